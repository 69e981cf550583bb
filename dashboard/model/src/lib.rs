pub mod dashboard;
pub mod filters;

pub mod prelude {
    pub use crate::dashboard::*;
    pub use crate::filters::*;
}
