pub mod config;
pub mod upstream;

#[cfg(feature = "tls")]
pub mod reqwest;
#[cfg(feature = "tls")]
pub mod tls;
