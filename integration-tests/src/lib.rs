mod dashboard;
mod snyk;

pub mod runner;

pub use dashboard::*;
pub use snyk::*;

use core::future::Future;
use snyk_export_client::{ExportScope, PollConfig, SnykConfig};
use std::{net::TcpListener, time::Duration};
use tokio::{select, time::timeout};

pub async fn assert_within_timeout<F: Future>(t: Duration, f: F) -> F::Output {
    match timeout(t, f).await {
        Ok(result) => result,
        Err(_) => panic!("Unable to perform operation successfully within timeout"),
    }
}
