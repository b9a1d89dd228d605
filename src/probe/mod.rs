// Remote probes: connectivity, throughput and external identity.
//
// Each probe talks to black-box services that can fail independently. Failures are
// classified in [`ProbeError`] and turned into fallback values by the monitor.

mod connectivity;
mod identity;
mod speed;

pub use connectivity::ConnectivityProbe;
pub use identity::HostIdentity;
pub use speed::HttpSpeedTester;

use crate::models::{Availability, SpeedStats};
use futures_util::future::BoxFuture;
use std::io::ErrorKind;
use std::time::Duration;
use thiserror::Error;

/// Probe and collector error types.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("network error: {0}")]
    Network(String),
    #[error("HTTP status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("host capability failed: {0}")]
    Capability(String),
    #[error("not supported on this platform: {0}")]
    Unsupported(&'static str),
}

impl ProbeError {
    /// Classify a reqwest failure; `timeout` is the budget the request ran under.
    pub fn from_reqwest(e: reqwest::Error, timeout: Duration) -> Self {
        if e.is_timeout() {
            ProbeError::Timeout(timeout)
        } else if e.is_decode() {
            ProbeError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ProbeError::Status {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            }
        } else {
            ProbeError::Network(e.to_string())
        }
    }
}

/// True when the peer reset, aborted or closed the connection mid-exchange.
pub(crate) fn is_dropped_connection(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(e) = source {
        if let Some(io) = e.downcast_ref::<std::io::Error>()
            && matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            )
        {
            return true;
        }
        if let Some(hyper_err) = e.downcast_ref::<hyper::Error>()
            && (hyper_err.is_incomplete_message() || hyper_err.is_closed() || hyper_err.is_canceled())
        {
            return true;
        }
        source = e.source();
    }
    false
}

/// Decides whether the internet is reachable.
pub trait ConnectivityCheck: Send + Sync {
    /// Never fails: an unreachable network is reported as [`Availability::unreachable`].
    fn check(&self, timeout: Duration) -> BoxFuture<'_, Availability>;
}

/// Measures download and upload throughput.
pub trait SpeedTester: Send + Sync {
    fn measure(&self) -> BoxFuture<'_, Result<SpeedStats, ProbeError>>;
}

/// Shared HTTP client for every probe, identified by `user_agent`.
pub fn http_client(user_agent: &str) -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .build()
        .map_err(|e| anyhow::anyhow!("build http client: {}", e))
}
