//! Shutdown coordination.
//!
//! Both triggers end in the same place: the front door's `/shutdown` route.
//! The operator interrupt is turned into an HTTP request against that route,
//! which clears the front door's running flag and relays the stop frame to
//! the ingestion listener.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::config::ServerEndpoint;

/// Path of the shutdown route.
pub const SHUTDOWN_PATH: &str = "/shutdown";

const SHUTDOWN_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Cooperative run flag for the front door's request loop.
///
/// Clones share the same flag.
#[derive(Debug, Clone)]
pub struct RunningFlag(Arc<AtomicBool>);

impl RunningFlag {
    /// A new flag in the running state.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_running(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag. Returns `true` if this call did the stopping.
    pub fn stop(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

impl Default for RunningFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// URL of the shutdown route for a front door endpoint.
pub fn shutdown_url(endpoint: &ServerEndpoint) -> Result<Url, url::ParseError> {
    let host = endpoint.public_host();
    let host = if host.contains(':') && !host.starts_with('[') {
        format!("[{}]", host)
    } else {
        host.to_string()
    };
    Url::parse(&format!("http://{}:{}{}", host, endpoint.port, SHUTDOWN_PATH))
}

/// Ask the front door at `endpoint` to shut down.
///
/// Best-effort: failures (server already gone, bad alias) are logged and
/// reported as `false`, never raised.
pub async fn request_remote_shutdown(endpoint: &ServerEndpoint) -> bool {
    let url = match shutdown_url(endpoint) {
        Ok(url) => url,
        Err(e) => {
            tracing::warn!(host = endpoint.public_host(), port = endpoint.port, error = %e, "Invalid shutdown URL");
            return false;
        }
    };

    let client = match reqwest::Client::builder()
        .no_proxy()
        .timeout(SHUTDOWN_REQUEST_TIMEOUT)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to build shutdown client");
            return false;
        }
    };

    match client.get(url.clone()).send().await {
        Ok(res) => {
            tracing::info!(url = %url, status = %res.status(), "Shutdown requested");
            res.status().is_success()
        }
        Err(e) => {
            tracing::warn!(url = %url, error = %e, "Shutdown request failed, server likely down");
            false
        }
    }
}
