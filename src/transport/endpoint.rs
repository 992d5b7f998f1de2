//! Debugging endpoint discovery.
//!
//! After the browser process starts, its debugger needs an unknown amount
//! of time before the HTTP target list answers. Discovery polls the list
//! until it yields a usable socket endpoint; endpoint-not-ready is
//! transient and never reported as an error.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Delay between target-list polls.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

// ============================================================================
// TargetDescriptor
// ============================================================================

/// A debuggable target advertised on the HTTP target list.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetDescriptor {
    /// Target identifier.
    #[serde(default)]
    pub id: String,

    /// Target kind, e.g. `page`.
    #[serde(rename = "type", default)]
    pub target_type: String,

    /// Page title.
    #[serde(default)]
    pub title: String,

    /// Current URL of the target.
    #[serde(default)]
    pub url: String,

    /// Socket endpoint for attaching the debugger.
    #[serde(rename = "webSocketDebuggerUrl", default)]
    pub web_socket_debugger_url: Option<String>,
}

// ============================================================================
// DebuggerEndpoint
// ============================================================================

/// Locator for the browser's remote-debugging socket.
///
/// # Example
///
/// ```ignore
/// use chrome_devtools::transport::DebuggerEndpoint;
///
/// let endpoint = DebuggerEndpoint::new(9222);
/// let ws_url = endpoint.discover().await?;
/// ```
pub struct DebuggerEndpoint {
    /// Remote-debugging port the browser was launched with.
    port: u16,
    /// HTTP client reused across polls.
    client: reqwest::Client,
}

impl DebuggerEndpoint {
    /// Creates a locator for the given debugging port.
    #[inline]
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            port,
            client: reqwest::Client::new(),
        }
    }

    /// Returns the target-list URL.
    ///
    /// Format: `http://127.0.0.1:{port}/json`
    #[inline]
    #[must_use]
    pub fn list_url(&self) -> String {
        format!("http://127.0.0.1:{}/json", self.port)
    }

    /// Polls the target list until it yields a socket endpoint.
    ///
    /// The first listed target is used. There is no upper bound on
    /// retries: the caller bounds discovery externally if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the advertised endpoint is not a
    /// valid URL. Unreachable-endpoint conditions are retried, not
    /// returned.
    pub async fn discover(&self) -> Result<Url> {
        let list_url = self.list_url();
        debug!(url = %list_url, "Discovering debugger endpoint");

        loop {
            match self.fetch_first_target().await {
                Some(ws_url) => {
                    debug!(url = %ws_url, "Debugger endpoint ready");
                    return Url::parse(&ws_url).map_err(|e| {
                        Error::protocol(format!("Invalid debugger endpoint URL: {e}"))
                    });
                }
                None => sleep(POLL_INTERVAL).await,
            }
        }
    }

    /// Fetches the target list once.
    ///
    /// Returns the first target's socket endpoint, or `None` while the
    /// endpoint is not ready (connection refused, bad body, empty list,
    /// endpoint field missing).
    async fn fetch_first_target(&self) -> Option<String> {
        let response = match self.client.get(self.list_url()).send().await {
            Ok(response) => response,
            Err(e) => {
                trace!(error = %e, "Target list not reachable yet");
                return None;
            }
        };

        let targets: Vec<TargetDescriptor> = match response.json().await {
            Ok(targets) => targets,
            Err(e) => {
                trace!(error = %e, "Target list not parseable yet");
                return None;
            }
        };

        targets
            .into_iter()
            .next()
            .and_then(|target| target.web_socket_debugger_url)
    }
}

// ============================================================================
// Tests
// ============================================================================
