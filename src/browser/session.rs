//! Session lifecycle management.
//!
//! A [`Session`] ties together the three independently-timed pieces of a
//! live automation run: the browser subprocess, the discovered debugger
//! endpoint, and the correlated socket connection. It is created with a
//! navigation target and destroyed only by an explicit [`Session::close`].
//!
//! # Example
//!
//! ```no_run
//! use chrome_devtools::{ChromeOptions, Result, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let session = Session::builder()
//!         .options(ChromeOptions::new("/usr/bin/chromium"))
//!         .url("https://example.com")
//!         .launch()
//!         .await?;
//!
//!     let page = session.page();
//!     page.click("#login").await?;
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::driver::{BrowserProcess, ChromeOptions};
use crate::error::{Error, Result};
use crate::transport::{Connection, ConnectionState, DebuggerEndpoint};

use super::Page;

// ============================================================================
// Constants
// ============================================================================

/// Pause before teardown so in-flight handshake notification traffic
/// settles.
const SHUTDOWN_DRAIN_DELAY: Duration = Duration::from_millis(500);

// ============================================================================
// Session
// ============================================================================

/// A live automation session.
///
/// Owns the browser process and the debugger connection. Dropping a
/// session kills the process via its guard, but the orderly path is
/// [`Session::close`].
pub struct Session {
    /// Supervised browser subprocess.
    process: Mutex<BrowserProcess>,
    /// Correlated debugger connection.
    connection: Connection,
    /// Navigation target the browser was launched with.
    target_url: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("pid", &self.pid())
            .field("target_url", &self.target_url)
            .field("state", &self.connection.state())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session - Public API
// ============================================================================

impl Session {
    /// Creates a configuration builder for a session.
    #[inline]
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Returns the command surface for the attached page.
    #[inline]
    #[must_use]
    pub fn page(&self) -> Page {
        Page::new(self.connection.clone())
    }

    /// Returns the browser process ID.
    #[inline]
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.process.lock().pid()
    }

    /// Returns the current connection state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.connection.state()
    }

    /// Returns the navigation target the session was launched with.
    #[inline]
    #[must_use]
    pub fn target_url(&self) -> &str {
        &self.target_url
    }

    /// Shuts the session down.
    ///
    /// The sequence is fixed: drain delay, mark the close as intentional,
    /// terminate the subprocess (captured stderr first), close the
    /// socket, then await the connection's close signal. Completes even
    /// if the connection never became ready. Pending commands are not
    /// cancelled; once the transport is gone they settle with
    /// [`Error::ConnectionClosed`].
    #[allow(clippy::await_holding_lock)]
    pub async fn close(&self) -> Result<()> {
        debug!(target_url = %self.target_url, "Closing session");

        sleep(SHUTDOWN_DRAIN_DELAY).await;

        self.connection.begin_shutdown();

        {
            let mut process = self.process.lock();
            process.terminate().await;
        }

        self.connection.shutdown();
        self.connection.wait_closed().await;

        info!(target_url = %self.target_url, "Session closed");
        Ok(())
    }
}

// ============================================================================
// SessionBuilder
// ============================================================================

/// Builder for configuring and launching a [`Session`].
///
/// Use [`Session::builder()`] to create a new builder.
#[derive(Debug, Default, Clone)]
pub struct SessionBuilder {
    /// Browser launch options.
    options: Option<ChromeOptions>,
    /// Navigation target URL.
    url: Option<String>,
    /// Optional per-command response deadline.
    command_deadline: Option<Duration>,
}

impl SessionBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the browser launch options.
    #[must_use]
    pub fn options(mut self, options: ChromeOptions) -> Self {
        self.options = Some(options);
        self
    }

    /// Sets the navigation target URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Bounds every command with a response deadline.
    ///
    /// Without one, a command whose response never arrives waits
    /// indefinitely.
    #[must_use]
    pub fn command_deadline(mut self, deadline: Duration) -> Self {
        self.command_deadline = Some(deadline);
        self
    }

    /// Launches the browser and establishes the session.
    ///
    /// Spawns the process, polls the debugging endpoint until it
    /// advertises a target, opens the socket, and waits for the
    /// readiness notification.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if options or URL are missing or invalid
    /// - [`Error::LaunchFailed`] if the process cannot be started
    /// - [`Error::Connection`] / [`Error::ConnectionLost`] if the socket
    ///   cannot be established or drops before readiness
    pub async fn launch(self) -> Result<Session> {
        let options = self
            .options
            .ok_or_else(|| Error::config("browser options are required"))?;
        let target_url = self
            .url
            .ok_or_else(|| Error::config("navigation target URL is required"))?;

        let process = BrowserProcess::spawn(&options, &target_url)?;

        let endpoint = DebuggerEndpoint::new(options.debugging_port);
        let ws_url = endpoint.discover().await?;

        let connection = Connection::open(&ws_url, self.command_deadline).await?;
        connection.wait_connected().await?;

        info!(pid = process.pid(), target_url = %target_url, "Session established");

        Ok(Session {
            process: Mutex::new(process),
            connection,
            target_url,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
