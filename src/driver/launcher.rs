//! Browser process lifecycle.
//!
//! Spawns the browser binary with the configured flags and owns the child
//! for the life of the session. Standard error is captured so debugger
//! chatter does not pollute the caller's terminal; standard output is
//! left unmanaged.
//!
//! There are no retries: a binary that cannot be started is a fatal
//! startup error surfaced immediately.

// ============================================================================
// Imports
// ============================================================================

use std::process::Stdio;

use tokio::process::{Child, ChildStderr, Command};
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::options::ChromeOptions;

// ============================================================================
// BrowserProcess
// ============================================================================

/// A supervised browser subprocess.
///
/// Created by [`BrowserProcess::spawn`] and torn down by
/// [`BrowserProcess::terminate`], which the shutdown sequence invokes
/// exactly once. If the handle is dropped without terminating, a kill
/// signal is still sent so no orphan survives the driver.
#[derive(Debug)]
pub struct BrowserProcess {
    /// The child process handle, taken on terminate.
    child: Option<Child>,
    /// Captured error stream, closed before the process is killed.
    stderr: Option<ChildStderr>,
    /// Process ID for logging.
    pid: u32,
}

impl BrowserProcess {
    /// Spawns the browser with the configured flags and navigation target.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the options fail validation, or
    /// [`Error::LaunchFailed`] if the process cannot be started.
    pub fn spawn(options: &ChromeOptions, target_url: &str) -> Result<Self> {
        options.validate()?;

        let mut cmd = Command::new(&options.binary);
        cmd.args(options.to_args(target_url));

        // stderr captured, stdout deliberately unmanaged.
        cmd.stdin(Stdio::null()).stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(Error::launch_failed)?;
        let stderr = child.stderr.take();
        let pid = child.id().unwrap_or(0);

        info!(pid, binary = %options.binary.display(), "Browser process spawned");

        Ok(Self {
            child: Some(child),
            stderr,
            pid,
        })
    }

    /// Returns the process ID.
    #[inline]
    #[must_use]
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Terminates the process.
    ///
    /// Closes the captured error stream first, then kills and reaps the
    /// child. Invoked once, from the session shutdown sequence.
    pub async fn terminate(&mut self) {
        drop(self.stderr.take());

        if let Some(mut child) = self.child.take() {
            debug!(pid = self.pid, "Killing browser process");
            if let Err(e) = child.kill().await {
                debug!(pid = self.pid, error = %e, "Failed to kill process");
            }
            if let Err(e) = child.wait().await {
                debug!(pid = self.pid, error = %e, "Failed to reap process");
            }
            info!(pid = self.pid, "Browser process terminated");
        }
    }
}

impl Drop for BrowserProcess {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take()
            && let Err(e) = child.start_kill()
        {
            debug!(pid = self.pid, error = %e, "Failed to send kill signal in Drop");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
