//! Error types for the DevTools driver.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use chrome_devtools::{Result, Session};
//!
//! async fn example(session: &Session) -> Result<()> {
//!     session.click("#submit").await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Startup | [`Error::Config`], [`Error::LaunchFailed`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionClosed`], [`Error::ConnectionLost`] |
//! | Protocol | [`Error::Protocol`], [`Error::CommandFailed`], [`Error::CommandDeadline`] |
//! | Evaluation | [`Error::JsSyntax`], [`Error::JsEvaluation`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Http`] |
//!
//! Startup and connection-lost errors are fatal: the driver never retries a
//! failed launch and never reconnects a dropped socket.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::CommandId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Startup Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when session configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Failed to launch the browser process.
    ///
    /// Returned when the browser binary cannot be started. Fatal; the
    /// driver does not retry a failed launch.
    #[error("Failed to launch browser: {message}")]
    LaunchFailed {
        /// Description of the launch failure.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the debugger socket cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection closed during intentional shutdown.
    ///
    /// Returned to commands still pending when the session tears down.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Connection dropped while the session was still in use.
    ///
    /// Returned when the socket closes or errors without the caller having
    /// initiated shutdown. Fatal; no reconnection is attempted.
    #[error("Connection lost unexpectedly")]
    ConnectionLost,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected message shape.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// The browser answered a command with an error payload.
    #[error("Command failed ({code}): {message}")]
    CommandFailed {
        /// Protocol error code.
        code: i64,
        /// Error message from the browser.
        message: String,
    },

    /// A command exceeded the configured deadline.
    ///
    /// Only produced when a deadline is configured; by default commands
    /// wait indefinitely for their response.
    #[error("Command {id} exceeded deadline of {deadline_ms}ms")]
    CommandDeadline {
        /// The command that timed out.
        id: CommandId,
        /// Milliseconds waited before giving up.
        deadline_ms: u64,
    },

    // ========================================================================
    // Evaluation Errors
    // ========================================================================
    /// The evaluated expression failed to parse.
    ///
    /// The message has the `SyntaxError: ` marker stripped; the offending
    /// expression is carried verbatim.
    #[error("Syntax error: {message} in expression `{expression}`")]
    JsSyntax {
        /// Parser message with the syntax-error marker removed.
        message: String,
        /// The expression that was evaluated.
        expression: String,
    },

    /// The evaluated expression raised an exception.
    #[error("Evaluation error: {description} in expression `{expression}`")]
    JsEvaluation {
        /// Raw exception description from the browser.
        description: String,
        /// The expression that was evaluated.
        expression: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// HTTP error from target discovery.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a launch failure from a spawn error.
    #[inline]
    pub fn launch_failed(err: IoError) -> Self {
        Self::LaunchFailed {
            message: err.to_string(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates a command-failed error from a protocol error payload.
    #[inline]
    pub fn command_failed(code: i64, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            code,
            message: message.into(),
        }
    }

    /// Creates a command-deadline error.
    #[inline]
    pub fn command_deadline(id: CommandId, deadline_ms: u64) -> Self {
        Self::CommandDeadline { id, deadline_ms }
    }

    /// Creates a syntax-error classification.
    #[inline]
    pub fn js_syntax(message: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::JsSyntax {
            message: message.into(),
            expression: expression.into(),
        }
    }

    /// Creates a generic evaluation-error classification.
    #[inline]
    pub fn js_evaluation(description: impl Into<String>, expression: impl Into<String>) -> Self {
        Self::JsEvaluation {
            description: description.into(),
            expression: expression.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionClosed
                | Self::ConnectionLost
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a classified evaluation error.
    #[inline]
    #[must_use]
    pub fn is_evaluation_error(&self) -> bool {
        matches!(self, Self::JsSyntax { .. } | Self::JsEvaluation { .. })
    }

    /// Returns `true` if this error is fatal to the session.
    ///
    /// Fatal errors leave the session unusable: the process never started,
    /// or the socket dropped with no reconnection policy.
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::LaunchFailed { .. } | Self::ConnectionLost)
    }
}

// ============================================================================
// Tests
// ============================================================================
