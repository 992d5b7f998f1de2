//! Outbound command frames and inbound message types.
//!
//! Defines the wire format for commands sent to the browser and the two
//! shapes of inbound traffic: responses (carry an `id`) and notifications
//! (carry a `method`, no `id`).

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;

// ============================================================================
// Command
// ============================================================================

/// The protocol methods this driver sends.
///
/// The method name and its parameters serialize together: the variant name
/// becomes the `method` field and the variant payload becomes `params`.
/// Unit variants omit `params` entirely.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "method", content = "params")]
pub enum Command {
    /// Handshake: enable network event reporting.
    ///
    /// Sent immediately after the socket opens; the readiness notification
    /// this enables is what flips the connection to connected.
    #[serde(rename = "Network.enable")]
    NetworkEnable,

    /// Evaluate a JavaScript expression in the page.
    #[serde(rename = "Runtime.evaluate")]
    RuntimeEvaluate {
        /// The expression text to evaluate.
        expression: String,
    },
}

impl Command {
    /// Returns the protocol method name for this command.
    #[inline]
    #[must_use]
    pub const fn method(&self) -> &'static str {
        match self {
            Self::NetworkEnable => "Network.enable",
            Self::RuntimeEvaluate { .. } => "Runtime.evaluate",
        }
    }
}

// ============================================================================
// CommandFrame
// ============================================================================

/// An outbound command frame.
///
/// # Format
///
/// ```json
/// {
///   "id": 3,
///   "method": "Runtime.evaluate",
///   "params": { "expression": "..." }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct CommandFrame {
    /// Identifier echoed back in the matching response.
    pub id: CommandId,

    /// Command with method and params.
    #[serde(flatten)]
    pub command: Command,
}

impl CommandFrame {
    /// Creates a frame pairing a command with its correlation ID.
    #[inline]
    #[must_use]
    pub fn new(id: CommandId, command: Command) -> Self {
        Self { id, command }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A response to a previously sent command.
///
/// # Format
///
/// Success:
/// ```json
/// { "id": 3, "result": { ... } }
/// ```
///
/// Error:
/// ```json
/// { "id": 3, "error": { "code": -32601, "message": "..." } }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    /// Matches the command `id`.
    pub id: CommandId,

    /// Result payload (if success).
    #[serde(default)]
    pub result: Option<Value>,

    /// Error payload (if the browser rejected the command).
    #[serde(default)]
    pub error: Option<ErrorPayload>,
}

impl Response {
    /// Returns `true` if this is an error response.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Extracts the result value, surfacing the error payload if present.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CommandFailed`] if the response carried an error
    /// payload.
    pub fn into_result(self) -> Result<Value> {
        match self.error {
            Some(payload) => Err(Error::command_failed(payload.code, payload.message)),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

// ============================================================================
// ErrorPayload
// ============================================================================

/// Error payload attached to a rejected command.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
    /// Protocol error code.
    #[serde(default)]
    pub code: i64,

    /// Human-readable message.
    #[serde(default)]
    pub message: String,
}

// ============================================================================
// Notification
// ============================================================================

/// An unsolicited inbound message with no associated command.
///
/// Used only to detect readiness (`Network.loadingFinished`); all other
/// notifications are observed and discarded.
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    /// Event method name, e.g. `Network.loadingFinished`.
    pub method: String,

    /// Event parameters.
    #[serde(default)]
    pub params: Value,
}

// ============================================================================
// InboundMessage
// ============================================================================

/// Any message arriving on the debugger socket.
///
/// Demultiplexing rule: a frame with a `method` field is a notification;
/// otherwise it is a response keyed by `id`. Variant order encodes that
/// rule for the untagged deserializer.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum InboundMessage {
    /// Unsolicited event.
    Notification(Notification),
    /// Reply to a sent command.
    Response(Response),
}

impl InboundMessage {
    /// Parses a raw text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the frame is neither a response nor a
    /// notification.
    #[inline]
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
