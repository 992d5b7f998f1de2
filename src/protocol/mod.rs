//! Debugger protocol message types.
//!
//! This module defines the JSON text-frame format spoken on the
//! remote-debugging socket.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `CommandFrame` | Driver → Browser | Command request |
//! | `Response` | Browser → Driver | Command response |
//! | `Notification` | Browser → Driver | Unsolicited event |
//!
//! Only two methods are ever sent: `Network.enable` (the handshake issued
//! right after the socket opens) and `Runtime.evaluate` (the primitive every
//! DOM operation is built on). Readiness is detected from the
//! `Network.loadingFinished` notification.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `message` | Outbound frames and inbound demultiplexing |
//! | `evaluate` | Evaluation results and error classification |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound command frames and inbound message types.
pub mod message;

/// Evaluation result types and classification.
pub mod evaluate;

// ============================================================================
// Re-exports
// ============================================================================

pub use evaluate::{Evaluation, ExceptionDetails, RemoteObject, RemoteObjectKind};
pub use message::{Command, CommandFrame, ErrorPayload, InboundMessage, Notification, Response};
