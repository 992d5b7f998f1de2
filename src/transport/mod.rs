//! Debugger transport layer.
//!
//! This module handles communication with the browser's remote-debugging
//! endpoint: discovering the WebSocket URL over local HTTP, then speaking
//! JSON text frames on a persistent socket.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Session (Rust) │   GET /json (discovery)      │  Browser        │
//! │                 │─────────────────────────────►│  (DevTools)     │
//! │  DebuggerEndpoint                              │                 │
//! │  → Connection   │◄────────────────────────────►│  WebSocket      │
//! │                 │      ws://127.0.0.1:PORT     │  Server         │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `DebuggerEndpoint::discover` - Poll the target list until it answers
//! 2. `Connection::open` - Connect the socket, send the handshake
//! 3. `Network.loadingFinished` notification observed - state is Connected
//! 4. `Connection::send` - Commands correlated with responses by id
//! 5. `Connection::shutdown` - Close the socket, settle the close signal
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection, event loop, correlation |
//! | `endpoint` | HTTP target-list discovery |

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// Debugging endpoint discovery.
pub mod endpoint;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, ConnectionState};
pub use endpoint::{DebuggerEndpoint, TargetDescriptor};
