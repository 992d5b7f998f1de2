//! Chrome DevTools driver - scripted UI automation over the
//! remote-debugging protocol.
//!
//! This library drives a headless Chromium-family browser by talking to
//! its remote-debugging endpoint over a persistent WebSocket.
//!
//! # Architecture
//!
//! The driver reconciles three independently-timed event sources into one
//! call/return surface:
//!
//! - **Process**: the browser subprocess is spawned with fixed flags and
//!   supervised for the life of the session
//! - **Socket**: the debugging endpoint is discovered over local HTTP,
//!   then a handshake and a readiness notification gate the connection
//! - **Messages**: responses arrive in any order and are correlated with
//!   their commands by a monotonic integer id
//!
//! Key design principles:
//!
//! - Each [`Session`] owns: browser process + debugger connection + event loop
//! - One primitive (`Runtime.evaluate`) carries every DOM operation
//! - Responses resolve one-shot pending slots; unknown ids are protocol noise
//! - No reconnection: an unexpected socket drop is fatal to the session
//!
//! # Quick Start
//!
//! ```no_run
//! use chrome_devtools::{ChromeOptions, Result, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Launch a headless browser pointed at the target page
//!     let session = Session::builder()
//!         .options(ChromeOptions::new("/usr/bin/chromium"))
//!         .url("https://example.com/login")
//!         .launch()
//!         .await?;
//!
//!     // Interact through the page surface
//!     let page = session.page();
//!     page.set_input_value("#email", "user@example.com").await?;
//!     page.click("#submit").await?;
//!     page.wait_for_network_idle().await?;
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`browser`] | Browser entities: [`Session`], [`Page`] |
//! | [`driver`] | Process supervision and launch options |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Debugger message types (internal) |
//! | [`transport`] | Endpoint discovery and socket transport (internal) |
//!
//! # Limitations
//!
//! - Commands have no deadline unless one is configured on the builder;
//!   a response that never arrives blocks its caller indefinitely
//! - In-flight commands cannot be cancelled; shutdown tears down the
//!   transport without settling work the browser never answered
//! - The network-idle wait relies on jQuery being loaded on the page

// ============================================================================
// Modules
// ============================================================================

/// Browser entities: Session and Page.
///
/// This module contains the caller-facing types:
///
/// - [`Session`] - Automation session (owns the browser process)
/// - [`Page`] - DOM command surface over the evaluate primitive
pub mod browser;

/// Process supervision and launch configuration.
///
/// Use [`ChromeOptions::new`] to configure how the browser is started.
pub mod driver;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for protocol entities.
///
/// Newtype wrappers prevent mixing incompatible IDs at compile time.
pub mod identifiers;

/// Debugger protocol message types.
///
/// Internal module defining command/response/notification structures.
pub mod protocol;

/// Transport layer.
///
/// Internal module handling endpoint discovery and the socket connection.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Browser types
pub use browser::{Page, Session, SessionBuilder};

// Driver types
pub use driver::{BrowserProcess, ChromeOptions};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::CommandId;

// Protocol types
pub use protocol::{Evaluation, RemoteObject, RemoteObjectKind};

// Transport types
pub use transport::{Connection, ConnectionState};
