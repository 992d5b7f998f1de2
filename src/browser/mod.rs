//! Browser entities: [`Session`] and [`Page`].
//!
//! A [`Session`] owns one browser process and one debugger connection;
//! [`Page`] is the command surface built on the evaluate primitive.
//!
//! # Module Structure
//!
//! | Module | Description |
//! |--------|-------------|
//! | `session` | Session lifecycle: launch, accessors, shutdown sequence |
//! | `page` | DOM operations: click, input values, network idle |

// ============================================================================
// Submodules
// ============================================================================

mod page;
mod session;

// ============================================================================
// Re-exports
// ============================================================================

pub use page::Page;
pub use session::{Session, SessionBuilder};
