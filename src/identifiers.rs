//! Type-safe identifiers for protocol entities.
//!
//! Newtype wrappers prevent mixing incompatible IDs at compile time.
//!
//! # Identifier Types
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`CommandId`] | Request/response correlation on the debugger socket |
//! | [`CommandIdSequence`] | Monotonic allocator for [`CommandId`] |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

// ============================================================================
// CommandId
// ============================================================================

/// Identifier correlating a protocol command with its response.
///
/// Serialized as a bare integer in the `id` field of outbound frames.
/// The browser echoes the same integer back in the matching response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(u64);

impl CommandId {
    /// Creates a command ID from a raw integer.
    #[inline]
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw integer value.
    #[inline]
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// CommandIdSequence
// ============================================================================

/// Monotonic allocator for [`CommandId`] values.
///
/// The first allocated ID is 1; the handshake command consumes it.
/// Each connection owns exactly one sequence.
#[derive(Debug)]
pub struct CommandIdSequence {
    /// Next ID to hand out.
    next: AtomicU64,
}

impl CommandIdSequence {
    /// Creates a sequence starting at 1.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Allocates the next command ID.
    #[inline]
    pub fn next(&self) -> CommandId {
        CommandId(self.next.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for CommandIdSequence {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
