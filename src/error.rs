//! Error and outcome types.
//!
//! Nothing in this crate is fatal. Failures are local and recover through a
//! new navigation or a cache invalidation:
//!
//! - [`FetchError`]: a data source read or mutation failed. Shared reads
//!   hand the same error to every waiter, so it is `Clone`.
//! - [`CommitOutcome`]: what happened when the rendering surface reported
//!   a staged location as displayed.
//!
//! # Examples
//!
//! ```
//! use async_navigator::error::{CommitOutcome, FetchError};
//!
//! let err = FetchError::not_found("42");
//! assert_eq!(err.to_string(), "No lesson with id 42");
//!
//! assert!(CommitOutcome::Committed.is_committed());
//! assert!(!CommitOutcome::Superseded.is_committed());
//! ```

use std::fmt;

// ============================================================================
// FetchError
// ============================================================================

/// Failure reported by a data source call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The endpoint answered with an error.
    Failed {
        /// Endpoint path, e.g. `/lessons`.
        endpoint: String,
        /// Human-readable failure description.
        message: String,
    },

    /// A mutation referenced a record that does not exist.
    NotFound { id: String },

    /// The request was dropped before it produced a value.
    Cancelled { endpoint: String },
}

impl FetchError {
    /// Create a [`FetchError::Failed`].
    pub fn failed(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a [`FetchError::NotFound`].
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Failed { endpoint, message } => {
                write!(f, "Request to {} failed: {}", endpoint, message)
            }
            FetchError::NotFound { id } => write!(f, "No lesson with id {}", id),
            FetchError::Cancelled { endpoint } => {
                write!(f, "Request to {} was cancelled", endpoint)
            }
        }
    }
}

impl std::error::Error for FetchError {}

// ============================================================================
// CommitOutcome
// ============================================================================

/// Result of reporting a staged location as displayed.
///
/// Returned by [`Coordinator::displayed`](crate::Coordinator::displayed).
/// Only [`Committed`](Self::Committed) produced a platform-visible effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// The pending commit ran.
    Committed,
    /// A newer stage replaced the one that was rendered; nothing ran.
    Superseded,
    /// The commit for this stage already ran.
    AlreadyCommitted,
}

impl CommitOutcome {
    /// Check if the pending commit ran
    pub fn is_committed(&self) -> bool {
        matches!(self, CommitOutcome::Committed)
    }
}

impl fmt::Display for CommitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitOutcome::Committed => write!(f, "committed"),
            CommitOutcome::Superseded => write!(f, "superseded by a newer navigation"),
            CommitOutcome::AlreadyCommitted => write!(f, "already committed"),
        }
    }
}
