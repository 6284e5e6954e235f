#![forbid(unsafe_code)]

//! Error taxonomy for curation operations.
//!
//! Empty targets are not errors: callers get a no-op outcome instead. Every
//! error below is raised before the first mutation, so the partition, the
//! metadata and the action flow are left exactly as they were.

use thiserror::Error;

use crate::ClusterId;

/// Errors raised by curation operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CurationError {
    /// The request can never succeed (fewer than two clusters to merge, an id
    /// that was never allocated, mismatched split labels).
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// The request names clusters that existed once but were merged or split
    /// away in the meantime.
    #[error("stale cluster reference: {cluster_ids:?} no longer exist")]
    StaleReference { cluster_ids: Vec<ClusterId> },

    /// A spike index beyond the partition.
    #[error("spike {spike} out of range ({n_spikes} spikes)")]
    UnknownSpike { spike: usize, n_spikes: usize },

    /// A textual group, target or action name could not be parsed.
    #[error("cannot parse {0:?}")]
    Parse(String),
}

impl CurationError {
    /// Stale references come from views lagging behind the partition; the
    /// caller can drop the request and keep going.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::StaleReference { .. })
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidOperation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, CurationError>;
