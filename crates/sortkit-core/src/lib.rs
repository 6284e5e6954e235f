#![forbid(unsafe_code)]

//! sortkit core
//!
//! Data structures mutated by cluster curation: the spike partition, the
//! per-cluster labels and the snapshot history both are built on.
//!
//! # Key Components
//!
//! - [`ClusterPartition`] - spike to cluster assignment with merge and split
//! - [`ClusterMetadata`] - `(field, cluster)` labels such as the [`Group`]
//! - [`SnapshotHistory`] - linear undo/redo over immutable snapshots
//! - [`CurationError`] - failures shared by every curation operation
//!
//! # Role in sortkit
//! `sortkit-core` knows nothing about selection or navigation. The runtime
//! crate owns one partition and one metadata store and keeps their histories
//! aligned with its action flow.

pub mod error;
pub mod group;
pub mod metadata;
pub mod partition;
#[cfg(feature = "test-helpers")]
pub mod testing;
pub mod undo;

pub use error::{CurationError, Result};
pub use group::{GROUP_FIELD, Group, LabelValue};
pub use metadata::{ClusterMetadata, LabelChange, MetaSnapshot, MetaUpdate};
pub use partition::{ClusterPartition, PartitionSnapshot, PartitionUpdate, UpdateKind};
pub use undo::SnapshotHistory;

/// Identifier of a cluster. Never reused once allocated.
pub type ClusterId = u32;

/// Index of a spike in the recording.
pub type SpikeId = usize;
