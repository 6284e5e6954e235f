#![forbid(unsafe_code)]

//! Reference dataset shared by tests across the workspace.
//!
//! Seven clusters of two spikes each. Quality equals the cluster id, so the
//! best cluster is the highest id; similarity to `c` ranks every other
//! cluster `d` by `c * 1.01 + d`.

use crate::group::Group;
use crate::metadata::ClusterMetadata;
use crate::partition::ClusterPartition;
use crate::ClusterId;

pub const CLUSTER_IDS: [ClusterId; 7] = [0, 1, 2, 10, 11, 20, 30];

/// Spikes per cluster in the reference dataset.
pub const SPIKES_PER_CLUSTER: usize = 2;

#[must_use]
pub fn spike_clusters() -> Vec<ClusterId> {
    CLUSTER_IDS
        .iter()
        .flat_map(|&id| std::iter::repeat_n(id, SPIKES_PER_CLUSTER))
        .collect()
}

#[must_use]
pub fn cluster_groups() -> Vec<(ClusterId, Group)> {
    vec![
        (0, Group::Noise),
        (1, Group::Good),
        (10, Group::Mua),
        (11, Group::Good),
    ]
}

#[must_use]
pub fn partition() -> ClusterPartition {
    ClusterPartition::new(&spike_clusters())
}

#[must_use]
pub fn metadata() -> ClusterMetadata {
    ClusterMetadata::new().with_groups(cluster_groups())
}

#[must_use]
pub fn quality(cluster: ClusterId) -> f64 {
    f64::from(cluster)
}

/// Every other reference cluster with its similarity to `cluster`, in the
/// order a similarity engine would return them (unsorted). Clusters created
/// later are never listed.
#[must_use]
pub fn similarity(cluster: ClusterId) -> Vec<(ClusterId, f64)> {
    CLUSTER_IDS
        .iter()
        .copied()
        .filter(|&other| other != cluster)
        .map(|other| (other, f64::from(cluster) * 1.01 + f64::from(other)))
        .collect()
}
