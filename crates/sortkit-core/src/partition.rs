#![forbid(unsafe_code)]

//! Spike-to-cluster partition with versioned snapshots.
//!
//! A [`ClusterPartition`] assigns every spike to exactly one cluster. Merges
//! and splits never edit a snapshot in place: each produces a new
//! [`PartitionSnapshot`] committed to a [`SnapshotHistory`], so earlier
//! versions stay reachable for undo.
//!
//! # Invariants
//!
//! 1. Every spike belongs to exactly one live cluster.
//! 2. The live id set is exactly the set of assigned ids; no cluster is empty.
//! 3. New ids are allocated from a counter that only grows, starting at
//!    `max(initial ids) + 1`. Undo does not rewind it, so an id is never
//!    handed out twice. Once `ClusterId::MAX` has been handed out, merges and
//!    splits fail with [`CurationError::InvalidOperation`].
//!
//! # Split semantics
//!
//! ```text
//! spike_clusters = [0, 0, 1, 1, 2, 2]      split(spikes = [1, 2])
//!
//!   selected spikes {1, 2}       -> new cluster n
//!   remainder of cluster 0 {0}   -> new cluster n + 1
//!   remainder of cluster 1 {3}   -> new cluster n + 2
//!   cluster 2 untouched
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use im::{OrdMap, Vector};
use tracing::debug;

use crate::error::{CurationError, Result};
use crate::undo::SnapshotHistory;
use crate::{ClusterId, SpikeId};

/// One immutable version of the partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSnapshot {
    spike_clusters: Vector<ClusterId>,
    /// Sorted spike indices of each live cluster.
    members: OrdMap<ClusterId, Arc<[SpikeId]>>,
}

impl PartitionSnapshot {
    fn from_assignment(spike_clusters: &[ClusterId]) -> Self {
        let mut grouped: BTreeMap<ClusterId, Vec<SpikeId>> = BTreeMap::new();
        for (spike, &cluster) in spike_clusters.iter().enumerate() {
            grouped.entry(cluster).or_default().push(spike);
        }
        Self {
            spike_clusters: spike_clusters.iter().copied().collect(),
            members: grouped
                .into_iter()
                .map(|(cluster, spikes)| (cluster, Arc::from(spikes)))
                .collect(),
        }
    }

    #[must_use]
    pub fn spike_clusters(&self) -> &Vector<ClusterId> {
        &self.spike_clusters
    }

    #[must_use]
    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        self.members.keys().copied().collect()
    }

    #[must_use]
    pub fn members(&self, cluster: ClusterId) -> Option<&[SpikeId]> {
        self.members.get(&cluster).map(AsRef::as_ref)
    }
}

/// What a partition mutation changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateKind {
    Merge,
    Assign,
    Undo,
    Redo,
}

/// Description of one partition change, for views and metadata propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionUpdate {
    pub kind: UpdateKind,
    /// Spikes whose cluster changed, ascending.
    pub spike_ids: Vec<SpikeId>,
    /// Clusters that appeared, ascending.
    pub added: Vec<ClusterId>,
    /// Clusters that disappeared, ascending.
    pub deleted: Vec<ClusterId>,
    /// `(parent, child)` pairs: spikes of `parent` now live in `child`.
    pub descendants: Vec<(ClusterId, ClusterId)>,
}

impl PartitionUpdate {
    fn diff(kind: UpdateKind, before: &PartitionSnapshot, after: &PartitionSnapshot) -> Self {
        let added: Vec<ClusterId> = after
            .members
            .keys()
            .filter(|id| !before.members.contains_key(id))
            .copied()
            .collect();
        let deleted: Vec<ClusterId> = before
            .members
            .keys()
            .filter(|id| !after.members.contains_key(id))
            .copied()
            .collect();
        let mut spike_ids: Vec<SpikeId> = added
            .iter()
            .filter_map(|id| after.members(*id))
            .flat_map(|spikes| spikes.iter().copied())
            .collect();
        spike_ids.sort_unstable();
        Self {
            kind,
            spike_ids,
            added,
            deleted,
            descendants: Vec::new(),
        }
    }
}

/// The live spike partition plus its full version history.
#[derive(Debug)]
pub struct ClusterPartition {
    history: SnapshotHistory<PartitionSnapshot>,
    /// One past `ClusterId::MAX` once the id space is used up.
    next_id: u64,
    /// Every id that has ever been live.
    known: BTreeSet<ClusterId>,
}

impl ClusterPartition {
    /// Build the initial partition from raw spike labels.
    #[must_use]
    pub fn new(spike_clusters: &[ClusterId]) -> Self {
        let next_id = spike_clusters
            .iter()
            .max()
            .map_or(0, |&max| u64::from(max) + 1);
        Self {
            history: SnapshotHistory::new(PartitionSnapshot::from_assignment(spike_clusters)),
            next_id,
            known: spike_clusters.iter().copied().collect(),
        }
    }

    fn snapshot(&self) -> &PartitionSnapshot {
        self.history.current()
    }

    // ====================================================================
    // Queries
    // ====================================================================

    /// Live cluster ids, ascending.
    #[must_use]
    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        self.snapshot().cluster_ids()
    }

    #[must_use]
    pub fn contains(&self, cluster: ClusterId) -> bool {
        self.snapshot().members.contains_key(&cluster)
    }

    /// Number of live clusters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshot().members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshot().members.is_empty()
    }

    #[must_use]
    pub fn n_spikes(&self) -> usize {
        self.snapshot().spike_clusters.len()
    }

    #[must_use]
    pub fn n_spikes_in(&self, cluster: ClusterId) -> usize {
        self.snapshot().members(cluster).map_or(0, <[SpikeId]>::len)
    }

    #[must_use]
    pub fn cluster_of(&self, spike: SpikeId) -> Option<ClusterId> {
        self.snapshot().spike_clusters.get(spike).copied()
    }

    #[must_use]
    pub fn spike_clusters(&self) -> &Vector<ClusterId> {
        &self.snapshot().spike_clusters
    }

    /// The snapshot currently in effect.
    #[must_use]
    pub fn current(&self) -> &Arc<PartitionSnapshot> {
        self.history.current()
    }

    /// Spikes of the given clusters, ascending. Unknown ids contribute nothing.
    #[must_use]
    pub fn spikes_in_clusters(&self, clusters: &[ClusterId]) -> Vec<SpikeId> {
        let snapshot = self.snapshot();
        let unique: BTreeSet<ClusterId> = clusters.iter().copied().collect();
        let mut spikes: Vec<SpikeId> = unique
            .into_iter()
            .filter_map(|id| snapshot.members(id))
            .flat_map(|members| members.iter().copied())
            .collect();
        spikes.sort_unstable();
        spikes
    }

    /// The id the next merge or split will start allocating from, or `None`
    /// once every id has been handed out.
    #[must_use]
    pub fn new_cluster_id(&self) -> Option<ClusterId> {
        ClusterId::try_from(self.next_id).ok()
    }

    /// The next `count` ids, without consuming them.
    fn reserve(&self, count: usize) -> Result<Vec<ClusterId>> {
        let end = self.next_id.saturating_add(count as u64);
        if end > u64::from(ClusterId::MAX) + 1 {
            return Err(CurationError::invalid(format!(
                "cluster id space exhausted, cannot allocate {count} more"
            )));
        }
        Ok((self.next_id..end)
            .filter_map(|id| ClusterId::try_from(id).ok())
            .collect())
    }

    /// Whether `cluster` has ever been part of this partition.
    #[must_use]
    pub fn was_allocated(&self, cluster: ClusterId) -> bool {
        self.known.contains(&cluster)
    }

    /// Check that every id is live.
    ///
    /// Ids that existed once are reported as [`CurationError::StaleReference`];
    /// ids that never existed make the request invalid.
    pub fn check_live(&self, clusters: &[ClusterId]) -> Result<()> {
        let missing: Vec<ClusterId> = clusters
            .iter()
            .copied()
            .filter(|id| !self.contains(*id))
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        if let Some(unknown) = missing.iter().find(|id| !self.was_allocated(**id)) {
            return Err(CurationError::invalid(format!(
                "cluster {unknown} does not exist"
            )));
        }
        Err(CurationError::StaleReference {
            cluster_ids: missing,
        })
    }

    fn check_spikes(&self, spikes: &[SpikeId]) -> Result<()> {
        let n_spikes = self.n_spikes();
        match spikes.iter().find(|spike| **spike >= n_spikes) {
            Some(&spike) => Err(CurationError::UnknownSpike { spike, n_spikes }),
            None => Ok(()),
        }
    }

    // ====================================================================
    // Mutations
    // ====================================================================

    /// Merge two or more live clusters into a freshly allocated one.
    pub fn merge(&mut self, clusters: &[ClusterId]) -> Result<PartitionUpdate> {
        let parents: BTreeSet<ClusterId> = clusters.iter().copied().collect();
        if parents.len() < 2 {
            return Err(CurationError::invalid(format!(
                "merge needs at least two distinct clusters, got {clusters:?}"
            )));
        }
        let parents: Vec<ClusterId> = parents.into_iter().collect();
        self.check_live(&parents)?;

        let to = self.reserve(1)?[0];
        let mut next = self.snapshot().clone();
        let mut spikes: Vec<SpikeId> = Vec::new();
        for parent in &parents {
            if let Some(members) = next.members.remove(parent) {
                spikes.extend(members.iter().copied());
            }
        }
        spikes.sort_unstable();
        for &spike in &spikes {
            next.spike_clusters.set(spike, to);
        }
        next.members.insert(to, Arc::from(spikes.clone()));

        self.next_id += 1;
        self.known.insert(to);
        self.history.commit(next);
        debug!(
            message = "partition.merge",
            parents = ?parents,
            to,
            n_spikes = spikes.len()
        );

        Ok(PartitionUpdate {
            kind: UpdateKind::Merge,
            spike_ids: spikes,
            added: vec![to],
            descendants: parents.iter().map(|&parent| (parent, to)).collect(),
            deleted: parents,
        })
    }

    /// Move the given spikes into one new cluster.
    ///
    /// The spikes left behind in each donor cluster form one new cluster per
    /// donor. An empty selection is a no-op and returns `Ok(None)`.
    pub fn split(&mut self, spikes: &[SpikeId]) -> Result<Option<PartitionUpdate>> {
        let labels = vec![0; spikes.len()];
        self.assign(spikes, &labels)
    }

    /// Split with an explicit sub-cluster label per spike.
    ///
    /// Labels are relative: equal labels end up in the same new cluster.
    pub fn split_with(
        &mut self,
        spikes: &[SpikeId],
        labels: &[u32],
    ) -> Result<Option<PartitionUpdate>> {
        self.assign(spikes, labels)
    }

    /// General reassignment primitive behind both split flavours.
    pub fn assign(&mut self, spikes: &[SpikeId], labels: &[u32]) -> Result<Option<PartitionUpdate>> {
        if spikes.len() != labels.len() {
            return Err(CurationError::invalid(format!(
                "{} spikes but {} labels",
                spikes.len(),
                labels.len()
            )));
        }
        if spikes.is_empty() {
            return Ok(None);
        }
        self.check_spikes(spikes)?;

        // First label wins for duplicated spikes.
        let mut selected: BTreeMap<SpikeId, u32> = BTreeMap::new();
        for (&spike, &label) in spikes.iter().zip(labels) {
            selected.entry(spike).or_insert(label);
        }

        let current = self.snapshot();
        let relative: BTreeMap<u32, usize> = selected
            .values()
            .copied()
            .collect::<BTreeSet<u32>>()
            .into_iter()
            .enumerate()
            .map(|(index, label)| (label, index))
            .collect();
        let donors: BTreeSet<ClusterId> = selected
            .keys()
            .map(|&spike| current.spike_clusters[spike])
            .collect();

        // Group index of every touched spike, plus the donor it came from.
        let mut groups: Vec<Vec<SpikeId>> = vec![Vec::new(); relative.len()];
        for (&spike, label) in &selected {
            groups[relative[label]].push(spike);
        }
        for donor in &donors {
            let remainder: Vec<SpikeId> = current
                .members(*donor)
                .unwrap_or_default()
                .iter()
                .copied()
                .filter(|spike| !selected.contains_key(spike))
                .collect();
            if !remainder.is_empty() {
                groups.push(remainder);
            }
        }

        let added = self.reserve(groups.len())?;
        let mut next = current.clone();
        let mut descendants: BTreeSet<(ClusterId, ClusterId)> = BTreeSet::new();
        let mut touched: Vec<SpikeId> = Vec::new();
        for donor in &donors {
            next.members.remove(donor);
        }
        for (&id, members) in added.iter().zip(groups) {
            for &spike in &members {
                descendants.insert((current.spike_clusters[spike], id));
                next.spike_clusters.set(spike, id);
            }
            touched.extend(members.iter().copied());
            next.members.insert(id, Arc::from(members));
        }
        touched.sort_unstable();

        self.next_id += added.len() as u64;
        self.known.extend(added.iter().copied());
        self.history.commit(next);
        debug!(
            message = "partition.assign",
            donors = ?donors,
            added = ?added,
            n_spikes = touched.len()
        );

        Ok(Some(PartitionUpdate {
            kind: UpdateKind::Assign,
            spike_ids: touched,
            added,
            deleted: donors.into_iter().collect(),
            descendants: descendants.into_iter().collect(),
        }))
    }

    // ====================================================================
    // History
    // ====================================================================

    /// Restore the previous snapshot. The id counter is left untouched.
    pub fn undo(&mut self) -> Option<PartitionUpdate> {
        let (undone, restored) = self.history.undo()?;
        Some(PartitionUpdate::diff(UpdateKind::Undo, &undone, &restored))
    }

    /// Re-apply the most recently undone snapshot.
    pub fn redo(&mut self) -> Option<PartitionUpdate> {
        let (left, restored) = self.history.redo()?;
        Some(PartitionUpdate::diff(UpdateKind::Redo, &left, &restored))
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Forget undone snapshots, e.g. once the action flow drops its future.
    pub fn discard_redo(&mut self) {
        self.history.discard_redo();
    }
}
