#![forbid(unsafe_code)]

//! Per-cluster labels with undoable mutations.
//!
//! Labels are keyed by `(field, cluster)`. A value is created on first
//! label and overwritten on update; nothing is removed implicitly. Fields may
//! declare a default returned for clusters without an explicit value.
//!
//! Merges inherit a field when every parent carries the same explicit
//! value. Split results start unlabeled.

use std::collections::{BTreeMap, BTreeSet};

use im::OrdMap;
use tracing::debug;

use crate::group::{GROUP_FIELD, Group, LabelValue};
use crate::undo::SnapshotHistory;
use crate::ClusterId;

/// One immutable version of every label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaSnapshot {
    values: OrdMap<String, OrdMap<ClusterId, LabelValue>>,
}

impl MetaSnapshot {
    fn explicit(&self, field: &str, cluster: ClusterId) -> Option<&LabelValue> {
        self.values.get(field).and_then(|column| column.get(&cluster))
    }

    fn changes_to(&self, other: &MetaSnapshot) -> Vec<LabelChange> {
        let fields: BTreeSet<&String> = self.values.keys().chain(other.values.keys()).collect();
        let mut changes = Vec::new();
        for field in fields {
            let empty = OrdMap::new();
            let before = self.values.get(field).unwrap_or(&empty);
            let after = other.values.get(field).unwrap_or(&empty);
            let clusters: BTreeSet<&ClusterId> = before.keys().chain(after.keys()).collect();
            for cluster in clusters {
                let old = before.get(cluster);
                let new = after.get(cluster);
                if old != new {
                    changes.push(LabelChange {
                        field: field.clone(),
                        cluster_id: *cluster,
                        before: old.cloned(),
                        after: new.cloned(),
                    });
                }
            }
        }
        changes
    }
}

/// A single label transition.
#[derive(Debug, Clone, PartialEq)]
pub struct LabelChange {
    pub field: String,
    pub cluster_id: ClusterId,
    pub before: Option<LabelValue>,
    pub after: Option<LabelValue>,
}

/// Every label change recorded by one metadata step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaUpdate {
    pub changes: Vec<LabelChange>,
}

impl MetaUpdate {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Distinct clusters touched, ascending.
    #[must_use]
    pub fn cluster_ids(&self) -> Vec<ClusterId> {
        self.changes
            .iter()
            .map(|change| change.cluster_id)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}

/// Label store for all clusters.
#[derive(Debug)]
pub struct ClusterMetadata {
    history: SnapshotHistory<MetaSnapshot>,
    defaults: BTreeMap<String, Option<LabelValue>>,
}

impl Default for ClusterMetadata {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterMetadata {
    /// An empty store with the `group` field declared.
    #[must_use]
    pub fn new() -> Self {
        let mut defaults = BTreeMap::new();
        defaults.insert(GROUP_FIELD.to_string(), None);
        Self {
            history: SnapshotHistory::new(MetaSnapshot::default()),
            defaults,
        }
    }

    /// Declare a field with an optional default.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>, default: Option<LabelValue>) -> Self {
        self.add_field(field, default);
        self
    }

    /// Seed explicit values. Seeds are part of the base snapshot and cannot
    /// be undone.
    #[must_use]
    pub fn with_values(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = (ClusterId, LabelValue)>,
    ) -> Self {
        let field = field.into();
        self.defaults.entry(field.clone()).or_insert(None);
        let mut base = MetaSnapshot::clone(self.history.current());
        let mut column = base.values.get(&field).cloned().unwrap_or_default();
        for (cluster, value) in values {
            column.insert(cluster, value);
        }
        base.values.insert(field, column);
        self.history.replace_current(base);
        self
    }

    /// Seed the group of each cluster.
    #[must_use]
    pub fn with_groups(self, groups: impl IntoIterator<Item = (ClusterId, Group)>) -> Self {
        self.with_values(
            GROUP_FIELD,
            groups
                .into_iter()
                .map(|(cluster, group)| (cluster, LabelValue::from(group))),
        )
    }

    /// Declare a field, or change its default. Not recorded in history.
    pub fn add_field(&mut self, field: impl Into<String>, default: Option<LabelValue>) {
        self.defaults.insert(field.into(), default);
    }

    /// All declared or labeled fields, ascending.
    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        let mut fields: BTreeSet<String> = self.defaults.keys().cloned().collect();
        fields.extend(self.history.current().values.keys().cloned());
        fields.into_iter().collect()
    }

    /// Explicit value, else the field default.
    #[must_use]
    pub fn get(&self, field: &str, cluster: ClusterId) -> Option<&LabelValue> {
        self.history
            .current()
            .explicit(field, cluster)
            .or_else(|| self.defaults.get(field).and_then(Option::as_ref))
    }

    #[must_use]
    pub fn group(&self, cluster: ClusterId) -> Option<Group> {
        self.get(GROUP_FIELD, cluster)
            .and_then(LabelValue::as_text)
            .and_then(|text| text.parse().ok())
    }

    /// Explicit values of one field.
    #[must_use]
    pub fn values(&self, field: &str) -> BTreeMap<ClusterId, LabelValue> {
        self.history
            .current()
            .values
            .get(field)
            .map(|column| column.iter().map(|(id, v)| (*id, v.clone())).collect())
            .unwrap_or_default()
    }

    /// Label every cluster in `clusters` with `value` as one undoable step.
    ///
    /// A step is recorded even when no value changes, so that callers that
    /// pair metadata steps with other history stay aligned. An empty id list
    /// records nothing.
    pub fn set(
        &mut self,
        field: &str,
        clusters: &[ClusterId],
        value: impl Into<LabelValue>,
    ) -> MetaUpdate {
        if clusters.is_empty() {
            return MetaUpdate::default();
        }
        let value = value.into();
        let before = self.history.current();
        let mut next = MetaSnapshot::clone(before);
        let mut column = next.values.get(field).cloned().unwrap_or_default();
        for &cluster in clusters {
            column.insert(cluster, value.clone());
        }
        next.values.insert(field.to_string(), column);
        let update = MetaUpdate {
            changes: before.changes_to(&next),
        };
        self.defaults.entry(field.to_string()).or_insert(None);
        self.history.commit(next);
        debug!(
            message = "metadata.set",
            field,
            clusters = ?clusters,
            value = %value
        );
        update
    }

    pub fn set_group(&mut self, clusters: &[ClusterId], group: Group) -> MetaUpdate {
        self.set(GROUP_FIELD, clusters, group)
    }

    /// Give each child the values its parents agree on.
    ///
    /// `pairs` holds `(parent, child)` links as produced by a merge. Always
    /// records exactly one step.
    pub fn set_from_descendants(&mut self, pairs: &[(ClusterId, ClusterId)]) -> MetaUpdate {
        let before = self.history.current();
        let mut parents: BTreeMap<ClusterId, Vec<ClusterId>> = BTreeMap::new();
        for &(parent, child) in pairs {
            parents.entry(child).or_default().push(parent);
        }

        let mut next = MetaSnapshot::clone(before);
        for (field, column) in before.values.iter() {
            let mut inherited = column.clone();
            for (child, parents) in &parents {
                let mut values = parents.iter().map(|parent| column.get(parent));
                let Some(Some(first)) = values.next() else {
                    continue;
                };
                if values.all(|value| value == Some(first)) {
                    inherited.insert(*child, first.clone());
                }
            }
            next.values.insert(field.clone(), inherited);
        }
        let update = MetaUpdate {
            changes: before.changes_to(&next),
        };
        self.history.commit(next);
        debug!(
            message = "metadata.inherit",
            children = parents.len(),
            changes = update.changes.len()
        );
        update
    }

    pub fn undo(&mut self) -> Option<MetaUpdate> {
        let (undone, restored) = self.history.undo()?;
        Some(MetaUpdate {
            changes: undone.changes_to(&restored),
        })
    }

    pub fn redo(&mut self) -> Option<MetaUpdate> {
        let (left, restored) = self.history.redo()?;
        Some(MetaUpdate {
            changes: left.changes_to(&restored),
        })
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn discard_redo(&mut self) {
        self.history.discard_redo();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> ClusterMetadata {
        ClusterMetadata::new().with_groups([
            (0, Group::Noise),
            (1, Group::Good),
            (10, Group::Mua),
            (11, Group::Good),
        ])
    }

    #[test]
    fn seeds_are_not_undoable() {
        let mut meta = seeded();
        assert_eq!(meta.group(10), Some(Group::Mua));
        assert_eq!(meta.group(2), None);
        assert!(!meta.can_undo());
        assert!(meta.undo().is_none());
    }

    #[test]
    fn set_records_changes_and_undoes() {
        let mut meta = seeded();
        let update = meta.set_group(&[2, 11], Group::Noise);
        assert_eq!(update.cluster_ids(), vec![2, 11]);
        assert_eq!(update.changes[0].before, None);
        assert_eq!(meta.group(11), Some(Group::Noise));

        let undo = meta.undo().unwrap();
        assert_eq!(undo.changes.len(), 2);
        assert_eq!(meta.group(11), Some(Group::Good));
        assert_eq!(meta.group(2), None);

        meta.redo().unwrap();
        assert_eq!(meta.group(2), Some(Group::Noise));
    }

    #[test]
    fn set_same_value_still_records_a_step() {
        let mut meta = seeded();
        let update = meta.set_group(&[1], Group::Good);
        assert!(update.is_empty());
        assert!(meta.can_undo());
    }

    #[test]
    fn set_with_no_clusters_records_nothing() {
        let mut meta = seeded();
        assert!(meta.set_group(&[], Group::Good).is_empty());
        assert!(!meta.can_undo());
    }

    #[test]
    fn defaults_fill_missing_values() {
        let mut meta = ClusterMetadata::new().with_field("score", Some(LabelValue::Int(0)));
        assert_eq!(meta.get("score", 4), Some(&LabelValue::Int(0)));
        meta.set("score", &[4], 2.5);
        assert_eq!(meta.get("score", 4), Some(&LabelValue::Float(2.5)));
        assert_eq!(meta.values("score").len(), 1);
        assert_eq!(meta.fields(), vec!["group".to_string(), "score".to_string()]);
    }

    #[test]
    fn merge_inherits_unanimous_values_only() {
        let mut meta = seeded();
        meta.set("my_field", &[1, 11], "x");

        let update = meta.set_from_descendants(&[(1, 31), (11, 31), (2, 32), (11, 32)]);
        assert_eq!(meta.group(31), Some(Group::Good));
        assert_eq!(meta.get("my_field", 31), Some(&LabelValue::from("x")));
        // 2 is unlabeled, 11 is good: no agreement.
        assert_eq!(meta.group(32), None);
        assert_eq!(update.cluster_ids(), vec![31]);

        meta.undo();
        assert_eq!(meta.group(31), None);
    }

    #[test]
    fn inherit_always_records_a_step() {
        let mut meta = ClusterMetadata::new();
        assert!(meta.set_from_descendants(&[]).is_empty());
        assert!(meta.can_undo());
    }

    #[test]
    fn new_step_discards_redo() {
        let mut meta = seeded();
        meta.set_group(&[2], Group::Good);
        meta.undo();
        meta.set_group(&[20], Group::Mua);
        assert!(!meta.can_redo());
    }
}
