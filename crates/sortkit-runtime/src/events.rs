#![forbid(unsafe_code)]

//! Notifications published by the [`Supervisor`](crate::Supervisor).

use std::collections::BTreeMap;

use serde::Serialize;

use sortkit_core::{ClusterId, Group, LabelValue, SpikeId};

use crate::action_flow::FlowState;

/// What a [`ClusterChange`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Merge,
    Split,
    Move,
    Label,
    Undo,
    Redo,
}

/// Clusters that appeared, disappeared or got new labels in one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClusterChange {
    pub kind: ChangeKind,
    /// The action that was applied, undone or redone.
    pub action: &'static str,
    pub added: Vec<ClusterId>,
    pub deleted: Vec<ClusterId>,
    /// Clusters whose metadata changed, ascending.
    pub relabeled: Vec<ClusterId>,
    /// Spikes whose cluster changed, ascending.
    pub spike_ids: Vec<SpikeId>,
}

/// Everything an external writer needs to persist the curation result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveSnapshot {
    pub spike_clusters: Vec<ClusterId>,
    pub groups: BTreeMap<ClusterId, Group>,
    /// Explicit labels per field, `group` excluded.
    pub labels: BTreeMap<String, BTreeMap<ClusterId, LabelValue>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SupervisorEvent {
    /// The primary selection changed.
    SelectClustersDone { cluster_ids: Vec<ClusterId> },
    /// The similar selection changed.
    SelectSimilarDone { similar: Vec<ClusterId> },
    /// The selection following a committed action, undo or redo.
    SelectAfterActionDone { action: &'static str, state: FlowState },
    /// A wizard step finished.
    WizardDone { state: FlowState },
    ClusterChanged(ClusterChange),
    SaveRequested(SaveSnapshot),
}

impl SupervisorEvent {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectClustersDone { .. } => "select_clusters_done",
            Self::SelectSimilarDone { .. } => "select_similar_done",
            Self::SelectAfterActionDone { .. } => "select_after_action_done",
            Self::WizardDone { .. } => "wizard_done",
            Self::ClusterChanged(_) => "cluster_changed",
            Self::SaveRequested(_) => "save_requested",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_their_name() {
        let event = SupervisorEvent::SelectClustersDone {
            cluster_ids: vec![30],
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
        assert_eq!(json["cluster_ids"][0], 30);
    }

    #[test]
    fn save_snapshot_serializes_groups_lowercase() {
        let snapshot = SaveSnapshot {
            spike_clusters: vec![0, 0, 1],
            groups: BTreeMap::from([(1, Group::Good)]),
            labels: BTreeMap::new(),
        };
        let json = serde_json::to_string(&SupervisorEvent::SaveRequested(snapshot)).unwrap();
        assert!(json.contains(r#""groups":{"1":"good"}"#), "{json}");
    }
}
