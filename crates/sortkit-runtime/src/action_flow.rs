#![forbid(unsafe_code)]

//! Selection timeline with undoable curation actions.
//!
//! The [`ActionFlow`] records what the operator looked at ([`FlowState`]: the
//! primary and similar selections plus navigation hints) interleaved with
//! what they did ([`FlowAction`]: merge, split, move, label). It holds cluster
//! ids only; the stores those ids live in belong to the supervisor.
//!
//! # Timeline
//!
//! ```text
//! add_state([30])  add_state([30],[20])  add_merge([30,20], 31)
//! ┌──────────────────────────────────────────────────────────────┐
//! │ S([30]) ─ S([30],[20]) ─ A(merge) ─ S([31],[11])              │
//! │                                      cursor ──^               │
//! └──────────────────────────────────────────────────────────────┘
//!
//! add_undo()                             add_redo()
//! │ S([30]) ─ S([30],[20]) ─ A ─ S(..)   │ S ─ S ─ A ─ S([31],[11]) │
//! │      cursor ──^                      │        cursor ──^        │
//! ```
//!
//! # Invariants
//!
//! 1. The cursor, when set, always points at a state node.
//! 2. Every action node is immediately followed by the state it derived.
//! 3. `add_*` drops every node after the cursor before appending.
//! 4. Undo and redo only move the cursor.
//! 5. [`update_current_state`](ActionFlow::update_current_state) writes to the
//!    draft of the state under the cursor and never to any other node. The
//!    draft is frozen back into the timeline whenever the cursor moves.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use sortkit_core::{ClusterId, Group};

/// A selection snapshot with navigation hints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowState {
    /// Primary selection, in selection order.
    pub cluster_ids: Vec<ClusterId>,
    /// Selection in the similarity list, if any.
    pub similar: Option<Vec<ClusterId>>,
    /// Where the wizard goes after the primary selection.
    pub next_cluster: Option<ClusterId>,
    /// Where the wizard goes after the similar selection.
    pub next_similar: Option<ClusterId>,
}

impl FlowState {
    #[must_use]
    pub fn new(cluster_ids: impl Into<Vec<ClusterId>>) -> Self {
        Self {
            cluster_ids: cluster_ids.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_similar(mut self, similar: impl Into<Vec<ClusterId>>) -> Self {
        self.similar = Some(similar.into());
        self
    }

    #[must_use]
    pub fn with_next_cluster(mut self, next_cluster: ClusterId) -> Self {
        self.next_cluster = Some(next_cluster);
        self
    }

    #[must_use]
    pub fn with_next_similar(mut self, next_similar: ClusterId) -> Self {
        self.next_similar = Some(next_similar);
        self
    }

    /// Primary ids followed by similar ids.
    #[must_use]
    pub fn selected(&self) -> Vec<ClusterId> {
        let mut selected = self.cluster_ids.clone();
        selected.extend(self.similar.iter().flatten().copied());
        selected
    }

    /// The similar selection, empty when there is none.
    #[must_use]
    pub fn similar_ids(&self) -> &[ClusterId] {
        self.similar.as_deref().unwrap_or_default()
    }

    fn derived(cluster_ids: Vec<ClusterId>, similar: Option<Vec<ClusterId>>) -> Self {
        Self {
            cluster_ids,
            similar,
            next_cluster: None,
            next_similar: None,
        }
    }
}

/// A committed curation step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FlowAction {
    Merge {
        cluster_ids: Vec<ClusterId>,
        to: ClusterId,
    },
    Split {
        old: Vec<ClusterId>,
        new: Vec<ClusterId>,
    },
    Move {
        cluster_ids: Vec<ClusterId>,
        group: Group,
    },
    Label {
        field: String,
        cluster_ids: Vec<ClusterId>,
    },
}

impl FlowAction {
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Merge { .. } => "merge",
            Self::Split { .. } => "split",
            Self::Move { .. } => "move",
            Self::Label { .. } => "label",
        }
    }

    /// Whether undoing this action rewinds the partition history.
    #[must_use]
    pub fn touches_partition(&self) -> bool {
        matches!(self, Self::Merge { .. } | Self::Split { .. })
    }

    /// Whether undoing this action rewinds the metadata history.
    #[must_use]
    pub fn touches_metadata(&self) -> bool {
        !matches!(self, Self::Split { .. })
    }
}

/// One timeline entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "node", rename_all = "snake_case")]
pub enum FlowNode {
    State(FlowState),
    Action(FlowAction),
}

impl FlowNode {
    #[must_use]
    pub fn as_state(&self) -> Option<&FlowState> {
        match self {
            Self::State(state) => Some(state),
            Self::Action(_) => None,
        }
    }

    #[must_use]
    pub fn as_action(&self) -> Option<&FlowAction> {
        match self {
            Self::Action(action) => Some(action),
            Self::State(_) => None,
        }
    }

    #[must_use]
    pub fn is_action(&self) -> bool {
        matches!(self, Self::Action(_))
    }
}

/// Fields to patch on the current state.
///
/// `None` leaves a field alone; `Some(None)` clears a hint. Selection fields
/// only take effect when the flow is empty and the update creates the first
/// state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateUpdate {
    pub cluster_ids: Option<Vec<ClusterId>>,
    pub similar: Option<Option<Vec<ClusterId>>>,
    pub next_cluster: Option<Option<ClusterId>>,
    pub next_similar: Option<Option<ClusterId>>,
}

impl StateUpdate {
    /// Overwrite both hints.
    #[must_use]
    pub fn hints(next_cluster: Option<ClusterId>, next_similar: Option<ClusterId>) -> Self {
        Self {
            next_cluster: Some(next_cluster),
            next_similar: Some(next_similar),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn cluster_ids(mut self, cluster_ids: impl Into<Vec<ClusterId>>) -> Self {
        self.cluster_ids = Some(cluster_ids.into());
        self
    }

    #[must_use]
    pub fn similar(mut self, similar: Option<Vec<ClusterId>>) -> Self {
        self.similar = Some(similar);
        self
    }

    #[must_use]
    pub fn next_cluster(mut self, next_cluster: Option<ClusterId>) -> Self {
        self.next_cluster = Some(next_cluster);
        self
    }

    #[must_use]
    pub fn next_similar(mut self, next_similar: Option<ClusterId>) -> Self {
        self.next_similar = Some(next_similar);
        self
    }
}

/// Linear history of selections and actions with a cursor.
#[derive(Debug, Clone, Default)]
pub struct ActionFlow {
    /// Frozen timeline. The entry under the cursor may lag behind `draft`.
    nodes: Vec<FlowNode>,
    cursor: Option<usize>,
    /// Mutable copy of the state under the cursor.
    draft: Option<FlowState>,
}

impl ActionFlow {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // ====================================================================
    // Queries
    // ====================================================================

    /// The state under the cursor, `None` on an empty flow.
    #[must_use]
    pub fn current(&self) -> Option<&FlowState> {
        self.draft.as_ref()
    }

    #[must_use]
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// The whole timeline, with the current draft in place.
    #[must_use]
    pub fn nodes(&self) -> Vec<FlowNode> {
        let mut nodes = self.nodes.clone();
        if let (Some(index), Some(draft)) = (self.cursor, &self.draft)
            && let Some(slot) = nodes.get_mut(index)
        {
            *slot = FlowNode::State(draft.clone());
        }
        nodes
    }

    /// The last state strictly before `index`.
    #[must_use]
    pub fn previous_state(&self, index: Option<usize>) -> Option<&FlowState> {
        let found = self.previous_state_index(index?)?;
        self.state_at(found)
    }

    /// The action the next [`add_undo`](Self::add_undo) would revert.
    #[must_use]
    pub fn peek_undo(&self) -> Option<&FlowAction> {
        let (action, _) = self.undo_target()?;
        self.nodes.get(action)?.as_action()
    }

    /// The action the next [`add_redo`](Self::add_redo) would re-apply.
    #[must_use]
    pub fn peek_redo(&self) -> Option<&FlowAction> {
        let (action, _) = self.redo_target()?;
        self.nodes.get(action)?.as_action()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.undo_target().is_some()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.redo_target().is_some()
    }

    // ====================================================================
    // Recording
    // ====================================================================

    /// Append a selection state. Hints are taken as given.
    pub fn add_state(&mut self, state: FlowState) {
        self.freeze();
        self.truncate_future();
        debug!(
            message = "flow.state",
            cluster_ids = ?state.cluster_ids,
            similar = ?state.similar
        );
        self.nodes.push(FlowNode::State(state.clone()));
        self.cursor = Some(self.nodes.len() - 1);
        self.draft = Some(state);
    }

    /// Record a merge of `cluster_ids` into `to`.
    ///
    /// The primary selection becomes `[to]`. A similar selection that took
    /// part in the merge is replaced by `next_similar`; one that did not is
    /// kept.
    pub fn add_merge(&mut self, cluster_ids: &[ClusterId], to: ClusterId) {
        let previous = self.base();
        let merged: BTreeSet<ClusterId> = cluster_ids.iter().copied().collect();
        let similar = match previous.similar {
            Some(similar) if similar.iter().any(|id| merged.contains(id)) => {
                previous
                    .next_similar
                    .filter(|next| !merged.contains(next))
                    .map(|next| vec![next])
            }
            other => other,
        };
        self.push_action(
            FlowAction::Merge {
                cluster_ids: cluster_ids.to_vec(),
                to,
            },
            FlowState::derived(vec![to], similar),
        );
    }

    /// Record a split. The new clusters become the selection.
    pub fn add_split(&mut self, old: &[ClusterId], new: &[ClusterId]) {
        self.base();
        self.push_action(
            FlowAction::Split {
                old: old.to_vec(),
                new: new.to_vec(),
            },
            FlowState::derived(new.to_vec(), None),
        );
    }

    /// Record a group change.
    ///
    /// Moving the whole primary selection advances it to `next_cluster` and
    /// drops the similar selection. Moving the whole similar selection
    /// advances only the similar half. Anything else keeps the selection.
    pub fn add_move(&mut self, cluster_ids: &[ClusterId], group: Group) {
        let previous = self.base();
        let moved: BTreeSet<ClusterId> = cluster_ids.iter().copied().collect();
        let covers = |ids: &[ClusterId]| !ids.is_empty() && ids.iter().all(|id| moved.contains(id));

        let state = if covers(&previous.cluster_ids) {
            let cluster_ids = previous
                .next_cluster
                .map_or_else(|| previous.cluster_ids.clone(), |next| vec![next]);
            FlowState::derived(cluster_ids, None)
        } else if covers(previous.similar_ids()) {
            let similar = previous.next_similar.map(|next| vec![next]);
            FlowState::derived(previous.cluster_ids.clone(), similar)
        } else {
            FlowState::derived(previous.cluster_ids.clone(), previous.similar.clone())
        };
        self.push_action(
            FlowAction::Move {
                cluster_ids: cluster_ids.to_vec(),
                group,
            },
            state,
        );
    }

    /// Record a label change. The selection is kept.
    pub fn add_label(&mut self, field: &str, cluster_ids: &[ClusterId]) {
        let previous = self.base();
        self.push_action(
            FlowAction::Label {
                field: field.to_string(),
                cluster_ids: cluster_ids.to_vec(),
            },
            FlowState::derived(previous.cluster_ids, previous.similar),
        );
    }

    // ====================================================================
    // Navigation
    // ====================================================================

    /// Move the cursor to the state before the most recent action.
    ///
    /// Returns the action stepped over, or `None` (cursor unchanged) if there
    /// is nothing to undo.
    pub fn add_undo(&mut self) -> Option<FlowAction> {
        let (action, target) = self.undo_target()?;
        let undone = self.nodes.get(action)?.as_action()?.clone();
        self.move_to(target);
        debug!(message = "flow.undo", action = undone.description(), cursor = target);
        Some(undone)
    }

    /// Move the cursor past the next action, to the last state recorded
    /// before the action after it.
    pub fn add_redo(&mut self) -> Option<FlowAction> {
        let (action, target) = self.redo_target()?;
        let redone = self.nodes.get(action)?.as_action()?.clone();
        self.move_to(target);
        debug!(message = "flow.redo", action = redone.description(), cursor = target);
        Some(redone)
    }

    /// Patch the current state without recording history.
    ///
    /// On an empty flow this creates the first state from `update`. On an
    /// existing state only the hints are written.
    pub fn update_current_state(&mut self, update: StateUpdate) {
        let Some(draft) = self.draft.as_mut() else {
            self.add_state(FlowState {
                cluster_ids: update.cluster_ids.unwrap_or_default(),
                similar: update.similar.flatten(),
                next_cluster: update.next_cluster.flatten(),
                next_similar: update.next_similar.flatten(),
            });
            return;
        };
        if update
            .cluster_ids
            .as_ref()
            .is_some_and(|ids| *ids != draft.cluster_ids)
            || update.similar.as_ref().is_some_and(|s| *s != draft.similar)
        {
            debug!(message = "flow.update.selection_ignored");
        }
        if let Some(next_cluster) = update.next_cluster {
            draft.next_cluster = next_cluster;
        }
        if let Some(next_similar) = update.next_similar {
            draft.next_similar = next_similar;
        }
    }

    // ====================================================================
    // Internals
    // ====================================================================

    /// The current state, creating an empty base state on an empty flow.
    fn base(&mut self) -> FlowState {
        if let Some(current) = &self.draft {
            return current.clone();
        }
        self.add_state(FlowState::default());
        FlowState::default()
    }

    fn push_action(&mut self, action: FlowAction, state: FlowState) {
        self.freeze();
        self.truncate_future();
        debug!(
            message = "flow.action",
            action = action.description(),
            cluster_ids = ?state.cluster_ids,
            similar = ?state.similar
        );
        self.nodes.push(FlowNode::Action(action));
        self.nodes.push(FlowNode::State(state.clone()));
        self.cursor = Some(self.nodes.len() - 1);
        self.draft = Some(state);
    }

    fn freeze(&mut self) {
        if let (Some(index), Some(draft)) = (self.cursor, &self.draft)
            && let Some(slot) = self.nodes.get_mut(index)
        {
            *slot = FlowNode::State(draft.clone());
        }
    }

    fn truncate_future(&mut self) {
        if let Some(index) = self.cursor {
            self.nodes.truncate(index + 1);
        }
    }

    fn move_to(&mut self, index: usize) {
        self.freeze();
        self.cursor = Some(index);
        self.draft = self.nodes.get(index).and_then(FlowNode::as_state).cloned();
    }

    fn state_at(&self, index: usize) -> Option<&FlowState> {
        if self.cursor == Some(index) {
            return self.draft.as_ref();
        }
        self.nodes.get(index)?.as_state()
    }

    fn previous_state_index(&self, index: usize) -> Option<usize> {
        (0..index.min(self.nodes.len()))
            .rev()
            .find(|&i| !self.nodes[i].is_action())
    }

    /// `(action index, landing state index)` for an undo.
    fn undo_target(&self) -> Option<(usize, usize)> {
        let cursor = self.cursor?;
        let action = (0..=cursor).rev().find(|&i| self.nodes[i].is_action())?;
        let target = self.previous_state_index(action)?;
        Some((action, target))
    }

    /// `(action index, landing state index)` for a redo.
    fn redo_target(&self) -> Option<(usize, usize)> {
        let cursor = self.cursor?;
        let len = self.nodes.len();
        let action = (cursor + 1..len).find(|&i| self.nodes[i].is_action())?;
        let end = (action + 1..len)
            .find(|&i| self.nodes[i].is_action())
            .unwrap_or(len);
        let target = self.previous_state_index(end)?;
        (target > action).then_some((action, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_state() -> FlowState {
        FlowState::new([0])
            .with_similar([100])
            .with_next_cluster(2)
            .with_next_similar(101)
    }

    fn flow_with_reference() -> ActionFlow {
        let mut flow = ActionFlow::new();
        flow.add_state(reference_state());
        flow
    }

    #[test]
    fn previous_state_of_none_is_none() {
        assert_eq!(ActionFlow::new().previous_state(None), None);
    }

    #[test]
    fn empty_flow_has_no_current() {
        let flow = ActionFlow::new();
        assert!(flow.current().is_none());
        assert!(flow.is_empty());
        assert!(!flow.can_undo());
    }

    #[test]
    fn update_on_empty_flow_creates_state() {
        let mut flow = ActionFlow::new();
        flow.update_current_state(StateUpdate::default().cluster_ids([0]));
        assert_eq!(flow.current().unwrap().cluster_ids, vec![0]);
        assert_eq!(flow.len(), 1);
    }

    #[test]
    fn update_patches_hints_but_not_selection() {
        let mut flow = ActionFlow::new();
        flow.add_state(FlowState::new([0]).with_similar([100]).with_next_similar(101));
        assert_eq!(flow.current().unwrap().next_cluster, None);

        flow.update_current_state(StateUpdate::default().next_cluster(Some(1000)));
        assert_eq!(flow.current().unwrap().next_cluster, Some(1000));

        flow.update_current_state(StateUpdate::default().cluster_ids([1]));
        assert_eq!(flow.current().unwrap().cluster_ids, vec![0]);
        assert_eq!(flow.len(), 1);
    }

    #[test]
    fn update_twice_is_idempotent() {
        let mut flow = flow_with_reference();
        let update = StateUpdate::hints(Some(7), None);
        flow.update_current_state(update.clone());
        let once = flow.nodes();
        flow.update_current_state(update);
        assert_eq!(flow.nodes(), once);
    }

    #[test]
    fn update_never_touches_ancestors() {
        let mut flow = flow_with_reference();
        flow.add_state(FlowState::new([5]));
        flow.update_current_state(StateUpdate::hints(Some(9), Some(9)));
        assert_eq!(flow.previous_state(flow.cursor()), Some(&reference_state()));
    }

    #[test]
    fn merge_replaces_merged_similar() {
        let mut flow = flow_with_reference();
        flow.add_merge(&[0, 100], 1000);

        let merged = flow.current().unwrap().clone();
        assert_eq!(merged.cluster_ids, vec![1000]);
        assert_eq!(merged.similar, Some(vec![101]));
        assert_eq!(merged.next_cluster, None);

        let undone = flow.add_undo().unwrap();
        assert_eq!(undone.description(), "merge");
        assert_eq!(flow.current(), Some(&reference_state()));

        flow.add_redo().unwrap();
        assert_eq!(flow.current(), Some(&merged));
    }

    #[test]
    fn merge_keeps_untouched_similar() {
        let mut flow = ActionFlow::new();
        flow.add_state(FlowState::new([0, 1]).with_similar([5]));
        flow.add_merge(&[0, 1], 6);
        assert_eq!(flow.current().unwrap().similar, Some(vec![5]));
    }

    #[test]
    fn merge_of_similar_without_hint_clears_it() {
        let mut flow = ActionFlow::new();
        flow.add_state(FlowState::new([0]).with_similar([100]));
        flow.add_merge(&[0, 100], 1000);
        assert_eq!(flow.current().unwrap().similar, None);
    }

    #[test]
    fn merge_consuming_the_hint_clears_similar() {
        let mut flow = ActionFlow::new();
        flow.add_state(FlowState::new([0]).with_similar([100]).with_next_similar(101));
        flow.add_merge(&[0, 100, 101], 1000);
        assert_eq!(flow.current().unwrap().similar, None);
    }

    #[test]
    fn split_selects_new_and_clears_similar() {
        let mut flow = flow_with_reference();
        flow.add_split(&[0, 100], &[1000, 1001]);
        let state = flow.current().unwrap();
        assert_eq!(state.cluster_ids, vec![1000, 1001]);
        assert_eq!(state.similar, None);
    }

    #[test]
    fn moving_primary_advances_primary() {
        let mut flow = flow_with_reference();
        flow.add_move(&[0], Group::Good);
        let state = flow.current().unwrap();
        assert_eq!(state.cluster_ids, vec![2]);
        assert_eq!(state.similar, None);
    }

    #[test]
    fn moving_similar_advances_similar() {
        let mut flow = flow_with_reference();
        flow.add_move(&[100], Group::Good);
        let state = flow.current().unwrap();
        assert_eq!(state.cluster_ids, vec![0]);
        assert_eq!(state.similar, Some(vec![101]));
    }

    #[test]
    fn moving_primary_without_hint_keeps_it() {
        let mut flow = ActionFlow::new();
        flow.add_state(FlowState::new([4]).with_similar([8]));
        flow.add_move(&[4, 8], Group::Noise);
        let state = flow.current().unwrap();
        assert_eq!(state.cluster_ids, vec![4]);
        assert_eq!(state.similar, None);
    }

    #[test]
    fn moving_unrelated_clusters_keeps_selection() {
        let mut flow = flow_with_reference();
        flow.add_move(&[55], Group::Mua);
        let state = flow.current().unwrap();
        assert_eq!(state.cluster_ids, vec![0]);
        assert_eq!(state.similar, Some(vec![100]));
    }

    #[test]
    fn label_keeps_selection() {
        let mut flow = flow_with_reference();
        flow.add_label("score", &[0]);
        assert_eq!(flow.current().unwrap().selected(), vec![0, 100]);
        assert_eq!(
            flow.peek_undo(),
            Some(&FlowAction::Label {
                field: "score".into(),
                cluster_ids: vec![0]
            })
        );
    }

    #[test]
    fn action_on_empty_flow_pushes_base_state() {
        let mut flow = ActionFlow::new();
        flow.add_split(&[0], &[1, 2]);
        assert_eq!(flow.len(), 3);
        flow.add_undo().unwrap();
        assert_eq!(flow.current(), Some(&FlowState::default()));
    }

    #[test]
    fn undo_without_action_is_none() {
        let mut flow = flow_with_reference();
        flow.add_state(FlowState::new([3]));
        assert!(flow.add_undo().is_none());
        assert_eq!(flow.current().unwrap().cluster_ids, vec![3]);
    }

    #[test]
    fn undo_skips_selections_after_action() {
        let mut flow = flow_with_reference();
        flow.add_merge(&[0, 100], 1000);
        flow.add_state(FlowState::new([7]));
        flow.add_undo().unwrap();
        assert_eq!(flow.current(), Some(&reference_state()));

        // Redo lands on the last selection made before the undo.
        flow.add_redo().unwrap();
        assert_eq!(flow.current().unwrap().cluster_ids, vec![7]);
        assert!(!flow.can_redo());
    }

    #[test]
    fn redo_stops_before_next_action() {
        let mut flow = flow_with_reference();
        flow.add_merge(&[0, 100], 1000);
        flow.add_move(&[1000], Group::Good);
        flow.add_undo().unwrap();
        flow.add_undo().unwrap();
        assert_eq!(flow.peek_redo().map(FlowAction::description), Some("merge"));

        flow.add_redo().unwrap();
        assert_eq!(flow.current().unwrap().cluster_ids, vec![1000]);
        assert_eq!(flow.peek_redo().map(FlowAction::description), Some("move"));
    }

    #[test]
    fn hints_set_after_undo_survive_redo_round_trip() {
        let mut flow = flow_with_reference();
        flow.add_merge(&[0, 100], 1000);
        flow.update_current_state(StateUpdate::hints(Some(3), Some(4)));
        let annotated = flow.current().unwrap().clone();

        flow.add_undo();
        flow.add_redo();
        assert_eq!(flow.current(), Some(&annotated));
    }

    #[test]
    fn new_state_after_undo_discards_future() {
        let mut flow = flow_with_reference();
        flow.add_merge(&[0, 100], 1000);
        flow.add_undo();
        flow.add_state(FlowState::new([42]));
        assert!(!flow.can_redo());
        assert_eq!(flow.len(), 2);
    }

    #[test]
    fn nodes_reflect_current_draft() {
        let mut flow = flow_with_reference();
        flow.update_current_state(StateUpdate::default().next_cluster(None));
        let nodes = flow.nodes();
        assert_eq!(nodes[0].as_state().unwrap().next_cluster, None);
    }

    #[test]
    fn action_serializes_with_kind_tag() {
        let json = serde_json::to_string(&FlowAction::Move {
            cluster_ids: vec![3],
            group: Group::Mua,
        })
        .unwrap();
        assert_eq!(json, r#"{"kind":"move","cluster_ids":[3],"group":"mua"}"#);
    }
}
