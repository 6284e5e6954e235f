#![forbid(unsafe_code)]

//! Selection coordination over one partition and one metadata store.
//!
//! # Design
//!
//! The [`Supervisor`] owns the [`ClusterPartition`], the [`ClusterMetadata`],
//! the [`ActionFlow`] and both list views. Every operation is a [`Command`]
//! run through [`Supervisor::dispatch`]:
//!
//! 1. All inputs are checked against the live partition. Nothing is mutated
//!    on failure.
//! 2. The stores commit (partition, then metadata), the action flow records
//!    the step, the views refresh.
//! 3. Navigation hints for the new current state are computed from the views
//!    and written to the flow.
//! 4. Events are published. Subscribers that want to act send follow-up
//!    commands through a [`CommandSender`]; they run after the current
//!    command, in order.
//!
//! # History alignment
//!
//! Merges commit one partition step and one metadata step, splits only a
//! partition step, moves and labels only a metadata step. Undo and redo
//! rewind exactly the stores the flow action touched. Recording any new
//! state drops the redo branch of both stores, as the flow drops its future.

use std::collections::BTreeMap;

use tracing::{debug, info_span, warn};
use web_time::Instant;

use sortkit_core::{
    ClusterId, ClusterMetadata, ClusterPartition, CurationError, GROUP_FIELD, Group, LabelValue,
    MetaUpdate, PartitionUpdate, Result, SpikeId,
};

use crate::action_flow::{ActionFlow, FlowAction, FlowState, StateUpdate};
use crate::actions::WizardAction;
use crate::command::{Command, CommandQueue, CommandSender, MoveTarget, Outcome};
use crate::config::{ConfigError, SupervisorConfig};
use crate::events::{ChangeKind, ClusterChange, SaveSnapshot, SupervisorEvent};
use crate::provider::{
    MetricsProvider, QualityProvider, SimilarityProvider, SplitAlgorithm, SplitRequester,
};
use crate::reactive::{EventBus, Subscription};
use crate::views::{
    ClusterRow, ClusterView, SimilarityView, SortDirection, SortSpec, Stateful, ViewPersistState,
};

/// Persistable state of both views.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SupervisorState {
    pub cluster_view: ViewPersistState,
    pub similarity_view: ViewPersistState,
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Collects the initial data and providers of a [`Supervisor`].
pub struct SupervisorBuilder {
    spike_clusters: Vec<ClusterId>,
    metadata: ClusterMetadata,
    config: SupervisorConfig,
    quality: Option<Box<dyn QualityProvider>>,
    similarity: Option<Box<dyn SimilarityProvider>>,
    split_requester: Option<Box<dyn SplitRequester>>,
    split_algorithm: Option<Box<dyn SplitAlgorithm>>,
    metrics: Option<Box<dyn MetricsProvider>>,
}

impl SupervisorBuilder {
    /// Seed cluster groups. Seeds cannot be undone.
    #[must_use]
    pub fn groups(mut self, groups: impl IntoIterator<Item = (ClusterId, Group)>) -> Self {
        self.metadata = self.metadata.with_groups(groups);
        self
    }

    /// Seed the values of one label field.
    #[must_use]
    pub fn labels(
        mut self,
        field: impl Into<String>,
        values: impl IntoIterator<Item = (ClusterId, LabelValue)>,
    ) -> Self {
        self.metadata = self.metadata.with_values(field, values);
        self
    }

    #[must_use]
    pub fn config(mut self, config: SupervisorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn quality(mut self, provider: impl QualityProvider + 'static) -> Self {
        self.quality = Some(Box::new(provider));
        self
    }

    #[must_use]
    pub fn similarity(mut self, provider: impl SimilarityProvider + 'static) -> Self {
        self.similarity = Some(Box::new(provider));
        self
    }

    #[must_use]
    pub fn split_requester(mut self, requester: impl SplitRequester + 'static) -> Self {
        self.split_requester = Some(Box::new(requester));
        self
    }

    #[must_use]
    pub fn split_algorithm(mut self, algorithm: impl SplitAlgorithm + 'static) -> Self {
        self.split_algorithm = Some(Box::new(algorithm));
        self
    }

    #[must_use]
    pub fn metrics(mut self, provider: impl MetricsProvider + 'static) -> Self {
        self.metrics = Some(Box::new(provider));
        self
    }

    /// Build the supervisor. Fails if the config does not validate.
    pub fn build(self) -> std::result::Result<Supervisor, ConfigError> {
        let errors = self.config.validate();
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        let cluster_view = ClusterView::new(self.config.cluster_view.default_sort.clone())
            .with_persistence_id("supervisor");
        let similarity_view =
            SimilarityView::new(self.config.similarity_view.default_sort.clone())
                .with_persistence_id("supervisor");
        let mut supervisor = Supervisor {
            partition: ClusterPartition::new(&self.spike_clusters),
            metadata: self.metadata,
            flow: ActionFlow::new(),
            cluster_view,
            similarity_view,
            config: self.config,
            quality: self.quality,
            similarity: self.similarity,
            split_requester: self.split_requester,
            split_algorithm: self.split_algorithm,
            metrics: self.metrics,
            events: EventBus::new(),
            queue: CommandQueue::default(),
        };
        supervisor.refresh_cluster_view();
        debug!(
            message = "supervisor.ready",
            n_spikes = supervisor.partition.n_spikes(),
            n_clusters = supervisor.partition.len()
        );
        Ok(supervisor)
    }
}

// ---------------------------------------------------------------------------
// Supervisor
// ---------------------------------------------------------------------------

pub struct Supervisor {
    partition: ClusterPartition,
    metadata: ClusterMetadata,
    flow: ActionFlow,
    cluster_view: ClusterView,
    similarity_view: SimilarityView,
    config: SupervisorConfig,
    quality: Option<Box<dyn QualityProvider>>,
    similarity: Option<Box<dyn SimilarityProvider>>,
    split_requester: Option<Box<dyn SplitRequester>>,
    split_algorithm: Option<Box<dyn SplitAlgorithm>>,
    metrics: Option<Box<dyn MetricsProvider>>,
    events: EventBus<SupervisorEvent>,
    queue: CommandQueue,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("n_clusters", &self.partition.len())
            .field("current", &self.flow.current())
            .field("flow_len", &self.flow.len())
            .field("queued", &self.queue.len())
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    #[must_use]
    pub fn builder(spike_clusters: &[ClusterId]) -> SupervisorBuilder {
        SupervisorBuilder {
            spike_clusters: spike_clusters.to_vec(),
            metadata: ClusterMetadata::new(),
            config: SupervisorConfig::default(),
            quality: None,
            similarity: None,
            split_requester: None,
            split_algorithm: None,
            metrics: None,
        }
    }

    // ====================================================================
    // Queries
    // ====================================================================

    #[must_use]
    pub fn partition(&self) -> &ClusterPartition {
        &self.partition
    }

    #[must_use]
    pub fn metadata(&self) -> &ClusterMetadata {
        &self.metadata
    }

    #[must_use]
    pub fn action_flow(&self) -> &ActionFlow {
        &self.flow
    }

    #[must_use]
    pub fn cluster_view(&self) -> &ClusterView {
        &self.cluster_view
    }

    #[must_use]
    pub fn similarity_view(&self) -> &SimilarityView {
        &self.similarity_view
    }

    #[must_use]
    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    #[must_use]
    pub fn current_state(&self) -> Option<&FlowState> {
        self.flow.current()
    }

    /// Primary selection followed by the similar selection.
    #[must_use]
    pub fn selected(&self) -> Vec<ClusterId> {
        self.flow.current().map(FlowState::selected).unwrap_or_default()
    }

    #[must_use]
    pub fn fields(&self) -> Vec<String> {
        self.metadata.fields()
    }

    /// Explicit labels of `field` on live clusters.
    #[must_use]
    pub fn get_labels(&self, field: &str) -> BTreeMap<ClusterId, LabelValue> {
        let mut labels = self.metadata.values(field);
        labels.retain(|id, _| self.partition.contains(*id));
        labels
    }

    #[must_use]
    pub fn state(&self) -> SupervisorState {
        SupervisorState {
            cluster_view: self.cluster_view.save_state(),
            similarity_view: self.similarity_view.save_state(),
        }
    }

    /// Register an event callback. Dropping the guard unsubscribes.
    pub fn subscribe(&self, callback: impl Fn(&SupervisorEvent) + 'static) -> Subscription {
        self.events.subscribe(callback)
    }

    /// Handle for enqueueing commands from event callbacks.
    #[must_use]
    pub fn sender(&self) -> CommandSender {
        self.queue.sender()
    }

    // ====================================================================
    // Operations
    // ====================================================================

    pub fn select(&mut self, cluster_ids: &[ClusterId]) -> Result<Outcome> {
        self.dispatch(Command::Select(cluster_ids.to_vec()))
    }

    pub fn select_similar(&mut self, similar: &[ClusterId]) -> Result<Outcome> {
        self.dispatch(Command::SelectSimilar(similar.to_vec()))
    }

    /// Merge `cluster_ids`, or the whole selection.
    pub fn merge(&mut self, cluster_ids: Option<&[ClusterId]>) -> Result<Outcome> {
        self.dispatch(Command::Merge(cluster_ids.map(<[_]>::to_vec)))
    }

    /// Split off `spike_ids`, or the spikes the split requester returns.
    pub fn split(&mut self, spike_ids: Option<&[SpikeId]>) -> Result<Outcome> {
        self.dispatch(Command::Split(spike_ids.map(<[_]>::to_vec)))
    }

    /// Redistribute the spikes of `cluster_ids` (or the selection) with the
    /// split algorithm.
    pub fn split_clusters(&mut self, cluster_ids: Option<&[ClusterId]>) -> Result<Outcome> {
        self.dispatch(Command::SplitClusters(cluster_ids.map(<[_]>::to_vec)))
    }

    pub fn move_clusters(&mut self, group: Group, target: MoveTarget) -> Result<Outcome> {
        self.dispatch(Command::Move { group, target })
    }

    /// Set `field` on `cluster_ids`, or on the whole selection.
    pub fn label(
        &mut self,
        field: &str,
        value: impl Into<LabelValue>,
        cluster_ids: Option<&[ClusterId]>,
    ) -> Result<Outcome> {
        self.dispatch(Command::Label {
            field: field.to_string(),
            value: value.into(),
            cluster_ids: cluster_ids.map(<[_]>::to_vec),
        })
    }

    pub fn undo(&mut self) -> Result<Outcome> {
        self.dispatch(Command::Undo)
    }

    pub fn redo(&mut self) -> Result<Outcome> {
        self.dispatch(Command::Redo)
    }

    pub fn reset_wizard(&mut self) -> Result<Outcome> {
        self.dispatch(Command::ResetWizard)
    }

    pub fn next(&mut self) -> Result<Outcome> {
        self.dispatch(Command::Next)
    }

    pub fn previous(&mut self) -> Result<Outcome> {
        self.dispatch(Command::Previous)
    }

    pub fn next_best(&mut self) -> Result<Outcome> {
        self.dispatch(Command::NextBest)
    }

    pub fn previous_best(&mut self) -> Result<Outcome> {
        self.dispatch(Command::PreviousBest)
    }

    pub fn sort_cluster_view(&mut self, column: &str, direction: SortDirection) -> Result<Outcome> {
        self.dispatch(Command::SortClusterView(SortSpec::new(column, direction)))
    }

    /// Publish a [`SupervisorEvent::SaveRequested`] snapshot.
    pub fn save(&mut self) -> Result<Outcome> {
        self.dispatch(Command::Save)
    }

    pub fn perform(&mut self, action: WizardAction) -> Result<Outcome> {
        self.dispatch(action.into())
    }

    /// Restore both views' sort. No history is recorded.
    pub fn set_state(&mut self, state: SupervisorState) {
        self.cluster_view.restore_state(state.cluster_view);
        self.similarity_view.restore_state(state.similarity_view);
        self.annotate();
    }

    /// Swap the quality ranking and re-annotate the current state.
    pub fn set_quality(&mut self, provider: impl QualityProvider + 'static) {
        self.quality = Some(Box::new(provider));
        self.refresh_cluster_view();
        self.annotate();
    }

    /// Swap the similarity ranking and re-annotate the current state.
    pub fn set_similarity(&mut self, provider: impl SimilarityProvider + 'static) {
        self.similarity = Some(Box::new(provider));
        self.reset_similarity_view();
        self.annotate();
    }

    pub fn set_metrics(&mut self, provider: impl MetricsProvider + 'static) {
        self.metrics = Some(Box::new(provider));
        self.refresh_cluster_view();
        self.annotate();
    }

    /// Run `command`, then every command queued while it ran.
    ///
    /// Returns the result of `command`. Failures of queued commands are
    /// logged and do not stop the queue.
    pub fn dispatch(&mut self, command: Command) -> Result<Outcome> {
        let result = self.run(command);
        while let Some(queued) = self.queue.pop() {
            let name = queued.name();
            if let Err(error) = self.run(queued) {
                warn!(message = "queued command failed", command = name, %error);
            }
        }
        result
    }

    fn run(&mut self, command: Command) -> Result<Outcome> {
        let name = command.name();
        let start = Instant::now();
        let span = info_span!(
            "supervisor.command",
            command = name,
            outcome = tracing::field::Empty,
            duration_us = tracing::field::Empty
        );
        let _guard = span.enter();

        let result = self.execute(command);

        let outcome = match &result {
            Ok(Outcome::Applied) => "applied",
            Ok(Outcome::NoOp) => "noop",
            Err(_) => "error",
        };
        span.record("outcome", outcome);
        span.record("duration_us", start.elapsed().as_micros() as u64);
        if let Err(error) = &result {
            debug!(message = "command rejected", command = name, %error);
        }
        result
    }

    fn execute(&mut self, command: Command) -> Result<Outcome> {
        match command {
            Command::Select(cluster_ids) => self.do_select(cluster_ids),
            Command::SelectSimilar(similar) => self.do_select_similar(similar),
            Command::Merge(cluster_ids) => self.do_merge(cluster_ids),
            Command::Split(spike_ids) => self.do_split(spike_ids),
            Command::SplitClusters(cluster_ids) => self.do_split_clusters(cluster_ids),
            Command::Move { group, target } => self.do_move(group, &target),
            Command::Label {
                field,
                value,
                cluster_ids,
            } => self.do_label(&field, value, cluster_ids),
            Command::Undo => self.do_undo(),
            Command::Redo => self.do_redo(),
            Command::ResetWizard => self.do_reset_wizard(),
            Command::Next => self.do_next(),
            Command::Previous => self.do_previous(),
            Command::NextBest => self.do_next_best(),
            Command::PreviousBest => self.do_previous_best(),
            Command::SortClusterView(sort) => {
                self.cluster_view.sort_by_spec(sort);
                self.annotate();
                Ok(Outcome::Applied)
            }
            Command::Save => {
                let snapshot = self.save_snapshot();
                self.publish(SupervisorEvent::SaveRequested(snapshot));
                Ok(Outcome::Applied)
            }
        }
    }

    // ====================================================================
    // Selection
    // ====================================================================

    fn do_select(&mut self, cluster_ids: Vec<ClusterId>) -> Result<Outcome> {
        let cluster_ids = dedup(cluster_ids);
        if cluster_ids.is_empty() {
            return Ok(Outcome::NoOp);
        }
        self.check_live(&cluster_ids)?;
        self.record_selection(FlowState::new(cluster_ids.clone()));
        self.publish(SupervisorEvent::SelectClustersDone { cluster_ids });
        Ok(Outcome::Applied)
    }

    fn do_select_similar(&mut self, similar: Vec<ClusterId>) -> Result<Outcome> {
        let similar = dedup(similar);
        if similar.is_empty() {
            return Ok(Outcome::NoOp);
        }
        self.check_live(&similar)?;
        let primary = self.primary();
        if let Some(id) = similar.iter().find(|id| primary.contains(id)) {
            return Err(CurationError::InvalidOperation(format!(
                "cluster {id} is already in the primary selection"
            )));
        }
        self.record_selection(FlowState::new(primary).with_similar(similar.clone()));
        self.publish(SupervisorEvent::SelectSimilarDone { similar });
        Ok(Outcome::Applied)
    }

    fn record_selection(&mut self, state: FlowState) {
        self.discard_redo();
        self.flow.add_state(state);
        self.reset_similarity_view();
        self.annotate();
    }

    // ====================================================================
    // Curation actions
    // ====================================================================

    fn do_merge(&mut self, cluster_ids: Option<Vec<ClusterId>>) -> Result<Outcome> {
        let cluster_ids = dedup(cluster_ids.unwrap_or_else(|| self.selected()));
        if cluster_ids.is_empty() {
            return Ok(Outcome::NoOp);
        }
        if cluster_ids.len() < 2 {
            return Err(CurationError::InvalidOperation(format!(
                "merge needs at least two clusters, got {cluster_ids:?}"
            )));
        }
        self.check_live(&cluster_ids)?;

        let to = self.partition.new_cluster_id().ok_or_else(|| {
            CurationError::InvalidOperation("cluster id space exhausted".into())
        })?;
        let update = self.partition.merge(&cluster_ids)?;
        let inherited: &[(ClusterId, ClusterId)] = if self.config.metadata.propagate_on_merge {
            &update.descendants
        } else {
            &[]
        };
        let meta = self.metadata.set_from_descendants(inherited);
        self.discard_redo();
        self.flow.add_merge(&cluster_ids, to);
        self.after_action(ChangeKind::Merge, "merge", Some(&update), &meta);
        Ok(Outcome::Applied)
    }

    fn do_split(&mut self, spike_ids: Option<Vec<SpikeId>>) -> Result<Outcome> {
        let spike_ids = match spike_ids {
            Some(spike_ids) => spike_ids,
            None => self
                .split_requester
                .as_ref()
                .map(|requester| requester.request_split())
                .unwrap_or_default(),
        };
        let Some(update) = self.partition.split(&spike_ids)? else {
            return Ok(Outcome::NoOp);
        };
        self.commit_split(&update);
        Ok(Outcome::Applied)
    }

    fn do_split_clusters(&mut self, cluster_ids: Option<Vec<ClusterId>>) -> Result<Outcome> {
        let cluster_ids = dedup(cluster_ids.unwrap_or_else(|| self.selected()));
        if cluster_ids.is_empty() {
            return Ok(Outcome::NoOp);
        }
        self.check_live(&cluster_ids)?;
        let Some(algorithm) = self.split_algorithm.as_ref() else {
            return Err(CurationError::InvalidOperation(
                "no split algorithm configured".into(),
            ));
        };
        let spike_ids = self.partition.spikes_in_clusters(&cluster_ids);
        let labels = algorithm.split(&spike_ids);
        let Some(update) = self.partition.split_with(&spike_ids, &labels)? else {
            return Ok(Outcome::NoOp);
        };
        self.commit_split(&update);
        Ok(Outcome::Applied)
    }

    fn commit_split(&mut self, update: &PartitionUpdate) {
        self.discard_redo();
        self.flow.add_split(&update.deleted, &update.added);
        self.after_action(ChangeKind::Split, "split", Some(update), &MetaUpdate::default());
    }

    fn do_move(&mut self, group: Group, target: &MoveTarget) -> Result<Outcome> {
        let cluster_ids = dedup(self.resolve_target(target));
        if cluster_ids.is_empty() {
            return Ok(Outcome::NoOp);
        }
        self.check_live(&cluster_ids)?;

        let meta = self.metadata.set_group(&cluster_ids, group);
        self.discard_redo();
        self.flow.add_move(&cluster_ids, group);
        self.after_action(ChangeKind::Move, "move", None, &meta);
        Ok(Outcome::Applied)
    }

    fn do_label(
        &mut self,
        field: &str,
        value: LabelValue,
        cluster_ids: Option<Vec<ClusterId>>,
    ) -> Result<Outcome> {
        if field.trim().is_empty() {
            return Err(CurationError::InvalidOperation(
                "label field must not be empty".into(),
            ));
        }
        if field == GROUP_FIELD {
            let valid = value.as_text().is_some_and(|text| text.parse::<Group>().is_ok());
            if !valid {
                return Err(CurationError::Parse(value.to_string()));
            }
        }
        let cluster_ids = dedup(cluster_ids.unwrap_or_else(|| self.selected()));
        if cluster_ids.is_empty() {
            return Ok(Outcome::NoOp);
        }
        self.check_live(&cluster_ids)?;

        let meta = self.metadata.set(field, &cluster_ids, value);
        self.discard_redo();
        self.flow.add_label(field, &cluster_ids);
        self.after_action(ChangeKind::Label, "label", None, &meta);
        Ok(Outcome::Applied)
    }

    fn after_action(
        &mut self,
        kind: ChangeKind,
        action: &'static str,
        partition: Option<&PartitionUpdate>,
        meta: &MetaUpdate,
    ) {
        self.refresh_cluster_view();
        self.reset_similarity_view();
        self.annotate();
        self.publish_change(kind, action, partition, meta);
        self.publish_after_action(action);
    }

    // ====================================================================
    // Undo / redo
    // ====================================================================

    fn do_undo(&mut self) -> Result<Outcome> {
        let Some(action) = self.flow.peek_undo().cloned() else {
            return Ok(Outcome::NoOp);
        };
        if (action.touches_partition() && !self.partition.can_undo())
            || (action.touches_metadata() && !self.metadata.can_undo())
        {
            return Err(out_of_step(&action, "undo"));
        }
        self.flow.add_undo();
        let partition = action
            .touches_partition()
            .then(|| self.partition.undo())
            .flatten();
        let meta = action
            .touches_metadata()
            .then(|| self.metadata.undo())
            .flatten()
            .unwrap_or_default();
        self.after_history(ChangeKind::Undo, &action, partition.as_ref(), &meta);
        Ok(Outcome::Applied)
    }

    fn do_redo(&mut self) -> Result<Outcome> {
        let Some(action) = self.flow.peek_redo().cloned() else {
            return Ok(Outcome::NoOp);
        };
        if (action.touches_partition() && !self.partition.can_redo())
            || (action.touches_metadata() && !self.metadata.can_redo())
        {
            return Err(out_of_step(&action, "redo"));
        }
        self.flow.add_redo();
        let partition = action
            .touches_partition()
            .then(|| self.partition.redo())
            .flatten();
        let meta = action
            .touches_metadata()
            .then(|| self.metadata.redo())
            .flatten()
            .unwrap_or_default();
        self.after_history(ChangeKind::Redo, &action, partition.as_ref(), &meta);
        Ok(Outcome::Applied)
    }

    /// Restored states keep the hints they were recorded with.
    fn after_history(
        &mut self,
        kind: ChangeKind,
        action: &FlowAction,
        partition: Option<&PartitionUpdate>,
        meta: &MetaUpdate,
    ) {
        self.refresh_cluster_view();
        self.reset_similarity_view();
        self.publish_change(kind, action.description(), partition, meta);
        let label = match kind {
            ChangeKind::Redo => "redo",
            _ => "undo",
        };
        self.publish_after_action(label);
    }

    // ====================================================================
    // Wizard
    // ====================================================================

    fn do_reset_wizard(&mut self) -> Result<Outcome> {
        let skipped = self.skip_predicate();
        let Some(best) = self.cluster_view.first(skipped) else {
            return Ok(Outcome::NoOp);
        };
        self.wizard_step(FlowState::new(vec![best]));
        Ok(Outcome::Applied)
    }

    fn do_next_best(&mut self) -> Result<Outcome> {
        let primary = self.primary();
        let skipped = self.skip_predicate();
        let next = if primary.is_empty() {
            self.cluster_view.first(skipped)
        } else {
            self.cluster_view.next_after(&primary, skipped)
        };
        let Some(next) = next else {
            return Ok(Outcome::NoOp);
        };
        self.wizard_step(FlowState::new(vec![next]));
        Ok(Outcome::Applied)
    }

    fn do_previous_best(&mut self) -> Result<Outcome> {
        let primary = self.primary();
        let skipped = self.skip_predicate();
        let Some(previous) = self.cluster_view.previous_before(&primary, skipped) else {
            return Ok(Outcome::NoOp);
        };
        self.wizard_step(FlowState::new(vec![previous]));
        Ok(Outcome::Applied)
    }

    fn do_next(&mut self) -> Result<Outcome> {
        let primary = self.primary();
        if primary.is_empty() {
            return self.do_next_best();
        }
        let similar = self.similar();
        let skipped = self.skip_predicate();
        let Some(next) = self.similarity_view.next_after(&similar, skipped) else {
            return Ok(Outcome::NoOp);
        };
        self.wizard_step(FlowState::new(primary).with_similar(vec![next]));
        Ok(Outcome::Applied)
    }

    fn do_previous(&mut self) -> Result<Outcome> {
        let similar = self.similar();
        let skipped = self.skip_predicate();
        let Some(previous) = self.similarity_view.previous_before(&similar, skipped) else {
            return Ok(Outcome::NoOp);
        };
        self.wizard_step(FlowState::new(self.primary()).with_similar(vec![previous]));
        Ok(Outcome::Applied)
    }

    fn wizard_step(&mut self, state: FlowState) {
        let cluster_ids = state.cluster_ids.clone();
        let similar = state.similar.clone();
        self.record_selection(state);
        self.publish(SupervisorEvent::SelectClustersDone { cluster_ids });
        if let Some(similar) = similar {
            self.publish(SupervisorEvent::SelectSimilarDone { similar });
        }
        if let Some(state) = self.flow.current().cloned() {
            self.publish(SupervisorEvent::WizardDone { state });
        }
    }

    // ====================================================================
    // Internals
    // ====================================================================

    fn primary(&self) -> Vec<ClusterId> {
        self.flow
            .current()
            .map(|state| state.cluster_ids.clone())
            .unwrap_or_default()
    }

    fn similar(&self) -> Vec<ClusterId> {
        self.flow
            .current()
            .map(|state| state.similar_ids().to_vec())
            .unwrap_or_default()
    }

    fn resolve_target(&self, target: &MoveTarget) -> Vec<ClusterId> {
        if let Some(ids) = target.explicit_ids() {
            return ids;
        }
        match target {
            MoveTarget::Best => self.primary(),
            MoveTarget::Similar => self.similar(),
            _ => self.selected(),
        }
    }

    fn skip_predicate(&self) -> impl Fn(ClusterId) -> bool + Copy + '_ {
        let config = &self.config;
        let metadata = &self.metadata;
        move |id| config.skips(metadata.group(id))
    }

    fn check_live(&self, cluster_ids: &[ClusterId]) -> Result<()> {
        self.partition.check_live(cluster_ids).inspect_err(|error| {
            if let CurationError::StaleReference { cluster_ids } = error {
                warn!(message = "stale cluster reference", cluster_ids = ?cluster_ids);
            }
        })
    }

    fn discard_redo(&mut self) {
        self.partition.discard_redo();
        self.metadata.discard_redo();
    }

    fn refresh_cluster_view(&mut self) {
        let ids = self.partition.cluster_ids();
        let columns = self
            .metrics
            .as_ref()
            .map(|metrics| metrics.request_cluster_metrics(&ids))
            .unwrap_or_default();
        let rows: Vec<ClusterRow> = ids
            .iter()
            .map(|&id| {
                let mut row = ClusterRow::new(id, self.partition.n_spikes_in(id));
                row.quality = self.quality.as_ref().and_then(|quality| quality.quality(id));
                row.group = self.metadata.group(id);
                if let Some(metrics) = &self.metrics {
                    for column in &columns {
                        if let Some(value) = metrics.metric(column, id) {
                            row.metrics.insert(column.clone(), value);
                        }
                    }
                }
                row
            })
            .collect();
        self.cluster_view.add_columns(columns);
        self.cluster_view.set_rows(rows);
    }

    /// Recompute the similarity list for the last primary cluster.
    fn reset_similarity_view(&mut self) {
        let primary = self.primary();
        let Some(&anchor) = primary.last() else {
            self.similarity_view.clear();
            return;
        };
        let rows = self
            .similarity
            .as_ref()
            .map(|similarity| similarity.request_similar_clusters(anchor))
            .unwrap_or_default();
        let partition = &self.partition;
        self.similarity_view
            .reset(anchor, rows, &primary, |id| partition.contains(id));
    }

    /// Write fresh navigation hints to the current state.
    fn annotate(&mut self) {
        let Some(state) = self.flow.current() else {
            return;
        };
        let primary = state.cluster_ids.clone();
        let similar = state.similar_ids().to_vec();
        let skipped = self.skip_predicate();
        let next_cluster = self
            .cluster_view
            .next_after(&primary, |id| similar.contains(&id) || skipped(id));
        let next_similar = self.similarity_view.next_after(&similar, skipped);
        debug!(
            message = "supervisor.hints",
            primary = ?primary,
            next_cluster = ?next_cluster,
            next_similar = ?next_similar
        );
        self.flow
            .update_current_state(StateUpdate::hints(next_cluster, next_similar));
    }

    fn save_snapshot(&self) -> SaveSnapshot {
        let groups = self
            .partition
            .cluster_ids()
            .into_iter()
            .filter_map(|id| Some((id, self.metadata.group(id)?)))
            .collect();
        let labels = self
            .metadata
            .fields()
            .into_iter()
            .filter(|field| field != GROUP_FIELD)
            .map(|field| {
                let values = self.get_labels(&field);
                (field, values)
            })
            .filter(|(_, values)| !values.is_empty())
            .collect();
        SaveSnapshot {
            spike_clusters: self.partition.spike_clusters().iter().copied().collect(),
            groups,
            labels,
        }
    }

    fn publish(&self, event: SupervisorEvent) {
        debug!(message = "supervisor.event", event = event.name());
        self.events.publish(&event);
    }

    fn publish_change(
        &self,
        kind: ChangeKind,
        action: &'static str,
        partition: Option<&PartitionUpdate>,
        meta: &MetaUpdate,
    ) {
        let (added, deleted, spike_ids) = partition.map_or_else(
            || (Vec::new(), Vec::new(), Vec::new()),
            |update| {
                (
                    update.added.clone(),
                    update.deleted.clone(),
                    update.spike_ids.clone(),
                )
            },
        );
        self.publish(SupervisorEvent::ClusterChanged(ClusterChange {
            kind,
            action,
            added,
            deleted,
            relabeled: meta.cluster_ids(),
            spike_ids,
        }));
    }

    fn publish_after_action(&self, action: &'static str) {
        if let Some(state) = self.flow.current().cloned() {
            self.publish(SupervisorEvent::SelectAfterActionDone { action, state });
        }
    }
}

fn dedup(ids: Vec<ClusterId>) -> Vec<ClusterId> {
    let mut seen = Vec::with_capacity(ids.len());
    for id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

fn out_of_step(action: &FlowAction, direction: &str) -> CurationError {
    CurationError::InvalidOperation(format!(
        "cannot {direction} {}: store history out of step",
        action.description()
    ))
}
