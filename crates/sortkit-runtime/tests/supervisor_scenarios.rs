#![forbid(unsafe_code)]

//! End-to-end curation sessions on the seven-cluster reference dataset.
//!
//! Clusters `[0, 1, 2, 10, 11, 20, 30]`, two spikes each. Quality equals the
//! id, so the cluster list reads `30, 20, 11, 10, 2, 1, 0`. Groups: 0 noise,
//! 1 good, 10 mua, 11 good; the wizard skips noise and mua.
//!
//! Run:
//!   cargo test -p sortkit-runtime --test supervisor_scenarios

use std::cell::RefCell;
use std::rc::Rc;

use sortkit_core::{ClusterId, CurationError, Group, LabelValue, testing};
use sortkit_runtime::{
    Command, MoveScope, MoveTarget, Outcome, SimilarRow, SortDirection, SortSpec, StaticMetrics,
    Supervisor, SupervisorEvent, SupervisorState, ViewPersistState, WizardAction,
};

fn similar_clusters(cluster: ClusterId) -> Vec<SimilarRow> {
    testing::similarity(cluster)
        .into_iter()
        .map(SimilarRow::from)
        .collect()
}

fn supervisor() -> Supervisor {
    Supervisor::builder(&testing::spike_clusters())
        .groups(testing::cluster_groups())
        .quality(|c: ClusterId| Some(testing::quality(c)))
        .similarity(similar_clusters)
        .build()
        .unwrap()
}

fn select(supervisor: &mut Supervisor, cluster_ids: &[ClusterId], similar: &[ClusterId]) {
    supervisor.select(cluster_ids).unwrap();
    if !similar.is_empty() {
        supervisor.select_similar(similar).unwrap();
    }
    let state = supervisor.current_state().unwrap();
    assert_eq!(state.cluster_ids, cluster_ids);
    if !similar.is_empty() {
        assert_eq!(state.similar.as_deref(), Some(similar));
    }
}

/// Names of every event published while the guard is alive.
fn record_events(supervisor: &Supervisor) -> (Rc<RefCell<Vec<&'static str>>>, sortkit_runtime::Subscription) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let sub = supervisor.subscribe(move |event| sink.borrow_mut().push(event.name()));
    (seen, sub)
}

// ============================================================================
// Selection
// ============================================================================

#[test]
fn select_primary_and_similar() {
    let mut s = supervisor();
    select(&mut s, &[30], &[20]);
    assert_eq!(s.selected(), vec![30, 20]);
}

#[test]
fn select_keeps_order() {
    let mut s = supervisor();
    s.select(&[1, 0]).unwrap();
    assert_eq!(s.selected(), vec![1, 0]);
    s.select(&[0, 1]).unwrap();
    assert_eq!(s.selected(), vec![0, 1]);
}

#[test]
fn similarity_list_excludes_primary_and_sorts_by_score() {
    let mut s = supervisor();
    s.select(&[30]).unwrap();
    assert_eq!(s.similarity_view().ids(), vec![20, 11, 10, 2, 1, 0]);
}

#[test]
fn wizard_skips_noise_and_mua() {
    let mut s = supervisor();
    for expected in [30, 20, 11, 2, 1] {
        s.next_best().unwrap();
        assert_eq!(s.selected(), vec![expected]);
    }
    assert_eq!(s.next_best().unwrap(), Outcome::NoOp);
    assert_eq!(s.selected(), vec![1]);
}

#[test]
fn edge_cases_leave_selection_unchanged() {
    let mut s = supervisor();
    assert_eq!(s.partition().cluster_ids(), testing::CLUSTER_IDS.to_vec());
    select(&mut s, &[0], &[]);

    assert_eq!(s.undo().unwrap(), Outcome::NoOp);
    assert_eq!(s.redo().unwrap(), Outcome::NoOp);

    assert!(matches!(s.merge(None), Err(CurationError::InvalidOperation(_))));
    assert_eq!(s.selected(), vec![0]);

    assert_eq!(s.merge(Some(&[])).unwrap(), Outcome::NoOp);
    assert_eq!(s.selected(), vec![0]);

    assert!(s.merge(Some(&[10])).is_err());
    assert_eq!(s.selected(), vec![0]);

    assert_eq!(s.split(Some(&[])).unwrap(), Outcome::NoOp);
    assert_eq!(s.selected(), vec![0]);

    let target: MoveTarget = "".parse().unwrap();
    assert_eq!(s.move_clusters(Group::Noise, target).unwrap(), Outcome::NoOp);

    assert_eq!(s.save().unwrap(), Outcome::Applied);
    assert_eq!(s.partition().cluster_ids(), testing::CLUSTER_IDS.to_vec());
}

// ============================================================================
// Merge
// ============================================================================

#[test]
fn merge_selection_then_undo_redo() {
    let mut s = supervisor();
    select(&mut s, &[30], &[20]);

    s.merge(None).unwrap();
    assert_eq!(s.selected(), vec![31, 11]);

    s.undo().unwrap();
    assert_eq!(s.selected(), vec![30, 20]);
    assert!(s.partition().contains(30));

    s.redo().unwrap();
    assert_eq!(s.selected(), vec![31, 11]);
    assert!(!s.partition().contains(30));
}

#[test]
fn merge_then_move_follows_updated_cluster_list() {
    let mut s = supervisor();
    select(&mut s, &[20, 11], &[]);

    let (events, _sub) = record_events(&s);
    s.merge(None).unwrap();
    assert!(events.borrow().contains(&"select_after_action_done"));
    assert_eq!(s.selected(), vec![31]);
    assert_eq!(s.current_state().unwrap().next_cluster, Some(30));

    s.move_clusters(Group::Good, MoveTarget::All).unwrap();
    assert_eq!(s.selected(), vec![30]);

    s.move_clusters(Group::Good, MoveTarget::All).unwrap();
    assert_eq!(s.selected(), vec![2]);
}

#[test]
fn undone_merge_never_reuses_its_id() {
    let mut s = supervisor();
    s.merge(Some(&[1, 2])).unwrap();
    s.undo().unwrap();
    s.merge(Some(&[10, 11])).unwrap();
    assert_eq!(s.selected(), vec![32]);
    assert!(!s.partition().contains(31));
}

// ============================================================================
// Split
// ============================================================================

#[test]
fn split_spikes_then_undo_redo() {
    let mut s = supervisor();
    select(&mut s, &[1, 2], &[]);

    s.split(Some(&[1, 2])).unwrap();
    assert_eq!(s.selected(), vec![31, 32, 33]);

    s.undo().unwrap();
    assert_eq!(s.selected(), vec![1, 2]);

    s.redo().unwrap();
    assert_eq!(s.selected(), vec![31, 32, 33]);
}

#[test]
fn split_asks_requester_for_spikes() {
    let mut s = Supervisor::builder(&testing::spike_clusters())
        .groups(testing::cluster_groups())
        .quality(|c: ClusterId| Some(testing::quality(c)))
        .similarity(similar_clusters)
        .split_requester(|| vec![1usize, 2])
        .build()
        .unwrap();
    s.select(&[1, 2]).unwrap();
    s.split(None).unwrap();
    assert_eq!(s.selected(), vec![31, 32, 33]);
}

#[test]
fn split_without_requester_is_noop() {
    let mut s = supervisor();
    assert_eq!(s.split(None).unwrap(), Outcome::NoOp);
}

#[test]
fn split_small_partition() {
    let mut s = Supervisor::builder(&[0, 0, 1])
        .similarity(similar_clusters)
        .build()
        .unwrap();
    s.split(Some(&[0])).unwrap();
    assert_eq!(s.selected(), vec![2, 3]);
    assert_eq!(s.partition().cluster_ids(), vec![1, 2, 3]);
}

#[test]
fn split_does_not_propagate_groups() {
    let mut s = supervisor();
    s.split(Some(&[2])).unwrap();
    assert_eq!(s.metadata().group(31), None);
    assert_eq!(s.metadata().group(32), None);
}

// ============================================================================
// Move
// ============================================================================

#[test]
fn move_primary_advances_to_next_cluster() {
    let mut s = supervisor();
    select(&mut s, &[20], &[]);

    s.move_clusters(Group::Noise, MoveTarget::All).unwrap();
    assert_eq!(s.selected(), vec![11]);
    assert_eq!(s.metadata().group(20), Some(Group::Noise));

    s.undo().unwrap();
    assert_eq!(s.selected(), vec![20]);
    assert_eq!(s.metadata().group(20), None);

    s.redo().unwrap();
    assert_eq!(s.selected(), vec![11]);
    assert_eq!(s.metadata().group(20), Some(Group::Noise));
}

#[test]
fn move_similar_by_id_advances_similar_only() {
    let mut s = supervisor();
    select(&mut s, &[20], &[10]);

    s.move_clusters(Group::Noise, MoveTarget::One(10)).unwrap();
    assert_eq!(s.selected(), vec![20, 2]);

    s.undo().unwrap();
    assert_eq!(s.selected(), vec![20, 10]);

    s.redo().unwrap();
    assert_eq!(s.selected(), vec![20, 2]);
}

#[test]
fn move_all_prefers_the_primary_half() {
    let mut s = supervisor();
    select(&mut s, &[30], &[20]);
    s.perform(WizardAction::Move(MoveScope::All, Group::Noise))
        .unwrap();
    assert_eq!(s.selected(), vec![11]);
    assert_eq!(s.metadata().group(30), Some(Group::Noise));
    assert_eq!(s.metadata().group(20), Some(Group::Noise));
}

// ============================================================================
// Wizard actions
// ============================================================================

#[test]
fn reset_then_walk_similar_clusters() {
    let mut s = supervisor();
    s.select(&[10, 11]).unwrap();

    let (events, _sub) = record_events(&s);
    s.perform(WizardAction::Reset).unwrap();
    assert_eq!(s.selected(), vec![30]);
    assert_eq!(events.borrow().last(), Some(&"wizard_done"));

    s.perform(WizardAction::Next).unwrap();
    assert_eq!(s.selected(), vec![30, 20]);

    s.perform(WizardAction::Next).unwrap();
    assert_eq!(s.selected(), vec![30, 11]);

    s.perform(WizardAction::Previous).unwrap();
    assert_eq!(s.selected(), vec![30, 20]);
}

#[test]
fn best_navigation() {
    let mut s = supervisor();
    s.perform(WizardAction::Reset).unwrap();
    assert_eq!(s.selected(), vec![30]);

    s.perform(WizardAction::NextBest).unwrap();
    assert_eq!(s.selected(), vec![20]);

    s.perform(WizardAction::PreviousBest).unwrap();
    assert_eq!(s.selected(), vec![30]);
}

#[test]
fn move_best_walks_the_cluster_list() {
    let mut s = supervisor();
    s.perform(WizardAction::Next).unwrap();
    assert_eq!(s.selected(), vec![30]);

    for (group, expected) in [(Group::Noise, 20), (Group::Mua, 11), (Group::Good, 2)] {
        s.perform(WizardAction::Move(MoveScope::Best, group)).unwrap();
        assert_eq!(s.selected(), vec![expected]);
    }

    assert_eq!(s.metadata().group(30), Some(Group::Noise));
    assert_eq!(s.metadata().group(20), Some(Group::Mua));
    assert_eq!(s.metadata().group(11), Some(Group::Good));
}

#[test]
fn move_similar_walks_the_similarity_list() {
    let mut s = supervisor();
    select(&mut s, &[30], &[20]);

    for (group, expected) in [(Group::Noise, 11), (Group::Mua, 2), (Group::Good, 1)] {
        s.perform(WizardAction::Move(MoveScope::Similar, group))
            .unwrap();
        assert_eq!(s.selected(), vec![30, expected]);
    }

    assert_eq!(s.metadata().group(20), Some(Group::Noise));
    assert_eq!(s.metadata().group(11), Some(Group::Mua));
    assert_eq!(s.metadata().group(2), Some(Group::Good));
}

#[test]
fn actions_dispatch_by_name() {
    let mut s = supervisor();
    let action: WizardAction = "reset".parse().unwrap();
    s.dispatch(action.into()).unwrap();
    assert_eq!(s.selected(), vec![30]);
}

// ============================================================================
// Labels, state and save
// ============================================================================

#[test]
fn label_selection() {
    let mut s = supervisor();
    select(&mut s, &[20], &[]);
    s.label("my_field", 2.5, None).unwrap();

    assert!(s.fields().contains(&"my_field".to_string()));
    assert_eq!(s.get_labels("my_field").get(&20), Some(&LabelValue::Float(2.5)));
    assert_eq!(s.selected(), vec![20]);

    s.undo().unwrap();
    assert!(s.get_labels("my_field").is_empty());
}

#[test]
fn view_state_round_trip() {
    let mut s = supervisor();
    assert_eq!(
        s.state().cluster_view.current_sort,
        SortSpec::new("quality", SortDirection::Desc)
    );

    s.sort_cluster_view("id", SortDirection::Asc).unwrap();
    assert_eq!(
        s.state().cluster_view.current_sort,
        SortSpec::new("id", SortDirection::Asc)
    );
    assert_eq!(s.cluster_view().ids(), testing::CLUSTER_IDS.to_vec());

    let state = SupervisorState {
        cluster_view: ViewPersistState {
            current_sort: SortSpec::new("n_spikes", SortDirection::Desc),
        },
        similarity_view: s.state().similarity_view,
    };
    s.set_state(state.clone());
    assert_eq!(s.state(), state);

    let json = serde_json::to_string(&state).unwrap();
    let back: SupervisorState = serde_json::from_str(&json).unwrap();
    assert_eq!(back, state);
}

#[test]
fn resorting_changes_wizard_order() {
    let mut s = supervisor();
    s.sort_cluster_view("id", SortDirection::Asc).unwrap();
    s.reset_wizard().unwrap();
    assert_eq!(s.selected(), vec![1]);
    s.next_best().unwrap();
    assert_eq!(s.selected(), vec![2]);
}

#[test]
fn save_is_an_event_not_history() {
    let mut s = supervisor();
    select(&mut s, &[30], &[20]);
    s.merge(None).unwrap();
    let flow_len = s.action_flow().len();

    let saved = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&saved);
    let _sub = s.subscribe(move |event| {
        if let SupervisorEvent::SaveRequested(snapshot) = event {
            sink.borrow_mut().push(snapshot.spike_clusters.clone());
        }
    });
    s.save().unwrap();

    assert_eq!(s.action_flow().len(), flow_len);
    let saved = saved.borrow();
    assert_eq!(saved.len(), 1);
    assert_eq!(&saved[0][10..], &[31, 31, 31, 31]);
}

// ============================================================================
// Command queue
// ============================================================================

#[test]
fn subscriber_follow_up_runs_after_current_command() {
    let mut s = supervisor();
    let sender = s.sender();
    let _sub = s.subscribe(move |event| {
        if let SupervisorEvent::SelectAfterActionDone { action: "merge", .. } = event {
            sender.send(Command::Move {
                group: Group::Good,
                target: MoveTarget::Best,
            });
        }
    });

    select(&mut s, &[30], &[20]);
    s.merge(None).unwrap();

    // The follow-up move advanced past the merged cluster.
    assert_eq!(s.metadata().group(31), Some(Group::Good));
    assert_eq!(s.action_flow().peek_undo().unwrap().description(), "move");
    assert_eq!(s.sender().pending(), 0);
}

#[test]
fn failing_follow_up_does_not_fail_the_command() {
    let mut s = supervisor();
    let sender = s.sender();
    let _sub = s.subscribe(move |event| {
        if let SupervisorEvent::SelectClustersDone { .. } = event {
            sender.send(Command::Select(vec![404]));
        }
    });
    assert_eq!(s.select(&[30]).unwrap(), Outcome::Applied);
    assert_eq!(s.selected(), vec![30]);
}

// ============================================================================
// Late providers
// ============================================================================

#[test]
fn late_similarity_only_updates_hints() {
    let mut s = Supervisor::builder(&testing::spike_clusters())
        .groups(testing::cluster_groups())
        .quality(|c: ClusterId| Some(testing::quality(c)))
        .build()
        .unwrap();
    s.select(&[30]).unwrap();
    assert!(s.similarity_view().ids().is_empty());
    assert_eq!(s.current_state().unwrap().next_similar, None);
    let flow_len = s.action_flow().len();

    s.set_similarity(similar_clusters);
    assert_eq!(s.similarity_view().ids(), vec![20, 11, 10, 2, 1, 0]);
    let state = s.current_state().unwrap();
    assert_eq!(state.cluster_ids, vec![30]);
    assert_eq!(state.next_similar, Some(20));
    assert_eq!(s.action_flow().len(), flow_len);

    s.next().unwrap();
    assert_eq!(s.selected(), vec![30, 20]);
}

fn amplitudes() -> StaticMetrics {
    StaticMetrics::new().with_column(
        "amp",
        [(0, 5.0), (1, 9.0), (2, 1.0), (10, 3.0), (11, 7.0), (20, 2.0), (30, 4.0)],
    )
}

#[test]
fn metrics_add_a_sortable_column() {
    let mut s = Supervisor::builder(&testing::spike_clusters())
        .groups(testing::cluster_groups())
        .quality(|c: ClusterId| Some(testing::quality(c)))
        .metrics(amplitudes())
        .build()
        .unwrap();
    assert!(s.cluster_view().columns().iter().any(|c| c == "amp"));
    assert_eq!(s.cluster_view().row(1).unwrap().metrics["amp"], 9.0);

    s.sort_cluster_view("amp", SortDirection::Desc).unwrap();
    assert_eq!(s.cluster_view().ids(), vec![1, 11, 0, 30, 10, 20, 2]);
    // 0 is noise and 10 is mua.
    s.reset_wizard().unwrap();
    assert_eq!(s.selected(), vec![1]);
    s.next_best().unwrap();
    assert_eq!(s.selected(), vec![11]);

    // The merged cluster has no amplitude yet and sorts last.
    s.merge(Some(&[2, 20])).unwrap();
    assert_eq!(s.cluster_view().ids().last(), Some(&31));
}

#[test]
fn metrics_set_after_build() {
    let mut s = supervisor();
    assert!(!s.cluster_view().columns().iter().any(|c| c == "amp"));
    s.set_metrics(amplitudes());
    assert!(s.cluster_view().columns().iter().any(|c| c == "amp"));
    assert_eq!(s.cluster_view().row(30).unwrap().metrics["amp"], 4.0);
    assert_eq!(s.action_flow().len(), 0);
}

#[test]
fn merge_fails_cleanly_when_ids_run_out() {
    let mut s = Supervisor::builder(&[0, ClusterId::MAX]).build().unwrap();
    s.select(&[0]).unwrap();
    let flow_len = s.action_flow().len();
    assert!(matches!(
        s.merge(Some(&[0, ClusterId::MAX])),
        Err(CurationError::InvalidOperation(_))
    ));
    assert_eq!(s.partition().cluster_ids(), vec![0, ClusterId::MAX]);
    assert_eq!(s.action_flow().len(), flow_len);
    assert_eq!(s.selected(), vec![0]);
}
