#![forbid(unsafe_code)]

//! Persistable view state.
//!
//! A GUI-state store outside this crate saves and restores these values;
//! the views only convert to and from them.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ClusterView, SimilarityView, SortSpec};

/// Identifies one view instance in a state store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    pub view_type: &'static str,
    pub instance_id: String,
}

impl StateKey {
    #[must_use]
    pub fn new(view_type: &'static str, instance_id: impl Into<String>) -> Self {
        Self {
            view_type,
            instance_id: instance_id.into(),
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.view_type, self.instance_id)
    }
}

/// A view whose user-facing state survives sessions.
pub trait Stateful {
    type State;

    fn state_key(&self) -> StateKey;
    fn save_state(&self) -> Self::State;
    fn restore_state(&mut self, state: Self::State);
}

/// Persistable state of a list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPersistState {
    pub current_sort: SortSpec,
}

impl Stateful for ClusterView {
    type State = ViewPersistState;

    fn state_key(&self) -> StateKey {
        StateKey::new("ClusterView", self.persistence_id().unwrap_or("default"))
    }

    fn save_state(&self) -> ViewPersistState {
        ViewPersistState {
            current_sort: self.current_sort().clone(),
        }
    }

    fn restore_state(&mut self, state: ViewPersistState) {
        self.sort_by_spec(state.current_sort);
    }
}

impl Stateful for SimilarityView {
    type State = ViewPersistState;

    fn state_key(&self) -> StateKey {
        StateKey::new("SimilarityView", self.persistence_id().unwrap_or("default"))
    }

    fn save_state(&self) -> ViewPersistState {
        ViewPersistState {
            current_sort: self.current_sort().clone(),
        }
    }

    fn restore_state(&mut self, state: ViewPersistState) {
        self.sort_by_spec(state.current_sort);
    }
}
