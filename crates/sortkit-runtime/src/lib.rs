#![forbid(unsafe_code)]

//! sortkit runtime
//!
//! Selection coordination for manual spike-sorting curation: the action
//! flow, the list-view models and the [`Supervisor`] that keeps them in step
//! with the core stores.
//!
//! # Key Components
//!
//! - [`Supervisor`] - runs every curation command and publishes events
//! - [`ActionFlow`] - linear timeline of selections and actions with a cursor
//! - [`ClusterView`] / [`SimilarityView`] - sortable lists the wizard walks
//! - [`EventBus`] - typed publish/subscribe with RAII subscriptions
//! - [`SupervisorConfig`] - TOML/JSON configuration
//!
//! # Role in sortkit
//! `sortkit-runtime` sits between a front-end and `sortkit-core`. Front-ends
//! send [`Command`]s (or [`WizardAction`]s bound to keys), subscribe to
//! [`SupervisorEvent`]s and render the views; they never touch the partition
//! or the metadata directly.

pub mod action_flow;
pub mod actions;
pub mod command;
pub mod config;
pub mod events;
pub mod provider;
pub mod reactive;
pub mod supervisor;
pub mod views;

pub use action_flow::{ActionFlow, FlowAction, FlowNode, FlowState, StateUpdate};
pub use actions::{MoveScope, WizardAction};
pub use command::{Command, CommandSender, MoveTarget, Outcome};
pub use config::{ConfigError, MetadataConfig, SupervisorConfig, ViewConfig, WizardConfig};
pub use events::{ChangeKind, ClusterChange, SaveSnapshot, SupervisorEvent};
pub use provider::{
    MetricsProvider, QualityProvider, SimilarityProvider, SplitAlgorithm, SplitRequester,
    StaticMetrics,
};
pub use reactive::{EventBus, Subscription};
pub use supervisor::{Supervisor, SupervisorBuilder, SupervisorState};
pub use views::{
    ClusterRow, ClusterView, SimilarRow, SimilarityView, SortDirection, SortSpec, StateKey,
    Stateful, ViewPersistState,
};
