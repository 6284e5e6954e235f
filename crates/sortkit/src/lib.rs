#![forbid(unsafe_code)]

//! sortkit public facade crate.
//!
//! Re-exports the types a curation front-end needs from the internal crates
//! and offers a prelude for day-to-day usage.
//!
//! ```rust,ignore
//! use sortkit::prelude::*;
//!
//! let mut supervisor = Supervisor::builder(&spike_clusters)
//!     .groups(groups)
//!     .quality(|cluster: ClusterId| quality.get(&cluster).copied())
//!     .build()?;
//! supervisor.reset_wizard()?;
//! supervisor.perform(WizardAction::Next)?;
//! supervisor.merge(None)?;
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use sortkit_core::{
    ClusterId, ClusterMetadata, ClusterPartition, CurationError, GROUP_FIELD, Group, LabelValue,
    PartitionUpdate, SpikeId,
};

// --- Runtime re-exports ----------------------------------------------------

#[cfg(feature = "runtime")]
pub use sortkit_runtime::{
    ActionFlow, Command, CommandSender, ConfigError, FlowAction, FlowState, MoveScope, MoveTarget,
    Outcome, SimilarRow, SortDirection, SortSpec, Subscription, Supervisor, SupervisorConfig,
    SupervisorEvent, SupervisorState, WizardAction,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for sortkit applications.
#[derive(Debug)]
pub enum Error {
    /// A curation command was rejected.
    Curation(CurationError),
    /// The supervisor configuration could not be loaded.
    #[cfg(feature = "runtime")]
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Curation(err) => write!(f, "{err}"),
            #[cfg(feature = "runtime")]
            Self::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Curation(err) => Some(err),
            #[cfg(feature = "runtime")]
            Self::Config(err) => Some(err),
        }
    }
}

impl From<CurationError> for Error {
    fn from(err: CurationError) -> Self {
        Self::Curation(err)
    }
}

#[cfg(feature = "runtime")]
impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// Standard result type for sortkit applications.
pub type Result<T> = std::result::Result<T, Error>;

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{ClusterId, CurationError, Error, Group, LabelValue, Result, SpikeId};

    #[cfg(feature = "runtime")]
    pub use crate::{
        Command, MoveTarget, Outcome, SimilarRow, SortDirection, Supervisor, SupervisorConfig,
        SupervisorEvent, WizardAction,
    };

    pub use crate::core;
    #[cfg(feature = "runtime")]
    pub use crate::runtime;
}

pub use sortkit_core as core;
#[cfg(feature = "runtime")]
pub use sortkit_runtime as runtime;
