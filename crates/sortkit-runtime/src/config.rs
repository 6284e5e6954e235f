#![forbid(unsafe_code)]

//! Supervisor configuration loaded from TOML or JSON.
//!
//! # Loading
//!
//! ```toml
//! # sortkit.toml
//! [wizard]
//! skip_groups = ["noise", "mua"]
//!
//! [cluster_view]
//! default_sort = ["quality", "desc"]
//!
//! [metadata]
//! propagate_on_merge = true
//! ```
//!
//! ```rust,ignore
//! let config = SupervisorConfig::from_toml_file("sortkit.toml")?;
//! let config = SupervisorConfig::from_json_str(json)?;
//! ```
//!
//! Every section and field is optional; missing values fall back to
//! [`SupervisorConfig::default`]. Loaders reject configs that fail
//! [`validate`](SupervisorConfig::validate).

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sortkit_core::Group;

use crate::views::{SortDirection, SortSpec};

// ---------------------------------------------------------------------------
// Top-level SupervisorConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupervisorConfig {
    pub wizard: WizardConfig,
    pub cluster_view: ViewConfig,
    pub similarity_view: ViewConfig,
    pub metadata: MetadataConfig,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            wizard: WizardConfig::default(),
            cluster_view: ViewConfig {
                default_sort: SortSpec::new("quality", SortDirection::Desc),
            },
            similarity_view: ViewConfig {
                default_sort: SortSpec::new("similarity", SortDirection::Desc),
            },
            metadata: MetadataConfig::default(),
        }
    }
}

impl SupervisorConfig {
    /// Load from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validated()
    }

    /// Load from a TOML file on disk.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Load from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s)?;
        config.validated()
    }

    /// Load from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Validate all parameters.
    ///
    /// Returns a list of problems. An empty list means the config is valid.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if Group::ALL
            .iter()
            .all(|group| self.wizard.skip_groups.contains(group))
        {
            errors.push("wizard.skip_groups must leave at least one group to visit".into());
        }

        for (name, view) in [
            ("cluster_view", &self.cluster_view),
            ("similarity_view", &self.similarity_view),
        ] {
            if view.default_sort.column().trim().is_empty() {
                errors.push(format!("{name}.default_sort column must not be empty"));
            }
        }

        errors
    }

    /// Whether the wizard passes over clusters of this group.
    #[must_use]
    pub fn skips(&self, group: Option<Group>) -> bool {
        group.is_some_and(|group| self.wizard.skip_groups.contains(&group))
    }

    fn validated(self) -> Result<Self, ConfigError> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(self)
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Wizard navigation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WizardConfig {
    /// Groups the wizard never lands on. Default: noise and mua.
    pub skip_groups: Vec<Group>,
}

impl Default for WizardConfig {
    fn default() -> Self {
        Self {
            skip_groups: vec![Group::Noise, Group::Mua],
        }
    }
}

/// One list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub default_sort: SortSpec,
}

/// Label handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Give merged clusters the labels all their parents agree on.
    /// Default: true.
    pub propagate_on_merge: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            propagate_on_merge: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur when loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid configuration: {}", .0.join("; "))]
    Validation(Vec<String>),
}
