#![forbid(unsafe_code)]

//! Cluster groups and label values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CurationError;

/// Metadata field holding a cluster's [`Group`].
pub const GROUP_FIELD: &str = "group";

/// Coarse quality label of a cluster. An unlabeled cluster has no group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Group {
    Noise,
    Mua,
    Good,
    Unsorted,
}

impl Group {
    pub const ALL: [Group; 4] = [Group::Noise, Group::Mua, Group::Good, Group::Unsorted];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Noise => "noise",
            Self::Mua => "mua",
            Self::Good => "good",
            Self::Unsorted => "unsorted",
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Group {
    type Err = CurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "noise" => Ok(Self::Noise),
            "mua" => Ok(Self::Mua),
            "good" => Ok(Self::Good),
            "unsorted" => Ok(Self::Unsorted),
            _ => Err(CurationError::Parse(s.to_string())),
        }
    }
}

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl LabelValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric view used for sorting; text has none.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(*v as f64),
            Self::Float(v) => Some(*v),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for LabelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<Group> for LabelValue {
    fn from(group: Group) -> Self {
        Self::Text(group.as_str().to_string())
    }
}

impl From<&str> for LabelValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for LabelValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for LabelValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for LabelValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}
