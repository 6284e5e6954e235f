#![forbid(unsafe_code)]

//! Sortable list models behind the cluster and similarity lists.
//!
//! The models do not render anything. They keep rows in display order and
//! answer the wizard's positional questions ("the first row after this
//! selection that is not skipped").

mod cluster_view;
mod similarity_view;
mod stateful;

pub use cluster_view::{ClusterRow, ClusterView};
pub use similarity_view::{SimilarRow, SimilarityView};
pub use stateful::{StateKey, Stateful, ViewPersistState};

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use sortkit_core::{ClusterId, CurationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = CurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(CurationError::Parse(s.to_string())),
        }
    }
}

/// `(column, direction)`, serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SortSpec(String, SortDirection);

impl SortSpec {
    #[must_use]
    pub fn new(column: impl Into<String>, direction: SortDirection) -> Self {
        Self(column.into(), direction)
    }

    #[must_use]
    pub fn column(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn direction(&self) -> SortDirection {
        self.1
    }
}

impl From<(&str, SortDirection)> for SortSpec {
    fn from((column, direction): (&str, SortDirection)) -> Self {
        Self::new(column, direction)
    }
}

/// A cell value used for ordering.
#[derive(Debug, Clone, PartialEq)]
pub enum SortValue {
    Number(f64),
    Text(String),
    Missing,
}

impl SortValue {
    /// Missing values always sort last, whatever the direction.
    fn compare(&self, other: &Self, direction: SortDirection) -> Ordering {
        let ordering = match (self, other) {
            (Self::Missing, Self::Missing) => return Ordering::Equal,
            (Self::Missing, _) => return Ordering::Greater,
            (_, Self::Missing) => return Ordering::Less,
            (Self::Number(a), Self::Number(b)) => a.total_cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Number(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Number(_)) => Ordering::Greater,
        };
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// A row that can be placed in a [`Table`].
pub trait Row {
    fn id(&self) -> ClusterId;
    fn sort_value(&self, column: &str) -> SortValue;
}

/// Rows in display order under one sort.
///
/// Sorting is stable, so rows that compare equal keep the order they were
/// supplied in.
#[derive(Debug, Clone)]
pub struct Table<R> {
    rows: Vec<R>,
    sort: SortSpec,
}

impl<R: Row> Table<R> {
    #[must_use]
    pub fn new(sort: SortSpec) -> Self {
        Self {
            rows: Vec::new(),
            sort,
        }
    }

    pub fn set_rows(&mut self, rows: Vec<R>) {
        self.rows = rows;
        self.resort();
    }

    pub fn sort_by(&mut self, sort: SortSpec) {
        self.sort = sort;
        self.resort();
    }

    #[must_use]
    pub fn current_sort(&self) -> &SortSpec {
        &self.sort
    }

    #[must_use]
    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    #[must_use]
    pub fn ids(&self) -> Vec<ClusterId> {
        self.rows.iter().map(Row::id).collect()
    }

    #[must_use]
    pub fn position(&self, id: ClusterId) -> Option<usize> {
        self.rows.iter().position(|row| row.id() == id)
    }

    #[must_use]
    pub fn get(&self, id: ClusterId) -> Option<&R> {
        self.rows.iter().find(|row| row.id() == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// First row after the last-placed anchor that is neither an anchor nor
    /// skipped. With no anchor in the table the search starts at the top.
    #[must_use]
    pub fn next_after(&self, anchor: &[ClusterId], skip: impl Fn(ClusterId) -> bool) -> Option<ClusterId> {
        let start = anchor
            .iter()
            .filter_map(|&id| self.position(id))
            .max()
            .map_or(0, |last| last + 1);
        self.rows
            .iter()
            .skip(start)
            .map(Row::id)
            .find(|id| !anchor.contains(id) && !skip(*id))
    }

    /// Last row before the first-placed anchor that is neither an anchor nor
    /// skipped. `None` when no anchor is in the table.
    #[must_use]
    pub fn previous_before(
        &self,
        anchor: &[ClusterId],
        skip: impl Fn(ClusterId) -> bool,
    ) -> Option<ClusterId> {
        let end = anchor.iter().filter_map(|&id| self.position(id)).min()?;
        self.rows[..end]
            .iter()
            .rev()
            .map(Row::id)
            .find(|id| !anchor.contains(id) && !skip(*id))
    }

    /// First row that is not skipped.
    #[must_use]
    pub fn first(&self, skip: impl Fn(ClusterId) -> bool) -> Option<ClusterId> {
        self.next_after(&[], skip)
    }

    fn resort(&mut self) {
        let column = self.sort.column().to_string();
        let direction = self.sort.direction();
        self.rows.sort_by(|a, b| {
            a.sort_value(&column)
                .compare(&b.sort_value(&column), direction)
        });
    }
}
