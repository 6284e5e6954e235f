#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use sortkit_core::{ClusterId, Group};

use super::{Row, SortSpec, SortValue, Table};

/// One line of the cluster list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterRow {
    pub id: ClusterId,
    pub n_spikes: usize,
    pub quality: Option<f64>,
    pub group: Option<Group>,
    /// Extra sortable columns supplied by a metrics provider.
    pub metrics: BTreeMap<String, f64>,
}

impl ClusterRow {
    #[must_use]
    pub fn new(id: ClusterId, n_spikes: usize) -> Self {
        Self {
            id,
            n_spikes,
            quality: None,
            group: None,
            metrics: BTreeMap::new(),
        }
    }
}

impl Row for ClusterRow {
    fn id(&self) -> ClusterId {
        self.id
    }

    fn sort_value(&self, column: &str) -> SortValue {
        match column {
            "id" => SortValue::Number(f64::from(self.id)),
            "n_spikes" => SortValue::Number(self.n_spikes as f64),
            "quality" => self.quality.map_or(SortValue::Missing, SortValue::Number),
            "group" => self
                .group
                .map_or(SortValue::Missing, |group| SortValue::Text(group.to_string())),
            metric => self
                .metrics
                .get(metric)
                .copied()
                .map_or(SortValue::Missing, SortValue::Number),
        }
    }
}

/// The primary list: every live cluster.
#[derive(Debug, Clone)]
pub struct ClusterView {
    table: Table<ClusterRow>,
    columns: Vec<String>,
    persistence_id: Option<String>,
}

impl ClusterView {
    pub const BASE_COLUMNS: [&'static str; 4] = ["id", "n_spikes", "quality", "group"];

    #[must_use]
    pub fn new(default_sort: SortSpec) -> Self {
        Self {
            table: Table::new(default_sort),
            columns: Self::BASE_COLUMNS.iter().map(ToString::to_string).collect(),
            persistence_id: None,
        }
    }

    /// Identifier used when persisting this view's state.
    #[must_use]
    pub fn with_persistence_id(mut self, id: impl Into<String>) -> Self {
        self.persistence_id = Some(id.into());
        self
    }

    /// Replace every row. Rows are expected in ascending id order so that
    /// ties end up ordered by id.
    pub fn set_rows(&mut self, rows: Vec<ClusterRow>) {
        self.table.set_rows(rows);
    }

    /// Add metric columns after the base ones, ignoring duplicates.
    pub fn add_columns(&mut self, columns: impl IntoIterator<Item = String>) {
        for column in columns {
            if !self.columns.contains(&column) {
                self.columns.push(column);
            }
        }
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Sort ascending by `column`.
    pub fn sort_by(&mut self, column: &str) {
        self.table
            .sort_by(SortSpec::new(column, super::SortDirection::Asc));
    }

    pub fn sort_by_spec(&mut self, sort: SortSpec) {
        self.table.sort_by(sort);
    }

    #[must_use]
    pub fn current_sort(&self) -> &SortSpec {
        self.table.current_sort()
    }

    #[must_use]
    pub fn rows(&self) -> &[ClusterRow] {
        self.table.rows()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<ClusterId> {
        self.table.ids()
    }

    #[must_use]
    pub fn row(&self, id: ClusterId) -> Option<&ClusterRow> {
        self.table.get(id)
    }

    #[must_use]
    pub fn next_after(&self, anchor: &[ClusterId], skip: impl Fn(ClusterId) -> bool) -> Option<ClusterId> {
        self.table.next_after(anchor, skip)
    }

    #[must_use]
    pub fn previous_before(
        &self,
        anchor: &[ClusterId],
        skip: impl Fn(ClusterId) -> bool,
    ) -> Option<ClusterId> {
        self.table.previous_before(anchor, skip)
    }

    #[must_use]
    pub fn first(&self, skip: impl Fn(ClusterId) -> bool) -> Option<ClusterId> {
        self.table.first(skip)
    }

    pub(crate) fn persistence_id(&self) -> Option<&str> {
        self.persistence_id.as_deref()
    }
}
