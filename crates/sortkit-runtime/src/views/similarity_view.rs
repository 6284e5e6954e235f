#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use sortkit_core::ClusterId;

use super::{Row, SortSpec, SortValue, Table};

/// One line of the similarity list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimilarRow {
    pub id: ClusterId,
    /// Score from the similarity engine, if it gave one.
    pub similarity: Option<f64>,
}

impl From<ClusterId> for SimilarRow {
    fn from(id: ClusterId) -> Self {
        Self {
            id,
            similarity: None,
        }
    }
}

impl From<(ClusterId, f64)> for SimilarRow {
    fn from((id, similarity): (ClusterId, f64)) -> Self {
        Self {
            id,
            similarity: Some(similarity),
        }
    }
}

impl Row for SimilarRow {
    fn id(&self) -> ClusterId {
        self.id
    }

    fn sort_value(&self, column: &str) -> SortValue {
        match column {
            "id" => SortValue::Number(f64::from(self.id)),
            "similarity" => self.similarity.map_or(SortValue::Missing, SortValue::Number),
            _ => SortValue::Missing,
        }
    }
}

/// The secondary list: clusters similar to the last primary cluster.
///
/// Unscored rows keep the order the similarity engine returned them in.
#[derive(Debug, Clone)]
pub struct SimilarityView {
    table: Table<SimilarRow>,
    anchor: Option<ClusterId>,
    persistence_id: Option<String>,
}

impl SimilarityView {
    #[must_use]
    pub fn new(default_sort: SortSpec) -> Self {
        Self {
            table: Table::new(default_sort),
            anchor: None,
            persistence_id: None,
        }
    }

    #[must_use]
    pub fn with_persistence_id(mut self, id: impl Into<String>) -> Self {
        self.persistence_id = Some(id.into());
        self
    }

    /// Show `rows` as the clusters similar to `anchor`. Rows listed in
    /// `exclude`, rows for which `keep` is false and repeated ids are dropped.
    pub fn reset(
        &mut self,
        anchor: ClusterId,
        rows: Vec<SimilarRow>,
        exclude: &[ClusterId],
        keep: impl Fn(ClusterId) -> bool,
    ) {
        let mut seen = Vec::with_capacity(rows.len());
        let rows = rows
            .into_iter()
            .filter(|row| row.id != anchor && !exclude.contains(&row.id) && keep(row.id))
            .filter(|row| {
                if seen.contains(&row.id) {
                    false
                } else {
                    seen.push(row.id);
                    true
                }
            })
            .collect();
        self.anchor = Some(anchor);
        self.table.set_rows(rows);
    }

    pub fn clear(&mut self) {
        self.anchor = None;
        self.table.set_rows(Vec::new());
    }

    /// The primary cluster the rows were computed for.
    #[must_use]
    pub fn anchor(&self) -> Option<ClusterId> {
        self.anchor
    }

    pub fn sort_by_spec(&mut self, sort: SortSpec) {
        self.table.sort_by(sort);
    }

    #[must_use]
    pub fn current_sort(&self) -> &SortSpec {
        self.table.current_sort()
    }

    #[must_use]
    pub fn rows(&self) -> &[SimilarRow] {
        self.table.rows()
    }

    #[must_use]
    pub fn ids(&self) -> Vec<ClusterId> {
        self.table.ids()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
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

    pub(crate) fn persistence_id(&self) -> Option<&str> {
        self.persistence_id.as_deref()
    }
}
