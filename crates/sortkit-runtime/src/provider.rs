#![forbid(unsafe_code)]

//! Capabilities the supervisor borrows from external engines.
//!
//! The single-method providers have a blanket implementation for closures, so
//! tests and simple integrations can pass a function directly. Metrics need
//! both a column list and a lookup; [`StaticMetrics`] covers the in-memory
//! case.
//!
//! ```rust,ignore
//! let supervisor = Supervisor::builder(&spike_clusters)
//!     .quality(|cluster: ClusterId| Some(f64::from(cluster)))
//!     .split_requester(|| vec![1, 2])
//!     .build()?;
//! ```

use sortkit_core::{ClusterId, SpikeId};

use crate::views::SimilarRow;

/// Ranks clusters similar to a given one.
pub trait SimilarityProvider {
    /// Candidates in the engine's order. Dead or selected ids may be listed;
    /// the supervisor filters them.
    fn request_similar_clusters(&self, cluster: ClusterId) -> Vec<SimilarRow>;
}

impl<F> SimilarityProvider for F
where
    F: Fn(ClusterId) -> Vec<SimilarRow>,
{
    fn request_similar_clusters(&self, cluster: ClusterId) -> Vec<SimilarRow> {
        self(cluster)
    }
}

/// Scores a single cluster. `None` while the score is unknown.
pub trait QualityProvider {
    fn quality(&self, cluster: ClusterId) -> Option<f64>;
}

impl<F> QualityProvider for F
where
    F: Fn(ClusterId) -> Option<f64>,
{
    fn quality(&self, cluster: ClusterId) -> Option<f64> {
        self(cluster)
    }
}

/// Answers "which spikes?" when a split is requested without any, e.g. from
/// a lasso in a feature view.
pub trait SplitRequester {
    fn request_split(&self) -> Vec<SpikeId>;
}

impl<F> SplitRequester for F
where
    F: Fn() -> Vec<SpikeId>,
{
    fn request_split(&self) -> Vec<SpikeId> {
        self()
    }
}

/// Redistributes the spikes of donor clusters into sub-clusters.
pub trait SplitAlgorithm {
    /// One relative label per spike in `spikes`.
    fn split(&self, spikes: &[SpikeId]) -> Vec<u32>;
}

impl<F> SplitAlgorithm for F
where
    F: Fn(&[SpikeId]) -> Vec<u32>,
{
    fn split(&self, spikes: &[SpikeId]) -> Vec<u32> {
        self(spikes)
    }
}

/// Extra numeric columns for the cluster list.
pub trait MetricsProvider {
    /// Column names available for these clusters.
    fn request_cluster_metrics(&self, cluster_ids: &[ClusterId]) -> Vec<String>;

    fn metric(&self, column: &str, cluster: ClusterId) -> Option<f64>;
}

/// Metrics held in memory, one map per column.
#[derive(Debug, Clone, Default)]
pub struct StaticMetrics {
    columns: Vec<(String, std::collections::BTreeMap<ClusterId, f64>)>,
}

impl StaticMetrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: impl IntoIterator<Item = (ClusterId, f64)>,
    ) -> Self {
        self.columns.push((name.into(), values.into_iter().collect()));
        self
    }
}

impl MetricsProvider for StaticMetrics {
    fn request_cluster_metrics(&self, _cluster_ids: &[ClusterId]) -> Vec<String> {
        self.columns.iter().map(|(name, _)| name.clone()).collect()
    }

    fn metric(&self, column: &str, cluster: ClusterId) -> Option<f64> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .and_then(|(_, values)| values.get(&cluster).copied())
    }
}
