//! Headline counts for the dashboard summary cards.

use crate::adjust::ScoredRecord;
use crate::stats::{mean, rate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetOverview {
    pub total: usize,
    pub terminated: usize,
    /// Actual termination rate in percent, 0 for an empty set.
    pub termination_rate_pct: f64,
    /// Mean model termination probability in percent.
    pub avg_probability_pct: f64,
    /// Mean adjusted probability in percent, when the records carry one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_adjusted_probability_pct: Option<f64>,
}

pub fn dataset_overview<R: ScoredRecord>(records: &[R]) -> DatasetOverview {
    let total = records.len();
    let terminated = records.iter().filter(|r| r.grant().terminated).count();
    let probability_sum: f64 = records.iter().map(|r| r.probability(false)).sum();

    let adjusted: Vec<f64> = records
        .iter()
        .filter_map(|r| r.adjusted_probability())
        .collect();
    let avg_adjusted_probability_pct = (!adjusted.is_empty())
        .then(|| mean(adjusted.iter().sum::<f64>(), adjusted.len()) * 100.0);

    DatasetOverview {
        total,
        terminated,
        termination_rate_pct: rate(terminated, total) * 100.0,
        avg_probability_pct: mean(probability_sum, total) * 100.0,
        avg_adjusted_probability_pct,
    }
}
