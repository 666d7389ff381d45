//! Bias impact per topic category.
//!
//! Two views feed the impact chart: the mean signed impact of the flags
//! carried by the current records, and a precomputed topic delta table
//! produced by the language model's counterfactual analysis.

use crate::adjust::ScoredRecord;
use crate::data::read_json;
use crate::error::Result;
use crate::grant::BiasCategory;
use crate::stats::mean;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Categories shown on the impact chart, in display order.
pub const IMPACT_CATEGORIES: [BiasCategory; 5] = [
    BiasCategory::Race,
    BiasCategory::Gender,
    BiasCategory::MentalHealth,
    BiasCategory::Lgbtq,
    BiasCategory::Climate,
];

/// Mean signed impact of one category's flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiasImpact {
    pub category: BiasCategory,
    pub label: String,
    /// Mean impact in percentage points, 0 when no record carries the flag.
    pub average_impact: f64,
    pub count: usize,
}

/// Average the flag impacts per chart category across `records`.
pub fn summarize_bias_impact<R: ScoredRecord>(records: &[R]) -> Vec<BiasImpact> {
    IMPACT_CATEGORIES
        .into_iter()
        .map(|category| {
            let (sum, count) = records
                .iter()
                .flat_map(|r| r.grant().bias_flags.iter())
                .filter(|f| f.category == category)
                .fold((0.0, 0usize), |(sum, count), f| (sum + f.impact, count + 1));
            BiasImpact {
                category,
                label: category.label().to_string(),
                average_impact: mean(sum, count),
                count,
            }
        })
        .collect()
}

/// Key used for a category in the topic delta files.
pub fn topic_key(category: BiasCategory) -> Option<&'static str> {
    match category {
        BiasCategory::Race => Some("race/ethnicity"),
        BiasCategory::Gender => Some("gender"),
        BiasCategory::MentalHealth => Some("mental health/mental disorders"),
        BiasCategory::Lgbtq => Some("lgbtq"),
        BiasCategory::Climate => Some("climate change"),
        BiasCategory::Institution | BiasCategory::Experience => None,
    }
}

/// Per-topic average and strongest probability deltas.
///
/// Deltas are stored as the change in termination probability when the
/// topic's terms are removed, so a positive delta means the terms were
/// protective. Rows flip the sign and scale to percentage points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TopicImpactTable {
    pub average: HashMap<String, f64>,
    pub strongest: HashMap<String, f64>,
}

/// One chart row derived from [`TopicImpactTable`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicImpact {
    pub category: BiasCategory,
    pub label: String,
    pub average_impact: f64,
    pub max_impact: f64,
}

impl TopicImpactTable {
    /// Load the average and strongest delta files, each a JSON object of
    /// topic key to delta.
    pub fn load(average: &Path, strongest: &Path) -> Result<Self> {
        let table = Self {
            average: read_json(average)?,
            strongest: read_json(strongest)?,
        };
        tracing::info!(
            average = %average.display(),
            strongest = %strongest.display(),
            topics = table.average.len(),
            "loaded topic impact table"
        );
        Ok(table)
    }

    /// Chart rows in [`IMPACT_CATEGORIES`] order. Missing topics read as 0.
    pub fn rows(&self) -> Vec<TopicImpact> {
        IMPACT_CATEGORIES
            .into_iter()
            .map(|category| {
                let delta = |map: &HashMap<String, f64>| {
                    topic_key(category)
                        .and_then(|key| map.get(key))
                        .copied()
                        .unwrap_or(0.0)
                };
                TopicImpact {
                    category,
                    label: category.label().to_string(),
                    average_impact: delta(&self.average) * -100.0,
                    max_impact: delta(&self.strongest) * -100.0,
                }
            })
            .collect()
    }
}
