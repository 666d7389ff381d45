//! Aggregation stage: every statistic the dashboard renders.
//!
//! Aggregates are generic over [`ScoredRecord`](crate::adjust::ScoredRecord)
//! so they run unchanged over raw grants, filtered references, or adjusted
//! views.

pub mod bias_impact;
pub mod breakdown;
pub mod fairness;
pub mod keywords;
pub mod overview;

pub use bias_impact::{BiasImpact, TopicImpact, TopicImpactTable, summarize_bias_impact};
pub use breakdown::{AmountBreakdown, CategoryBreakdown, MetadataBreakdown, metadata_breakdown};
pub use fairness::{
    FairnessMetrics, GroupComparison, GroupStats, ParityRatios, compare_all_groups,
    compare_groups, compute_fairness_metrics,
};
pub use keywords::{
    ImpactBand, KeywordReferenceTable, KeywordRisk, KeywordStat, ReferenceEntry, RiskLevel,
    SampleGrant, classify_keywords, compute_keyword_stats, compute_keyword_stats_with_limit,
};
pub use overview::{DatasetOverview, dataset_overview};
