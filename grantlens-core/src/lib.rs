//! # grantlens-core: Grant Termination Analytics
//!
//! Aggregation and fairness core of the Grantlens dashboard. A fixed set of
//! scored grant records flows through three pure stages on every parameter
//! change:
//!
//! 1. **Filter**: conjunctive search, year, agency and field predicates
//! 2. **Adjust**: attribute-gated corrections of each termination probability
//! 3. **Aggregate**: keyword statistics, fairness ratios, bias impact and
//!    metadata breakdowns
//!
//! Records come from a seedable synthetic generator or from JSON files
//! joined against a project metadata table.

// Foundation
pub mod config;
pub mod error;
pub mod grant;
pub mod stats;

// Record source
pub mod data;

// Pipeline stages
pub mod adjust;
pub mod aggregate;
pub mod filter;

// Query surface
pub mod dashboard;
pub mod predict;

// Re-exports
pub use adjust::{AdjustedGrant, BiasAdjustments, ScoredRecord, apply_adjustments};
pub use aggregate::{
    DatasetOverview, FairnessMetrics, KeywordStat, ParityRatios, compute_fairness_metrics,
    compute_keyword_stats,
};
pub use config::{DashboardConfig, SourceConfig, load_config};
pub use dashboard::{Dashboard, DashboardSnapshot};
pub use data::{GrantSource, load_records};
pub use error::{GrantError, Result};
pub use filter::GrantFilter;
pub use grant::{BiasCategory, BiasFlag, Gender, Grant, PrestigeTier, Race, Severity};
pub use predict::{GrantProfile, ProfilePrediction, predict_profile};
