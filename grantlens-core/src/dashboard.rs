//! One recomputation pass of the dashboard: filter, adjust, aggregate.
//!
//! [`Dashboard`] owns the loaded records and the user-controlled
//! parameters. Every call to [`Dashboard::snapshot`] derives fresh values
//! from them; nothing computed is cached or mutated in place.

use crate::adjust::{AdjustedGrant, BiasAdjustments};
use crate::aggregate::{
    BiasImpact, DatasetOverview, FairnessMetrics, KeywordReferenceTable, KeywordRisk, KeywordStat,
    MetadataBreakdown, classify_keywords, compute_fairness_metrics,
    compute_keyword_stats_with_limit, dataset_overview, metadata_breakdown, summarize_bias_impact,
};
use crate::aggregate::keywords::DEFAULT_SAMPLE_LIMIT;
use crate::config::DashboardConfig;
use crate::data::load_records;
use crate::error::{GrantError, Result};
use crate::filter::GrantFilter;
use crate::grant::Grant;
use serde::Serialize;

/// Everything the presentation layer renders for one set of parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    /// Whether breakdowns read adjusted probabilities.
    pub show_adjusted: bool,
    pub overview: DatasetOverview,
    pub keywords: Vec<KeywordStat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_risks: Option<Vec<KeywordRisk>>,
    pub fairness: FairnessMetrics,
    pub adjusted_fairness: FairnessMetrics,
    pub bias_impact: Vec<BiasImpact>,
    pub breakdown: MetadataBreakdown,
}

/// Loaded records plus the current filter and adjustment parameters.
#[derive(Debug, Clone)]
pub struct Dashboard {
    records: Vec<Grant>,
    filter: GrantFilter,
    adjustments: BiasAdjustments,
    show_adjusted: bool,
    sample_limit: usize,
    reference_table: Option<KeywordReferenceTable>,
}

impl Dashboard {
    pub fn new(records: Vec<Grant>) -> Self {
        Self {
            records,
            filter: GrantFilter::default(),
            adjustments: BiasAdjustments::default(),
            show_adjusted: false,
            sample_limit: DEFAULT_SAMPLE_LIMIT,
            reference_table: None,
        }
    }

    /// Load records from the configured source and apply the configured
    /// parameters.
    pub fn from_config(config: &DashboardConfig) -> Result<Self> {
        config.validate()?;
        let records = load_records(&config.source)?;
        let reference_table = config
            .keywords
            .reference_table
            .as_deref()
            .map(KeywordReferenceTable::load)
            .transpose()?;

        tracing::info!(
            records = records.len(),
            filtered = !GrantFilter::from(&config.filter).is_empty(),
            adjusted = !config.adjustments.is_zero(),
            "dashboard initialized"
        );

        Ok(Self {
            records,
            filter: GrantFilter::from(&config.filter),
            adjustments: config.adjustments,
            show_adjusted: !config.adjustments.is_zero(),
            sample_limit: config.keywords.sample_limit,
            reference_table,
        })
    }

    pub fn with_filter(mut self, filter: GrantFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_adjustments(mut self, adjustments: BiasAdjustments) -> Result<Self> {
        self.set_adjustments(adjustments)?;
        Ok(self)
    }

    pub fn with_show_adjusted(mut self, show_adjusted: bool) -> Self {
        self.show_adjusted = show_adjusted;
        self
    }

    pub fn with_reference_table(mut self, table: KeywordReferenceTable) -> Self {
        self.reference_table = Some(table);
        self
    }

    pub fn with_sample_limit(mut self, sample_limit: usize) -> Result<Self> {
        if sample_limit == 0 {
            return Err(GrantError::invalid_input("sample limit must be at least 1"));
        }
        self.sample_limit = sample_limit;
        Ok(self)
    }

    pub fn set_filter(&mut self, filter: GrantFilter) {
        self.filter = filter;
    }

    /// Replace the adjustment magnitudes. Out-of-range values are rejected
    /// and the previous magnitudes kept.
    pub fn set_adjustments(&mut self, adjustments: BiasAdjustments) -> Result<()> {
        adjustments.validate()?;
        self.adjustments = adjustments;
        Ok(())
    }

    pub fn records(&self) -> &[Grant] {
        &self.records
    }

    pub fn filter(&self) -> &GrantFilter {
        &self.filter
    }

    pub fn adjustments(&self) -> &BiasAdjustments {
        &self.adjustments
    }

    /// Records surviving the current filter, in load order.
    pub fn filtered(&self) -> Vec<&Grant> {
        self.filter.apply(&self.records)
    }

    /// Filtered records with their adjusted probabilities.
    pub fn adjusted(&self) -> Vec<AdjustedGrant<'_>> {
        self.filtered()
            .into_iter()
            .map(|grant| AdjustedGrant::new(grant, &self.adjustments))
            .collect()
    }

    /// Keyword statistics over the adjusted view, keeping the configured
    /// number of drill-down samples per keyword.
    pub fn keyword_stats(&self) -> Vec<KeywordStat> {
        compute_keyword_stats_with_limit(&self.adjusted(), self.sample_limit)
    }

    pub fn snapshot(&self) -> DashboardSnapshot {
        let adjusted = self.adjusted();
        let snapshot = DashboardSnapshot {
            show_adjusted: self.show_adjusted,
            overview: dataset_overview(&adjusted),
            keywords: compute_keyword_stats_with_limit(&adjusted, self.sample_limit),
            keyword_risks: self
                .reference_table
                .as_ref()
                .map(|table| classify_keywords(&adjusted, table)),
            fairness: compute_fairness_metrics(&adjusted, false),
            adjusted_fairness: compute_fairness_metrics(&adjusted, true),
            bias_impact: summarize_bias_impact(&adjusted),
            breakdown: metadata_breakdown(&adjusted, self.show_adjusted),
        };
        tracing::debug!(
            total = self.records.len(),
            visible = snapshot.overview.total,
            keywords = snapshot.keywords.len(),
            "dashboard snapshot computed"
        );
        snapshot
    }
}
