//! Keyword statistics for the termination word cloud.
//!
//! Two modes are supported. Computed-weight mode derives each keyword's
//! termination weight from the records themselves. Reference-table mode
//! classifies keywords into fixed risk tiers from an externally produced
//! table.

use crate::adjust::ScoredRecord;
use crate::data::read_json;
use crate::error::Result;
use crate::stats::rate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

/// Sample grants retained per keyword when no limit is configured.
pub const DEFAULT_SAMPLE_LIMIT: usize = 5;

/// Smallest and largest word-cloud font sizes, in pixels.
pub const CLOUD_FONT_MIN: f64 = 12.0;
pub const CLOUD_FONT_MAX: f64 = 44.0;

/// Aggregate statistics for one keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordStat {
    pub keyword: String,
    /// Number of records carrying the keyword.
    pub frequency: usize,
    pub terminated_count: usize,
    /// `terminated_count / frequency`.
    pub avg_termination_rate: f64,
    /// Subgroup termination rate minus the overall rate of the input.
    pub termination_weight: f64,
    pub sample_grants: Vec<SampleGrant>,
}

impl KeywordStat {
    pub fn impact_band(&self) -> ImpactBand {
        ImpactBand::from_weight(self.termination_weight)
    }
}

/// A record shown in a keyword's drill-down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleGrant {
    pub title: String,
    pub terminated: bool,
    /// The record's model termination probability.
    pub confidence: f64,
}

#[derive(Default)]
struct KeywordTally {
    frequency: usize,
    terminated_count: usize,
    samples: Vec<SampleGrant>,
}

/// Keyword statistics with the default drill-down sample limit.
pub fn compute_keyword_stats<R: ScoredRecord>(records: &[R]) -> Vec<KeywordStat> {
    compute_keyword_stats_with_limit(records, DEFAULT_SAMPLE_LIMIT)
}

/// Keyword statistics sorted by descending absolute termination weight, ties
/// broken by keyword.
///
/// Keywords match exactly and case-sensitively. A keyword listed twice on
/// one record counts once. The first `sample_limit` records carrying a
/// keyword, in input order, become its samples.
pub fn compute_keyword_stats_with_limit<R: ScoredRecord>(
    records: &[R],
    sample_limit: usize,
) -> Vec<KeywordStat> {
    let mut tallies: BTreeMap<&str, KeywordTally> = BTreeMap::new();
    let mut terminated_total = 0usize;

    for record in records {
        let grant = record.grant();
        if grant.terminated {
            terminated_total += 1;
        }
        let mut seen = HashSet::new();
        for keyword in &grant.keywords {
            if !seen.insert(keyword.as_str()) {
                continue;
            }
            let tally = tallies.entry(keyword.as_str()).or_default();
            tally.frequency += 1;
            if grant.terminated {
                tally.terminated_count += 1;
            }
            if tally.samples.len() < sample_limit {
                tally.samples.push(SampleGrant {
                    title: grant.title.clone(),
                    terminated: grant.terminated,
                    confidence: grant.termination_probability,
                });
            }
        }
    }

    let overall_rate = rate(terminated_total, records.len());
    let mut stats: Vec<KeywordStat> = tallies
        .into_iter()
        .map(|(keyword, tally)| {
            let avg_termination_rate = rate(tally.terminated_count, tally.frequency);
            KeywordStat {
                keyword: keyword.to_string(),
                frequency: tally.frequency,
                terminated_count: tally.terminated_count,
                avg_termination_rate,
                termination_weight: avg_termination_rate - overall_rate,
                sample_grants: tally.samples,
            }
        })
        .collect();

    stats.sort_by(|a, b| {
        b.termination_weight
            .abs()
            .total_cmp(&a.termination_weight.abs())
            .then_with(|| a.keyword.cmp(&b.keyword))
    });

    tracing::debug!(
        records = records.len(),
        keywords = stats.len(),
        overall_rate,
        "computed keyword statistics"
    );
    stats
}

/// Word-cloud colour band for a termination weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactBand {
    /// Weight above +0.10.
    High,
    /// Weight above +0.05.
    Moderate,
    /// Any positive weight up to +0.05.
    Slight,
    /// Weight above -0.05, zero included.
    Protective,
    StronglyProtective,
}

impl ImpactBand {
    pub fn from_weight(weight: f64) -> Self {
        if weight > 0.10 {
            ImpactBand::High
        } else if weight > 0.05 {
            ImpactBand::Moderate
        } else if weight > 0.0 {
            ImpactBand::Slight
        } else if weight > -0.05 {
            ImpactBand::Protective
        } else {
            ImpactBand::StronglyProtective
        }
    }
}

/// Font size for a keyword of `frequency` in a cloud whose frequencies span
/// `min..=max`. A cloud where every keyword has the same frequency renders
/// at the minimum size.
pub fn cloud_font_size(frequency: usize, min: usize, max: usize) -> f64 {
    if max <= min {
        return CLOUD_FONT_MIN;
    }
    let normalized = (frequency.clamp(min, max) - min) as f64 / (max - min) as f64;
    CLOUD_FONT_MIN + normalized * (CLOUD_FONT_MAX - CLOUD_FONT_MIN)
}

// ---------------------------------------------------------------------------
// Reference-table mode
// ---------------------------------------------------------------------------

/// Ordinal risk tier: `Protective < Low Risk < Mod Risk < High Risk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Protective,
    #[serde(rename = "Low Risk")]
    LowRisk,
    #[serde(rename = "Mod Risk")]
    ModRisk,
    #[serde(rename = "High Risk")]
    HighRisk,
}

/// One row of the keyword risk reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub term: String,
    pub avg_tfidf_freq: f64,
    pub risk_level: RiskLevel,
}

/// Keyword risk tiers keyed by lowercased term.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordReferenceTable {
    entries: HashMap<String, ReferenceEntry>,
}

impl KeywordReferenceTable {
    pub fn from_entries(entries: impl IntoIterator<Item = ReferenceEntry>) -> Self {
        let entries = entries
            .into_iter()
            .map(|entry| (entry.term.to_lowercase(), entry))
            .collect();
        Self { entries }
    }

    /// Load a JSON object mapping terms to `{term, avg_tfidf_freq, risk_level}`.
    pub fn load(path: &Path) -> Result<Self> {
        let raw: HashMap<String, ReferenceEntry> = read_json(path)?;
        let entries = raw
            .into_iter()
            .map(|(key, entry)| (key.to_lowercase(), entry))
            .collect::<HashMap<_, _>>();
        tracing::info!(
            path = %path.display(),
            terms = entries.len(),
            "loaded keyword reference table"
        );
        Ok(Self { entries })
    }

    pub fn get(&self, term: &str) -> Option<&ReferenceEntry> {
        self.entries.get(&term.to_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A reference-table term with its occurrences in the current records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordRisk {
    pub term: String,
    pub risk_level: RiskLevel,
    pub avg_tfidf_freq: f64,
    /// Records whose keywords include the term, compared case-insensitively.
    pub occurrences: usize,
    pub terminated_count: usize,
}

/// Classify every reference-table term, sorted by risk tier descending, then
/// TF-IDF frequency descending, then term.
pub fn classify_keywords<R: ScoredRecord>(
    records: &[R],
    table: &KeywordReferenceTable,
) -> Vec<KeywordRisk> {
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for record in records {
        let grant = record.grant();
        let mut seen = HashSet::new();
        for keyword in &grant.keywords {
            let Some((key, _)) = table.entries.get_key_value(&keyword.to_lowercase()) else {
                continue;
            };
            if !seen.insert(key.as_str()) {
                continue;
            }
            let entry = counts.entry(key.as_str()).or_default();
            entry.0 += 1;
            if grant.terminated {
                entry.1 += 1;
            }
        }
    }

    let mut risks: Vec<KeywordRisk> = table
        .entries
        .iter()
        .map(|(key, entry)| {
            let (occurrences, terminated_count) =
                counts.get(key.as_str()).copied().unwrap_or_default();
            KeywordRisk {
                term: entry.term.clone(),
                risk_level: entry.risk_level,
                avg_tfidf_freq: entry.avg_tfidf_freq,
                occurrences,
                terminated_count,
            }
        })
        .collect();

    risks.sort_by(|a, b| {
        b.risk_level
            .cmp(&a.risk_level)
            .then_with(|| b.avg_tfidf_freq.total_cmp(&a.avg_tfidf_freq))
            .then_with(|| a.term.cmp(&b.term))
    });
    risks
}
