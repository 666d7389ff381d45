//! Metadata breakdowns: outcomes and mean probability by field, year,
//! agency and award size.

use crate::adjust::ScoredRecord;
use crate::grant::Grant;
use crate::stats::mean;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcomes and mean probability for the records sharing one value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub key: String,
    pub count: usize,
    pub terminated: usize,
    pub active: usize,
    /// Mean termination probability in percent.
    pub avg_probability_pct: f64,
}

/// An award-amount range, `min` inclusive and `max` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AmountBin {
    pub label: &'static str,
    pub min: f64,
    pub max: Option<f64>,
}

impl AmountBin {
    pub fn contains(&self, amount: f64) -> bool {
        amount >= self.min && self.max.is_none_or(|max| amount < max)
    }
}

pub const AMOUNT_BINS: [AmountBin; 4] = [
    AmountBin {
        label: "$0-500K",
        min: 0.0,
        max: Some(500_000.0),
    },
    AmountBin {
        label: "$500K-1M",
        min: 500_000.0,
        max: Some(1_000_000.0),
    },
    AmountBin {
        label: "$1M-1.5M",
        min: 1_000_000.0,
        max: Some(1_500_000.0),
    },
    AmountBin {
        label: "$1.5M+",
        min: 1_500_000.0,
        max: None,
    },
];

/// Mean probability and size of one award-amount bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AmountBreakdown {
    pub range: String,
    pub count: usize,
    pub avg_probability_pct: f64,
}

/// Every breakdown the metadata panel shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataBreakdown {
    pub by_field: Vec<CategoryBreakdown>,
    pub by_year: Vec<CategoryBreakdown>,
    pub by_agency: Vec<CategoryBreakdown>,
    pub by_amount: Vec<AmountBreakdown>,
}

#[derive(Default)]
struct Bucket {
    count: usize,
    terminated: usize,
    probability_sum: f64,
}

fn group_by<R, K, F>(records: &[R], use_adjusted: bool, key: F) -> Vec<CategoryBreakdown>
where
    R: ScoredRecord,
    K: Ord + ToString,
    F: Fn(&Grant) -> K,
{
    let mut buckets: BTreeMap<K, Bucket> = BTreeMap::new();
    for record in records {
        let grant = record.grant();
        let bucket = buckets.entry(key(grant)).or_default();
        bucket.count += 1;
        bucket.probability_sum += record.probability(use_adjusted);
        if grant.terminated {
            bucket.terminated += 1;
        }
    }
    buckets
        .into_iter()
        .map(|(key, bucket)| CategoryBreakdown {
            key: key.to_string(),
            count: bucket.count,
            terminated: bucket.terminated,
            active: bucket.count - bucket.terminated,
            avg_probability_pct: mean(bucket.probability_sum, bucket.count) * 100.0,
        })
        .collect()
}

/// One row per research field present in `records`, sorted by field.
pub fn breakdown_by_field<R: ScoredRecord>(
    records: &[R],
    use_adjusted: bool,
) -> Vec<CategoryBreakdown> {
    group_by(records, use_adjusted, |g| g.field.clone())
}

/// One row per award year present in `records`, oldest first.
pub fn breakdown_by_year<R: ScoredRecord>(
    records: &[R],
    use_adjusted: bool,
) -> Vec<CategoryBreakdown> {
    group_by(records, use_adjusted, |g| g.year)
}

/// One row per agency present in `records`, sorted by agency.
pub fn breakdown_by_agency<R: ScoredRecord>(
    records: &[R],
    use_adjusted: bool,
) -> Vec<CategoryBreakdown> {
    group_by(records, use_adjusted, |g| g.agency.clone())
}

/// One row per [`AMOUNT_BINS`] entry, empty bins included.
pub fn breakdown_by_amount<R: ScoredRecord>(
    records: &[R],
    use_adjusted: bool,
) -> Vec<AmountBreakdown> {
    AMOUNT_BINS
        .iter()
        .map(|bin| {
            let (sum, count) = records
                .iter()
                .filter(|r| bin.contains(r.grant().amount))
                .fold((0.0, 0usize), |(sum, count), r| {
                    (sum + r.probability(use_adjusted), count + 1)
                });
            AmountBreakdown {
                range: bin.label.to_string(),
                count,
                avg_probability_pct: mean(sum, count) * 100.0,
            }
        })
        .collect()
}

pub fn metadata_breakdown<R: ScoredRecord>(records: &[R], use_adjusted: bool) -> MetadataBreakdown {
    MetadataBreakdown {
        by_field: breakdown_by_field(records, use_adjusted),
        by_year: breakdown_by_year(records, use_adjusted),
        by_agency: breakdown_by_agency(records, use_adjusted),
        by_amount: breakdown_by_amount(records, use_adjusted),
    }
}
