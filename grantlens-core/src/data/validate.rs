//! Record validation for externally supplied datasets.

use crate::error::{GrantError, Result};
use crate::grant::Grant;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A data quality report over a loaded record set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub total_records: usize,
    pub issues: Vec<RecordIssue>,
    pub duplicate_ids: usize,
    /// Fraction of records without any issue, in [0, 1].
    pub overall_score: f64,
    pub passed_gate: bool,
}

/// A problem found in one record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordIssue {
    pub record_id: String,
    pub row_index: usize,
    pub kind: IssueKind,
    pub detail: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    EmptyIdentifier,
    DuplicateIdentifier,
    ProbabilityOutOfRange,
    ScoreOutOfRange,
    NegativeAmount,
    InvalidLength,
    RepeatedKeyword,
}

/// Validate every record and produce a quality report.
pub fn validate_grants(grants: &[Grant]) -> DataQualityReport {
    let mut issues = Vec::new();
    let mut seen_ids = HashSet::new();
    let mut duplicate_ids = 0;

    for (row_index, grant) in grants.iter().enumerate() {
        let mut push = |kind: IssueKind, detail: String| {
            issues.push(RecordIssue {
                record_id: grant.id.clone(),
                row_index,
                kind,
                detail,
            });
        };

        if grant.id.trim().is_empty() {
            push(IssueKind::EmptyIdentifier, "record has no identifier".into());
        } else if !seen_ids.insert(grant.id.as_str()) {
            duplicate_ids += 1;
            push(
                IssueKind::DuplicateIdentifier,
                format!("identifier {} appears more than once", grant.id),
            );
        }

        if !(0.0..=1.0).contains(&grant.termination_probability) {
            push(
                IssueKind::ProbabilityOutOfRange,
                format!(
                    "termination probability {} outside [0, 1]",
                    grant.termination_probability
                ),
            );
        }

        let scores = [
            ("sentiment", grant.sentiment, -1.0, 1.0),
            ("language complexity", grant.language_complexity, 0.0, 1.0),
            ("technical term density", grant.technical_term_density, 0.0, 1.0),
            ("readability", grant.readability_score, 0.0, 100.0),
        ];
        for (name, value, lo, hi) in scores {
            if !(lo..=hi).contains(&value) {
                push(
                    IssueKind::ScoreOutOfRange,
                    format!("{name} {value} outside [{lo}, {hi}]"),
                );
            }
        }

        if grant.amount.is_nan() || grant.amount < 0.0 {
            push(
                IssueKind::NegativeAmount,
                format!("award amount {} is negative", grant.amount),
            );
        }

        if grant.proposal_length == 0 {
            push(IssueKind::InvalidLength, "proposal length is zero pages".into());
        }

        let mut seen_keywords = HashSet::new();
        for keyword in &grant.keywords {
            if !seen_keywords.insert(keyword.as_str()) {
                push(
                    IssueKind::RepeatedKeyword,
                    format!("keyword {keyword:?} repeated"),
                );
            }
        }
    }

    let total_records = grants.len();
    let flagged: HashSet<usize> = issues.iter().map(|i| i.row_index).collect();
    let overall_score = if total_records > 0 {
        1.0 - flagged.len() as f64 / total_records as f64
    } else {
        1.0
    };

    DataQualityReport {
        total_records,
        passed_gate: issues.is_empty(),
        issues,
        duplicate_ids,
        overall_score,
    }
}

/// Fail fast when any record is malformed.
pub fn ensure_valid(grants: &[Grant]) -> Result<()> {
    let report = validate_grants(grants);
    if report.passed_gate {
        return Ok(());
    }
    for issue in &report.issues {
        tracing::warn!(
            record = %issue.record_id,
            row = issue.row_index,
            kind = ?issue.kind,
            "{}",
            issue.detail
        );
    }
    let first = &report.issues[0];
    Err(GrantError::invalid_record(format!(
        "{} (row {}): {}; {} issue(s) in total",
        first.record_id,
        first.row_index,
        first.detail,
        report.issues.len()
    )))
}
