//! Record sources: synthesis, grant-shaped files, and metadata-joined files.

use crate::config::SourceConfig;
use crate::data::read_json;
use crate::data::synthetic::generate_grants;
use crate::data::validate::ensure_valid;
use crate::error::{GrantError, Result};
use crate::grant::{BiasCategory, BiasFlag, Gender, Grant, PrestigeTier, Race};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

pub const UNTITLED_PROJECT: &str = "Untitled Project";
pub const UNKNOWN_RECIPIENT: &str = "Unknown Recipient";
pub const UNKNOWN_AGENCY: &str = "Unknown Agency";
pub const UNKNOWN_STATUS: &str = "Unknown";

/// Information about a record source, for logging and reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub source_type: String,
    pub location: String,
}

/// Trait for producing the working set of grant records.
pub trait GrantSource {
    /// Produce the ordered record sequence.
    fn load(&self) -> Result<Vec<Grant>>;

    /// Describe this source.
    fn source_info(&self) -> SourceInfo;
}

// ---------------------------------------------------------------------------
// SyntheticSource
// ---------------------------------------------------------------------------

/// Procedurally generated records.
///
/// Without a seed every load draws from OS entropy and produces a different
/// dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticSource {
    pub count: usize,
    pub seed: Option<u64>,
}

impl GrantSource for SyntheticSource {
    fn load(&self) -> Result<Vec<Grant>> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(generate_grants(self.count, &mut rng))
    }

    fn source_info(&self) -> SourceInfo {
        let location = match self.seed {
            Some(seed) => format!("{} records, seed {seed}", self.count),
            None => format!("{} records, unseeded", self.count),
        };
        SourceInfo {
            source_type: "synthetic".to_string(),
            location,
        }
    }
}

// ---------------------------------------------------------------------------
// GrantFileSource
// ---------------------------------------------------------------------------

/// A JSON array of fully grant-shaped records.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantFileSource {
    pub path: PathBuf,
}

impl GrantSource for GrantFileSource {
    fn load(&self) -> Result<Vec<Grant>> {
        let grants: Vec<Grant> = read_json(&self.path)?;
        ensure_valid(&grants)?;
        tracing::info!(
            path = %self.path.display(),
            count = grants.len(),
            "loaded grant records"
        );
        Ok(grants)
    }

    fn source_info(&self) -> SourceInfo {
        SourceInfo {
            source_type: "grants".to_string(),
            location: self.path.display().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// JoinedSource
// ---------------------------------------------------------------------------

/// A scored record before the metadata join: grant-shaped, minus the
/// project details that live in the metadata table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGrantRecord {
    #[serde(alias = "award_number")]
    pub award_number: String,
    pub field: String,
    pub year: i32,
    pub gender: Gender,
    pub race: Race,
    pub institution_prestige: PrestigeTier,
    pub pi_experience: u32,
    pub sentiment: f64,
    pub language_complexity: f64,
    pub technical_term_density: f64,
    pub readability_score: f64,
    pub proposal_length: u32,
    #[serde(alias = "y_true", deserialize_with = "deserialize_flag")]
    pub terminated: bool,
    #[serde(alias = "y_prob")]
    pub termination_probability: f64,
    #[serde(
        default,
        alias = "y_pred",
        deserialize_with = "deserialize_optional_flag"
    )]
    pub predicted_label: Option<bool>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub bias_flags: Vec<BiasFlag>,
}

/// One row of the project metadata table. Any field but the key may be
/// absent or null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub award_number: String,
    #[serde(default)]
    pub project_title: Option<String>,
    #[serde(default)]
    pub recipient_name: Option<String>,
    #[serde(default)]
    pub awarding_office: Option<String>,
    #[serde(default)]
    pub award_amount: Option<f64>,
    #[serde(default)]
    pub grant_status: Option<String>,
    /// Comma-separated topic labels, e.g. `"race, gender"`.
    #[serde(default)]
    pub bias_flags: Option<String>,
}

impl ProjectMetadata {
    /// Topic categories named by `bias_flags`. Unrecognized labels are skipped.
    pub fn topic_tags(&self) -> Vec<BiasCategory> {
        let Some(raw) = self.bias_flags.as_deref() else {
            return Vec::new();
        };
        let mut tags = Vec::new();
        for label in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match label.parse::<BiasCategory>() {
                Ok(category) if !tags.contains(&category) => tags.push(category),
                Ok(_) => {}
                Err(_) => {
                    tracing::debug!(
                        award = %self.award_number,
                        label,
                        "skipping unknown bias flag label"
                    );
                }
            }
        }
        tags
    }
}

/// Left join `records` against `metadata` on award number.
///
/// Records without a metadata row keep their scores and receive the
/// placeholders `"Untitled Project"`, `"Unknown Recipient"`,
/// `"Unknown Agency"`, amount 0 and status `"Unknown"`. Fields missing from
/// a matched row are filled the same way.
///
/// Fails when a metadata row has a blank award number.
pub fn join_metadata(
    records: Vec<RawGrantRecord>,
    metadata: &[ProjectMetadata],
) -> Result<Vec<Grant>> {
    let mut index: HashMap<&str, &ProjectMetadata> = HashMap::with_capacity(metadata.len());
    for (row_index, row) in metadata.iter().enumerate() {
        if row.award_number.trim().is_empty() {
            return Err(GrantError::join(format!(
                "metadata row {row_index} has no award number"
            )));
        }
        if index.insert(row.award_number.as_str(), row).is_some() {
            tracing::warn!(
                award = %row.award_number,
                "duplicate metadata row, keeping the last one"
            );
        }
    }

    let mut unmatched = 0usize;
    let grants: Vec<Grant> = records
        .into_iter()
        .map(|raw| {
            let meta = index.get(raw.award_number.as_str()).copied();
            if meta.is_none() {
                unmatched += 1;
            }
            build_grant(raw, meta)
        })
        .collect();

    if unmatched > 0 {
        tracing::warn!(
            unmatched,
            total = grants.len(),
            "records without metadata received placeholder values"
        );
    }
    Ok(grants)
}

fn build_grant(raw: RawGrantRecord, meta: Option<&ProjectMetadata>) -> Grant {
    let text = |value: Option<&Option<String>>, placeholder: &str| {
        value
            .and_then(|v| v.as_deref())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .unwrap_or(placeholder)
            .to_string()
    };

    Grant {
        title: text(meta.map(|m| &m.project_title), UNTITLED_PROJECT),
        recipient: text(meta.map(|m| &m.recipient_name), UNKNOWN_RECIPIENT),
        agency: text(meta.map(|m| &m.awarding_office), UNKNOWN_AGENCY),
        status: text(meta.map(|m| &m.grant_status), UNKNOWN_STATUS),
        amount: meta.and_then(|m| m.award_amount).unwrap_or(0.0),
        topic_tags: meta.map(ProjectMetadata::topic_tags).unwrap_or_default(),
        id: raw.award_number,
        field: raw.field,
        year: raw.year,
        gender: raw.gender,
        race: raw.race,
        institution_prestige: raw.institution_prestige,
        pi_experience: raw.pi_experience,
        sentiment: raw.sentiment,
        language_complexity: raw.language_complexity,
        technical_term_density: raw.technical_term_density,
        readability_score: raw.readability_score,
        proposal_length: raw.proposal_length,
        terminated: raw.terminated,
        termination_probability: raw.termination_probability,
        keywords: raw.keywords,
        bias_flags: raw.bias_flags,
        predicted_label: raw.predicted_label,
    }
}

/// Scored records from one file joined against a metadata table from another.
#[derive(Debug, Clone, PartialEq)]
pub struct JoinedSource {
    pub records: PathBuf,
    pub metadata: PathBuf,
}

impl GrantSource for JoinedSource {
    fn load(&self) -> Result<Vec<Grant>> {
        let records: Vec<RawGrantRecord> = read_json(&self.records)?;
        let metadata: Vec<ProjectMetadata> = read_json(&self.metadata)?;
        let grants = join_metadata(records, &metadata)?;
        ensure_valid(&grants)?;
        tracing::info!(
            records = %self.records.display(),
            metadata = %self.metadata.display(),
            count = grants.len(),
            "loaded and joined grant records"
        );
        Ok(grants)
    }

    fn source_info(&self) -> SourceInfo {
        SourceInfo {
            source_type: "joined".to_string(),
            location: format!(
                "{} + {}",
                self.records.display(),
                self.metadata.display()
            ),
        }
    }
}

/// Build the source named by `config`.
pub fn source_from_config(config: &SourceConfig) -> Box<dyn GrantSource> {
    match config {
        SourceConfig::Synthetic { count, seed } => Box::new(SyntheticSource {
            count: *count,
            seed: *seed,
        }),
        SourceConfig::Grants { path } => Box::new(GrantFileSource { path: path.clone() }),
        SourceConfig::Joined { records, metadata } => Box::new(JoinedSource {
            records: records.clone(),
            metadata: metadata.clone(),
        }),
    }
}

/// Produce the working record set for `config`.
pub fn load_records(config: &SourceConfig) -> Result<Vec<Grant>> {
    let source = source_from_config(config);
    let info = source.source_info();
    tracing::debug!(source = %info.source_type, location = %info.location, "loading records");
    source.load()
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagValue {
    Bool(bool),
    Int(i64),
}

impl From<FlagValue> for bool {
    fn from(value: FlagValue) -> Self {
        match value {
            FlagValue::Bool(b) => b,
            FlagValue::Int(i) => i != 0,
        }
    }
}

/// Accept `true`/`false` or the 0/1 labels written by model exports.
fn deserialize_flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    FlagValue::deserialize(deserializer).map(bool::from)
}

fn deserialize_optional_flag<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<bool>, D::Error> {
    Option::<FlagValue>::deserialize(deserializer).map(|v| v.map(bool::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::Severity;
    use pretty_assertions::assert_eq;

    fn raw(award: &str) -> RawGrantRecord {
        RawGrantRecord {
            award_number: award.to_string(),
            field: "Medicine".to_string(),
            year: 2023,
            gender: Gender::Female,
            race: Race::Minority,
            institution_prestige: PrestigeTier::Low,
            pi_experience: 3,
            sentiment: 0.1,
            language_complexity: 0.6,
            technical_term_density: 0.4,
            readability_score: 55.0,
            proposal_length: 18,
            terminated: true,
            termination_probability: 0.61,
            predicted_label: Some(true),
            keywords: vec!["vaccine".to_string()],
            bias_flags: vec![BiasFlag {
                category: BiasCategory::Gender,
                severity: Severity::Moderate,
                impact: 8.0,
            }],
        }
    }

    #[test]
    fn test_join_matched_record() {
        let metadata = vec![ProjectMetadata {
            award_number: "R01-1".into(),
            project_title: Some("Vaccine Uptake in Rural Clinics".into()),
            recipient_name: Some("State University".into()),
            awarding_office: Some("NIH".into()),
            award_amount: Some(750_000.0),
            grant_status: Some("Terminated".into()),
            bias_flags: Some("race, gender, equity".into()),
        }];
        let grants = join_metadata(vec![raw("R01-1")], &metadata).unwrap();
        assert_eq!(grants.len(), 1);
        let g = &grants[0];
        assert_eq!(g.id, "R01-1");
        assert_eq!(g.title, "Vaccine Uptake in Rural Clinics");
        assert_eq!(g.recipient, "State University");
        assert_eq!(g.agency, "NIH");
        assert_eq!(g.amount, 750_000.0);
        assert_eq!(g.status, "Terminated");
        assert_eq!(g.topic_tags, vec![BiasCategory::Race, BiasCategory::Gender]);
        assert_eq!(g.termination_probability, 0.61);
        assert_eq!(g.predicted_label, Some(true));
    }

    #[test]
    fn test_join_missing_metadata_uses_placeholders() {
        let grants = join_metadata(vec![raw("R01-9")], &[]).unwrap();
        let g = &grants[0];
        assert_eq!(g.title, UNTITLED_PROJECT);
        assert_eq!(g.recipient, UNKNOWN_RECIPIENT);
        assert_eq!(g.agency, UNKNOWN_AGENCY);
        assert_eq!(g.amount, 0.0);
        assert_eq!(g.status, UNKNOWN_STATUS);
        assert!(g.topic_tags.is_empty());
        assert_eq!(g.bias_flags.len(), 1);
    }

    #[test]
    fn test_join_partial_metadata_row() {
        let metadata = vec![ProjectMetadata {
            award_number: "R01-2".into(),
            project_title: Some("  ".into()),
            awarding_office: Some("NSF".into()),
            ..Default::default()
        }];
        let grants = join_metadata(vec![raw("R01-2")], &metadata).unwrap();
        assert_eq!(grants[0].title, UNTITLED_PROJECT);
        assert_eq!(grants[0].agency, "NSF");
        assert_eq!(grants[0].amount, 0.0);
        assert_eq!(grants[0].status, UNKNOWN_STATUS);
    }

    #[test]
    fn test_join_preserves_record_order() {
        let grants = join_metadata(vec![raw("C"), raw("A"), raw("B")], &[]).unwrap();
        let ids: Vec<_> = grants.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, vec!["C", "A", "B"]);
    }

    #[test]
    fn test_join_duplicate_metadata_keeps_last_row() {
        let metadata = vec![
            ProjectMetadata {
                award_number: "R01-7".into(),
                project_title: Some("First Filing".into()),
                awarding_office: Some("NIH".into()),
                award_amount: Some(100_000.0),
                ..Default::default()
            },
            ProjectMetadata {
                award_number: "R01-7".into(),
                project_title: Some("Amended Filing".into()),
                bias_flags: Some("climate".into()),
                ..Default::default()
            },
        ];
        let grants = join_metadata(vec![raw("R01-7")], &metadata).unwrap();
        assert_eq!(grants.len(), 1);
        let g = &grants[0];
        assert_eq!(g.title, "Amended Filing");
        assert_eq!(g.agency, UNKNOWN_AGENCY);
        assert_eq!(g.amount, 0.0);
        assert_eq!(g.topic_tags, vec![BiasCategory::Climate]);
    }

    #[test]
    fn test_join_rejects_blank_metadata_key() {
        let metadata = vec![ProjectMetadata::default()];
        let err = join_metadata(vec![raw("R01-1")], &metadata).unwrap_err();
        assert!(matches!(err, GrantError::Join(_)));
    }

    #[test]
    fn test_joined_source_reads_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let records = dir.path().join("records.json");
        let metadata = dir.path().join("metadata.json");
        std::fs::write(&records, serde_json::to_string(&vec![raw("R01-5")]).unwrap()).unwrap();
        std::fs::write(
            &metadata,
            r#"[{
                "award_number": "R01-5",
                "project_title": "Climate Adaptation",
                "award_amount": null,
                "bias_flags": "climate change"
            }]"#,
        )
        .unwrap();

        let source = JoinedSource { records, metadata };
        let grants = source.load().unwrap();
        assert_eq!(grants[0].title, "Climate Adaptation");
        assert_eq!(grants[0].amount, 0.0);
        assert_eq!(grants[0].topic_tags, vec![BiasCategory::Climate]);
    }

    #[test]
    fn test_grant_file_source_rejects_invalid_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grants.json");
        let mut bad = crate::grant::fixtures::grant("G1");
        bad.termination_probability = 2.0;
        std::fs::write(&path, serde_json::to_string(&vec![bad]).unwrap()).unwrap();
        let err = GrantFileSource { path }.load().unwrap_err();
        assert!(matches!(err, GrantError::InvalidRecord(_)));
    }

    #[test]
    fn test_raw_record_accepts_model_export_labels() {
        let json = serde_json::json!({
            "award_number": "R01-3",
            "field": "Biology",
            "year": 2021,
            "gender": "Male",
            "race": "Non-Minority",
            "institutionPrestige": "Medium",
            "piExperience": 12,
            "sentiment": 0.3,
            "languageComplexity": 0.5,
            "technicalTermDensity": 0.5,
            "readabilityScore": 62.0,
            "proposalLength": 25,
            "y_true": 1,
            "y_prob": 0.72,
            "y_pred": 0
        });
        let record: RawGrantRecord = serde_json::from_value(json).unwrap();
        assert!(record.terminated);
        assert_eq!(record.termination_probability, 0.72);
        assert_eq!(record.predicted_label, Some(false));
        assert!(record.keywords.is_empty());
    }

    #[test]
    fn test_synthetic_source_is_seedable() {
        let source = SyntheticSource {
            count: 10,
            seed: Some(3),
        };
        assert_eq!(source.load().unwrap(), source.load().unwrap());
        assert_eq!(source.source_info().source_type, "synthetic");
    }

    #[test]
    fn test_load_records_dispatches_on_config() {
        let grants = load_records(&SourceConfig::Synthetic {
            count: 12,
            seed: Some(1),
        })
        .unwrap();
        assert_eq!(grants.len(), 12);
    }
}
