//! Grant record model shared by every stage of the pipeline.
//!
//! Field names serialize in camelCase so that datasets exported for the
//! browser dashboard load without a translation step.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Gender of the principal investigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
}

/// Race/ethnicity grouping of the principal investigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Race {
    Minority,
    #[serde(rename = "Non-Minority")]
    NonMinority,
}

/// Institution prestige tier. Ordered `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrestigeTier {
    Low,
    Medium,
    High,
}

/// Severity tier of a bias flag. Ordered `Low < Moderate < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Moderate,
    High,
}

impl Severity {
    /// Tier for a probability delta: High ≥ 0.10, Moderate ≥ 0.05, Low below.
    pub fn from_delta(delta: f64) -> Self {
        let magnitude = delta.abs();
        if magnitude >= 0.10 {
            Severity::High
        } else if magnitude >= 0.05 {
            Severity::Moderate
        } else {
            Severity::Low
        }
    }
}

/// Category tag of a bias flag: structural attributes and topic signals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BiasCategory {
    Gender,
    Race,
    Institution,
    Experience,
    MentalHealth,
    #[serde(rename = "LGBTQ")]
    Lgbtq,
    Climate,
}

impl BiasCategory {
    pub const ALL: [BiasCategory; 7] = [
        BiasCategory::Gender,
        BiasCategory::Race,
        BiasCategory::Institution,
        BiasCategory::Experience,
        BiasCategory::MentalHealth,
        BiasCategory::Lgbtq,
        BiasCategory::Climate,
    ];

    /// Display label used by the dashboard charts.
    pub fn label(&self) -> &'static str {
        match self {
            BiasCategory::Gender => "Gender",
            BiasCategory::Race => "Race/Ethnicity",
            BiasCategory::Institution => "Institution",
            BiasCategory::Experience => "Experience",
            BiasCategory::MentalHealth => "Mental Health",
            BiasCategory::Lgbtq => "LGBTQ+",
            BiasCategory::Climate => "Climate",
        }
    }
}

impl fmt::Display for BiasCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for BiasCategory {
    type Err = String;

    /// Parses flag labels as they appear in metadata tables and delta files,
    /// e.g. `"race"`, `"race/ethnicity"`, `"mental health/mental disorders"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        let head = normalized.split('/').next().unwrap_or_default().trim();
        match head {
            "gender" => Ok(BiasCategory::Gender),
            "race" | "ethnicity" => Ok(BiasCategory::Race),
            "institution" => Ok(BiasCategory::Institution),
            "experience" => Ok(BiasCategory::Experience),
            "mental health" | "mentalhealth" | "mental_health" => Ok(BiasCategory::MentalHealth),
            "lgbtq" | "lgbtq+" => Ok(BiasCategory::Lgbtq),
            "climate" | "climate change" => Ok(BiasCategory::Climate),
            _ => Err(format!("unknown bias category: {s}")),
        }
    }
}

/// Evidence that a demographic or topical attribute contributed to a grant's
/// termination probability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasFlag {
    #[serde(rename = "type")]
    pub category: BiasCategory,
    pub severity: Severity,
    /// Signed percentage-point contribution to the termination probability.
    pub impact: f64,
}

impl BiasFlag {
    /// Flag for a probability delta, with severity derived from its magnitude.
    pub fn from_delta(category: BiasCategory, delta: f64) -> Self {
        Self {
            category,
            severity: Severity::from_delta(delta),
            impact: delta * 100.0,
        }
    }
}

/// One evaluated funding record. Immutable once loaded or generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub id: String,
    pub title: String,
    pub field: String,
    pub year: i32,
    pub agency: String,
    pub amount: f64,
    #[serde(default = "default_recipient")]
    pub recipient: String,
    #[serde(default = "default_status")]
    pub status: String,
    pub gender: Gender,
    pub race: Race,
    pub institution_prestige: PrestigeTier,
    pub pi_experience: u32,
    pub sentiment: f64,
    pub language_complexity: f64,
    pub technical_term_density: f64,
    pub readability_score: f64,
    pub proposal_length: u32,
    pub terminated: bool,
    pub termination_probability: f64,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub bias_flags: Vec<BiasFlag>,
    /// Topic signals attached from a metadata table rather than the scorer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub topic_tags: Vec<BiasCategory>,
    /// Hard label from the model, when the dataset carries one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_label: Option<bool>,
}

pub(crate) fn default_recipient() -> String {
    "Unknown Recipient".to_string()
}

pub(crate) fn default_status() -> String {
    "Unknown".to_string()
}

impl Grant {
    /// Whether the grant carries a flag or topic tag of the given category.
    pub fn has_flag(&self, category: BiasCategory) -> bool {
        self.bias_flags.iter().any(|f| f.category == category)
            || self.topic_tags.contains(&category)
    }

    /// Whether the PI has fewer than five years of experience.
    pub fn is_early_career(&self) -> bool {
        self.pi_experience < EARLY_CAREER_YEARS
    }
}

/// Experience threshold, in years, below which a PI counts as early career.
pub const EARLY_CAREER_YEARS: u32 = 5;
