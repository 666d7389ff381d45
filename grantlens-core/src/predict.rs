//! What-if termination risk for a hypothetical grant profile.
//!
//! The predictor applies the same heuristic deltas the synthetic scorer uses
//! for structural and language factors, without keyword or agency terms, so
//! that a user can see how each attribute moves the estimate.

use crate::error::{GrantError, Result};
use crate::grant::{EARLY_CAREER_YEARS, Gender, Grant, PrestigeTier};
use serde::{Deserialize, Serialize};

pub const BASE_RATE: f64 = 0.15;

/// Experience above which a PI counts as senior, in years.
pub const SENIOR_CAREER_YEARS: u32 = 15;

/// Inputs to the predictor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantProfile {
    pub gender: Gender,
    pub prestige: PrestigeTier,
    pub experience: u32,
    pub sentiment: f64,
    pub complexity: f64,
    pub readability: f64,
}

impl Default for GrantProfile {
    fn default() -> Self {
        Self {
            gender: Gender::Male,
            prestige: PrestigeTier::Medium,
            experience: 10,
            sentiment: 0.5,
            complexity: 0.5,
            readability: 60.0,
        }
    }
}

impl GrantProfile {
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("sentiment", self.sentiment, -1.0, 1.0),
            ("complexity", self.complexity, 0.0, 1.0),
            ("readability", self.readability, 0.0, 100.0),
        ];
        for (name, value, lo, hi) in checks {
            if !(lo..=hi).contains(&value) {
                return Err(GrantError::invalid_input(format!(
                    "{name} = {value} is outside [{lo}, {hi}]"
                )));
            }
        }
        Ok(())
    }
}

impl From<&Grant> for GrantProfile {
    fn from(grant: &Grant) -> Self {
        Self {
            gender: grant.gender,
            prestige: grant.institution_prestige,
            experience: grant.pi_experience,
            sentiment: grant.sentiment,
            complexity: grant.language_complexity,
            readability: grant.readability_score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLabel {
    #[serde(rename = "Low Risk")]
    Low,
    #[serde(rename = "Medium Risk")]
    Medium,
    #[serde(rename = "High Risk")]
    High,
}

impl RiskLabel {
    /// Low below 0.2, Medium below 0.4, High otherwise.
    pub fn from_probability(probability: f64) -> Self {
        if probability < 0.2 {
            RiskLabel::Low
        } else if probability < 0.4 {
            RiskLabel::Medium
        } else {
            RiskLabel::High
        }
    }
}

/// An attribute that raised the estimate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskFactor {
    pub factor: String,
    /// Contribution in percentage points.
    pub impact: f64,
}

/// Radar-chart view of a profile, each axis in [0, 100].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProfileScores {
    pub experience: f64,
    pub sentiment: f64,
    pub readability: f64,
    pub simplicity: f64,
    pub prestige: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfilePrediction {
    pub probability: f64,
    pub label: RiskLabel,
    pub risk_factors: Vec<RiskFactor>,
    pub scores: ProfileScores,
}

/// Relative importance of each model feature, in percent.
pub const FEATURE_IMPORTANCE: [(&str, f64); 7] = [
    ("Institution Prestige", 24.0),
    ("PI Experience", 18.0),
    ("Language Complexity", 16.0),
    ("Gender", 14.0),
    ("Sentiment", 12.0),
    ("Readability", 10.0),
    ("Technical Density", 6.0),
];

pub fn predict_profile(profile: &GrantProfile) -> ProfilePrediction {
    let mut probability = BASE_RATE;
    let mut risk_factors = Vec::new();
    let mut add = |factor: &str, delta: f64| {
        probability += delta;
        if delta > 0.0 {
            risk_factors.push(RiskFactor {
                factor: factor.to_string(),
                impact: (delta * 100.0).round(),
            });
        }
    };

    if profile.gender == Gender::Female {
        add("Gender Bias", 0.08);
    }
    match profile.prestige {
        PrestigeTier::Low => add("Institution Prestige", 0.12),
        PrestigeTier::Medium => add("Institution Prestige", 0.05),
        PrestigeTier::High => {}
    }
    if profile.experience < EARLY_CAREER_YEARS {
        add("Early Career", 0.10);
    } else if profile.experience > SENIOR_CAREER_YEARS {
        add("Senior PI", -0.05);
    }
    if profile.sentiment < 0.2 {
        add("Negative Sentiment", 0.06);
    }
    if profile.complexity > 0.75 {
        add("High Complexity", 0.07);
    }
    if profile.readability < 50.0 {
        add("Low Readability", 0.05);
    }

    let probability = probability.clamp(0.0, 1.0);
    ProfilePrediction {
        probability,
        label: RiskLabel::from_probability(probability),
        risk_factors,
        scores: profile_scores(profile),
    }
}

fn profile_scores(profile: &GrantProfile) -> ProfileScores {
    ProfileScores {
        experience: (profile.experience as f64 / 25.0 * 100.0).min(100.0),
        sentiment: ((profile.sentiment + 0.5) * 100.0).clamp(0.0, 100.0),
        readability: profile.readability.clamp(0.0, 100.0),
        simplicity: (1.0 - profile.complexity) * 100.0,
        prestige: match profile.prestige {
            PrestigeTier::High => 100.0,
            PrestigeTier::Medium => 60.0,
            PrestigeTier::Low => 20.0,
        },
    }
}
