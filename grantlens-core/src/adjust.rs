//! Bias-adjustment stage: a linear, attribute-gated correction of each
//! grant's termination probability.
//!
//! Adjustment never touches the source records. It produces
//! [`AdjustedGrant`] views that pair a borrowed [`Grant`] with its corrected
//! probability.

use crate::error::{GrantError, Result};
use crate::grant::{Gender, Grant, PrestigeTier, Race};
use serde::{Deserialize, Serialize};

/// Upper bound of the recognized adjustment range, in percentage points.
pub const MAX_ADJUSTMENT: f64 = 20.0;

/// User-controlled correction magnitudes, in percentage points.
///
/// Each magnitude is subtracted from matching grants only:
/// - `gender_bias` from grants with a female PI
/// - `race_bias` from grants with a minority PI
/// - `institution_bias` from grants at low-prestige institutions
/// - `experience_bias` from grants whose PI has under five years of experience
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BiasAdjustments {
    #[serde(default)]
    pub gender_bias: f64,
    #[serde(default)]
    pub race_bias: f64,
    #[serde(default)]
    pub institution_bias: f64,
    #[serde(default)]
    pub experience_bias: f64,
}

impl BiasAdjustments {
    pub fn is_zero(&self) -> bool {
        self.gender_bias == 0.0
            && self.race_bias == 0.0
            && self.institution_bias == 0.0
            && self.experience_bias == 0.0
    }

    /// Check that every magnitude lies in `[0, MAX_ADJUSTMENT]`.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("gender_bias", self.gender_bias),
            ("race_bias", self.race_bias),
            ("institution_bias", self.institution_bias),
            ("experience_bias", self.experience_bias),
        ];
        for (name, value) in fields {
            if !(0.0..=MAX_ADJUSTMENT).contains(&value) {
                return Err(GrantError::invalid_input(format!(
                    "{name} = {value} is outside [0, {MAX_ADJUSTMENT}]"
                )));
            }
        }
        Ok(())
    }

    /// Corrected probability for one grant, clamped to [0, 1].
    pub fn adjusted_probability(&self, grant: &Grant) -> f64 {
        let mut probability = grant.termination_probability;
        if grant.gender == Gender::Female {
            probability -= self.gender_bias * 0.01;
        }
        if grant.race == Race::Minority {
            probability -= self.race_bias * 0.01;
        }
        if grant.institution_prestige == PrestigeTier::Low {
            probability -= self.institution_bias * 0.01;
        }
        if grant.is_early_career() {
            probability -= self.experience_bias * 0.01;
        }
        probability.clamp(0.0, 1.0)
    }
}

/// A grant paired with its bias-adjusted termination probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustedGrant<'a> {
    #[serde(flatten)]
    pub grant: &'a Grant,
    #[serde(rename = "adjustedTerminationProb")]
    pub adjusted_probability: f64,
}

impl<'a> AdjustedGrant<'a> {
    pub fn new(grant: &'a Grant, adjustments: &BiasAdjustments) -> Self {
        Self {
            grant,
            adjusted_probability: adjustments.adjusted_probability(grant),
        }
    }
}

/// Apply `adjustments` to every record, preserving length and order.
pub fn apply_adjustments<'a, R>(
    records: &'a [R],
    adjustments: &BiasAdjustments,
) -> Vec<AdjustedGrant<'a>>
where
    R: ScoredRecord,
{
    let adjusted: Vec<AdjustedGrant<'a>> = records
        .iter()
        .map(|record| AdjustedGrant::new(record.grant(), adjustments))
        .collect();
    tracing::debug!(
        records = adjusted.len(),
        zero = adjustments.is_zero(),
        "applied bias adjustments"
    );
    adjusted
}

/// Anything the aggregation stage can read a grant and probability from.
pub trait ScoredRecord {
    fn grant(&self) -> &Grant;

    /// Adjusted probability, when this record went through the adjustment stage.
    fn adjusted_probability(&self) -> Option<f64> {
        None
    }

    /// Probability to aggregate: the adjusted one when requested and present,
    /// the model's termination probability otherwise.
    fn probability(&self, use_adjusted: bool) -> f64 {
        match self.adjusted_probability() {
            Some(adjusted) if use_adjusted => adjusted,
            _ => self.grant().termination_probability,
        }
    }
}

impl ScoredRecord for Grant {
    fn grant(&self) -> &Grant {
        self
    }
}

impl ScoredRecord for &Grant {
    fn grant(&self) -> &Grant {
        self
    }
}

impl ScoredRecord for AdjustedGrant<'_> {
    fn grant(&self) -> &Grant {
        self.grant
    }

    fn adjusted_probability(&self) -> Option<f64> {
        Some(self.adjusted_probability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::fixtures::grant;

    #[test]
    fn test_zero_adjustment_is_identity() {
        let mut g = grant("G1");
        g.gender = Gender::Female;
        g.race = Race::Minority;
        g.institution_prestige = PrestigeTier::Low;
        g.pi_experience = 2;
        g.termination_probability = 0.47;
        let adjusted = BiasAdjustments::default().adjusted_probability(&g);
        assert_eq!(adjusted, 0.47);
    }

    #[test]
    fn test_only_matching_attributes_are_adjusted() {
        let mut g = grant("G1");
        g.gender = Gender::Female;
        g.termination_probability = 0.5;
        let adjustments = BiasAdjustments {
            gender_bias: 10.0,
            race_bias: 10.0,
            institution_bias: 10.0,
            experience_bias: 10.0,
        };
        assert!((adjustments.adjusted_probability(&g) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_adjustment_clamps_at_zero() {
        let mut g = grant("G1");
        g.institution_prestige = PrestigeTier::Low;
        g.pi_experience = 3;
        g.termination_probability = 0.03;
        let adjustments = BiasAdjustments {
            institution_bias: 20.0,
            experience_bias: 20.0,
            ..Default::default()
        };
        assert_eq!(adjustments.adjusted_probability(&g), 0.0);
    }

    #[test]
    fn test_apply_preserves_order_and_source() {
        let mut a = grant("A");
        a.gender = Gender::Female;
        let b = grant("B");
        let records = vec![a.clone(), b.clone()];
        let adjustments = BiasAdjustments {
            gender_bias: 5.0,
            ..Default::default()
        };
        let adjusted = apply_adjustments(&records, &adjustments);
        assert_eq!(adjusted.len(), 2);
        assert_eq!(adjusted[0].grant.id, "A");
        assert_eq!(adjusted[1].grant.id, "B");
        assert!((adjusted[0].adjusted_probability - 0.15).abs() < 1e-12);
        assert_eq!(adjusted[1].adjusted_probability, 0.2);
        assert_eq!(records[0], a);
        assert_eq!(records[1], b);
    }

    #[test]
    fn test_probability_selection() {
        let g = grant("G1");
        let view = AdjustedGrant {
            grant: &g,
            adjusted_probability: 0.05,
        };
        assert_eq!(view.probability(true), 0.05);
        assert_eq!(view.probability(false), 0.2);
        assert_eq!(g.probability(true), 0.2);
    }

    #[test]
    fn test_validate_range() {
        assert!(BiasAdjustments::default().validate().is_ok());
        let too_high = BiasAdjustments {
            experience_bias: 20.5,
            ..Default::default()
        };
        assert!(too_high.validate().is_err());
        let negative = BiasAdjustments {
            gender_bias: -1.0,
            ..Default::default()
        };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn test_adjusted_grant_serializes_flat() {
        let g = grant("G1");
        let view = AdjustedGrant {
            grant: &g,
            adjusted_probability: 0.1,
        };
        let json = serde_json::to_value(view).unwrap();
        assert_eq!(json["id"], serde_json::json!("G1"));
        assert_eq!(json["adjustedTerminationProb"], serde_json::json!(0.1));
    }
}
