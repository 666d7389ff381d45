//! Fairness metrics over two-group partitions of the record set.
//!
//! Each tracked attribute splits records into a reference group and a focus
//! group:
//!
//! | attribute     | reference          | focus              |
//! |---------------|--------------------|--------------------|
//! | gender        | Male               | Female             |
//! | race          | Non-Minority       | Minority           |
//! | institution   | High prestige      | Low prestige       |
//! | experience    | 5 or more years    | under 5 years      |
//! | topic flags   | flag absent        | flag present       |
//!
//! Medium-prestige institutions belong to neither institution group.

use crate::adjust::ScoredRecord;
use crate::grant::{BiasCategory, Gender, Grant, PrestigeTier, Race};
use crate::stats::{mean, parity_ratio, rate};
use serde::{Deserialize, Serialize};

/// Ratio per tracked attribute, each in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParityRatios {
    pub gender: f64,
    pub race: f64,
    pub institution: f64,
    pub experience: f64,
    pub mental_health: f64,
    pub lgbtq: f64,
    pub climate: f64,
}

impl ParityRatios {
    fn from_fn(mut f: impl FnMut(BiasCategory) -> f64) -> Self {
        Self {
            gender: f(BiasCategory::Gender),
            race: f(BiasCategory::Race),
            institution: f(BiasCategory::Institution),
            experience: f(BiasCategory::Experience),
            mental_health: f(BiasCategory::MentalHealth),
            lgbtq: f(BiasCategory::Lgbtq),
            climate: f(BiasCategory::Climate),
        }
    }

    pub fn get(&self, category: BiasCategory) -> f64 {
        match category {
            BiasCategory::Gender => self.gender,
            BiasCategory::Race => self.race,
            BiasCategory::Institution => self.institution,
            BiasCategory::Experience => self.experience,
            BiasCategory::MentalHealth => self.mental_health,
            BiasCategory::Lgbtq => self.lgbtq,
            BiasCategory::Climate => self.climate,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (BiasCategory, f64)> + '_ {
        BiasCategory::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

/// Demographic parity and equality of opportunity for every tracked attribute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FairnessMetrics {
    /// Ratio of mean termination probabilities between groups.
    pub demographic_parity: ParityRatios,
    /// Ratio of actual termination rates between groups.
    pub equality_of_opportunity: ParityRatios,
}

/// Size, probability mass and outcomes of one comparison group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub count: usize,
    pub probability_sum: f64,
    pub terminated: usize,
}

impl GroupStats {
    fn add(&mut self, probability: f64, terminated: bool) {
        self.count += 1;
        self.probability_sum += probability;
        if terminated {
            self.terminated += 1;
        }
    }

    /// Mean probability, 0 for an empty group.
    pub fn mean_probability(&self) -> f64 {
        mean(self.probability_sum, self.count)
    }

    /// Actual termination rate, 0 for an empty group.
    pub fn termination_rate(&self) -> f64 {
        rate(self.terminated, self.count)
    }
}

/// Both groups for one attribute and the two ratios between them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupComparison {
    pub category: BiasCategory,
    pub reference: GroupStats,
    pub focus: GroupStats,
    pub demographic_parity: f64,
    pub equality_of_opportunity: f64,
}

/// Which group a grant falls in for `category`: `Some(false)` for the
/// reference group, `Some(true)` for the focus group, `None` for neither.
pub fn in_focus_group(grant: &Grant, category: BiasCategory) -> Option<bool> {
    match category {
        BiasCategory::Gender => Some(grant.gender == Gender::Female),
        BiasCategory::Race => Some(grant.race == Race::Minority),
        BiasCategory::Institution => match grant.institution_prestige {
            PrestigeTier::High => Some(false),
            PrestigeTier::Low => Some(true),
            PrestigeTier::Medium => None,
        },
        BiasCategory::Experience => Some(grant.is_early_career()),
        BiasCategory::MentalHealth | BiasCategory::Lgbtq | BiasCategory::Climate => {
            Some(grant.has_flag(category))
        }
    }
}

/// Partition `records` for `category` and compare the groups.
pub fn compare_groups<R: ScoredRecord>(
    records: &[R],
    category: BiasCategory,
    use_adjusted: bool,
) -> GroupComparison {
    let mut reference = GroupStats::default();
    let mut focus = GroupStats::default();
    for record in records {
        let grant = record.grant();
        let probability = record.probability(use_adjusted);
        match in_focus_group(grant, category) {
            Some(true) => focus.add(probability, grant.terminated),
            Some(false) => reference.add(probability, grant.terminated),
            None => {}
        }
    }
    GroupComparison {
        category,
        reference,
        focus,
        demographic_parity: parity_ratio(reference.mean_probability(), focus.mean_probability()),
        equality_of_opportunity: parity_ratio(
            reference.termination_rate(),
            focus.termination_rate(),
        ),
    }
}

/// Group comparisons for every tracked attribute, in [`BiasCategory::ALL`] order.
pub fn compare_all_groups<R: ScoredRecord>(
    records: &[R],
    use_adjusted: bool,
) -> Vec<GroupComparison> {
    BiasCategory::ALL
        .into_iter()
        .map(|category| compare_groups(records, category, use_adjusted))
        .collect()
}

/// Fairness ratios for every tracked attribute, reading the adjusted
/// probability when `use_adjusted` is set and the records carry one.
///
/// Empty groups contribute a mean and rate of 0, so the result is always
/// defined. Two empty groups compare as equal (1.0); one empty group against
/// a populated one compares as 0.0.
pub fn compute_fairness_metrics<R: ScoredRecord>(
    records: &[R],
    use_adjusted: bool,
) -> FairnessMetrics {
    let comparisons = compare_all_groups(records, use_adjusted);
    let lookup = |category: BiasCategory| {
        comparisons
            .iter()
            .find(|c| c.category == category)
            .copied()
    };
    let metrics = FairnessMetrics {
        demographic_parity: ParityRatios::from_fn(|c| {
            lookup(c).map_or(1.0, |cmp| cmp.demographic_parity)
        }),
        equality_of_opportunity: ParityRatios::from_fn(|c| {
            lookup(c).map_or(1.0, |cmp| cmp.equality_of_opportunity)
        }),
    };
    tracing::debug!(
        records = records.len(),
        use_adjusted,
        gender_parity = metrics.demographic_parity.gender,
        race_parity = metrics.demographic_parity.race,
        "computed fairness metrics"
    );
    metrics
}
