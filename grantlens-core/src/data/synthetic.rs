//! Procedural grant synthesis with an embedded termination heuristic.
//!
//! Every attribute is drawn independently and uniformly from its domain.
//! The termination probability starts at a base rate and accumulates fixed
//! deltas gated by attribute values; the outcome is then a Bernoulli draw
//! with that probability. Output is reproducible only when the caller
//! supplies a seeded generator.

use crate::grant::{BiasCategory, BiasFlag, Gender, Grant, PrestigeTier, Race};
use rand::Rng;
use rand::seq::SliceRandom;

pub const FIELDS: &[&str] = &[
    "Medicine",
    "Engineering",
    "Social Sciences",
    "Biology",
    "Physics",
    "Computer Science",
    "Chemistry",
    "Psychology",
];

pub const AGENCIES: &[&str] = &["NIH", "NSF", "DOE", "NASA", "DARPA"];

pub const KEYWORD_POOL: &[&str] = &[
    "mental health",
    "substance use",
    "HIV",
    "pilot study",
    "training",
    "outreach",
    "community health",
    "clinical trial",
    "adolescent",
    "recovery",
    "intervention",
    "machine learning",
    "neural networks",
    "climate change",
    "renewable energy",
    "cancer research",
    "genomics",
    "biomarker",
    "stem cells",
    "vaccine",
    "quantum computing",
    "artificial intelligence",
    "data analysis",
    "algorithm",
    "social impact",
    "equity",
    "diversity",
    "underserved",
    "disparities",
    "education",
    "workforce",
    "innovation",
    "collaboration",
    "interdisciplinary",
    "longitudinal study",
    "randomized control",
    "cohort",
    "epidemiology",
    "protein structure",
    "molecular dynamics",
    "crystallography",
    "synthesis",
    "behavioral",
    "cognitive",
    "neuroimaging",
    "psychotherapy",
];

const TITLE_PREFIXES: &[&str] = &[
    "Understanding",
    "Investigating",
    "Exploring",
    "Developing",
    "Advancing",
    "Novel Approaches to",
    "Comprehensive Study of",
    "Innovative Strategies for",
    "Integrated Framework for",
    "Community-Based",
    "Longitudinal Analysis of",
    "Mechanisms of",
    "Impact of",
    "Efficacy of",
    "Evaluation of",
];

const BASE_RATE: f64 = 0.15;
const MIN_PROBABILITY: f64 = 0.02;
const MAX_PROBABILITY: f64 = 0.85;

/// Attributes drawn for one synthetic record, before scoring.
#[derive(Debug, Clone)]
struct Draw {
    gender: Gender,
    race: Race,
    prestige: PrestigeTier,
    experience: u32,
    sentiment: f64,
    complexity: f64,
    technical_density: f64,
    readability: f64,
    proposal_length: u32,
    field: &'static str,
    year: i32,
    agency: &'static str,
    keywords: Vec<String>,
}

/// Generate `count` grants using `rng` for every random draw.
pub fn generate_grants<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<Grant> {
    let mut grants = Vec::with_capacity(count);
    for index in 0..count {
        grants.push(generate_one(index, rng));
    }
    let terminated = grants.iter().filter(|g| g.terminated).count();
    tracing::info!(count, terminated, "synthesized grant dataset");
    grants
}

fn generate_one<R: Rng + ?Sized>(index: usize, rng: &mut R) -> Grant {
    let draw = draw_attributes(rng);
    let (probability, bias_flags) = score(&draw);
    let terminated = rng.gen_range(0.0..1.0) < probability;
    let title = generate_title(&draw.keywords, draw.field, rng);

    Grant {
        id: format!("G{index:05}"),
        title,
        field: draw.field.to_string(),
        year: draw.year,
        agency: draw.agency.to_string(),
        amount: rng.gen_range(100_000..=2_000_000) as f64,
        recipient: crate::grant::default_recipient(),
        status: if terminated { "Terminated" } else { "Active" }.to_string(),
        gender: draw.gender,
        race: draw.race,
        institution_prestige: draw.prestige,
        pi_experience: draw.experience,
        sentiment: draw.sentiment,
        language_complexity: draw.complexity,
        technical_term_density: draw.technical_density,
        readability_score: draw.readability,
        proposal_length: draw.proposal_length,
        terminated,
        termination_probability: probability,
        keywords: draw.keywords,
        bias_flags,
        topic_tags: Vec::new(),
        predicted_label: None,
    }
}

fn draw_attributes<R: Rng + ?Sized>(rng: &mut R) -> Draw {
    let gender = if rng.gen_range(0..2) == 0 {
        Gender::Male
    } else {
        Gender::Female
    };
    let race = if rng.gen_range(0..2) == 0 {
        Race::Minority
    } else {
        Race::NonMinority
    };
    let prestige = match rng.gen_range(0..3) {
        0 => PrestigeTier::High,
        1 => PrestigeTier::Medium,
        _ => PrestigeTier::Low,
    };
    let keyword_count = rng.gen_range(2..=5);
    let keywords = KEYWORD_POOL
        .choose_multiple(rng, keyword_count)
        .map(|k| k.to_string())
        .collect();

    Draw {
        gender,
        race,
        prestige,
        experience: rng.gen_range(1..=25),
        sentiment: rng.gen_range(-0.3..0.8),
        complexity: rng.gen_range(0.3..0.95),
        technical_density: rng.gen_range(0.2..0.85),
        readability: rng.gen_range(30.0..85.0),
        proposal_length: rng.gen_range(10..=50),
        field: pick(FIELDS, rng),
        year: rng.gen_range(2020..=2024),
        agency: pick(AGENCIES, rng),
        keywords,
    }
}

fn pick<R: Rng + ?Sized>(values: &'static [&'static str], rng: &mut R) -> &'static str {
    values[rng.gen_range(0..values.len())]
}

/// Termination probability and the structural bias flags behind it.
fn score(draw: &Draw) -> (f64, Vec<BiasFlag>) {
    let mut probability = BASE_RATE;
    let mut flags = Vec::new();
    let mut structural = |category: BiasCategory, delta: f64, probability: &mut f64| {
        *probability += delta;
        flags.push(BiasFlag::from_delta(category, delta));
    };

    if draw.gender == Gender::Female {
        structural(BiasCategory::Gender, 0.08, &mut probability);
    }
    if draw.race == Race::Minority {
        structural(BiasCategory::Race, 0.07, &mut probability);
    }
    match draw.prestige {
        PrestigeTier::Low => structural(BiasCategory::Institution, 0.12, &mut probability),
        PrestigeTier::Medium => structural(BiasCategory::Institution, 0.05, &mut probability),
        PrestigeTier::High => {}
    }
    if draw.experience < crate::grant::EARLY_CAREER_YEARS {
        structural(BiasCategory::Experience, 0.10, &mut probability);
    }

    // Language features and keywords shift the score without a flag.
    if draw.sentiment < 0.0 {
        probability += 0.06;
    }
    if draw.complexity > 0.75 {
        probability += 0.07;
    }
    if draw.technical_density > 0.7 {
        probability += 0.04;
    }
    if draw.readability < 50.0 {
        probability += 0.05;
    }

    let has = |keyword: &str| draw.keywords.iter().any(|k| k == keyword);
    if has("mental health") || has("substance use") {
        probability += 0.05;
    }
    if has("pilot study") {
        probability += 0.06;
    }
    if has("HIV") || has("vaccine") {
        probability -= 0.03;
    }
    if has("machine learning") || has("artificial intelligence") {
        probability -= 0.02;
    }

    if draw.proposal_length < 15 {
        probability += 0.03;
    }

    if draw.agency == "DARPA" {
        probability += 0.05;
    }
    if draw.agency == "NIH" && draw.field != "Medicine" && draw.field != "Biology" {
        probability += 0.08;
    }

    (probability.clamp(MIN_PROBABILITY, MAX_PROBABILITY), flags)
}

fn generate_title<R: Rng + ?Sized>(keywords: &[String], field: &str, rng: &mut R) -> String {
    let prefix = pick(TITLE_PREFIXES, rng);
    let main = keywords.first().map(String::as_str).unwrap_or(field);
    format!("{prefix} {} in {field}", capitalize(main))
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grant::Severity;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn neutral_draw() -> Draw {
        Draw {
            gender: Gender::Male,
            race: Race::NonMinority,
            prestige: PrestigeTier::High,
            experience: 10,
            sentiment: 0.5,
            complexity: 0.5,
            technical_density: 0.5,
            readability: 60.0,
            proposal_length: 20,
            field: "Medicine",
            year: 2022,
            agency: "NSF",
            keywords: vec!["genomics".into(), "cohort".into()],
        }
    }

    #[test]
    fn test_neutral_profile_scores_base_rate() {
        let (probability, flags) = score(&neutral_draw());
        assert!((probability - BASE_RATE).abs() < 1e-12);
        assert!(flags.is_empty());
    }

    #[test]
    fn test_structural_flags_and_severity() {
        let draw = Draw {
            gender: Gender::Female,
            race: Race::Minority,
            prestige: PrestigeTier::Medium,
            experience: 2,
            ..neutral_draw()
        };
        let (probability, flags) = score(&draw);
        assert!((probability - (0.15 + 0.08 + 0.07 + 0.05 + 0.10)).abs() < 1e-12);
        let summary: Vec<_> = flags.iter().map(|f| (f.category, f.severity)).collect();
        assert_eq!(
            summary,
            vec![
                (BiasCategory::Gender, Severity::Moderate),
                (BiasCategory::Race, Severity::Moderate),
                (BiasCategory::Institution, Severity::Moderate),
                (BiasCategory::Experience, Severity::High),
            ]
        );
        assert!((flags[0].impact - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_language_and_keyword_factors_do_not_flag() {
        let draw = Draw {
            sentiment: -0.2,
            complexity: 0.9,
            readability: 40.0,
            keywords: vec!["pilot study".into(), "mental health".into()],
            ..neutral_draw()
        };
        let (probability, flags) = score(&draw);
        assert!(flags.is_empty());
        assert!((probability - (0.15 + 0.06 + 0.07 + 0.05 + 0.05 + 0.06)).abs() < 1e-12);
    }

    #[test]
    fn test_probability_is_clamped() {
        let worst = Draw {
            gender: Gender::Female,
            race: Race::Minority,
            prestige: PrestigeTier::Low,
            experience: 1,
            sentiment: -0.3,
            complexity: 0.94,
            technical_density: 0.84,
            readability: 31.0,
            proposal_length: 10,
            field: "Physics",
            agency: "NIH",
            keywords: vec!["pilot study".into(), "substance use".into()],
            ..neutral_draw()
        };
        assert_eq!(score(&worst).0, MAX_PROBABILITY);

        let best = Draw {
            keywords: vec!["vaccine".into(), "machine learning".into()],
            ..neutral_draw()
        };
        assert!((score(&best).0 - 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = generate_grants(25, &mut StdRng::seed_from_u64(42));
        let b = generate_grants(25, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_generated_records_respect_domains() {
        let grants = generate_grants(200, &mut StdRng::seed_from_u64(7));
        assert_eq!(grants.len(), 200);
        assert_eq!(grants[0].id, "G00000");
        assert_eq!(grants[199].id, "G00199");
        for g in &grants {
            assert!((2..=5).contains(&g.keywords.len()));
            let mut unique = g.keywords.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), g.keywords.len());
            assert!((MIN_PROBABILITY..=MAX_PROBABILITY).contains(&g.termination_probability));
            assert!((2020..=2024).contains(&g.year));
            assert!((1..=25).contains(&g.pi_experience));
            assert!((-0.3..0.8).contains(&g.sentiment));
            assert!((30.0..85.0).contains(&g.readability_score));
            assert!(g.amount >= 100_000.0 && g.amount <= 2_000_000.0);
            assert!(FIELDS.contains(&g.field.as_str()));
            assert!(AGENCIES.contains(&g.agency.as_str()));
            assert!(g.title.ends_with(&format!(" in {}", g.field)));
            assert_eq!(g.status == "Terminated", g.terminated);
        }
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("vaccine"), "Vaccine");
        assert_eq!(capitalize("HIV"), "HIV");
        assert_eq!(capitalize(""), "");
    }
}
