//! Integration tests for the dashboard pipeline.
//!
//! These exercise filter -> adjust -> aggregate through the public API,
//! including loading records from JSON files on disk.

use grantlens_core::adjust::{BiasAdjustments, apply_adjustments};
use grantlens_core::aggregate::{
    KeywordReferenceTable, ReferenceEntry, RiskLevel, compare_groups, compute_fairness_metrics,
    compute_keyword_stats,
};
use grantlens_core::config::{DashboardConfig, SourceConfig};
use grantlens_core::{
    BiasCategory, Dashboard, Gender, Grant, GrantError, GrantFilter, PrestigeTier, Race,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::path::Path;

/// Helper to build a neutral grant that tests then customize.
fn grant(id: &str, keywords: &[&str], terminated: bool, probability: f64) -> Grant {
    Grant {
        id: id.to_string(),
        title: format!("Study {id}"),
        field: "Public Health".to_string(),
        year: 2023,
        agency: "NIH".to_string(),
        amount: 250_000.0,
        recipient: "State University".to_string(),
        status: if terminated { "Terminated" } else { "Active" }.to_string(),
        gender: Gender::Male,
        race: Race::NonMinority,
        institution_prestige: PrestigeTier::High,
        pi_experience: 12,
        sentiment: 0.3,
        language_complexity: 0.5,
        technical_term_density: 0.4,
        readability_score: 55.0,
        proposal_length: 18,
        terminated,
        termination_probability: probability,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        bias_flags: Vec::new(),
        topic_tags: Vec::new(),
        predicted_label: None,
    }
}

fn write_json(path: &Path, value: &serde_json::Value) {
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

#[test]
fn test_empty_dataset_yields_defined_aggregates() {
    let records: Vec<Grant> = Vec::new();

    assert!(compute_keyword_stats(&records).is_empty());

    let metrics = compute_fairness_metrics(&records, false);
    for (_, ratio) in metrics
        .demographic_parity
        .iter()
        .chain(metrics.equality_of_opportunity.iter())
    {
        assert!(!ratio.is_nan());
        assert_eq!(ratio, 1.0);
    }

    let snapshot = Dashboard::new(records).snapshot();
    assert_eq!(snapshot.overview.total, 0);
    assert_eq!(snapshot.overview.termination_rate_pct, 0.0);
    assert!(snapshot.bias_impact.iter().all(|b| b.count == 0));
}

#[test]
fn test_single_keyword_dataset() {
    let records = vec![
        grant("V1", &["vaccine"], true, 0.6),
        grant("V2", &["vaccine"], false, 0.2),
        grant("V3", &["vaccine"], false, 0.1),
    ];

    let stats = compute_keyword_stats(&records);
    assert_eq!(stats.len(), 1);
    let vaccine = &stats[0];
    assert_eq!(vaccine.keyword, "vaccine");
    assert_eq!(vaccine.frequency, 3);
    assert_eq!(vaccine.terminated_count, 1);
    assert!((vaccine.avg_termination_rate - 1.0 / 3.0).abs() < 1e-12);
    assert_eq!(vaccine.termination_weight, 0.0);
    assert_eq!(vaccine.sample_grants.len(), 3);
    assert_eq!(vaccine.sample_grants[0].title, "Study V1");
    assert_eq!(vaccine.sample_grants[0].confidence, 0.6);
}

#[test]
fn test_full_gender_parity() {
    let mut records = vec![
        grant("M1", &[], true, 0.4),
        grant("M2", &[], false, 0.2),
        grant("F1", &[], true, 0.4),
        grant("F2", &[], false, 0.2),
    ];
    records[2].gender = Gender::Female;
    records[3].gender = Gender::Female;

    let metrics = compute_fairness_metrics(&records, false);
    assert_eq!(metrics.demographic_parity.gender, 1.0);
    assert_eq!(metrics.equality_of_opportunity.gender, 1.0);
}

#[test]
fn test_adjustment_clamps_at_zero() {
    let mut record = grant("LOW", &[], false, 0.03);
    record.institution_prestige = PrestigeTier::Low;
    record.pi_experience = 2;
    let records = vec![record];

    let adjustments = BiasAdjustments {
        institution_bias: 20.0,
        experience_bias: 20.0,
        ..Default::default()
    };
    let adjusted = apply_adjustments(&records, &adjustments);
    assert_eq!(adjusted.len(), 1);
    assert_eq!(adjusted[0].adjusted_probability, 0.0);
    assert_eq!(records[0].termination_probability, 0.03);
}

#[test]
fn test_filter_then_adjust_then_aggregate() {
    let mut records = vec![
        grant("A", &["climate", "soil"], true, 0.7),
        grant("B", &["climate"], false, 0.3),
        grant("C", &["battery"], false, 0.2),
    ];
    records[0].gender = Gender::Female;
    records[1].agency = "NSF".to_string();
    records[2].year = 2020;

    let dashboard = Dashboard::new(records)
        .with_filter(GrantFilter::new().search("CLIMATE").years(Some(2021), None))
        .with_adjustments(BiasAdjustments {
            gender_bias: 10.0,
            ..Default::default()
        })
        .unwrap()
        .with_show_adjusted(true);

    let filtered: Vec<&str> = dashboard.filtered().into_iter().map(|g| g.id.as_str()).collect();
    assert_eq!(filtered, vec!["A", "B"]);

    let snapshot = dashboard.snapshot();
    assert_eq!(snapshot.overview.total, 2);
    assert_eq!(snapshot.overview.terminated, 1);
    let adjusted_avg = snapshot.overview.avg_adjusted_probability_pct.unwrap();
    assert!((adjusted_avg - 45.0).abs() < 1e-9);
    assert!(snapshot.keywords.iter().all(|k| k.keyword != "battery"));
    assert_eq!(snapshot.breakdown.by_agency.len(), 2);
}

#[test]
fn test_keyword_risks_in_snapshot() {
    let records = vec![
        grant("A", &["Equity", "battery"], true, 0.6),
        grant("B", &["equity"], false, 0.2),
    ];
    let table = KeywordReferenceTable::from_entries([
        ReferenceEntry {
            term: "equity".to_string(),
            avg_tfidf_freq: 0.12,
            risk_level: RiskLevel::HighRisk,
        },
        ReferenceEntry {
            term: "battery".to_string(),
            avg_tfidf_freq: 0.02,
            risk_level: RiskLevel::LowRisk,
        },
    ]);

    let snapshot = Dashboard::new(records)
        .with_reference_table(table)
        .snapshot();
    let risks = snapshot.keyword_risks.unwrap();
    assert_eq!(risks[0].term, "equity");
    assert_eq!(risks[0].risk_level, RiskLevel::HighRisk);
    assert_eq!(risks[0].occurrences, 2);
    assert_eq!(risks[0].terminated_count, 1);
    assert_eq!(risks.last().map(|r| r.term.as_str()), Some("battery"));
}

#[test]
fn test_joined_source_loads_through_config() {
    let dir = tempfile::tempdir().unwrap();
    let records_path = dir.path().join("records.json");
    let metadata_path = dir.path().join("metadata.json");

    let raw = |award: &str, gender: &str, terminated: u8, probability: f64| {
        json!({
            "award_number": award,
            "field": "Environmental Science",
            "year": 2024,
            "gender": gender,
            "race": "Minority",
            "institutionPrestige": "Low",
            "piExperience": 3,
            "sentiment": 0.1,
            "languageComplexity": 0.6,
            "technicalTermDensity": 0.5,
            "readabilityScore": 42.0,
            "proposalLength": 25,
            "y_true": terminated,
            "y_prob": probability,
            "keywords": ["climate", "equity"]
        })
    };
    write_json(
        &records_path,
        &json!([
            raw("2401", "Female", 1, 0.55),
            raw("2402", "Male", 0, 0.25),
        ]),
    );
    write_json(
        &metadata_path,
        &json!([
            {
                "award_number": "2401",
                "project_title": "Coastal resilience networks",
                "recipient_name": "Gulf College",
                "awarding_office": "NSF",
                "award_amount": 820000.0,
                "grant_status": "Terminated",
                "bias_flags": "climate change, race"
            }
        ]),
    );

    let mut config = DashboardConfig::default();
    config.source = SourceConfig::Joined {
        records: records_path,
        metadata: metadata_path,
    };
    let dashboard = Dashboard::from_config(&config).unwrap();

    let records = dashboard.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].title, "Coastal resilience networks");
    assert_eq!(records[0].agency, "NSF");
    assert!(records[0].has_flag(BiasCategory::Climate));
    assert_eq!(records[1].title, "Untitled Project");
    assert_eq!(records[1].agency, "Unknown Agency");
    assert_eq!(records[1].amount, 0.0);

    let climate = compare_groups(records, BiasCategory::Climate, false);
    assert_eq!(climate.focus.count, 1);
    assert_eq!(climate.reference.count, 1);

    let snapshot = dashboard.snapshot();
    assert_eq!(snapshot.breakdown.by_amount.len(), 4);
    assert_eq!(snapshot.breakdown.by_amount[0].count, 1);
}

#[test]
fn test_missing_records_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = DashboardConfig::default();
    config.source = SourceConfig::Grants {
        path: dir.path().join("absent.json"),
    };
    let err = Dashboard::from_config(&config).unwrap_err();
    assert!(matches!(err, GrantError::NotFound(_)));
}

#[test]
fn test_invalid_records_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grants.json");
    let bad = grant("X1", &["vaccine"], false, 1.4);
    std::fs::write(&path, serde_json::to_string(&vec![bad]).unwrap()).unwrap();

    let mut config = DashboardConfig::default();
    config.source = SourceConfig::Grants { path };
    assert!(Dashboard::from_config(&config).is_err());
}
