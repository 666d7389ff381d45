//! Subcommand handlers.

use crate::{AdjustmentArgs, Cli, Commands, ConfigAction, FilterArgs, SourceArgs};
use grantlens_core::aggregate::bias_impact::TopicImpactTable;
use grantlens_core::aggregate::keywords::cloud_font_size;
use grantlens_core::aggregate::{
    ImpactBand, KeywordReferenceTable, KeywordRisk, KeywordStat, classify_keywords,
    compare_all_groups, metadata_breakdown, summarize_bias_impact,
};
use grantlens_core::config::DEFAULT_SYNTHETIC_COUNT;
use grantlens_core::config::{load_config, load_config_file};
use grantlens_core::predict::FEATURE_IMPORTANCE;
use grantlens_core::{
    Dashboard, DashboardConfig, Gender, GrantProfile, PrestigeTier, SourceConfig,
    compute_fairness_metrics, predict_profile,
};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenderArg {
    Male,
    Female,
}

impl From<GenderArg> for Gender {
    fn from(arg: GenderArg) -> Self {
        match arg {
            GenderArg::Male => Gender::Male,
            GenderArg::Female => Gender::Female,
        }
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum PrestigeArg {
    Low,
    Medium,
    High,
}

impl From<PrestigeArg> for PrestigeTier {
    fn from(arg: PrestigeArg) -> Self {
        match arg {
            PrestigeArg::Low => PrestigeTier::Low,
            PrestigeArg::Medium => PrestigeTier::Medium,
            PrestigeArg::High => PrestigeTier::High,
        }
    }
}

pub fn run(cli: Cli, workspace: &Path) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => load_config_file(path),
        None => load_config(Some(workspace), None),
    }
    .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    apply_overrides(&mut config, &cli.source, &cli.filter, &cli.adjustments);
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;

    tracing::debug!(command = ?cli.command, source = ?config.source, "running command");
    match cli.command {
        Commands::Config { action } => handle_config(action, workspace, &config),
        Commands::Predict {
            gender,
            prestige,
            experience,
            sentiment,
            complexity,
            readability,
        } => {
            let profile = GrantProfile {
                gender: gender.into(),
                prestige: prestige.into(),
                experience,
                sentiment,
                complexity,
                readability,
            };
            profile.validate()?;
            print_json(&PredictOutput {
                profile,
                prediction: predict_profile(&profile),
                feature_importance: FEATURE_IMPORTANCE
                    .iter()
                    .map(|&(feature, importance)| FeatureImportance {
                        feature,
                        importance,
                    })
                    .collect(),
            })
        }
        Commands::Summary => print_json(&load_dashboard(&config)?.snapshot()),
        Commands::Keywords { top, reference } => {
            print_json(&keywords_report(&config, top, reference)?)
        }
        Commands::Fairness { adjusted } => {
            let dashboard = load_dashboard(&config)?;
            let records = dashboard.adjusted();
            print_json(&FairnessOutput {
                adjusted,
                metrics: compute_fairness_metrics(&records, adjusted),
                groups: compare_all_groups(&records, adjusted),
            })
        }
        Commands::Breakdown { adjusted } => {
            let dashboard = load_dashboard(&config)?;
            print_json(&metadata_breakdown(&dashboard.adjusted(), adjusted))
        }
        Commands::BiasImpact { avg, max } => match (avg, max) {
            (Some(avg), Some(max)) => print_json(&TopicImpactTable::load(&avg, &max)?.rows()),
            _ => {
                let dashboard = load_dashboard(&config)?;
                print_json(&summarize_bias_impact(&dashboard.adjusted()))
            }
        },
    }
}

fn load_dashboard(config: &DashboardConfig) -> anyhow::Result<Dashboard> {
    Dashboard::from_config(config).map_err(|e| anyhow::anyhow!("Failed to load records: {}", e))
}

#[derive(Serialize)]
#[serde(untagged)]
enum KeywordsReport {
    Risks(Vec<KeywordRisk>),
    Cloud(Vec<CloudEntry>),
}

/// Keyword tiers from a reference table when one is given, otherwise the
/// word-cloud statistics with the configured drill-down sample limit.
fn keywords_report(
    config: &DashboardConfig,
    top: Option<usize>,
    reference: Option<PathBuf>,
) -> anyhow::Result<KeywordsReport> {
    let dashboard = load_dashboard(config)?;
    let top = top.unwrap_or(config.keywords.top_n);
    let reference = reference.or_else(|| config.keywords.reference_table.clone());
    if let Some(path) = reference {
        let table = KeywordReferenceTable::load(&path)?;
        let mut risks = classify_keywords(&dashboard.adjusted(), &table);
        risks.truncate(top);
        return Ok(KeywordsReport::Risks(risks));
    }
    let mut stats = dashboard.keyword_stats();
    stats.truncate(top);
    Ok(KeywordsReport::Cloud(cloud_entries(stats)))
}

/// Layer command-line flags over the loaded configuration.
fn apply_overrides(
    config: &mut DashboardConfig,
    source: &SourceArgs,
    filter: &FilterArgs,
    adjustments: &AdjustmentArgs,
) {
    if let Some(records) = &source.data {
        config.source = match &source.metadata {
            Some(metadata) => SourceConfig::Joined {
                records: records.clone(),
                metadata: metadata.clone(),
            },
            None => SourceConfig::Grants {
                path: records.clone(),
            },
        };
    } else if source.seed.is_some() || source.count.is_some() {
        let (count, seed) = match &config.source {
            SourceConfig::Synthetic { count, seed } => (*count, *seed),
            _ => (DEFAULT_SYNTHETIC_COUNT, None),
        };
        config.source = SourceConfig::Synthetic {
            count: source.count.unwrap_or(count),
            seed: source.seed.or(seed),
        };
    }

    if filter.search.is_some() {
        config.filter.search = filter.search.clone();
    }
    if filter.year_min.is_some() {
        config.filter.year_min = filter.year_min;
    }
    if filter.year_max.is_some() {
        config.filter.year_max = filter.year_max;
    }
    if filter.agency.is_some() {
        config.filter.agency = filter.agency.clone();
    }
    if filter.field.is_some() {
        config.filter.field = filter.field.clone();
    }

    let adj = &mut config.adjustments;
    if let Some(v) = adjustments.gender_bias {
        adj.gender_bias = v;
    }
    if let Some(v) = adjustments.race_bias {
        adj.race_bias = v;
    }
    if let Some(v) = adjustments.institution_bias {
        adj.institution_bias = v;
    }
    if let Some(v) = adjustments.experience_bias {
        adj.experience_bias = v;
    }
}

fn handle_config(
    action: ConfigAction,
    workspace: &Path,
    config: &DashboardConfig,
) -> anyhow::Result<()> {
    match action {
        ConfigAction::Init => {
            let config_dir = workspace.join(".grantlens");
            std::fs::create_dir_all(&config_dir)?;

            let config_path = config_dir.join("config.toml");
            if config_path.exists() {
                println!(
                    "Configuration file already exists at: {}",
                    config_path.display()
                );
                return Ok(());
            }

            let toml_str = toml::to_string_pretty(&DashboardConfig::default())?;
            std::fs::write(&config_path, &toml_str)?;
            println!(
                "Created default configuration at: {}",
                config_path.display()
            );
            Ok(())
        }
        ConfigAction::Show => {
            let toml_str = toml::to_string_pretty(config)?;
            println!("{}", toml_str);
            Ok(())
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CloudEntry {
    #[serde(flatten)]
    stat: KeywordStat,
    band: ImpactBand,
    font_size: f64,
}

fn cloud_entries(stats: Vec<KeywordStat>) -> Vec<CloudEntry> {
    let min = stats.iter().map(|s| s.frequency).min().unwrap_or(1);
    let max = stats.iter().map(|s| s.frequency).max().unwrap_or(1);
    stats
        .into_iter()
        .map(|stat| CloudEntry {
            band: stat.impact_band(),
            font_size: cloud_font_size(stat.frequency, min, max),
            stat,
        })
        .collect()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FairnessOutput {
    adjusted: bool,
    metrics: grantlens_core::FairnessMetrics,
    groups: Vec<grantlens_core::aggregate::GroupComparison>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PredictOutput {
    profile: GrantProfile,
    prediction: grantlens_core::ProfilePrediction,
    feature_importance: Vec<FeatureImportance>,
}

#[derive(Serialize)]
struct FeatureImportance {
    feature: &'static str,
    importance: f64,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
