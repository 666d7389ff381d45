//! Configuration for the dashboard core.
//!
//! Uses `figment` for layered configuration: defaults -> user config file ->
//! workspace config file -> environment -> explicit overrides. Files live at
//! `~/.config/grantlens/config.toml` and `.grantlens/config.toml`.

use crate::adjust::BiasAdjustments;
use crate::error::{GrantError, Result};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Where grant records come from.
    #[serde(default)]
    pub source: SourceConfig,
    /// Percentage-point corrections applied by the adjustment stage.
    #[serde(default)]
    pub adjustments: BiasAdjustments,
    /// Initial filter predicates.
    #[serde(default)]
    pub filter: FilterConfig,
    /// Keyword statistics settings.
    #[serde(default)]
    pub keywords: KeywordConfig,
}

impl DashboardConfig {
    /// Reject values the pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        self.adjustments.validate()?;
        if let SourceConfig::Synthetic { count: 0, .. } = self.source {
            return Err(GrantError::config("synthetic source count must be at least 1"));
        }
        if let (Some(min), Some(max)) = (self.filter.year_min, self.filter.year_max) {
            if min > max {
                return Err(GrantError::config(format!(
                    "filter year range is inverted: {min} > {max}"
                )));
            }
        }
        if self.keywords.sample_limit == 0 {
            return Err(GrantError::config("keywords.sample_limit must be at least 1"));
        }
        Ok(())
    }
}

/// Record source selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Procedurally generated records.
    Synthetic {
        #[serde(default = "default_count")]
        count: usize,
        /// Fixed seed for reproducible output. Entropy-seeded when absent.
        #[serde(default)]
        seed: Option<u64>,
    },
    /// A JSON array of fully grant-shaped records.
    Grants { path: PathBuf },
    /// Raw scored records joined against a project metadata table.
    Joined { records: PathBuf, metadata: PathBuf },
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Synthetic {
            count: default_count(),
            seed: None,
        }
    }
}

/// Record count of the synthetic source when none is configured.
pub const DEFAULT_SYNTHETIC_COUNT: usize = 500;

fn default_count() -> usize {
    DEFAULT_SYNTHETIC_COUNT
}

/// Filter predicates as stored in configuration.
///
/// Text predicates accept bare numbers and booleans as well as strings, so
/// `GRANTLENS_FILTER__SEARCH=2023` searches for the text `"2023"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FilterConfig {
    #[serde(default, deserialize_with = "deserialize_text")]
    pub search: Option<String>,
    #[serde(default)]
    pub year_min: Option<i32>,
    #[serde(default)]
    pub year_max: Option<i32>,
    /// Agency name, or `"all"`.
    #[serde(default, deserialize_with = "deserialize_text")]
    pub agency: Option<String>,
    /// Research field, or `"all"`.
    #[serde(default, deserialize_with = "deserialize_text")]
    pub field: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScalarText {
    Text(String),
    Unsigned(u64),
    Signed(i64),
    Float(f64),
    Bool(bool),
}

impl From<ScalarText> for String {
    fn from(value: ScalarText) -> Self {
        match value {
            ScalarText::Text(text) => text,
            ScalarText::Unsigned(n) => n.to_string(),
            ScalarText::Signed(n) => n.to_string(),
            ScalarText::Float(n) => n.to_string(),
            ScalarText::Bool(b) => b.to_string(),
        }
    }
}

fn deserialize_text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<ScalarText>::deserialize(deserializer).map(|v| v.map(String::from))
}

/// Keyword statistics configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KeywordConfig {
    /// Sample grants retained per keyword for drill-down.
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,
    /// Keywords shown by the word cloud.
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Risk-tier reference table. When set, keywords are classified by tier
    /// instead of computed weight.
    #[serde(default)]
    pub reference_table: Option<PathBuf>,
}

impl Default for KeywordConfig {
    fn default() -> Self {
        Self {
            sample_limit: default_sample_limit(),
            top_n: default_top_n(),
            reference_table: None,
        }
    }
}

fn default_sample_limit() -> usize {
    5
}

fn default_top_n() -> usize {
    30
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `GRANTLENS_`)
/// 3. Workspace-local config (`.grantlens/config.toml`)
/// 4. User config (`~/.config/grantlens/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&DashboardConfig>,
) -> Result<DashboardConfig> {
    let mut figment = Figment::from(Serialized::defaults(DashboardConfig::default()));

    if let Some(config_dir) = directories::ProjectDirs::from("org", "grantlens", "grantlens") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    if let Some(ws) = workspace {
        let ws_config = ws.join(".grantlens").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // GRANTLENS_ADJUSTMENTS__GENDER_BIAS, GRANTLENS_KEYWORDS__TOP_N, etc.
    figment = figment.merge(Env::prefixed("GRANTLENS_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    let config: DashboardConfig = figment.extract()?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from an explicit TOML file layered over the defaults.
pub fn load_config_file(path: &Path) -> Result<DashboardConfig> {
    if !path.exists() {
        return Err(GrantError::not_found(format!(
            "config file {}",
            path.display()
        )));
    }
    let config: DashboardConfig = Figment::from(Serialized::defaults(DashboardConfig::default()))
        .merge(Toml::file(path))
        .extract()?;
    config.validate()?;
    Ok(config)
}
