//! Filter stage: conjunctive predicates over the record set.

use crate::config::FilterConfig;
use crate::grant::Grant;
use serde::{Deserialize, Serialize};

/// A set of filter predicates. Inactive predicates impose no constraint.
///
/// A record survives when it satisfies every active predicate:
/// - `search`: case-insensitive substring of the title or any keyword
/// - `year_min` / `year_max`: inclusive bounds on the award year
/// - `agency` / `field`: exact match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrantFilter {
    search: Option<String>,
    year_min: Option<i32>,
    year_max: Option<i32>,
    agency: Option<String>,
    field: Option<String>,
}

impl GrantFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = active_text(text.into()).map(|s| s.to_lowercase());
        self
    }

    pub fn years(mut self, min: Option<i32>, max: Option<i32>) -> Self {
        self.year_min = min;
        self.year_max = max;
        self
    }

    pub fn agency(mut self, agency: impl Into<String>) -> Self {
        self.agency = active_category(agency.into());
        self
    }

    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.field = active_category(field.into());
        self
    }

    /// Whether no predicate is active.
    pub fn is_empty(&self) -> bool {
        self.search.is_none()
            && self.year_min.is_none()
            && self.year_max.is_none()
            && self.agency.is_none()
            && self.field.is_none()
    }

    /// Whether `grant` satisfies every active predicate.
    pub fn matches(&self, grant: &Grant) -> bool {
        if let Some(needle) = &self.search {
            let in_title = grant.title.to_lowercase().contains(needle.as_str());
            let in_keywords = grant
                .keywords
                .iter()
                .any(|k| k.to_lowercase().contains(needle.as_str()));
            if !in_title && !in_keywords {
                return false;
            }
        }
        if self.year_min.is_some_and(|min| grant.year < min) {
            return false;
        }
        if self.year_max.is_some_and(|max| grant.year > max) {
            return false;
        }
        if self.agency.as_ref().is_some_and(|a| *a != grant.agency) {
            return false;
        }
        if self.field.as_ref().is_some_and(|f| *f != grant.field) {
            return false;
        }
        true
    }

    /// Surviving records, in input order.
    pub fn apply<'a>(&self, records: &'a [Grant]) -> Vec<&'a Grant> {
        let kept: Vec<&Grant> = records.iter().filter(|g| self.matches(g)).collect();
        tracing::debug!(
            input = records.len(),
            kept = kept.len(),
            "filtered grant records"
        );
        kept
    }
}

impl From<&FilterConfig> for GrantFilter {
    fn from(config: &FilterConfig) -> Self {
        let mut filter = GrantFilter::new().years(config.year_min, config.year_max);
        if let Some(search) = &config.search {
            filter = filter.search(search.clone());
        }
        if let Some(agency) = &config.agency {
            filter = filter.agency(agency.clone());
        }
        if let Some(field) = &config.field {
            filter = filter.field(field.clone());
        }
        filter
    }
}

fn active_text(text: String) -> Option<String> {
    if text.trim().is_empty() { None } else { Some(text) }
}

fn active_category(value: String) -> Option<String> {
    active_text(value).filter(|v| !v.trim().eq_ignore_ascii_case("all"))
}
