//! Record sources: synthesis, file loading, metadata join, validation.

pub mod source;
pub mod synthetic;
pub mod validate;

pub use source::{
    GrantFileSource, GrantSource, JoinedSource, ProjectMetadata, RawGrantRecord, SourceInfo,
    SyntheticSource, join_metadata, load_records, source_from_config,
};
pub use synthetic::generate_grants;
pub use validate::{DataQualityReport, IssueKind, RecordIssue, ensure_valid, validate_grants};

use crate::error::{GrantError, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Read and parse a JSON file, naming the path in any error.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(GrantError::not_found(format!("{}", path.display())));
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| GrantError::dataset(format!("{}: {e}", path.display())))
}
