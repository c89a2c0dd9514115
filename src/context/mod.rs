//! The persisted review state document (`.claude/review/context.json`).
//!
//! Loading never fails: a missing or unparseable file yields the default
//! document, and individual malformed fields fall back to their defaults
//! without discarding the rest.

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

/// Lint phase, advanced by the agent after the review checklist is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LintStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSection {
    #[serde(default, deserialize_with = "lenient_strings")]
    pub targets: Vec<String>,
    #[serde(rename = "patchUnified0", default, deserialize_with = "lenient")]
    pub patch_unified0: String,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub checklist: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintSection {
    #[serde(default, deserialize_with = "lenient_strings")]
    pub tools: Vec<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: LintStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewContext {
    /// Informational only; never consulted when deciding.
    #[serde(default, deserialize_with = "lenient")]
    pub generated_at: String,
    #[serde(default, deserialize_with = "lenient")]
    pub review: ReviewSection,
    #[serde(default, deserialize_with = "lenient")]
    pub lint: LintSection,
}

/// Deserialize a field, substituting its default if it has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_else(|e| {
        debug!(error = %e, "malformed state field, using default");
        T::default()
    }))
}

/// Deserialize a list of strings, skipping entries that are not strings.
/// Anything other than an array becomes an empty list.
fn lenient_strings<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect())
}

/// Format a timestamp the way `generatedAt` stores it.
pub fn timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Read the state document, substituting the default for a missing or
/// unreadable file.
pub fn load(path: &Path) -> ReviewContext {
    let contents = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no state document yet");
            return ReviewContext::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "reading state document, starting fresh");
            return ReviewContext::default();
        }
    };
    match serde_json::from_str(&contents) {
        Ok(ctx) => ctx,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "parsing state document, starting fresh");
            ReviewContext::default()
        }
    }
}

/// Write the state document atomically, creating parent directories.
pub fn save(path: &Path, ctx: &ReviewContext) -> Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let mut json = serde_json::to_string_pretty(ctx).context("serializing state document")?;
    json.push('\n');
    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("creating temp file in {}", dir.display()))?;
    tmp.write_all(json.as_bytes())
        .context("writing state document")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
