//! Core data models: parsed sources, per-check outcomes, and scored results.
//!
//! All types serialize with camelCase field names, matching the JSON shapes
//! accepted and returned by the HTTP API.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Heuristic classification of a citation, assigned by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Book,
    Journal,
    Website,
    Conference,
    #[default]
    Other,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Book => "book",
            SourceType::Journal => "journal",
            SourceType::Website => "website",
            SourceType::Conference => "conference",
            SourceType::Other => "other",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "book" => Ok(SourceType::Book),
            "journal" => Ok(SourceType::Journal),
            "website" => Ok(SourceType::Website),
            "conference" => Ok(SourceType::Conference),
            "other" => Ok(SourceType::Other),
            other => anyhow::bail!("unknown source type: '{}'", other),
        }
    }
}

/// A parsed citation candidate.
///
/// `id` is assigned once at creation and must be unique within a session.
/// `citation` is the raw line the source was parsed from and is never empty.
/// The remaining fields are whatever the parser managed to extract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub citation: String,
    #[serde(rename = "type", default)]
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl Source {
    /// Author, if present and not blank.
    pub fn author(&self) -> Option<&str> {
        non_blank(&self.author)
    }

    /// Title, if present and not blank.
    pub fn title(&self) -> Option<&str> {
        non_blank(&self.title)
    }

    /// URL, if present and not blank.
    pub fn url(&self) -> Option<&str> {
        non_blank(&self.url)
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Outcome of a single check that may not apply to every source.
///
/// Serialized as `true`, `false`, or `null`. A check that was run and
/// failed is never reported the same way as a check that was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum Check {
    Passed,
    Failed,
    #[default]
    NotApplicable,
}

impl Check {
    pub fn is_passed(&self) -> bool {
        matches!(self, Check::Passed)
    }

    /// Short label used in CSV reports.
    pub fn label(&self) -> &'static str {
        match self {
            Check::Passed => "true",
            Check::Failed => "false",
            Check::NotApplicable => "n/a",
        }
    }
}

impl From<bool> for Check {
    fn from(value: bool) -> Self {
        if value {
            Check::Passed
        } else {
            Check::Failed
        }
    }
}

impl From<Option<bool>> for Check {
    fn from(value: Option<bool>) -> Self {
        value.map(Check::from).unwrap_or(Check::NotApplicable)
    }
}

impl From<Check> for Option<bool> {
    fn from(value: Check) -> Self {
        match value {
            Check::Passed => Some(true),
            Check::Failed => Some(false),
            Check::NotApplicable => None,
        }
    }
}

/// Per-source check outcomes, the sole input to scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationChecks {
    #[serde(default)]
    pub url_accessible: Check,
    pub format_correct: bool,
    #[serde(default)]
    pub credible_domain: Check,
    #[serde(default)]
    pub is_recent: Check,
    pub has_required_fields: bool,
}

/// Scored outcome of validating one [`Source`].
///
/// `source_id` is a back-reference to the source; a later validation of the
/// same source in the same session replaces this result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub source_id: String,
    pub score: u32,
    pub is_valid: bool,
    pub checks: ValidationChecks,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub validated_at: DateTime<Utc>,
}
