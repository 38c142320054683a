//! Citation style conformance.
//!
//! A coarse check of whether a citation string follows the surface shape of
//! a style. APA expects `Author (Year). Rest`; MLA expects `Author. Rest`.
//! Patterns are anchored at the start of the citation only.

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

fn apa_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^(]+\(\d{4}\)\..+").unwrap())
}

fn mla_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^.]+\..+").unwrap())
}

/// Citation styles the checker knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CitationStyle {
    Apa,
    Mla,
}

impl FromStr for CitationStyle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "apa" => Ok(CitationStyle::Apa),
            "mla" => Ok(CitationStyle::Mla),
            other => anyhow::bail!("unsupported citation style: '{}'", other),
        }
    }
}

/// Result of a format check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormatCheck {
    pub format_correct: bool,
    pub has_required_fields: bool,
    pub issues: Vec<String>,
}

impl FormatCheck {
    fn matched(ok: bool, issue: &str) -> Self {
        Self {
            format_correct: ok,
            has_required_fields: ok,
            issues: if ok { Vec::new() } else { vec![issue.to_string()] },
        }
    }
}

/// Checks `citation` against a style given by name.
///
/// `style` is case-insensitive and defaults to APA when `None`. Unknown
/// styles report `"Unsupported format"` rather than failing.
pub fn check_format(citation: &str, style: Option<&str>) -> FormatCheck {
    match style.unwrap_or("apa").parse::<CitationStyle>() {
        Ok(style) => check_style(citation, style),
        Err(_) => FormatCheck {
            format_correct: false,
            has_required_fields: false,
            issues: vec!["Unsupported format".to_string()],
        },
    }
}

/// Checks `citation` against a known style.
pub fn check_style(citation: &str, style: CitationStyle) -> FormatCheck {
    match style {
        CitationStyle::Apa => {
            FormatCheck::matched(apa_re().is_match(citation), "Does not match APA format")
        }
        CitationStyle::Mla => {
            FormatCheck::matched(mla_re().is_match(citation), "Does not match MLA format")
        }
    }
}
