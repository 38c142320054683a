//! Session reports.
//!
//! Joins the sources of a session with their validation results, computes a
//! summary, and renders the whole thing as pretty JSON or CSV.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Source, ValidationResult};

/// Column headers of the CSV rendering, in order.
pub const CSV_HEADER: &[&str] = &[
    "Source ID",
    "Citation",
    "Type",
    "Author",
    "Year",
    "Title",
    "URL",
    "Score",
    "Valid",
    "URL Accessible",
    "Format Correct",
    "Credible Domain",
    "Recent",
    "Required Fields",
    "Issues",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_sources: usize,
    pub valid_sources: usize,
    pub invalid_sources: usize,
    pub unvalidated: usize,
    /// Mean score over validated sources, rounded to one decimal.
    pub average_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEntry {
    #[serde(flatten)]
    pub source: Source,
    pub validation: Option<ValidationResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub session_id: String,
    pub generated_at: DateTime<Utc>,
    pub summary: ReportSummary,
    pub sources: Vec<ReportEntry>,
}

/// Builds a report from a session's sources and results.
///
/// Results whose source is not among `sources` are ignored. Entries are
/// ordered by citation text, then by source id.
pub fn build_report(
    session_id: &str,
    sources: Vec<Source>,
    results: Vec<ValidationResult>,
    generated_at: DateTime<Utc>,
) -> Report {
    let mut by_source: HashMap<String, ValidationResult> = results
        .into_iter()
        .map(|r| (r.source_id.clone(), r))
        .collect();

    let mut entries: Vec<ReportEntry> = sources
        .into_iter()
        .map(|source| {
            let validation = by_source.remove(&source.id);
            ReportEntry { source, validation }
        })
        .collect();
    entries.sort_by(|a, b| {
        a.source
            .citation
            .cmp(&b.source.citation)
            .then_with(|| a.source.id.cmp(&b.source.id))
    });

    let validated: Vec<&ValidationResult> =
        entries.iter().filter_map(|e| e.validation.as_ref()).collect();
    let valid_sources = validated.iter().filter(|r| r.is_valid).count();
    let average_score = if validated.is_empty() {
        0.0
    } else {
        let total: u64 = validated.iter().map(|r| u64::from(r.score)).sum();
        (total as f64 / validated.len() as f64 * 10.0).round() / 10.0
    };

    let summary = ReportSummary {
        total_sources: entries.len(),
        valid_sources,
        invalid_sources: validated.len() - valid_sources,
        unvalidated: entries.len() - validated.len(),
        average_score,
    };

    Report {
        session_id: session_id.to_string(),
        generated_at,
        summary,
        sources: entries,
    }
}

/// Pretty-printed JSON rendering.
pub fn render_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// CSV rendering: one header row plus one row per source, CRLF-free.
pub fn render_csv(report: &Report) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER.iter().map(|h| h.to_string()));

    for entry in &report.sources {
        let s = &entry.source;
        let mut row = vec![
            s.id.clone(),
            s.citation.clone(),
            s.source_type.to_string(),
            s.author.clone().unwrap_or_default(),
            s.year.map(|y| y.to_string()).unwrap_or_default(),
            s.title.clone().unwrap_or_default(),
            s.url.clone().unwrap_or_default(),
        ];
        match &entry.validation {
            Some(r) => row.extend([
                r.score.to_string(),
                r.is_valid.to_string(),
                r.checks.url_accessible.label().to_string(),
                r.checks.format_correct.to_string(),
                r.checks.credible_domain.label().to_string(),
                r.checks.is_recent.label().to_string(),
                r.checks.has_required_fields.to_string(),
                r.issues.join("; "),
            ]),
            None => row.extend(std::iter::repeat(String::new()).take(8)),
        }
        push_row(&mut out, row.into_iter());
    }
    out
}

fn push_row(out: &mut String, fields: impl Iterator<Item = String>) {
    let line: Vec<String> = fields.map(|f| csv_field(&f)).collect();
    out.push_str(&line.join(","));
    out.push('\n');
}

/// Quotes a field when it contains a comma, quote, or line break.
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Check, SourceType, ValidationChecks};

    fn source(id: &str, citation: &str) -> Source {
        Source {
            id: id.to_string(),
            citation: citation.to_string(),
            source_type: SourceType::Journal,
            author: Some("Smith, J.".to_string()),
            year: Some(2020),
            title: Some("Study".to_string()),
            url: None,
        }
    }

    fn result(id: &str, score: u32) -> ValidationResult {
        ValidationResult {
            source_id: id.to_string(),
            score,
            is_valid: score >= 60,
            checks: ValidationChecks {
                url_accessible: Check::NotApplicable,
                format_correct: true,
                credible_domain: Check::NotApplicable,
                is_recent: Check::Failed,
                has_required_fields: true,
            },
            issues: vec!["Source is older than 10 years".to_string()],
            warnings: Vec::new(),
            validated_at: Utc::now(),
        }
    }

    #[test]
    fn test_summary_counts_and_average() {
        let report = build_report(
            "sess",
            vec![source("a", "A."), source("b", "B."), source("c", "C.")],
            vec![result("a", 50), result("b", 85)],
            Utc::now(),
        );
        assert_eq!(report.summary.total_sources, 3);
        assert_eq!(report.summary.valid_sources, 1);
        assert_eq!(report.summary.invalid_sources, 1);
        assert_eq!(report.summary.unvalidated, 1);
        assert_eq!(report.summary.average_score, 67.5);
    }

    #[test]
    fn test_empty_session_average_is_zero() {
        let report = build_report("sess", Vec::new(), Vec::new(), Utc::now());
        assert_eq!(report.summary.total_sources, 0);
        assert_eq!(report.summary.average_score, 0.0);
    }

    #[test]
    fn test_entries_sorted_and_orphan_results_ignored() {
        let report = build_report(
            "sess",
            vec![source("z", "Beta."), source("y", "Alpha.")],
            vec![result("z", 70), result("ghost", 10)],
            Utc::now(),
        );
        let ids: Vec<&str> = report.sources.iter().map(|e| e.source.id.as_str()).collect();
        assert_eq!(ids, vec!["y", "z"]);
        assert!(report.sources[0].validation.is_none());
        assert_eq!(report.sources[1].validation.as_ref().unwrap().score, 70);
        assert_eq!(report.summary.average_score, 70.0);
    }

    #[test]
    fn test_csv_quotes_commas_and_quotes() {
        let mut s = source("a", "Smith, J. (2020). \"Quoted\" study.");
        s.url = Some("https://mit.edu/x".to_string());
        let report = build_report("sess", vec![s], vec![result("a", 60)], Utc::now());
        let csv = render_csv(&report);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], CSV_HEADER.join(","));
        assert_eq!(
            lines[1],
            "a,\"Smith, J. (2020). \"\"Quoted\"\" study.\",journal,\"Smith, J.\",2020,Study,\
             https://mit.edu/x,60,true,n/a,true,n/a,false,true,Source is older than 10 years"
        );
    }

    #[test]
    fn test_csv_unvalidated_row_has_empty_result_columns() {
        let mut s = source("a", "A.");
        s.author = Some("Smith".to_string());
        let report = build_report("sess", vec![s], Vec::new(), Utc::now());
        let csv = render_csv(&report);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.ends_with(",,,,,,,,"));
        assert_eq!(row.matches(',').count(), CSV_HEADER.len() - 1);
    }

    #[test]
    fn test_json_flattens_source_fields() {
        let report = build_report("sess", vec![source("a", "A.")], vec![result("a", 60)], Utc::now());
        let value: serde_json::Value = serde_json::from_str(&render_json(&report).unwrap()).unwrap();
        assert_eq!(value["sessionId"], "sess");
        assert_eq!(value["summary"]["totalSources"], 1);
        assert_eq!(value["sources"][0]["id"], "a");
        assert_eq!(value["sources"][0]["type"], "journal");
        assert_eq!(value["sources"][0]["validation"]["score"], 60);
        assert_eq!(value["sources"][0]["validation"]["checks"]["urlAccessible"], serde_json::Value::Null);
    }
}
