//! CLI front-ends for validation and format checking.
//!
//! `citecheck validate` reads either a JSON array of sources or plain
//! bibliography text (one citation per line), validates it against the
//! configured database, and prints one line per source.

use anyhow::{bail, Context, Result};
use std::path::Path;
use std::sync::Arc;

use citecheck_core::citation::parse_citations;
use citecheck_core::format::check_format;
use citecheck_core::models::Source;

use crate::config::Config;
use crate::db;
use crate::probe::HttpProber;
use crate::session::resolve_session_id;
use crate::sqlite_store::SqliteStore;
use crate::validate::Validator;

/// Loads sources from a file.
///
/// A file whose first non-blank character is `[` is read as a JSON array of
/// sources; anything else is parsed as bibliography text.
pub fn load_sources(path: &Path) -> Result<Vec<Source>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    if content.trim_start().starts_with('[') {
        serde_json::from_str(&content)
            .with_context(|| format!("invalid source list in {}", path.display()))
    } else {
        Ok(parse_citations(&content))
    }
}

/// `citecheck parse <file>`: prints the parsed sources as JSON.
pub fn run_parse(path: &Path) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let sources = parse_citations(&content);
    println!("{}", serde_json::to_string_pretty(&sources)?);
    eprintln!("{} citations parsed", sources.len());
    Ok(())
}

/// `citecheck check <citation>`: prints the style check as JSON.
pub fn run_check(citation: &str, style: Option<&str>) -> Result<()> {
    let check = check_format(citation, style);
    println!("{}", serde_json::to_string_pretty(&check)?);
    Ok(())
}

/// `citecheck validate <file>`.
pub async fn run_validate(
    config: &Config,
    path: &Path,
    session_id: Option<&str>,
    partial: bool,
) -> Result<()> {
    let sources = load_sources(path)?;
    if sources.is_empty() {
        bail!("no citations found in {}", path.display());
    }
    let session_id = resolve_session_id(session_id);

    let pool = db::connect(config).await?;
    let store = Arc::new(SqliteStore::new(pool));
    let prober = Arc::new(HttpProber::new(&config.probe)?);
    let validator = Validator::new(prober, store, config);

    println!("Session: {}", session_id);

    let mut valid = 0;
    let mut failed = 0;
    if partial {
        for outcome in validator.validate_each(&session_id, &sources).await? {
            match outcome.result {
                Ok(r) => {
                    if r.is_valid {
                        valid += 1;
                    }
                    print_result(&r.source_id, r.score, r.is_valid, &r.issues);
                }
                Err(e) => {
                    failed += 1;
                    println!("  {:<38} ERROR  {}", outcome.source_id, e);
                }
            }
        }
    } else {
        for r in validator.validate_batch(&session_id, &sources).await? {
            if r.is_valid {
                valid += 1;
            }
            print_result(&r.source_id, r.score, r.is_valid, &r.issues);
        }
    }

    println!();
    println!("{} sources, {} valid", sources.len(), valid);
    if failed > 0 {
        println!("{} sources could not be validated", failed);
    }
    Ok(())
}

fn print_result(source_id: &str, score: u32, is_valid: bool, issues: &[String]) {
    let verdict = if is_valid { "valid" } else { "INVALID" };
    println!("  {:<38} {:>3}  {:<7}  {}", source_id, score, verdict, issues.join("; "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_sources_reads_json_array() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("sources.json");
        std::fs::write(
            &path,
            r#"  [{"id": "a", "citation": "Smith (2020). T.", "type": "journal"}]"#,
        )
        .unwrap();
        let sources = load_sources(&path).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].id, "a");
    }

    #[test]
    fn test_load_sources_parses_text() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("refs.txt");
        std::fs::write(&path, "Smith, J. (2020). Study. Journal.\n\nDoe, A. (2001). Book.\n")
            .unwrap();
        assert_eq!(load_sources(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_load_sources_rejects_bad_json() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("bad.json");
        std::fs::write(&path, "[{\"citation\": 1}]").unwrap();
        assert!(load_sources(&path).is_err());
    }
}
