//! Citation parsing.
//!
//! Turns a free-text bibliography into [`Source`] records, one per non-blank
//! line. Extraction is a fixed set of regular expressions applied in order;
//! the first match wins and nothing is backtracked or reconciled. Fields the
//! patterns do not recognize stay `None`.
//!
//! Recognized shapes:
//!
//! ```text
//! APA:  Smith, J. (2020). Title of the work. Journal, 4(2), 1-10. https://...
//! MLA:  Smith, John. "Title of the Work." Journal, vol. 4, 2020.
//! MLA:  Smith, John. Title of the Book. Some Press, 2010.
//! ```

use std::sync::OnceLock;

use regex::Regex;

use crate::models::{Source, SourceType};

fn list_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?:\[\d{1,3}\]|\d{1,3}[.)]|[-*•])\s+").unwrap())
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"https?://[^\s<>"]+"#).unwrap())
}

fn apa_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\((\d{4})[a-z]?(?:,[^)]*)?\)").unwrap())
}

fn bare_year_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(1[5-9]\d{2}|20\d{2})\b").unwrap())
}

fn apa_author_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(.+?)\s*\(\d{4}").unwrap())
}

fn apa_title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\(\d{4}[a-z]?(?:,[^)]*)?\)\.\s*([^.?!]+[?!]?)").unwrap()
    })
}

fn quoted_title_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["“]([^"”]+)["”]"#).unwrap())
}

/// Parses every non-blank line of `text` into a [`Source`].
pub fn parse_citations(text: &str) -> Vec<Source> {
    text.lines().filter_map(parse_citation).collect()
}

/// Parses a single citation line.
///
/// Returns `None` when the line is blank once list markers are removed.
pub fn parse_citation(line: &str) -> Option<Source> {
    let citation = list_marker_re().replace(line, "").trim().to_string();
    if citation.is_empty() {
        return None;
    }

    let url = extract_url(&citation);
    let without_url = url_re().replace_all(&citation, " ");
    let year = extract_year(&without_url);

    let (author, title) = if apa_year_re().is_match(&without_url) {
        (extract_apa_author(&without_url), extract_apa_title(&without_url))
    } else if let Some(caps) = quoted_title_re().captures(&without_url) {
        let start = caps.get(0).map(|m| m.start()).unwrap_or(0);
        let author = clean_field(&without_url[..start]);
        let title = caps.get(1).and_then(|m| clean_field(m.as_str()));
        (author, title)
    } else {
        let segments = sentence_segments(&without_url);
        if segments.len() >= 3 {
            (clean_field(segments[0]), clean_field(segments[1]))
        } else {
            (None, None)
        }
    };

    let source_type = infer_type(&citation, url.is_some());

    Some(Source {
        id: uuid::Uuid::new_v4().to_string(),
        citation,
        source_type,
        author,
        year,
        title,
        url,
    })
}

/// Classifies a citation by keyword, falling back to `website` when it has a
/// URL and `other` otherwise.
pub fn infer_type(citation: &str, has_url: bool) -> SourceType {
    let lower = citation.to_lowercase();
    let has_any = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has_any(&["proceedings", "conference", "symposium", "workshop"]) {
        SourceType::Conference
    } else if has_any(&["journal", "vol.", "volume", "doi", "issue"]) {
        SourceType::Journal
    } else if has_any(&["press", "publisher", "publishing", " ed.", "edition"]) {
        SourceType::Book
    } else if has_url || has_any(&["retrieved from", "accessed"]) {
        SourceType::Website
    } else {
        SourceType::Other
    }
}

fn extract_url(citation: &str) -> Option<String> {
    url_re()
        .find(citation)
        .map(|m| {
            m.as_str()
                .trim_end_matches(['.', ',', ';', ')', ']'])
                .to_string()
        })
        .filter(|u| u.len() > "https://".len())
}

fn extract_year(text: &str) -> Option<i32> {
    let caps = apa_year_re()
        .captures(text)
        .or_else(|| bare_year_re().captures(text))?;
    caps.get(1)?.as_str().parse().ok()
}

fn extract_apa_author(text: &str) -> Option<String> {
    let caps = apa_author_re().captures(text)?;
    clean_field(caps.get(1)?.as_str())
}

fn extract_apa_title(text: &str) -> Option<String> {
    let caps = apa_title_re().captures(text)?;
    clean_field(caps.get(1)?.as_str())
}

/// Splits on `". "`, except between two initials (`"K. M. "`).
fn sentence_segments(text: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = 0;
    let bytes = text.as_bytes();
    let mut i = 0;
    while i + 1 < bytes.len() {
        if bytes[i] == b'.' && bytes[i + 1] == b' ' {
            let next_word = text[i + 2..].split(' ').next().unwrap_or("");
            let between_initials = ends_with_initial(&text[start..i])
                && next_word
                    .strip_suffix('.')
                    .is_some_and(|w| ends_with_initial(w));
            if !between_initials {
                segments.push(&text[start..i]);
                start = i + 2;
            }
        }
        i += 1;
    }
    let rest = text[start..].trim_end_matches('.');
    if !rest.trim().is_empty() {
        segments.push(rest);
    }
    segments
}

/// True when the last word of `text` is a single capital letter.
fn ends_with_initial(text: &str) -> bool {
    let word = text.rsplit(' ').next().unwrap_or("");
    word.len() == 1 && word.chars().all(|c| c.is_ascii_uppercase())
}

/// Trims whitespace and trailing punctuation, keeping the period of a
/// trailing initial (`"Smith, J."`).
fn clean_field(raw: &str) -> Option<String> {
    let mut cleaned = raw.trim().trim_end_matches([',', ';', ':']).trim_end();
    while let Some(stripped) = cleaned.strip_suffix('.') {
        if ends_with_initial(stripped) {
            break;
        }
        cleaned = stripped.trim_end_matches([',', ';', ':']).trim_end();
    }
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}
