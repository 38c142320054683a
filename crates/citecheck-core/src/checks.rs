//! Field completeness and recency checks.

use crate::models::{Check, Source};

/// Default age, in years, below which a source counts as recent.
pub const DEFAULT_RECENCY_YEARS: u32 = 10;

/// True iff both `author` and `title` are present and non-blank.
pub fn has_required_fields(source: &Source) -> bool {
    source.author().is_some() && source.title().is_some()
}

/// Recency of a publication year relative to `current_year`.
///
/// `NotApplicable` when the year is unknown; otherwise `Passed` iff
/// `current_year - year < recency_years`. Future years count as recent.
pub fn is_recent(year: Option<i32>, current_year: i32, recency_years: u32) -> Check {
    match year {
        Some(y) => Check::from(i64::from(current_year) - i64::from(y) < i64::from(recency_years)),
        None => Check::NotApplicable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceType;

    fn source(author: Option<&str>, title: Option<&str>) -> Source {
        Source {
            id: "s1".to_string(),
            citation: "Citation.".to_string(),
            source_type: SourceType::Other,
            author: author.map(String::from),
            year: None,
            title: title.map(String::from),
            url: None,
        }
    }

    #[test]
    fn test_required_fields_need_author_and_title() {
        assert!(has_required_fields(&source(Some("Smith, J."), Some("Study"))));
        assert!(!has_required_fields(&source(Some("Smith, J."), None)));
        assert!(!has_required_fields(&source(None, Some("Study"))));
        assert!(!has_required_fields(&source(None, None)));
    }

    #[test]
    fn test_empty_strings_do_not_count_as_present() {
        assert!(!has_required_fields(&source(Some(""), Some("Study"))));
        assert!(!has_required_fields(&source(Some("Smith"), Some("  "))));
    }

    #[test]
    fn test_recency_boundary_is_strict() {
        assert_eq!(is_recent(Some(2016), 2025, 10), Check::Passed);
        assert_eq!(is_recent(Some(2015), 2025, 10), Check::Failed);
    }

    #[test]
    fn test_recency_without_year_is_not_applicable() {
        assert_eq!(is_recent(None, 2025, 10), Check::NotApplicable);
    }

    #[test]
    fn test_future_and_current_years_are_recent() {
        assert_eq!(is_recent(Some(2025), 2025, 10), Check::Passed);
        assert_eq!(is_recent(Some(2030), 2025, 10), Check::Passed);
    }

    #[test]
    fn test_old_year_is_not_recent() {
        assert_eq!(is_recent(Some(1990), 2025, DEFAULT_RECENCY_YEARS), Check::Failed);
    }
}
