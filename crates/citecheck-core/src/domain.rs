//! Domain credibility classification.
//!
//! A source URL is credible when its host falls under an academic,
//! governmental, or non-profit suffix (`.edu`, `.gov`, `.org`) or belongs to
//! a named trusted publisher. Matching is done on the parsed host, by
//! suffix, so `https://notarealuniversity.edu.fake.com/` is not credible and
//! `https://link.springer.com/` is.

use url::Url;

use crate::models::Check;

/// Default host suffixes treated as credible.
pub const DEFAULT_SUFFIXES: &[&str] = &[".edu", ".gov", ".org"];

/// Default publisher domains treated as credible (including subdomains).
pub const DEFAULT_PUBLISHERS: &[&str] = &["springer.com", "sciencedirect.com"];

/// Static allow-list used by the credibility check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainPolicy {
    suffixes: Vec<String>,
    publishers: Vec<String>,
}

impl Default for DomainPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_SUFFIXES, DEFAULT_PUBLISHERS)
    }
}

impl DomainPolicy {
    /// Builds a policy from suffix and publisher lists.
    ///
    /// Entries are lowercased; suffixes gain a leading `.` if they lack one,
    /// and publishers lose any leading `.` so both apex and subdomains match.
    pub fn new<S: AsRef<str>, P: AsRef<str>>(suffixes: &[S], publishers: &[P]) -> Self {
        let suffixes = suffixes
            .iter()
            .map(|s| s.as_ref().trim().to_ascii_lowercase())
            .filter(|s| !s.is_empty() && s != ".")
            .map(|s| if s.starts_with('.') { s } else { format!(".{}", s) })
            .collect();
        let publishers = publishers
            .iter()
            .map(|p| p.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        Self {
            suffixes,
            publishers,
        }
    }

    /// Returns whether `url`'s host is on the allow-list.
    ///
    /// Unparsable URLs and URLs without a host are never credible.
    pub fn is_credible(&self, url: &str) -> bool {
        let Some(host) = host_of(url) else {
            return false;
        };
        self.host_is_credible(&host)
    }

    /// Tri-state credibility: `NotApplicable` when there is no URL.
    pub fn check(&self, url: Option<&str>) -> Check {
        match url {
            Some(u) => Check::from(self.is_credible(u)),
            None => Check::NotApplicable,
        }
    }

    fn host_is_credible(&self, host: &str) -> bool {
        let host = host.trim_end_matches('.');
        if host.is_empty() {
            return false;
        }
        if self
            .suffixes
            .iter()
            .any(|suffix| host.len() > suffix.len() && host.ends_with(suffix.as_str()))
        {
            return true;
        }
        self.publishers.iter().any(|domain| {
            host == domain
                || (host.len() > domain.len()
                    && host.ends_with(domain.as_str())
                    && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
        })
    }
}

/// Extracts the lowercased host of `url`, if it parses and has one.
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    parsed.host_str().map(|h| h.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_academic_and_org_domains_are_credible() {
        let policy = DomainPolicy::default();
        assert!(policy.is_credible("https://mit.edu/paper"));
        assert!(policy.is_credible("https://ieee.org/journal"));
        assert!(policy.is_credible("https://www.nih.gov/research"));
    }

    #[test]
    fn test_commercial_domain_is_not_credible() {
        let policy = DomainPolicy::default();
        assert!(!policy.is_credible("https://example.com/blog"));
    }

    #[test]
    fn test_publishers_match_apex_and_subdomains() {
        let policy = DomainPolicy::default();
        assert!(policy.is_credible("https://springer.com/x"));
        assert!(policy.is_credible("https://link.springer.com/article/10.1007/abc"));
        assert!(policy.is_credible("https://www.sciencedirect.com/science/article/pii/1"));
        assert!(!policy.is_credible("https://evilspringer.com/x"));
    }

    #[test]
    fn test_suffix_appearing_mid_host_is_not_credible() {
        let policy = DomainPolicy::default();
        assert!(!policy.is_credible("https://notarealuniversity.edu.fake.com/"));
        assert!(!policy.is_credible("https://example.com/.edu/page"));
        assert!(!policy.is_credible("https://example.com/?ref=springer.com"));
    }

    #[test]
    fn test_host_matching_is_case_insensitive() {
        let policy = DomainPolicy::default();
        assert!(policy.is_credible("HTTPS://WWW.STANFORD.EDU/Research"));
        assert!(policy.is_credible("https://mit.edu./paper"));
    }

    #[test]
    fn test_unparsable_urls_are_not_credible() {
        let policy = DomainPolicy::default();
        assert!(!policy.is_credible("not a url"));
        assert!(!policy.is_credible("mailto:someone@mit.edu"));
        assert!(!policy.is_credible(""));
    }

    #[test]
    fn test_check_is_not_applicable_without_url() {
        let policy = DomainPolicy::default();
        assert_eq!(policy.check(None), Check::NotApplicable);
        assert_eq!(policy.check(Some("https://mit.edu")), Check::Passed);
        assert_eq!(policy.check(Some("https://example.com")), Check::Failed);
    }

    #[test]
    fn test_custom_lists_are_normalized() {
        let policy = DomainPolicy::new(&["AC.UK"], &[".Nature.com"]);
        assert!(policy.is_credible("https://www.ox.ac.uk/"));
        assert!(policy.is_credible("https://nature.com/articles/1"));
        assert!(!policy.is_credible("https://mit.edu/"));
    }
}
