//! Validation orchestration.
//!
//! [`Validator`] fans a batch of sources out to the per-source checks, scores
//! each one, and persists the results keyed by `(session_id, source_id)`.
//!
//! # Pipeline
//!
//! ```text
//! sources ──▶ input checks ──▶ per-source tasks (≤ max_in_flight) ──▶ store
//!                              ├─ url probe (network)
//!                              ├─ domain credibility
//!                              ├─ recency
//!                              └─ required fields
//!                                      │
//!                                      ▼
//!                               score + verdict
//! ```
//!
//! Two entry points share the pipeline:
//!
//! - [`Validator::validate_batch`] is all-or-nothing: if any source fails
//!   or the store write fails, the caller gets an error and nothing is
//!   written.
//! - [`Validator::validate_each`] isolates sources: each one is evaluated
//!   and written on its own, and the caller receives a per-source outcome.
//!
//! Results are matched back to sources by id, never by position.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use anyhow::anyhow;
use chrono::{Datelike, Utc};
use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use citecheck_core::checks::{has_required_fields, is_recent};
use citecheck_core::domain::DomainPolicy;
use citecheck_core::models::{Check, Source, ValidationChecks, ValidationResult};
use citecheck_core::score::ScoringConfig;
use citecheck_core::store::ResultStore;

use crate::config::Config;
use crate::error::ValidateError;
use crate::probe::UrlProber;

/// Outcome for one source of an isolated batch.
#[derive(Debug, Clone)]
pub struct SourceOutcome {
    pub source_id: String,
    pub result: Result<ValidationResult, String>,
}

/// Validation orchestrator.
///
/// Holds the injected prober and store plus the scoring and domain policy.
/// Construct once per process; clones share the same handles.
#[derive(Clone)]
pub struct Validator {
    prober: Arc<dyn UrlProber>,
    store: Arc<dyn ResultStore>,
    scoring: ScoringConfig,
    domains: Arc<DomainPolicy>,
    max_in_flight: usize,
    max_batch_size: usize,
    ttl_secs: i64,
}

impl Validator {
    pub fn new(
        prober: Arc<dyn UrlProber>,
        store: Arc<dyn ResultStore>,
        config: &Config,
    ) -> Self {
        Self {
            prober,
            store,
            scoring: config.scoring,
            domains: Arc::new(config.domains.policy()),
            max_in_flight: config.probe.max_in_flight.max(1),
            max_batch_size: config.server.max_batch_size,
            ttl_secs: config.session.ttl_secs(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ResultStore> {
        &self.store
    }

    pub fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    /// Expiry timestamp for records written at `now`.
    pub fn expires_at(&self, now: i64) -> i64 {
        now.saturating_add(self.ttl_secs)
    }

    /// Runs every check on one source and scores it.
    ///
    /// Never fails: an unreachable URL is a failed check, not an error.
    pub async fn evaluate(&self, source: &Source, current_year: i32) -> ValidationResult {
        let url = source.url();
        let url_accessible = match url {
            Some(u) => Check::from(self.prober.probe(u).await),
            None => Check::NotApplicable,
        };

        let checks = ValidationChecks {
            url_accessible,
            // Style conformance is reported separately by the format checker.
            format_correct: true,
            credible_domain: self.domains.check(url),
            is_recent: is_recent(source.year, current_year, self.scoring.recency_years),
            has_required_fields: has_required_fields(source),
        };
        let (score, is_valid) = self.scoring.evaluate(&checks);
        let (issues, warnings) = describe(&checks, self.scoring.recency_years);

        ValidationResult {
            source_id: source.id.clone(),
            score,
            is_valid,
            checks,
            issues,
            warnings,
            validated_at: Utc::now(),
        }
    }

    /// Rejects malformed batches before any check runs.
    pub fn check_batch(&self, session_id: &str, sources: &[Source]) -> Result<(), ValidateError> {
        if session_id.trim().is_empty() {
            return Err(ValidateError::invalid("sessionId is required"));
        }
        if sources.len() > self.max_batch_size {
            return Err(ValidateError::invalid(format!(
                "too many sources: {} (max {})",
                sources.len(),
                self.max_batch_size
            )));
        }
        let mut seen = HashSet::new();
        for s in sources {
            if s.id.trim().is_empty() {
                return Err(ValidateError::invalid("every source needs a non-empty id"));
            }
            if s.citation.trim().is_empty() {
                return Err(ValidateError::invalid(format!(
                    "source {} has an empty citation",
                    s.id
                )));
            }
            if !seen.insert(s.id.as_str()) {
                return Err(ValidateError::invalid(format!("duplicate source id: {}", s.id)));
            }
        }
        Ok(())
    }

    /// Validates a batch and persists it atomically.
    ///
    /// Returns one result per source, in input order. Any failure aborts the
    /// whole batch and nothing is written.
    pub async fn validate_batch(
        &self,
        session_id: &str,
        sources: &[Source],
    ) -> Result<Vec<ValidationResult>, ValidateError> {
        self.check_batch(session_id, sources)?;
        info!(session_id, count = sources.len(), "validating batch");

        let current_year = Utc::now().year();
        let mut by_id: HashMap<String, ValidationResult> = HashMap::new();
        for (source_id, outcome) in self.run_tasks(sources, current_year, None).await {
            match outcome {
                Ok(result) => {
                    by_id.insert(source_id, result);
                }
                Err(e) => {
                    return Err(ValidateError::Internal(anyhow!(
                        "validation of source {} failed: {}",
                        source_id,
                        e
                    )))
                }
            }
        }

        let mut results = Vec::with_capacity(sources.len());
        for s in sources {
            let result = by_id
                .remove(&s.id)
                .ok_or_else(|| anyhow!("no result produced for source {}", s.id))?;
            results.push(result);
        }

        let now = Utc::now().timestamp();
        self.store
            .put_batch(session_id, sources, &results, self.expires_at(now))
            .await?;

        let valid = results.iter().filter(|r| r.is_valid).count();
        info!(session_id, total = results.len(), valid, "batch validated");
        Ok(results)
    }

    /// Validates and persists each source independently.
    ///
    /// Input checks still apply to the batch as a whole. After that, a
    /// failing source (task panic or store error) does not affect the
    /// others; its outcome carries the error message instead.
    pub async fn validate_each(
        &self,
        session_id: &str,
        sources: &[Source],
    ) -> Result<Vec<SourceOutcome>, ValidateError> {
        self.check_batch(session_id, sources)?;
        info!(session_id, count = sources.len(), "validating sources independently");

        let current_year = Utc::now().year();
        let mut by_id: HashMap<String, Result<ValidationResult, String>> = self
            .run_tasks(sources, current_year, Some(session_id))
            .await
            .into_iter()
            .collect();

        let outcomes: Vec<SourceOutcome> = sources
            .iter()
            .map(|s| SourceOutcome {
                source_id: s.id.clone(),
                result: by_id
                    .remove(&s.id)
                    .unwrap_or_else(|| Err("no result produced".to_string())),
            })
            .collect();

        let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
        if failed > 0 {
            warn!(session_id, failed, "some sources failed validation");
        }
        Ok(outcomes)
    }

    /// Evaluates every source on its own task, at most `max_in_flight` at a
    /// time. With `persist_to`, each task also writes its own source and
    /// result.
    async fn run_tasks(
        &self,
        sources: &[Source],
        current_year: i32,
        persist_to: Option<&str>,
    ) -> Vec<(String, Result<ValidationResult, String>)> {
        let tasks = sources.iter().cloned().map(|source| {
            let this = self.clone();
            let session_id = persist_to.map(str::to_string);
            let source_id = source.id.clone();
            let handle = tokio::spawn(async move {
                let result = this.evaluate(&source, current_year).await;
                if let Some(session_id) = session_id {
                    let now = Utc::now().timestamp();
                    this.store
                        .put_batch(
                            &session_id,
                            std::slice::from_ref(&source),
                            std::slice::from_ref(&result),
                            this.expires_at(now),
                        )
                        .await
                        .map_err(|e| format!("failed to store result: {:#}", e))?;
                }
                Ok::<_, String>(result)
            });
            async move {
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(format!("validation task failed: {}", e)),
                };
                (source_id, outcome)
            }
        });

        stream::iter(tasks)
            .buffer_unordered(self.max_in_flight)
            .collect()
            .await
    }
}

/// Human-readable issues (failed checks) and warnings (skipped checks).
fn describe(checks: &ValidationChecks, recency_years: u32) -> (Vec<String>, Vec<String>) {
    let mut issues = Vec::new();
    let mut warnings = Vec::new();

    match checks.url_accessible {
        Check::Failed => issues.push("URL is not accessible".to_string()),
        Check::NotApplicable => {
            warnings.push("No URL provided; URL and domain checks skipped".to_string())
        }
        Check::Passed => {}
    }
    if checks.credible_domain == Check::Failed {
        issues.push("Domain is not on the credible list".to_string());
    }
    match checks.is_recent {
        Check::Failed => issues.push(format!("Source is older than {} years", recency_years)),
        Check::NotApplicable => {
            warnings.push("No publication year found; recency check skipped".to_string())
        }
        Check::Passed => {}
    }
    if !checks.format_correct {
        issues.push("Citation format is incorrect".to_string());
    }
    if !checks.has_required_fields {
        issues.push("Missing author or title".to_string());
    }

    (issues, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use citecheck_core::models::SourceType;
    use citecheck_core::store::memory::InMemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedProber {
        reachable: bool,
        calls: AtomicUsize,
    }

    impl FixedProber {
        fn new(reachable: bool) -> Arc<Self> {
            Arc::new(Self {
                reachable,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl UrlProber for FixedProber {
        async fn probe(&self, _url: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reachable
        }
    }

    fn validator(prober: Arc<dyn UrlProber>, store: Arc<dyn ResultStore>) -> Validator {
        Validator::new(prober, store, &Config::minimal())
    }

    fn springer_source() -> Source {
        Source {
            id: "s1".to_string(),
            citation: "Smith, J. (2020). Study. Journal.".to_string(),
            source_type: SourceType::Journal,
            author: Some("Smith, J.".to_string()),
            year: Some(2020),
            title: Some("Study".to_string()),
            url: Some("https://springer.com/x".to_string()),
        }
    }

    fn bare_source() -> Source {
        Source {
            id: "s2".to_string(),
            citation: "Untitled notes, 1990.".to_string(),
            source_type: SourceType::Other,
            author: None,
            year: Some(1990),
            title: None,
            url: None,
        }
    }

    #[tokio::test]
    async fn test_reachable_credible_recent_complete_scores_100() {
        let v = validator(FixedProber::new(true), Arc::new(InMemoryStore::new()));
        let r = v.evaluate(&springer_source(), 2025).await;
        assert_eq!(r.checks.url_accessible, Check::Passed);
        assert!(r.checks.format_correct);
        assert_eq!(r.checks.credible_domain, Check::Passed);
        assert_eq!(r.checks.is_recent, Check::Passed);
        assert!(r.checks.has_required_fields);
        assert_eq!(r.score, 100);
        assert!(r.is_valid);
        assert!(r.issues.is_empty());
        assert!(r.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_url_scores_80() {
        let v = validator(FixedProber::new(false), Arc::new(InMemoryStore::new()));
        let r = v.evaluate(&springer_source(), 2025).await;
        assert_eq!(r.checks.url_accessible, Check::Failed);
        assert_eq!(r.score, 80);
        assert!(r.is_valid);
        assert_eq!(r.issues, vec!["URL is not accessible".to_string()]);
    }

    #[tokio::test]
    async fn test_bare_old_source_scores_30_without_probing() {
        let prober = FixedProber::new(true);
        let v = validator(prober.clone(), Arc::new(InMemoryStore::new()));
        let r = v.evaluate(&bare_source(), 2025).await;
        assert_eq!(r.checks.url_accessible, Check::NotApplicable);
        assert_eq!(r.checks.credible_domain, Check::NotApplicable);
        assert_eq!(r.checks.is_recent, Check::Failed);
        assert!(!r.checks.has_required_fields);
        assert_eq!(r.score, 30);
        assert!(!r.is_valid);
        assert_eq!(prober.calls.load(Ordering::SeqCst), 0);
        assert!(r.warnings.iter().any(|w| w.contains("No URL")));
        assert!(r.issues.contains(&"Missing author or title".to_string()));
    }

    #[tokio::test]
    async fn test_url_less_source_caps_at_60() {
        let v = validator(FixedProber::new(true), Arc::new(InMemoryStore::new()));
        let mut s = springer_source();
        s.url = None;
        let r = v.evaluate(&s, 2025).await;
        assert_eq!(r.score, 60);
        assert!(r.is_valid);
    }

    #[tokio::test]
    async fn test_batch_persists_results_in_input_order() {
        let store = Arc::new(InMemoryStore::new());
        let v = validator(FixedProber::new(true), store.clone());
        let sources = vec![bare_source(), springer_source()];

        let results = v.validate_batch("sess", &sources).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source_id, "s2");
        assert_eq!(results[1].source_id, "s1");

        let stored = store.get_results("sess", 0).await.unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(store.get_sources("sess", 0).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_revalidation_replaces_previous_result() {
        let store = Arc::new(InMemoryStore::new());
        validator(FixedProber::new(false), store.clone())
            .validate_batch("sess", &[springer_source()])
            .await
            .unwrap();
        validator(FixedProber::new(true), store.clone())
            .validate_batch("sess", &[springer_source()])
            .await
            .unwrap();

        let stored = store.get_results("sess", 0).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].score, 100);
    }

    #[tokio::test]
    async fn test_empty_batch_is_accepted() {
        let v = validator(FixedProber::new(true), Arc::new(InMemoryStore::new()));
        assert!(v.validate_batch("sess", &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_batches_are_rejected() {
        let v = validator(FixedProber::new(true), Arc::new(InMemoryStore::new()));

        let err = v.validate_batch("  ", &[springer_source()]).await.unwrap_err();
        assert!(matches!(err, ValidateError::InvalidArgument(_)));

        let err = v
            .validate_batch("sess", &[springer_source(), springer_source()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("duplicate source id"));

        let mut blank = bare_source();
        blank.citation = " ".to_string();
        let err = v.validate_batch("sess", &[blank]).await.unwrap_err();
        assert!(err.to_string().contains("empty citation"));

        let many: Vec<Source> = (0..101)
            .map(|i| Source {
                id: format!("s{}", i),
                ..bare_source()
            })
            .collect();
        let err = v.validate_batch("sess", &many).await.unwrap_err();
        assert!(err.to_string().contains("too many sources"));
    }

    struct FailingStore;

    #[async_trait]
    impl ResultStore for FailingStore {
        async fn put_sources(&self, _: &str, _: &[Source], _: i64) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
        async fn put_results(
            &self,
            _: &str,
            _: &[ValidationResult],
            _: i64,
        ) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
        async fn put_batch(
            &self,
            _: &str,
            _: &[Source],
            _: &[ValidationResult],
            _: i64,
        ) -> anyhow::Result<()> {
            anyhow::bail!("disk full")
        }
        async fn get_sources(&self, _: &str, _: i64) -> anyhow::Result<Vec<Source>> {
            Ok(Vec::new())
        }
        async fn get_results(&self, _: &str, _: i64) -> anyhow::Result<Vec<ValidationResult>> {
            Ok(Vec::new())
        }
        async fn purge_expired(&self, _: i64) -> anyhow::Result<u64> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn test_store_failure_fails_whole_batch() {
        let v = validator(FixedProber::new(true), Arc::new(FailingStore));
        let err = v
            .validate_batch("sess", &[springer_source(), bare_source()])
            .await
            .unwrap_err();
        assert!(matches!(err, ValidateError::Internal(_)));
        assert!(err.to_string().contains("disk full"));
    }

    #[tokio::test]
    async fn test_validate_each_reports_per_source_failures() {
        let v = validator(FixedProber::new(true), Arc::new(FailingStore));
        let outcomes = v
            .validate_each("sess", &[springer_source(), bare_source()])
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].source_id, "s1");
        for o in &outcomes {
            let err = o.result.as_ref().unwrap_err();
            assert!(err.contains("disk full"), "unexpected error: {}", err);
        }
    }

    struct PanickingProber;

    #[async_trait]
    impl UrlProber for PanickingProber {
        async fn probe(&self, url: &str) -> bool {
            if url.contains("boom") {
                panic!("probe exploded");
            }
            true
        }
    }

    #[tokio::test]
    async fn test_validate_each_isolates_a_panicking_source() {
        let store = Arc::new(InMemoryStore::new());
        let v = validator(Arc::new(PanickingProber), store.clone());
        let mut boom = springer_source();
        boom.id = "boom".to_string();
        boom.url = Some("https://boom.example.com/".to_string());

        let outcomes = v
            .validate_each("sess", &[boom.clone(), bare_source()])
            .await
            .unwrap();
        assert!(outcomes[0].result.is_err());
        assert_eq!(outcomes[1].result.as_ref().unwrap().score, 30);

        let stored = store.get_results("sess", 0).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].source_id, "s2");

        let err = v.validate_batch("other", &[boom, bare_source()]).await.unwrap_err();
        assert!(matches!(err, ValidateError::Internal(_)));
        assert!(store.get_results("other", 0).await.unwrap().is_empty());
    }

    /// Tracks how many probes run at once.
    struct SlowProber {
        current: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl UrlProber for SlowProber {
        async fn probe(&self, _url: &str) -> bool {
            let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            self.current.fetch_sub(1, Ordering::SeqCst);
            true
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_probes_are_bounded_by_max_in_flight() {
        let prober = Arc::new(SlowProber {
            current: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let mut config = Config::minimal();
        config.probe.max_in_flight = 2;
        let v = Validator::new(prober.clone(), Arc::new(InMemoryStore::new()), &config);

        let sources: Vec<Source> = (0..10)
            .map(|i| {
                let mut s = springer_source();
                s.id = format!("s{}", i);
                s
            })
            .collect();

        let results = v.validate_batch("sess", &sources).await.unwrap();
        assert_eq!(results.len(), 10);
        let peak = prober.peak.load(Ordering::SeqCst);
        assert!(peak <= 2, "peak in flight was {}", peak);
        assert!(peak >= 1);
    }

    #[test]
    fn test_describe_reports_each_failed_check() {
        let checks = ValidationChecks {
            url_accessible: Check::Failed,
            format_correct: false,
            credible_domain: Check::Failed,
            is_recent: Check::Failed,
            has_required_fields: false,
        };
        let (issues, warnings) = describe(&checks, 10);
        assert_eq!(
            issues,
            vec![
                "URL is not accessible",
                "Domain is not on the credible list",
                "Source is older than 10 years",
                "Citation format is incorrect",
                "Missing author or title",
            ]
        );
        assert!(warnings.is_empty());
    }
}
