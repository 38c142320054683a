//! URL reachability probing.
//!
//! A probe is a single `HEAD` request with a fixed client-side timeout. The
//! answer is a plain boolean: `true` iff the final response status is in
//! `[200, 400)`. Timeouts, DNS failures, refused connections, TLS errors,
//! and malformed URLs all fold into `false`. There are no retries.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::ProbeConfig;

/// Checks whether a URL answers.
///
/// Implementations must not mutate local or remote state beyond the single
/// outbound request.
#[async_trait]
pub trait UrlProber: Send + Sync {
    async fn probe(&self, url: &str) -> bool;
}

/// [`UrlProber`] backed by a shared `reqwest` client.
///
/// Build once per process and reuse across requests so connections are
/// pooled.
pub struct HttpProber {
    client: Client,
}

impl HttpProber {
    pub fn new(config: &ProbeConfig) -> anyhow::Result<Self> {
        Self::with_timeout(config.timeout(), &config.user_agent)
    }

    pub fn with_timeout(timeout: Duration, user_agent: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }
}

/// True iff `status` counts as reachable.
pub fn is_reachable_status(status: u16) -> bool {
    (200..400).contains(&status)
}

#[async_trait]
impl UrlProber for HttpProber {
    async fn probe(&self, url: &str) -> bool {
        match self.client.head(url).send().await {
            Ok(resp) => {
                let status = resp.status().as_u16();
                tracing::debug!(url, status, "probe answered");
                is_reachable_status(status)
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "probe failed");
                false
            }
        }
    }
}
