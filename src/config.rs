use anyhow::{Context, Result};
use citecheck_core::domain::{DomainPolicy, DEFAULT_PUBLISHERS, DEFAULT_SUFFIXES};
use citecheck_core::score::ScoringConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub domains: DomainsConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_origins: default_cors_origins(),
            max_batch_size: default_max_batch_size(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7340".to_string()
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_max_batch_size() -> usize {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProbeConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            max_in_flight: default_max_in_flight(),
            user_agent: default_user_agent(),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_timeout_ms() -> u64 {
    5000
}
fn default_max_in_flight() -> usize {
    16
}
fn default_user_agent() -> String {
    format!("citecheck/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Deserialize, Clone)]
pub struct DomainsConfig {
    #[serde(default = "default_suffixes")]
    pub suffixes: Vec<String>,
    #[serde(default = "default_publishers")]
    pub publishers: Vec<String>,
}

impl Default for DomainsConfig {
    fn default() -> Self {
        Self {
            suffixes: default_suffixes(),
            publishers: default_publishers(),
        }
    }
}

impl DomainsConfig {
    pub fn policy(&self) -> DomainPolicy {
        DomainPolicy::new(&self.suffixes, &self.publishers)
    }
}

fn default_suffixes() -> Vec<String> {
    DEFAULT_SUFFIXES.iter().map(|s| s.to_string()).collect()
}
fn default_publishers() -> Vec<String> {
    DEFAULT_PUBLISHERS.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_ttl_days")]
    pub ttl_days: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_days: default_ttl_days(),
        }
    }
}

impl SessionConfig {
    pub fn ttl_secs(&self) -> i64 {
        i64::from(self.ttl_days) * 24 * 60 * 60
    }
}

fn default_ttl_days() -> u32 {
    7
}

impl Config {
    /// Defaults for commands that can run without a config file.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/citecheck.sqlite"),
            },
            server: ServerConfig::default(),
            scoring: ScoringConfig::default(),
            probe: ProbeConfig::default(),
            domains: DomainsConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<()> {
    if config.db.path.as_os_str().is_empty() {
        anyhow::bail!("db.path must not be empty");
    }

    if config.server.max_batch_size < 1 {
        anyhow::bail!("server.max_batch_size must be >= 1");
    }

    // Validate scoring
    let s = &config.scoring;
    if s.max_score() != 100 {
        anyhow::bail!(
            "scoring weights must sum to 100 (got {})",
            s.max_score()
        );
    }
    if s.pass_cutoff > 100 {
        anyhow::bail!("scoring.pass_cutoff must be <= 100");
    }
    if s.recency_years < 1 {
        anyhow::bail!("scoring.recency_years must be >= 1");
    }

    // Validate probe
    if config.probe.timeout_ms == 0 {
        anyhow::bail!("probe.timeout_ms must be > 0");
    }
    if config.probe.max_in_flight < 1 {
        anyhow::bail!("probe.max_in_flight must be >= 1");
    }

    if !(1..=7).contains(&config.session.ttl_days) {
        anyhow::bail!(
            "session.ttl_days must be between 1 and 7 (got {})",
            config.session.ttl_days
        );
    }

    Ok(())
}
