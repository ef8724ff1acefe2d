//! Runtime configuration from `ROSTER_*` environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, bail};

use roster_observability::LogFormat;

/// Where export files are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactBackend {
    Filesystem(PathBuf),
    InMemory,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub workers: usize,
    pub poll_interval: Duration,
    pub artifacts: ArtifactBackend,
    /// Zero disables the list cache.
    pub list_cache_ttl: Duration,
    pub page_size: usize,
    pub max_page_size: usize,
    /// Random people inserted at startup.
    pub seed_persons: usize,
    pub log_format: LogFormat,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            workers: 2,
            poll_interval: Duration::from_millis(100),
            artifacts: ArtifactBackend::Filesystem(PathBuf::from("media/exports")),
            list_cache_ttl: Duration::from_secs(60),
            page_size: 10,
            max_page_size: 100,
            seed_persons: 0,
            log_format: LogFormat::Json,
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset or blank keys keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(v) = get("ROSTER_BIND_ADDR") {
            config.bind_addr = parse("ROSTER_BIND_ADDR", &v)?;
        }
        if let Some(v) = get("ROSTER_WORKERS") {
            config.workers = parse("ROSTER_WORKERS", &v)?;
            if config.workers == 0 {
                bail!("ROSTER_WORKERS must be at least 1");
            }
        }
        if let Some(v) = get("ROSTER_POLL_INTERVAL_MS") {
            config.poll_interval = Duration::from_millis(parse("ROSTER_POLL_INTERVAL_MS", &v)?);
        }
        if let Some(v) = get("ROSTER_EXPORT_DIR") {
            config.artifacts = ArtifactBackend::Filesystem(PathBuf::from(v));
        }
        if let Some(v) = get("ROSTER_LIST_CACHE_TTL_SECS") {
            config.list_cache_ttl = Duration::from_secs(parse("ROSTER_LIST_CACHE_TTL_SECS", &v)?);
        }
        if let Some(v) = get("ROSTER_PAGE_SIZE") {
            config.page_size = parse("ROSTER_PAGE_SIZE", &v)?;
        }
        if let Some(v) = get("ROSTER_MAX_PAGE_SIZE") {
            config.max_page_size = parse("ROSTER_MAX_PAGE_SIZE", &v)?;
        }
        if let Some(v) = get("ROSTER_SEED_PERSONS") {
            config.seed_persons = parse("ROSTER_SEED_PERSONS", &v)?;
        }
        if let Some(v) = get("ROSTER_LOG_FORMAT") {
            config.log_format = v.parse().map_err(anyhow::Error::msg)?;
        }

        if config.page_size == 0 || config.max_page_size == 0 {
            bail!("page sizes must be at least 1");
        }
        if config.page_size > config.max_page_size {
            bail!(
                "ROSTER_PAGE_SIZE ({}) exceeds ROSTER_MAX_PAGE_SIZE ({})",
                config.page_size,
                config.max_page_size
            );
        }

        Ok(config)
    }

    /// In-memory artifacts, fast polling, no seed data.
    pub fn for_tests() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            poll_interval: Duration::from_millis(10),
            artifacts: ArtifactBackend::InMemory,
            ..Self::default()
        }
    }
}

fn parse<T>(key: &str, raw: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{key}: invalid value {raw:?}"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = ApiConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.bind_addr.port(), 8000);
        assert_eq!(config.workers, 2);
        assert_eq!(config.list_cache_ttl, Duration::from_secs(60));
        assert_eq!(
            config.artifacts,
            ArtifactBackend::Filesystem(PathBuf::from("media/exports"))
        );
    }

    #[test]
    fn reads_overrides() {
        let config = ApiConfig::from_lookup(lookup(&[
            ("ROSTER_BIND_ADDR", "127.0.0.1:9000"),
            ("ROSTER_WORKERS", "4"),
            ("ROSTER_LIST_CACHE_TTL_SECS", "0"),
            ("ROSTER_LOG_FORMAT", "pretty"),
            ("ROSTER_PAGE_SIZE", " "),
        ]))
        .unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.workers, 4);
        assert!(config.list_cache_ttl.is_zero());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.page_size, 10);
    }

    #[test]
    fn rejects_bad_values() {
        let err = ApiConfig::from_lookup(lookup(&[("ROSTER_WORKERS", "many")])).unwrap_err();
        assert!(err.to_string().contains("ROSTER_WORKERS"));
        assert!(ApiConfig::from_lookup(lookup(&[("ROSTER_WORKERS", "0")])).is_err());
        assert!(ApiConfig::from_lookup(lookup(&[("ROSTER_PAGE_SIZE", "500")])).is_err());
        assert!(ApiConfig::from_lookup(lookup(&[("ROSTER_LOG_FORMAT", "xml")])).is_err());
    }
}
