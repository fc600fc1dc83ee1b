//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/atlas.sqlite"
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! public_url = "https://atlas.example.org"   # optional
//! cache_max_age_secs = 300                   # 0 disables the header
//!
//! [query]
//! max_limit = 100
//!
//! [web_annotation]
//! page_size = 10
//!
//! [logging]
//! filter = "info"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub web_annotation: WebAnnotationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Base used for absolute URLs in Web Annotation documents.
    #[serde(default)]
    pub public_url: Option<String>,
    #[serde(default)]
    pub cache_max_age_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    /// Default and upper bound for `limit` on list endpoints.
    #[serde(default = "default_max_limit")]
    pub max_limit: i64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_limit: default_max_limit(),
        }
    }
}

fn default_max_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebAnnotationConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

impl Default for WebAnnotationConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

fn default_page_size() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive, overridden by `RUST_LOG`.
    #[serde(default = "default_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> String {
    "info".to_string()
}

impl QueryConfig {
    /// Applies the default and the ceiling to a caller-supplied limit.
    pub fn effective_limit(&self, requested: Option<i64>) -> i64 {
        match requested {
            Some(n) if n > 0 => n.min(self.max_limit),
            _ => self.max_limit,
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
    if config.query.max_limit < 1 {
        anyhow::bail!("query.max_limit must be >= 1");
    }

    if config.web_annotation.page_size == 0 {
        anyhow::bail!("web_annotation.page_size must be > 0");
    }

    if let Some(url) = &config.server.public_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            anyhow::bail!(
                "server.public_url must start with http:// or https://, got '{}'",
                url
            );
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &str) -> Config {
        let content = format!(
            "[db]\npath = \"atlas.sqlite\"\n\n[server]\nbind = \"127.0.0.1:8000\"\n{}",
            extra
        );
        toml::from_str(&content).unwrap()
    }

    #[test]
    fn test_defaults() {
        let cfg = parse("");
        assert_eq!(cfg.query.max_limit, 100);
        assert_eq!(cfg.web_annotation.page_size, 10);
        assert_eq!(cfg.logging.filter, "info");
        assert_eq!(cfg.server.cache_max_age_secs, 0);
        assert!(cfg.server.public_url.is_none());
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_zero_page_size_rejected() {
        let cfg = parse("[web_annotation]\npage_size = 0\n");
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_bad_public_url_rejected() {
        let mut cfg = parse("");
        cfg.server.public_url = Some("atlas.example.org".to_string());
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn test_effective_limit() {
        let q = QueryConfig { max_limit: 50 };
        assert_eq!(q.effective_limit(None), 50);
        assert_eq!(q.effective_limit(Some(10)), 10);
        assert_eq!(q.effective_limit(Some(500)), 50);
        assert_eq!(q.effective_limit(Some(0)), 50);
    }
}
