//! Pipeline configuration.

use crate::error::{Error, Result};
use std::time::Duration;

/// Default model for every agent
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Default timeout for outbound HTTP requests
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(120);

/// Sender and recipient for report delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConfig {
    pub sendgrid_api_key: String,
    pub from: String,
    pub to: String,
}

/// Configuration for a research pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct ResearchConfig {
    pub openai_api_key: String,
    /// OpenAI-compatible endpoint; the public API when unset
    pub openai_base_url: Option<String>,
    /// The model used by every agent
    pub model: String,
    /// Upper bound on concurrent searches; unbounded when unset
    pub max_concurrent_searches: Option<usize>,
    pub http_timeout: Duration,
    /// Exa search key; without it the search tool reports an error
    pub exa_api_key: Option<String>,
    /// Delivery settings; delivery is skipped when unset
    pub email: Option<EmailConfig>,
}

impl ResearchConfig {
    /// Create a config with defaults and the given API key.
    pub fn new(openai_api_key: impl Into<String>) -> Self {
        Self {
            openai_api_key: openai_api_key.into(),
            openai_base_url: None,
            model: DEFAULT_MODEL.to_string(),
            max_concurrent_searches: None,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            exa_api_key: None,
            email: None,
        }
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("OPENAI_API_KEY")
            .ok_or_else(|| Error::Config("OPENAI_API_KEY is not set".to_string()))?;

        let mut config = Self::new(api_key);
        config.openai_base_url = get("OPENAI_BASE_URL");
        if let Some(model) = get("QUARRY_MODEL") {
            config.model = model;
        }
        if let Some(raw) = get("QUARRY_MAX_CONCURRENT_SEARCHES") {
            let n = parse_number(&raw, "QUARRY_MAX_CONCURRENT_SEARCHES")?;
            if n == 0 {
                return Err(Error::Config(
                    "QUARRY_MAX_CONCURRENT_SEARCHES must be at least 1".to_string(),
                ));
            }
            config.max_concurrent_searches = Some(n as usize);
        }
        if let Some(raw) = get("QUARRY_HTTP_TIMEOUT_SECS") {
            config.http_timeout =
                Duration::from_secs(parse_number(&raw, "QUARRY_HTTP_TIMEOUT_SECS")?);
        }
        config.exa_api_key = get("EXA_API_KEY");
        config.email = get("SENDGRID_API_KEY").map(|key| EmailConfig {
            sendgrid_api_key: key,
            from: get("FROM_EMAIL").unwrap_or_else(|| "noreply@example.com".to_string()),
            to: get("TO_EMAIL").unwrap_or_else(|| "user@example.com".to_string()),
        });

        Ok(config)
    }
}

fn parse_number(raw: &str, key: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a positive integer, got '{}'", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_requires_api_key() {
        let err = ResearchConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = ResearchConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "  ")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_defaults() {
        let config = ResearchConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config, ResearchConfig::new("sk-test"));
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.email.is_none());
        assert!(config.max_concurrent_searches.is_none());
    }

    #[test]
    fn test_full_environment() {
        let config = ResearchConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:11434/v1"),
            ("QUARRY_MODEL", "llama3.1"),
            ("QUARRY_MAX_CONCURRENT_SEARCHES", "3"),
            ("QUARRY_HTTP_TIMEOUT_SECS", "30"),
            ("EXA_API_KEY", "exa-test"),
            ("SENDGRID_API_KEY", "sg-test"),
            ("TO_EMAIL", "reader@example.com"),
        ]))
        .unwrap();

        assert_eq!(config.openai_base_url.as_deref(), Some("http://localhost:11434/v1"));
        assert_eq!(config.model, "llama3.1");
        assert_eq!(config.max_concurrent_searches, Some(3));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.exa_api_key.as_deref(), Some("exa-test"));

        let email = config.email.unwrap();
        assert_eq!(email.sendgrid_api_key, "sg-test");
        assert_eq!(email.from, "noreply@example.com");
        assert_eq!(email.to, "reader@example.com");
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let err = ResearchConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("QUARRY_MAX_CONCURRENT_SEARCHES", "many"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));

        let err = ResearchConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("QUARRY_MAX_CONCURRENT_SEARCHES", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
