use crate::{ClientError, Result};
use std::time::Duration;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://backend-new-bagaent1.vercel.app";
pub const BASE_URL_ENV: &str = "MERMEND_API_BASE_URL";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("valid default base URL"),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url.trim()).map_err(|source| ClientError::InvalidBaseUrl {
            value: base_url.to_string(),
            source,
        })?;
        if !matches!(base_url.scheme(), "http" | "https") || base_url.cannot_be_a_base() {
            return Err(ClientError::UnsupportedBaseUrl {
                value: base_url.to_string(),
            });
        }
        Ok(Self {
            base_url,
            ..Self::default()
        })
    }

    /// Default config, with the base URL taken from `MERMEND_API_BASE_URL` when set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        match lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            Some(value) => Self::new(&value),
            None => Ok(Self::default()),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_hosted_backend() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.base_url.as_str(), "https://backend-new-bagaent1.vercel.app/");
        assert_eq!(cfg.timeout, Duration::from_secs(60));
    }

    #[test]
    fn environment_overrides_base_url() {
        let cfg = ClientConfig::from_lookup(|_| Some("http://localhost:5000".to_string())).unwrap();
        assert_eq!(cfg.base_url.as_str(), "http://localhost:5000/");
        let cfg = ClientConfig::from_lookup(|_| Some("  ".to_string())).unwrap();
        assert_eq!(cfg, ClientConfig::default());
    }

    #[test]
    fn rejects_relative_base_url() {
        assert!(matches!(
            ClientConfig::new("/api"),
            Err(ClientError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn rejects_non_http_base_url() {
        for value in ["mailto:ops@example.com", "ftp://files.example.com/api", "data:text/plain,x"] {
            assert!(
                matches!(
                    ClientConfig::new(value),
                    Err(ClientError::UnsupportedBaseUrl { .. })
                ),
                "{value}"
            );
        }
        assert!(ClientConfig::new("https://example.com/backend/").is_ok());
        assert!(matches!(
            ClientConfig::from_lookup(|_| Some("mailto:x".to_string())),
            Err(ClientError::UnsupportedBaseUrl { .. })
        ));
    }
}
