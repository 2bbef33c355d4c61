//! Client configuration.
//!
//! Built once at process start and handed to `ApiService::new`. The only
//! externally visible knob the API layer depends on is the base URL; the
//! timeout and polling cadence have defaults that tests shorten.

use std::time::Duration;

use url::Url;

use crate::error::ConfigError;

/// Environment variable holding the API base URL.
pub const BASE_URL_ENV: &str = "CASE_API_URL";

/// Environment variable holding the per-request timeout, in seconds.
pub const TIMEOUT_ENV: &str = "CASE_API_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// Headers sent with every request unless the caller overrides them.
pub const DEFAULT_HEADERS: [(&str, &str); 2] = [
    ("Content-Type", "application/json"),
    ("Accept", "application/json"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prefix joined verbatim with every endpoint path.
    pub base_url: String,
    /// Upper bound on a single round-trip, enforced by the transport.
    pub timeout: Duration,
    /// Interval between polls of an update subscription.
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Check that the configuration can actually drive requests: an absolute
    /// `http`/`https` base URL with a host, and non-zero timeout and poll
    /// interval.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        let url = Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidBaseUrl(self.base_url.clone()))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout(format!("{}s", self.timeout.as_secs())));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }

    /// Read `CASE_API_URL` and `CASE_API_TIMEOUT_SECS` from the process
    /// environment, falling back to the local development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env`, reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = match lookup(BASE_URL_ENV) {
            Some(url) if url.trim().is_empty() => return Err(ConfigError::EmptyBaseUrl),
            Some(url) => url,
            None => DEFAULT_BASE_URL.to_string(),
        };

        let timeout = match lookup(TIMEOUT_ENV) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
            None => DEFAULT_TIMEOUT,
        };

        let config = Self {
            base_url,
            timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        };
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_variables_use_defaults() {
        let config = ClientConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.base_url, "http://localhost:8000/api");
        assert_eq!(config.poll_interval, Duration::from_millis(5000));
    }

    #[test]
    fn base_url_is_kept_verbatim() {
        let config =
            ClientConfig::from_lookup(lookup(&[(BASE_URL_ENV, "https://cases.example/api/")])).unwrap();
        assert_eq!(config.base_url, "https://cases.example/api/");
    }

    #[test]
    fn timeout_is_parsed_in_seconds() {
        let config = ClientConfig::from_lookup(lookup(&[(TIMEOUT_ENV, "5")])).unwrap();
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[(TIMEOUT_ENV, "soon")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeout("soon".to_string()));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[(TIMEOUT_ENV, "0")])).unwrap_err();
        assert_eq!(err, ConfigError::InvalidTimeout("0".to_string()));

        let err = ClientConfig::default().with_timeout(Duration::ZERO).validate().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidTimeout(_)));
    }

    #[test]
    fn base_url_must_be_absolute_http() {
        for url in ["localhost:8000/api", "/api", "ftp://files.example/api", "http://"] {
            let err = ClientConfig::from_lookup(lookup(&[(BASE_URL_ENV, url)])).unwrap_err();
            assert_eq!(err, ConfigError::InvalidBaseUrl(url.to_string()), "{url}");
        }
        assert!(ClientConfig::from_lookup(lookup(&[(BASE_URL_ENV, "https://cases.example")])).is_ok());
    }

    #[test]
    fn zero_poll_interval_is_rejected() {
        let err = ClientConfig::default()
            .with_poll_interval(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert_eq!(err, ConfigError::ZeroPollInterval);
    }

    #[test]
    fn blank_base_url_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[(BASE_URL_ENV, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::EmptyBaseUrl);
    }
}
