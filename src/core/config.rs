//! Configuration management

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::warn;

use crate::core::backoff::{duration_from_secs, BackoffSettings, MAX_INTERVAL_SECS};
use crate::core::retry::RetrySettings;

/// Endpoint used for paid accounts
pub const DEFAULT_SERVER_URL: &str = "https://api.deepl.com";

/// Endpoint used for keys ending in `:fx`
pub const DEFAULT_SERVER_URL_FREE: &str = "https://api-free.deepl.com";

/// Configuration for translator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// DeepL authentication key
    pub auth_key: String,
    /// Overrides the endpoint picked from the key type
    pub server_url: Option<String>,
    /// Minimum timeout of each attempt, in seconds
    pub timeout_secs: f64,
    /// Maximum attempts per request
    pub max_retries: u32,
    /// Delay curve between attempts
    pub backoff: BackoffSettings,
    /// Deadline for a whole call including retries
    pub total_timeout_secs: Option<f64>,
    /// Lower bound between document status polls
    pub poll_min_interval_secs: f64,
    /// Upper bound between document status polls
    pub poll_max_interval_secs: f64,
    /// Extra headers on every request, replacing defaults of the same name
    pub headers: HashMap<String, String>,
    /// Proxy URL for all requests
    pub proxy: Option<String>,
    /// Appended to the User-Agent, e.g. `my-app/1.2`
    pub app_info: Option<String>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            auth_key: std::env::var("DEEPL_AUTH_KEY").unwrap_or_default(),
            server_url: None,
            timeout_secs: 10.0,
            max_retries: 5,
            backoff: BackoffSettings::default(),
            total_timeout_secs: None,
            poll_min_interval_secs: 1.0,
            poll_max_interval_secs: 60.0,
            headers: HashMap::new(),
            proxy: None,
            app_info: None,
        }
    }
}

impl TranslatorConfig {
    /// Config with the given key and defaults for everything else
    pub fn new(auth_key: impl Into<String>) -> Self {
        Self {
            auth_key: auth_key.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        let auth_key = std::env::var("DEEPL_AUTH_KEY")
            .map_err(|_| anyhow::anyhow!("DEEPL_AUTH_KEY environment variable is required"))?;

        let server_url = std::env::var("DEEPL_SERVER_URL").ok();

        let timeout_secs = std::env::var("DEEPL_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10.0".to_string())
            .parse::<f64>()?;

        let max_retries = std::env::var("DEEPL_MAX_RETRIES")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()?;

        let total_timeout_secs = std::env::var("DEEPL_TOTAL_TIMEOUT_SECS")
            .ok()
            .map(|v| v.parse::<f64>())
            .transpose()?;

        let proxy = std::env::var("DEEPL_PROXY").ok();

        Ok(Self {
            auth_key,
            server_url,
            timeout_secs,
            max_retries,
            total_timeout_secs,
            proxy,
            ..Default::default()
        })
    }

    /// Load from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load an optional config file overlaid by `DEEPL_*` environment variables
    pub fn load_layered<P: AsRef<Path>>(path: Option<P>) -> anyhow::Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.as_ref()).required(false));
        }
        let loaded: Self = builder
            .add_source(config::Environment::with_prefix("DEEPL").try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(loaded)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.auth_key.is_empty() {
            return Err(anyhow::anyhow!("auth_key must be a non-empty string"));
        }

        if matches!(&self.server_url, Some(url) if url.trim().is_empty()) {
            return Err(anyhow::anyhow!("If specified, server_url must be a non-empty string"));
        }

        check_secs("timeout_secs", self.timeout_secs)?;
        if self.timeout_secs == 0.0 {
            return Err(anyhow::anyhow!("timeout_secs must be greater than 0"));
        }

        if let Some(total) = self.total_timeout_secs {
            check_secs("total_timeout_secs", total)?;
            if total == 0.0 {
                return Err(anyhow::anyhow!("total_timeout_secs must be greater than 0"));
            }
        }

        let b = &self.backoff;
        check_secs("backoff.initial_secs", b.initial_secs)?;
        check_secs("backoff.max_secs", b.max_secs)?;
        if !(b.multiplier.is_finite() && b.multiplier >= 1.0) || b.max_secs < b.initial_secs {
            return Err(anyhow::anyhow!(
                "backoff needs initial >= 0, a finite multiplier >= 1 and max >= initial"
            ));
        }
        if !(0.0..1.0).contains(&b.jitter) {
            return Err(anyhow::anyhow!("backoff jitter must be in [0, 1)"));
        }

        check_secs("poll_min_interval_secs", self.poll_min_interval_secs)?;
        check_secs("poll_max_interval_secs", self.poll_max_interval_secs)?;
        if self.poll_max_interval_secs < self.poll_min_interval_secs {
            return Err(anyhow::anyhow!("poll interval bounds are inconsistent"));
        }

        if self.max_retries == 0 {
            warn!("max_retries is 0; every request is attempted exactly once");
        }

        Ok(())
    }

    /// Configured server URL, or the default for the key type, without trailing slash
    pub fn resolved_server_url(&self) -> String {
        let url = match &self.server_url {
            Some(url) => url.as_str(),
            None if is_free_account_key(&self.auth_key) => DEFAULT_SERVER_URL_FREE,
            None => DEFAULT_SERVER_URL,
        };
        url.strip_suffix('/').unwrap_or(url).to_string()
    }

    /// Retry engine settings; out-of-range seconds saturate instead of panicking
    pub fn retry_settings(&self) -> RetrySettings {
        RetrySettings {
            min_timeout: duration_from_secs(self.timeout_secs),
            max_retries: self.max_retries,
            backoff: self.backoff,
            total_timeout: self.total_timeout_secs.map(duration_from_secs),
        }
    }

    /// Minimum and maximum wait between document status polls
    pub fn poll_bounds(&self) -> (Duration, Duration) {
        (
            duration_from_secs(self.poll_min_interval_secs),
            duration_from_secs(self.poll_max_interval_secs),
        )
    }
}

/// Seconds must be finite, non-negative and at most one day
fn check_secs(name: &str, value: f64) -> anyhow::Result<()> {
    if !value.is_finite() || !(0.0..=MAX_INTERVAL_SECS).contains(&value) {
        return Err(anyhow::anyhow!(
            "{} must be between 0 and {} seconds, got {}",
            name,
            MAX_INTERVAL_SECS,
            value
        ));
    }
    Ok(())
}

/// Keys of free accounts end in `:fx`
pub fn is_free_account_key(auth_key: &str) -> bool {
    auth_key.ends_with(":fx")
}
