//! Application configuration.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::error::{AppError, AppResult};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Federation configuration.
    #[serde(default)]
    pub federation: FederationConfig,
    /// Outbound delivery configuration.
    #[serde(default)]
    pub delivery: DeliveryConfig,
    /// Initial local site policy.
    #[serde(default)]
    pub policy: PolicyConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to bind to.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Public URL of this instance.
    pub url: String,
    /// Emit JSON formatted logs.
    #[serde(default)]
    pub json_logs: bool,
}

impl ServerConfig {
    /// Public base URL, always with a trailing slash so it can be joined.
    pub fn base_url(&self) -> AppResult<Url> {
        normalize_base_url(&self.url)
    }
}

/// Federation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FederationConfig {
    /// Whether federation is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Instance name.
    #[serde(default = "default_instance_name")]
    pub instance_name: String,
    /// Upper bound for a synchronous resolution, in milliseconds.
    #[serde(default = "default_resolve_timeout_ms")]
    pub resolve_timeout_ms: u64,
    /// Timeout for a single remote fetch, in milliseconds.
    #[serde(default = "default_fetch_timeout_ms")]
    pub fetch_timeout_ms: u64,
}

impl FederationConfig {
    /// Resolution timeout.
    #[must_use]
    pub const fn resolve_timeout(&self) -> Duration {
        Duration::from_millis(self.resolve_timeout_ms)
    }

    /// Fetch timeout.
    #[must_use]
    pub const fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            instance_name: default_instance_name(),
            resolve_timeout_ms: default_resolve_timeout_ms(),
            fetch_timeout_ms: default_fetch_timeout_ms(),
        }
    }
}

/// Outbound delivery retry configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryConfig {
    /// Maximum number of retry attempts after the first failure.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Upper bound for the retry delay, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Multiplier for exponential backoff.
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    /// Timeout for a single delivery request, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Deliveries running at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Dead letters kept for inspection; the oldest are dropped first.
    #[serde(default = "default_dead_letter_capacity")]
    pub dead_letter_capacity: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            multiplier: default_multiplier(),
            request_timeout_ms: default_request_timeout_ms(),
            concurrency: default_concurrency(),
            dead_letter_capacity: default_dead_letter_capacity(),
        }
    }
}

/// Initial policy of the local site. Admins mutate it at runtime.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    /// Instances whose content is never accepted or fetched.
    #[serde(default)]
    pub blocked_instances: Vec<String>,
    /// URL patterns rejected for local posts.
    #[serde(default)]
    pub blocked_urls: Vec<String>,
    /// Reject NSFW content.
    #[serde(default)]
    pub disallow_nsfw_content: bool,
    /// How long readers may see a stale policy snapshot, in milliseconds.
    #[serde(default = "default_policy_cache_ttl_ms")]
    pub cache_ttl_ms: u64,
}

impl PolicyConfig {
    /// Cache TTL of the policy snapshot.
    #[must_use]
    pub const fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            blocked_instances: Vec::new(),
            blocked_urls: Vec::new(),
            disallow_nsfw_content: false,
            cache_ttl_ms: default_policy_cache_ttl_ms(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    8536
}

fn default_instance_name() -> String {
    "fedsync".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_resolve_timeout_ms() -> u64 {
    10_000
}

const fn default_fetch_timeout_ms() -> u64 {
    5_000
}

const fn default_max_retries() -> u32 {
    5
}

const fn default_initial_delay_ms() -> u64 {
    60_000
}

const fn default_max_delay_ms() -> u64 {
    24 * 60 * 60 * 1000
}

const fn default_multiplier() -> f64 {
    2.0
}

const fn default_request_timeout_ms() -> u64 {
    30_000
}

const fn default_concurrency() -> usize {
    16
}

const fn default_dead_letter_capacity() -> usize {
    1_000
}

const fn default_policy_cache_ttl_ms() -> u64 {
    1_000
}

/// Parse a public URL and make sure it ends with `/`.
pub fn normalize_base_url(raw: &str) -> AppResult<Url> {
    let mut url = Url::parse(raw).map_err(|e| AppError::Config(format!("server.url: {e}")))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `FEDSYNC_ENV`)
    /// 3. Environment variables with `FEDSYNC_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("FEDSYNC_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("FEDSYNC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("FEDSYNC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Minimal configuration for a node served at `url`.
    #[must_use]
    pub fn for_url(url: &str) -> Self {
        Self {
            server: ServerConfig {
                host: default_host(),
                port: default_port(),
                url: url.to_string(),
                json_logs: false,
            },
            federation: FederationConfig::default(),
            delivery: DeliveryConfig::default(),
            policy: PolicyConfig::default(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_base_url() {
        let url = normalize_base_url("http://lemmy-alpha:8541").unwrap();
        assert_eq!(url.as_str(), "http://lemmy-alpha:8541/");
        assert_eq!(url.join("post/1").unwrap().as_str(), "http://lemmy-alpha:8541/post/1");
    }

    #[test]
    fn test_defaults() {
        let config = Config::for_url("https://alpha.example");
        assert!(config.federation.enabled);
        assert_eq!(config.delivery.max_retries, 5);
        assert!(!config.policy.disallow_nsfw_content);
        assert_eq!(config.policy.cache_ttl(), Duration::from_secs(1));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [server]
                url = "https://beta.example"

                [policy]
                blocked_urls = ["https://evil.com/"]
                disallow_nsfw_content = true
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.server.port, 8536);
        assert_eq!(config.policy.blocked_urls, vec!["https://evil.com/"]);
        assert!(config.policy.disallow_nsfw_content);
        assert_eq!(config.federation.resolve_timeout_ms, 10_000);
    }
}
