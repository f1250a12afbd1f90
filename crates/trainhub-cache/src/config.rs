//! Redis cache configuration.

use std::env;
use std::time::Duration;

/// Cache settings loaded from the environment.
///
/// - `CACHE_ENABLED`: set to `false` to run without Redis (default: `true`)
/// - `REDIS_URL`: connection URL (default: `redis://127.0.0.1:6379`)
/// - `CACHE_TTL_SECONDS`: default entry lifetime (default: `300`)
/// - `CACHE_PREFIX`: prefix for every key (default: `trainhub`)
#[derive(Clone, Debug)]
pub struct CacheConfig {
    pub enabled: bool,
    pub redis_url: String,
    pub default_ttl_seconds: u64,
    pub key_prefix: String,
}

impl CacheConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            enabled: env::var("CACHE_ENABLED")
                .map(|v| !matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"))
                .unwrap_or(defaults.enabled),
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            default_ttl_seconds: env::var("CACHE_TTL_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.default_ttl_seconds),
            key_prefix: env::var("CACHE_PREFIX").unwrap_or(defaults.key_prefix),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }

    /// `"<prefix>:<key>"`
    pub fn prefixed_key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: "redis://127.0.0.1:6379".into(),
            default_ttl_seconds: 300,
            key_prefix: "trainhub".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_key() {
        let config = CacheConfig {
            key_prefix: "th-test".into(),
            ..CacheConfig::default()
        };
        assert_eq!(config.prefixed_key("formation:1"), "th-test:formation:1");
    }

    #[test]
    fn test_disabled() {
        let config = CacheConfig::disabled();
        assert!(!config.enabled);
        assert_eq!(config.default_ttl(), Duration::from_secs(300));
    }
}
