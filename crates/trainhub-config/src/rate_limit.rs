//! Rate limiting for authentication endpoints.
//!
//! Uses a token bucket keyed by peer IP:
//!
//! - `RATE_LIMIT_ENABLED`: turn throttling on or off (default: on)
//! - `RATE_LIMIT_PER_SECOND`: seconds between token refills (default: 2)
//! - `RATE_LIMIT_BURST`: bucket size (default: 10)
//!
//! The server must be started with
//! `into_make_service_with_connect_info::<SocketAddr>()` for the peer IP to be
//! available.

use tower_governor::governor::{GovernorConfig, GovernorConfigBuilder};
use tower_governor::key_extractor::PeerIpKeyExtractor;

use crate::{env_flag, env_parse};

pub type AuthGovernorConfig =
    GovernorConfig<PeerIpKeyExtractor, ::governor::middleware::NoOpMiddleware>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub per_second: u64,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: 2,
            burst_size: 10,
        }
    }
}

impl RateLimitConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            enabled: env_flag("RATE_LIMIT_ENABLED", defaults.enabled),
            per_second: env_parse("RATE_LIMIT_PER_SECOND", defaults.per_second),
            burst_size: env_parse("RATE_LIMIT_BURST", defaults.burst_size),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Builds the governor configuration, or `None` when throttling is off or
    /// the values are zero.
    #[must_use]
    pub fn governor_config(&self) -> Option<AuthGovernorConfig> {
        if !self.enabled {
            return None;
        }

        GovernorConfigBuilder::default()
            .per_second(self.per_second)
            .burst_size(self.burst_size)
            .key_extractor(PeerIpKeyExtractor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert!(config.enabled);
        assert_eq!(config.per_second, 2);
        assert_eq!(config.burst_size, 10);
    }

    #[test]
    fn test_disabled_has_no_governor() {
        assert!(RateLimitConfig::disabled().governor_config().is_none());
    }

    #[test]
    fn test_zero_burst_is_rejected() {
        let config = RateLimitConfig {
            enabled: true,
            per_second: 1,
            burst_size: 0,
        };
        assert!(config.governor_config().is_none());
    }

    #[test]
    fn test_enabled_builds_governor() {
        assert!(RateLimitConfig::default().governor_config().is_some());
    }
}
