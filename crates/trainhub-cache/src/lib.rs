//! # TrainHub Cache
//!
//! Optional Redis cache for hot read paths (formations, sessions).
//!
//! Reads return `None` on any failure and invalidation helpers only log, so a
//! missing or unhealthy Redis never fails a request.
//!
//! ```ignore
//! use trainhub_cache::{CacheConfig, RedisCache, keys};
//!
//! let config = CacheConfig::from_env();
//! let cache = RedisCache::connect(&config).await?;
//!
//! let key = keys::formations::by_id(formation_id);
//! let cached: Option<Formation> = cache.get(&key).await;
//! ```

pub mod config;
pub mod keys;
pub mod redis;

pub use config::CacheConfig;
pub use keys::{hash_filters, invalidate};
pub use redis::{CacheError, RedisCache};
