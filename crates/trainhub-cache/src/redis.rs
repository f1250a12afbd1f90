//! Redis client with JSON-encoded values.

use std::time::Duration;

use redis::{AsyncCommands, Client, aio::ConnectionManager};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error, instrument};

use crate::CacheConfig;

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    default_ttl: Duration,
    key_prefix: String,
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("default_ttl", &self.default_ttl)
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Redis error: {0}")]
    Connection(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RedisCache {
    pub async fn connect(config: &CacheConfig) -> Result<Self, CacheError> {
        let client = Client::open(config.redis_url.as_str())?;
        let conn = ConnectionManager::new(client).await?;

        Ok(Self {
            conn,
            default_ttl: config.default_ttl(),
            key_prefix: config.key_prefix.clone(),
        })
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.key_prefix, key)
    }

    /// Returns `None` on a miss, a Redis error, or an undecodable value.
    #[instrument(skip(self), fields(cache.operation = "GET"))]
    pub async fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let mut conn = self.conn.clone();
        let key = self.key(key);

        match conn.get::<_, Option<String>>(&key).await {
            Ok(Some(value)) => match serde_json::from_str(&value) {
                Ok(parsed) => {
                    debug!(cache.key = %key, "Cache hit");
                    Some(parsed)
                }
                Err(e) => {
                    error!(cache.key = %key, error = %e, "Failed to deserialize cached value");
                    None
                }
            },
            Ok(None) => {
                debug!(cache.key = %key, "Cache miss");
                None
            }
            Err(e) => {
                error!(cache.key = %key, error = %e, "Redis GET error");
                None
            }
        }
    }

    #[instrument(skip(self, value), fields(cache.operation = "SETEX"))]
    pub async fn set<T>(&self, key: &str, value: &T) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        self.set_with_ttl(key, value, self.default_ttl).await
    }

    #[instrument(skip(self, value), fields(cache.operation = "SETEX"))]
    pub async fn set_with_ttl<T>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), CacheError>
    where
        T: Serialize,
    {
        let mut conn = self.conn.clone();
        let key = self.key(key);
        let json = serde_json::to_string(value)?;

        conn.set_ex::<_, _, ()>(&key, json, ttl.as_secs().max(1)).await?;
        debug!(cache.key = %key, cache.ttl_secs = ttl.as_secs(), "Cache set");

        Ok(())
    }

    #[instrument(skip(self), fields(cache.operation = "DEL"))]
    pub async fn invalidate(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(self.key(key)).await?;
        Ok(())
    }

    /// Deletes every key matching `pattern` (relative to the prefix), using
    /// `SCAN` so large keyspaces are not blocked.
    #[instrument(skip(self), fields(cache.operation = "SCAN_DEL"))]
    pub async fn invalidate_pattern(&self, pattern: &str) -> Result<u64, CacheError> {
        let mut conn = self.conn.clone();
        let pattern = self.key(pattern);
        let mut cursor: u64 = 0;
        let mut deleted: u64 = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let count: u64 = conn.del(&keys).await?;
                deleted += count;
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!(cache.pattern = %pattern, cache.deleted = deleted, "Pattern invalidation complete");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Cached {
        id: i32,
        name: String,
    }

    #[tokio::test]
    #[ignore = "requires Redis"]
    async fn test_set_get_invalidate() {
        let config = CacheConfig {
            key_prefix: format!("trainhub-test-{}", uuid::Uuid::new_v4()),
            ..CacheConfig::default()
        };
        let cache = RedisCache::connect(&config).await.unwrap();
        let value = Cached {
            id: 1,
            name: "formation".into(),
        };

        cache.set("formation:1", &value).await.unwrap();
        assert_eq!(cache.get::<Cached>("formation:1").await, Some(value));

        assert_eq!(cache.invalidate_pattern("formation:*").await.unwrap(), 1);
        assert_eq!(cache.get::<Cached>("formation:1").await, None);
    }
}
