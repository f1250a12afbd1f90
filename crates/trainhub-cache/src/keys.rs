//! Cache keys and invalidation helpers.
//!
//! Keys are relative; [`RedisCache`] adds the configured prefix.

use std::hash::{Hash, Hasher};

use sha2::{Digest, Sha256};
use tracing::warn;
use uuid::Uuid;

use crate::RedisCache;

fn build_key(parts: &[&str]) -> String {
    parts.join(":")
}

pub mod formations {
    use super::*;

    pub fn by_id(formation_id: Uuid) -> String {
        build_key(&["formation", &formation_id.to_string()])
    }

    pub fn list(organization_id: Uuid, filters_hash: &str) -> String {
        build_key(&[
            "formations",
            &organization_id.to_string(),
            "list",
            filters_hash,
        ])
    }

    pub fn list_pattern(organization_id: Uuid) -> String {
        format!("formations:{organization_id}:list:*")
    }
}

pub mod sessions {
    use super::*;

    pub fn by_id(session_id: Uuid) -> String {
        build_key(&["session", &session_id.to_string()])
    }

    pub fn list(organization_id: Uuid, filters_hash: &str) -> String {
        build_key(&[
            "sessions",
            &organization_id.to_string(),
            "list",
            filters_hash,
        ])
    }

    pub fn list_pattern(organization_id: Uuid) -> String {
        format!("sessions:{organization_id}:list:*")
    }
}

/// `Hasher` backed by SHA-256 so filter hashes are identical across processes
/// sharing one Redis.
struct StableHasher(Sha256);

impl Hasher for StableHasher {
    fn write(&mut self, bytes: &[u8]) {
        self.0.update(bytes);
    }

    fn finish(&self) -> u64 {
        let digest = self.0.clone().finalize();
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(head)
    }
}

/// Short hex digest of a filter set, for list keys.
pub fn hash_filters<T: Hash>(filters: &T) -> String {
    let mut hasher = StableHasher(Sha256::new());
    filters.hash(&mut hasher);
    let digest = hasher.0.finalize();
    hex::encode(&digest[..8])
}

pub mod invalidate {
    use super::*;

    async fn drop_key(cache: &RedisCache, key: &str) {
        if let Err(e) = cache.invalidate(key).await {
            warn!(error = %e, cache.key = %key, "Failed to invalidate cache key");
        }
    }

    async fn drop_pattern(cache: &RedisCache, pattern: &str) {
        if let Err(e) = cache.invalidate_pattern(pattern).await {
            warn!(error = %e, cache.pattern = %pattern, "Failed to invalidate cache pattern");
        }
    }

    /// Call after creating, updating or deleting a formation.
    pub async fn formation(
        cache: Option<&RedisCache>,
        organization_id: Uuid,
        formation_id: Option<Uuid>,
    ) {
        let Some(cache) = cache else { return };

        if let Some(id) = formation_id {
            drop_key(cache, &formations::by_id(id)).await;
        }
        drop_pattern(cache, &formations::list_pattern(organization_id)).await;
        // Session lists embed the formation name.
        drop_pattern(cache, &sessions::list_pattern(organization_id)).await;
    }

    /// Call after any write that changes a session or its counters
    /// (enrollments, slots, program links).
    pub async fn session(
        cache: Option<&RedisCache>,
        organization_id: Uuid,
        session_id: Option<Uuid>,
    ) {
        let Some(cache) = cache else { return };

        if let Some(id) = session_id {
            drop_key(cache, &sessions::by_id(id)).await;
        }
        drop_pattern(cache, &sessions::list_pattern(organization_id)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formation_keys() {
        let id = Uuid::nil();
        assert_eq!(
            formations::by_id(id),
            "formation:00000000-0000-0000-0000-000000000000"
        );
        assert!(formations::list(id, "abc").starts_with("formations:"));
        assert!(formations::list(id, "abc").ends_with(":list:abc"));
    }

    #[test]
    fn test_list_pattern_matches_list_keys() {
        let org = Uuid::new_v4();
        let key = sessions::list(org, "deadbeef");
        let pattern = sessions::list_pattern(org);
        assert!(key.starts_with(pattern.trim_end_matches('*')));
    }

    #[test]
    fn test_hash_filters_is_stable() {
        let filters = ("search", Some(10i64), true);
        assert_eq!(hash_filters(&filters), hash_filters(&filters));
        assert_eq!(hash_filters(&filters).len(), 16);
        assert_ne!(hash_filters(&filters), hash_filters(&("search", Some(20i64), true)));
    }
}
