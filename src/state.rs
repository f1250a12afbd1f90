use std::fmt;
use std::sync::Arc;

use sqlx::PgPool;
use tracing::{info, warn};
use trainhub_cache::{CacheConfig, RedisCache};
use trainhub_config::{CorsConfig, DocumentsConfig, EmailConfig, JwtConfig, RateLimitConfig};
use trainhub_core::file_storage::{FileStorage, LocalFileStorage};
use trainhub_db::init_db_pool;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub jwt_config: JwtConfig,
    pub email_config: EmailConfig,
    pub cors_config: CorsConfig,
    pub rate_limit_config: RateLimitConfig,
    pub cache_config: CacheConfig,
    pub cache: Option<RedisCache>,
    pub documents_config: DocumentsConfig,
    pub storage: Arc<dyn FileStorage>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("jwt_config", &self.jwt_config)
            .field("email_config", &self.email_config)
            .field("cors_config", &self.cors_config)
            .field("rate_limit_config", &self.rate_limit_config)
            .field("cache_enabled", &self.cache.is_some())
            .field("documents_config", &self.documents_config)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// Builds a state around an existing pool, with everything else read from
    /// the environment and no cache connection.
    pub fn from_pool(db: PgPool) -> Self {
        let documents_config = DocumentsConfig::from_env();
        let storage = local_storage(&documents_config);

        Self {
            db,
            jwt_config: JwtConfig::from_env(),
            email_config: EmailConfig::from_env(),
            cors_config: CorsConfig::from_env(),
            rate_limit_config: RateLimitConfig::from_env(),
            cache_config: CacheConfig::disabled(),
            cache: None,
            documents_config,
            storage,
        }
    }

    pub fn cache(&self) -> Option<&RedisCache> {
        self.cache.as_ref()
    }
}

fn local_storage(config: &DocumentsConfig) -> Arc<dyn FileStorage> {
    Arc::new(LocalFileStorage::with_max_size(
        config.storage_dir.clone(),
        config.base_url.clone(),
        config.max_archive_bytes,
    ))
}

pub async fn init_app_state() -> anyhow::Result<AppState> {
    let db = init_db_pool().await?;
    let cache_config = CacheConfig::from_env();

    let cache = if cache_config.enabled {
        match RedisCache::connect(&cache_config).await {
            Ok(cache) => {
                info!(redis_url = %cache_config.redis_url, "Redis cache connected");
                Some(cache)
            }
            Err(e) => {
                warn!(error = %e, "Redis unavailable, continuing without cache");
                None
            }
        }
    } else {
        info!("Cache disabled");
        None
    };

    let documents_config = DocumentsConfig::from_env();
    let storage = local_storage(&documents_config);

    Ok(AppState {
        db,
        jwt_config: JwtConfig::from_env(),
        email_config: EmailConfig::from_env(),
        cors_config: CorsConfig::from_env(),
        rate_limit_config: RateLimitConfig::from_env(),
        cache_config,
        cache,
        documents_config,
        storage,
    })
}
