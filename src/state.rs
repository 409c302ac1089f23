use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::auth::jwt::JwtKeys;
use crate::cache::TtlCache;
use crate::config::AppConfig;
use crate::users::repo_types::PublicUser;

/// Cache of sanitized users keyed by `user:<id>`.
pub type UserCache = TtlCache<PublicUser>;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub jwt: Arc<JwtKeys>,
    pub cache: Arc<UserCache>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await
            .context("connect to database")?;
        let jwt = Arc::new(JwtKeys::new(&config.jwt));
        let cache = Arc::new(UserCache::new(Duration::from_secs(
            config.cache.user_ttl_secs,
        )));
        Ok(Self {
            db,
            config,
            jwt,
            cache,
        })
    }
}
