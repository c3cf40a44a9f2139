use std::time::Duration;

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use sqlx::PgPool;

use crate::{ApiConfig, cache::ResponseCache, config::Environment};

/// Settings the authentication extractors need
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub refresh_token_expiry_days: i64,
}

/// Cookie settings shared by every handler that sets cookies
#[derive(Clone, Debug)]
pub struct CookieConfig {
    pub environment: Environment,
    pub domain: String,
}

#[derive(Clone)]
pub struct ApiState {
    pub pool: PgPool,
    pub auth: AuthConfig,
    pub cookies: CookieConfig,
    pub cookie_key: Key,
    pub bcrypt_cost: u32,
    pub cache: ResponseCache,
}

impl ApiState {
    pub fn new(config: &ApiConfig, pool: PgPool) -> Self {
        Self {
            pool,
            auth: AuthConfig {
                jwt_secret: config.jwt_secret.clone(),
                jwt_expiry_hours: config.jwt_expiry_hours,
                refresh_token_expiry_days: config.refresh_token_expiry_days,
            },
            cookies: CookieConfig {
                environment: config.env.clone(),
                domain: config.cookie_domain.clone(),
            },
            cookie_key: Key::from(config.cookie_secret.as_bytes()),
            bcrypt_cost: config.bcrypt_cost,
            cache: ResponseCache::new(Duration::from_secs(config.cache_ttl_seconds)),
        }
    }
}

impl FromRef<ApiState> for Key {
    fn from_ref(state: &ApiState) -> Self {
        state.cookie_key.clone()
    }
}

impl FromRef<ApiState> for AuthConfig {
    fn from_ref(state: &ApiState) -> Self {
        state.auth.clone()
    }
}
