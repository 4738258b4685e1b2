//! Application configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use gatekeep_core::admission::{BasicCredentials, DEFAULT_STAGE_TIMEOUT, RateLimitKey};
use gatekeep_infra::database::DatabaseConfig;
use gatekeep_infra::{JwtConfig, RateLimitConfig, RateLimitMode};

#[cfg(feature = "redis")]
use gatekeep_infra::RedisConfig;

/// Rate limiting settings.
#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub mode: RateLimitMode,
    pub quota: RateLimitConfig,
    pub key: RateLimitKey,
    /// Prefix for counter keys in the shared store.
    pub key_prefix: String,
    /// Cron expression (with seconds) for sweeping the local limiter.
    pub sweep_cron: String,
}

impl RateLimitSettings {
    fn from_env(redis_enabled: bool) -> Self {
        let default_mode = if redis_enabled {
            RateLimitMode::Distributed
        } else {
            RateLimitMode::Local
        };

        let mode = match env::var("RATE_LIMIT_MODE") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, fallback = %default_mode, "Invalid RATE_LIMIT_MODE");
                default_mode
            }),
            Err(_) => default_mode,
        };

        let key = match env::var("RATE_LIMIT_KEY") {
            Ok(raw) => raw.parse().unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Invalid RATE_LIMIT_KEY, counting per client address");
                RateLimitKey::ClientAddr
            }),
            Err(_) => RateLimitKey::ClientAddr,
        };

        Self {
            enabled: flag("RATE_LIMIT_ENABLED", true),
            mode,
            quota: RateLimitConfig::from_env(),
            key,
            key_prefix: env::var("RATE_LIMIT_KEY_PREFIX")
                .unwrap_or_else(|_| "ratelimit".to_string()),
            sweep_cron: env::var("RATE_LIMIT_SWEEP_CRON")
                .unwrap_or_else(|_| "0 * * * * *".to_string()),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub env: String,
    /// Present only when `DATABASE_URL` is set.
    pub database: Option<DatabaseConfig>,
    #[cfg(feature = "redis")]
    pub redis: RedisConfig,
    pub user_cache_enabled: bool,
    pub user_cache_ttl: Duration,
    pub rate_limit: RateLimitSettings,
    pub stage_timeout: Duration,
    /// `TRUST_PROXY_HEADERS`: key clients by forwarded address. Off by default.
    pub trust_proxy_headers: bool,
    pub jwt: JwtConfig,
    pub basic: BasicCredentials,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL")
            .ok()
            .map(|_| DatabaseConfig::from_env());

        #[cfg(feature = "redis")]
        let redis = RedisConfig::from_env();
        #[cfg(feature = "redis")]
        let redis_enabled = redis.enabled;
        #[cfg(not(feature = "redis"))]
        let redis_enabled = false;

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            env: env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
            database,
            #[cfg(feature = "redis")]
            redis,
            user_cache_enabled: flag("USER_CACHE_ENABLED", redis_enabled),
            user_cache_ttl: Duration::from_secs(
                env::var("USER_CACHE_TTL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            rate_limit: RateLimitSettings::from_env(redis_enabled),
            stage_timeout: env::var("ADMISSION_STAGE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_STAGE_TIMEOUT),
            trust_proxy_headers: flag("TRUST_PROXY_HEADERS", false),
            jwt: JwtConfig::from_env(),
            basic: BasicCredentials::from_env(),
        }
    }
}

fn flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| matches!(v.to_ascii_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}
