//! Application state - shared across all handlers.
//!
//! This is the only place that decides which limiter, cache and repositories
//! back the admission pipeline.

use std::sync::Arc;

use gatekeep_core::AdmissionPipeline;
use gatekeep_core::admission::{BasicCredentials, IdentityResolver, RoleAuthorizer, UserCache};
use gatekeep_core::ports::{
    Cache, CounterStore, PostRepository, RateLimiter, RoleRepository, TokenService, UserRepository,
};
use gatekeep_infra::{
    DistributedFixedWindowLimiter, InMemoryCache, InMemoryPostRepository, InMemoryRoleRepository,
    InMemoryUserRepository, JwtTokenService, LocalFixedWindowLimiter, RateLimitConfig,
    RateLimitMode,
};

#[cfg(feature = "postgres")]
use gatekeep_infra::{PostgresPostRepository, PostgresRoleRepository, PostgresUserRepository};
#[cfg(feature = "redis")]
use gatekeep_infra::{RedisCache, RedisCounterStore};

use crate::config::{AppConfig, RateLimitSettings};

/// The rate limiter chosen at startup.
#[derive(Clone)]
pub enum Limiter {
    Disabled,
    Local(Arc<LocalFixedWindowLimiter>),
    Distributed(Arc<DistributedFixedWindowLimiter>),
}

impl Limiter {
    /// Pick the limiter for `settings`. Distributed mode without a shared
    /// store degrades to the in-process limiter.
    pub fn select(settings: &RateLimitSettings, counters: Option<Arc<dyn CounterStore>>) -> Self {
        if !settings.enabled {
            tracing::info!("Rate limiting disabled");
            return Self::Disabled;
        }

        let quota = settings.quota.clone();
        match (settings.mode, counters) {
            (RateLimitMode::Distributed, Some(store)) => {
                tracing::info!(
                    max_requests = quota.max_requests(),
                    window_secs = quota.window().as_secs(),
                    "Using distributed rate limiter"
                );
                Self::Distributed(Arc::new(DistributedFixedWindowLimiter::new(store, quota)))
            }
            (RateLimitMode::Distributed, None) => {
                tracing::warn!("No shared counter store available, falling back to local rate limiter");
                Self::Local(Arc::new(LocalFixedWindowLimiter::new(quota)))
            }
            (RateLimitMode::Local, _) => {
                tracing::info!(
                    max_requests = quota.max_requests(),
                    window_secs = quota.window().as_secs(),
                    "Using local rate limiter"
                );
                Self::Local(Arc::new(LocalFixedWindowLimiter::new(quota)))
            }
        }
    }

    pub fn mode(&self) -> Option<RateLimitMode> {
        match self {
            Self::Disabled => None,
            Self::Local(_) => Some(RateLimitMode::Local),
            Self::Distributed(_) => Some(RateLimitMode::Distributed),
        }
    }

    pub fn config(&self) -> Option<&RateLimitConfig> {
        match self {
            Self::Disabled => None,
            Self::Local(l) => Some(l.config()),
            Self::Distributed(l) => Some(l.config()),
        }
    }

    /// The in-process limiter, when that is the one in use.
    pub fn local(&self) -> Option<Arc<LocalFixedWindowLimiter>> {
        match self {
            Self::Local(l) => Some(l.clone()),
            _ => None,
        }
    }

    fn as_rate_limiter(&self) -> Option<Arc<dyn RateLimiter>> {
        match self {
            Self::Disabled => None,
            Self::Local(l) => Some(l.clone()),
            Self::Distributed(l) => Some(l.clone()),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub env: String,
    pub pipeline: AdmissionPipeline,
    pub posts: Arc<dyn PostRepository>,
    pub basic: BasicCredentials,
    pub limiter: Limiter,
    /// Take the client address from `Forwarded` / `X-Forwarded-For` rather
    /// than the TCP peer. Only safe behind a proxy that overwrites them.
    pub trust_proxy_headers: bool,
}

struct Repositories {
    users: Arc<dyn UserRepository>,
    roles: Arc<dyn RoleRepository>,
    posts: Arc<dyn PostRepository>,
}

impl Repositories {
    fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            roles: Arc::new(InMemoryRoleRepository::default()),
            posts: Arc::new(InMemoryPostRepository::new()),
        }
    }

    #[cfg(feature = "postgres")]
    async fn connect(config: &AppConfig) -> Self {
        let Some(db_config) = config.database.as_ref() else {
            tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
            return Self::in_memory();
        };

        match db_config.connect().await {
            Ok(conn) => {
                let timeout = db_config.query_timeout;
                Self {
                    users: Arc::new(PostgresUserRepository::new(conn.clone()).with_timeout(timeout)),
                    roles: Arc::new(PostgresRoleRepository::new(conn.clone()).with_timeout(timeout)),
                    posts: Arc::new(PostgresPostRepository::new(conn).with_timeout(timeout)),
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to connect to database. Using in-memory fallback.");
                Self::in_memory()
            }
        }
    }

    #[cfg(not(feature = "postgres"))]
    async fn connect(_config: &AppConfig) -> Self {
        tracing::info!("Running without postgres feature - using in-memory repositories");
        Self::in_memory()
    }
}

/// Cache backend plus, when Redis is reachable, the shared counter store.
async fn connect_stores(config: &AppConfig) -> (Arc<dyn Cache>, Option<Arc<dyn CounterStore>>) {
    #[cfg(feature = "redis")]
    {
        if config.redis.enabled {
            match config.redis.connect().await {
                Ok(conn) => {
                    tracing::info!(url = %config.redis.url, "Connected to Redis");
                    let counters: Arc<dyn CounterStore> = Arc::new(
                        RedisCounterStore::from_connection(conn.clone(), &config.rate_limit.key_prefix),
                    );
                    return (Arc::new(RedisCache::from_connection(conn)), Some(counters));
                }
                Err(e) => {
                    tracing::error!(error = %e, "Redis unreachable. Using in-memory cache.");
                }
            }
        }
    }

    #[cfg(not(feature = "redis"))]
    let _ = config;

    (Arc::new(InMemoryCache::new()), None)
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        let repos = Repositories::connect(config).await;
        let (cache, counters) = connect_stores(config).await;
        let limiter = Limiter::select(&config.rate_limit, counters);

        let user_cache = UserCache::from_flag(config.user_cache_enabled, cache, config.user_cache_ttl)
            .with_timeout(config.stage_timeout);
        tracing::info!(
            enabled = user_cache.is_enabled(),
            ttl_secs = user_cache.ttl().as_secs(),
            "User cache configured"
        );

        let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(config.jwt.clone()));
        let pipeline = AdmissionPipeline::new(
            tokens,
            IdentityResolver::new(repos.users, user_cache).with_timeout(config.stage_timeout),
            RoleAuthorizer::new(repos.roles).with_timeout(config.stage_timeout),
        )
        .with_rate_limit_key(config.rate_limit.key)
        .with_stage_timeout(config.stage_timeout);

        let mut state = Self::assemble(
            config.env.clone(),
            pipeline,
            repos.posts,
            config.basic.clone(),
            limiter,
        );
        state.trust_proxy_headers = config.trust_proxy_headers;
        if state.trust_proxy_headers {
            tracing::info!("Client addresses taken from forwarding headers");
        }

        tracing::info!("Application state initialized");
        state
    }

    /// Combine prepared parts; the limiter is attached to the pipeline here.
    pub fn assemble(
        env: String,
        pipeline: AdmissionPipeline,
        posts: Arc<dyn PostRepository>,
        basic: BasicCredentials,
        limiter: Limiter,
    ) -> Self {
        let pipeline = match limiter.as_rate_limiter() {
            Some(l) => pipeline.with_rate_limiter(l),
            None => pipeline,
        };

        Self {
            env,
            pipeline,
            posts,
            basic,
            limiter,
            trust_proxy_headers: false,
        }
    }
}
