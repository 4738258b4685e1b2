//! # Gatekeep Infrastructure
//!
//! Concrete implementations of the ports defined in `gatekeep-core`.
//! This crate contains token, cache, counter-store, rate-limit and database integrations.
//!
//! ## Feature Flags
//!
//! - `full` (default) - All features enabled
//! - `minimal` - No external dependencies, in-memory only
//! - `postgres` - PostgreSQL repositories via SeaORM
//! - `auth` - JWT bearer token verification
//! - `rate-limit` - Local and distributed fixed-window rate limiters
//! - `redis` - Redis support for the user cache and the shared rate-limit counters

pub mod cache;
pub mod database;

#[cfg(feature = "auth")]
pub mod auth;

#[cfg(feature = "rate-limit")]
pub mod rate_limit;

// Re-exports - In-Memory
pub use cache::InMemoryCache;
pub use database::{
    DatabaseConfig, InMemoryPostRepository, InMemoryRoleRepository, InMemoryUserRepository,
};

#[cfg(feature = "postgres")]
pub use database::{PostgresPostRepository, PostgresRoleRepository, PostgresUserRepository};

#[cfg(feature = "auth")]
pub use auth::{JwtConfig, JwtTokenService};

#[cfg(feature = "rate-limit")]
pub use rate_limit::{
    DistributedFixedWindowLimiter, InMemoryCounterStore, LocalFixedWindowLimiter, RateLimitConfig,
    RateLimitMode,
};

// Re-exports - Redis
#[cfg(feature = "redis")]
pub use cache::{RedisCache, RedisConfig};
#[cfg(all(feature = "redis", feature = "rate-limit"))]
pub use rate_limit::RedisCounterStore;
