//! Ports - trait definitions for external dependencies.
//! These are the "interfaces" that infrastructure must implement.

mod auth;
mod cache;
mod counter_store;
mod rate_limit;
mod repository;

pub use auth::{AuthError, TokenClaims, TokenService};
pub use cache::{Cache, CacheError};
pub use counter_store::{CounterStore, StoreError};
pub use rate_limit::{RateLimitError, RateLimitResult, RateLimiter};
pub use repository::{PostRepository, RoleRepository, UserRepository};
