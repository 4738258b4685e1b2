//! Database connection management and repositories.

mod connections;
mod memory;

#[cfg(feature = "postgres")]
pub mod entity;
#[cfg(feature = "postgres")]
mod postgres_repo;

pub use connections::DatabaseConfig;
pub use memory::{
    InMemoryPostRepository, InMemoryRoleRepository, InMemoryUserRepository, default_roles,
};

#[cfg(feature = "postgres")]
pub use postgres_repo::{PostgresPostRepository, PostgresRoleRepository, PostgresUserRepository};

#[cfg(feature = "postgres")]
#[cfg(test)]
mod tests;
