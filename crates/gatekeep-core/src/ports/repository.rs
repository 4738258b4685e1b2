use async_trait::async_trait;

use crate::domain::{Post, Role, User};
use crate::error::RepoError;

/// User repository - durable lookup of fully populated users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fetch a user with its role embedded. Missing users yield `RepoError::NotFound`.
    async fn get_by_id(&self, id: i64) -> Result<User, RepoError>;
}

/// Role repository - read-only reference data.
#[async_trait]
pub trait RoleRepository: Send + Sync {
    /// Fetch a role by its unique name. Missing roles yield `RepoError::NotFound`.
    async fn get_by_name(&self, name: &str) -> Result<Role, RepoError>;
}

/// Post repository.
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Post, RepoError>;

    async fn update(&self, post: Post) -> Result<Post, RepoError>;

    async fn delete(&self, id: i64) -> Result<(), RepoError>;
}
