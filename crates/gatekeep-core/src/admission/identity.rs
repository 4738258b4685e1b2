//! Identity resolution: cache first, repository on miss.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::User;
use crate::error::RepoError;
use crate::ports::UserRepository;

use super::{DEFAULT_STAGE_TIMEOUT, UserCache};

/// Identity resolution errors.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("User {0} not found")]
    NotFound(i64),

    #[error("Repository error: {0}")]
    Repository(RepoError),
}

/// Resolves a user id to a fully populated [`User`].
#[derive(Clone)]
pub struct IdentityResolver {
    users: Arc<dyn UserRepository>,
    cache: UserCache,
    timeout: Duration,
}

impl IdentityResolver {
    pub fn new(users: Arc<dyn UserRepository>, cache: UserCache) -> Self {
        Self {
            users,
            cache,
            timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn cache(&self) -> &UserCache {
        &self.cache
    }

    pub async fn resolve(&self, user_id: i64) -> Result<User, ResolveError> {
        if let Some(user) = self.cache.get(user_id).await {
            tracing::debug!(user_id, "User cache hit");
            return Ok(user);
        }

        let user = match tokio::time::timeout(self.timeout, self.users.get_by_id(user_id)).await {
            Ok(Ok(user)) => user,
            Ok(Err(RepoError::NotFound)) => return Err(ResolveError::NotFound(user_id)),
            Ok(Err(e)) => return Err(ResolveError::Repository(e)),
            Err(_) => return Err(ResolveError::Repository(RepoError::Timeout(self.timeout))),
        };

        // Best effort: a failed write only costs a miss next time.
        if let Err(e) = self.cache.set(&user).await {
            tracing::warn!(user_id, error = %e, "Failed to populate user cache");
        }

        Ok(user)
    }
}
