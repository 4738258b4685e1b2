//! Role-precedence authorization.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::User;
use crate::error::RepoError;
use crate::ports::RoleRepository;

use super::DEFAULT_STAGE_TIMEOUT;

#[derive(Debug, thiserror::Error)]
pub enum AuthorizeError {
    #[error("Role not found: {0}")]
    RoleNotFound(String),

    #[error("Repository error: {0}")]
    Repository(RepoError),
}

/// Grants an action when the user's role level is at least the required role's level.
///
/// Ownership is not considered here; callers check it first.
#[derive(Clone)]
pub struct RoleAuthorizer {
    roles: Arc<dyn RoleRepository>,
    timeout: Duration,
}

impl RoleAuthorizer {
    pub fn new(roles: Arc<dyn RoleRepository>) -> Self {
        Self {
            roles,
            timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn authorize(&self, user: &User, required_role: &str) -> Result<bool, AuthorizeError> {
        let required =
            match tokio::time::timeout(self.timeout, self.roles.get_by_name(required_role)).await {
                Ok(Ok(role)) => role,
                Ok(Err(RepoError::NotFound)) => {
                    return Err(AuthorizeError::RoleNotFound(required_role.to_string()));
                }
                Ok(Err(e)) => return Err(AuthorizeError::Repository(e)),
                Err(_) => return Err(AuthorizeError::Repository(RepoError::Timeout(self.timeout))),
            };

        let granted = user.role.outranks_or_equals(&required);
        tracing::debug!(
            user_id = user.id,
            user_level = user.role.level,
            required = %required.name,
            required_level = required.level,
            granted,
            "Role precedence checked"
        );

        Ok(granted)
    }
}
