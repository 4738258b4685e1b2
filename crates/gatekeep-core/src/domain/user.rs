use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Role;

/// User entity - a fully populated account with its role embedded by value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    /// Opaque password hash. Never leaves the process in serialized form.
    #[serde(skip)]
    pub password_hash: Vec<u8>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub role: Role,
}

impl User {
    /// Create an active user with the given role.
    pub fn new(id: i64, username: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            username: username.into(),
            email: email.into(),
            password_hash: Vec::new(),
            is_active: true,
            created_at: Utc::now(),
            role,
        }
    }
}

/// The user resolved for one request, attached to that request's context.
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    pub user: User,
}

impl AuthenticatedIdentity {
    pub fn new(user: User) -> Self {
        Self { user }
    }

    pub fn user_id(&self) -> i64 {
        self.user.id
    }

    /// Whether the identity owns a resource whose owner is `owner_id`.
    pub fn owns(&self, owner_id: i64) -> bool {
        self.user.id == owner_id
    }
}
