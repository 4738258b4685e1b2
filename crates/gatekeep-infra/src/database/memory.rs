//! In-memory repositories - used when no database is configured.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use gatekeep_core::domain::{Post, Role, User};
use gatekeep_core::error::RepoError;
use gatekeep_core::ports::{PostRepository, RoleRepository, UserRepository};

/// The standard role ladder: `user` < `moderator` < `admin`.
pub fn default_roles() -> Vec<Role> {
    vec![
        Role {
            description: "A user can create posts and comments".to_string(),
            ..Role::new(1, "user", 1)
        },
        Role {
            description: "A moderator can update other users' posts".to_string(),
            ..Role::new(2, "moderator", 2)
        },
        Role {
            description: "An admin can update and delete other users' posts".to_string(),
            ..Role::new(3, "admin", 3)
        },
    ]
}

/// User repository held in process memory. Inactive users are invisible.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<i64, User>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = User>) -> Self {
        Self {
            users: RwLock::new(users.into_iter().map(|u| (u.id, u)).collect()),
        }
    }

    pub async fn insert(&self, user: User) {
        self.users.write().await.insert(user.id, user);
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn get_by_id(&self, id: i64) -> Result<User, RepoError> {
        self.users
            .read()
            .await
            .get(&id)
            .filter(|u| u.is_active)
            .cloned()
            .ok_or(RepoError::NotFound)
    }
}

/// Role repository over a fixed set of roles.
pub struct InMemoryRoleRepository {
    roles: HashMap<String, Role>,
}

impl InMemoryRoleRepository {
    pub fn new(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: roles.into_iter().map(|r| (r.name.clone(), r)).collect(),
        }
    }
}

impl Default for InMemoryRoleRepository {
    fn default() -> Self {
        Self::new(default_roles())
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn get_by_name(&self, name: &str) -> Result<Role, RepoError> {
        self.roles.get(name).cloned().ok_or(RepoError::NotFound)
    }
}

/// Post repository held in process memory.
#[derive(Default)]
pub struct InMemoryPostRepository {
    posts: RwLock<HashMap<i64, Post>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_posts(posts: impl IntoIterator<Item = Post>) -> Self {
        Self {
            posts: RwLock::new(posts.into_iter().map(|p| (p.id, p)).collect()),
        }
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn get_by_id(&self, id: i64) -> Result<Post, RepoError> {
        self.posts
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepoError::NotFound)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let mut posts = self.posts.write().await;
        let stored = posts.get_mut(&post.id).ok_or(RepoError::NotFound)?;
        stored.title = post.title;
        stored.content = post.content;
        Ok(stored.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        self.posts
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }
}
