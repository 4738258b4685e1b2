//! PostgreSQL repository implementations.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, ColumnTrait, DbConn, DbErr, EntityTrait, QueryFilter, Set};

use gatekeep_core::domain::{Post, Role, User};
use gatekeep_core::error::RepoError;
use gatekeep_core::ports::{PostRepository, RoleRepository, UserRepository};

use super::entity::post::{self, Entity as PostEntity};
use super::entity::role::{self, Entity as RoleEntity};
use super::entity::user::{self, Entity as UserEntity};

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Run one query under the repository's timeout.
async fn bounded<T>(
    timeout: Duration,
    query: impl Future<Output = Result<T, DbErr>>,
) -> Result<T, RepoError> {
    match tokio::time::timeout(timeout, query).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(DbErr::RecordNotFound(_))) | Ok(Err(DbErr::RecordNotUpdated)) => {
            Err(RepoError::NotFound)
        }
        Ok(Err(DbErr::Conn(e))) => Err(RepoError::Connection(e.to_string())),
        Ok(Err(e)) => Err(RepoError::Query(e.to_string())),
        Err(_) => Err(RepoError::Timeout(timeout)),
    }
}

/// PostgreSQL user repository. Only active users are visible.
pub struct PostgresUserRepository {
    db: DbConn,
    timeout: Duration,
}

impl PostgresUserRepository {
    pub fn new(db: DbConn) -> Self {
        Self {
            db,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn get_by_id(&self, id: i64) -> Result<User, RepoError> {
        tracing::debug!(user_id = id, "Loading user");

        let row = bounded(
            self.timeout,
            UserEntity::find_by_id(id)
                .filter(user::Column::IsActive.eq(true))
                .find_also_related(RoleEntity)
                .one(&self.db),
        )
        .await?;

        match row {
            Some((user, Some(role))) => Ok(user.into_domain(role)),
            Some((user, None)) => Err(RepoError::Query(format!(
                "user {} references missing role {}",
                user.id, user.role_id
            ))),
            None => Err(RepoError::NotFound),
        }
    }
}

/// PostgreSQL role repository.
pub struct PostgresRoleRepository {
    db: DbConn,
    timeout: Duration,
}

impl PostgresRoleRepository {
    pub fn new(db: DbConn) -> Self {
        Self {
            db,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl RoleRepository for PostgresRoleRepository {
    async fn get_by_name(&self, name: &str) -> Result<Role, RepoError> {
        let row = bounded(
            self.timeout,
            RoleEntity::find()
                .filter(role::Column::Name.eq(name))
                .one(&self.db),
        )
        .await?;

        row.map(Into::into).ok_or(RepoError::NotFound)
    }
}

/// PostgreSQL post repository.
pub struct PostgresPostRepository {
    db: DbConn,
    timeout: Duration,
}

impl PostgresPostRepository {
    pub fn new(db: DbConn) -> Self {
        Self {
            db,
            timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn get_by_id(&self, id: i64) -> Result<Post, RepoError> {
        let row = bounded(self.timeout, PostEntity::find_by_id(id).one(&self.db)).await?;

        row.map(Into::into).ok_or(RepoError::NotFound)
    }

    async fn update(&self, post: Post) -> Result<Post, RepoError> {
        let model = post::ActiveModel {
            id: Set(post.id),
            title: Set(post.title),
            content: Set(post.content),
            ..Default::default()
        };

        let updated = bounded(self.timeout, model.update(&self.db)).await?;
        Ok(updated.into())
    }

    async fn delete(&self, id: i64) -> Result<(), RepoError> {
        let result = bounded(self.timeout, PostEntity::delete_by_id(id).exec(&self.db)).await?;

        if result.rows_affected == 0 {
            return Err(RepoError::NotFound);
        }

        Ok(())
    }
}
