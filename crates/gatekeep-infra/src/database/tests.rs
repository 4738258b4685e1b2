#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    use crate::database::entity::{post, role, user};
    use crate::database::{PostgresPostRepository, PostgresRoleRepository, PostgresUserRepository};
    use gatekeep_core::domain::Post;
    use gatekeep_core::error::RepoError;
    use gatekeep_core::ports::{PostRepository, RoleRepository, UserRepository};

    fn moderator_row() -> role::Model {
        role::Model {
            id: 2,
            name: "moderator".to_owned(),
            level: 2,
            description: "Can edit other users' posts".to_owned(),
        }
    }

    fn post_row(id: i64, user_id: i64) -> post::Model {
        post::Model {
            id,
            user_id,
            title: "Test Post".to_owned(),
            content: "Content".to_owned(),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_get_user_embeds_role() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![(
                user::Model {
                    id: 42,
                    username: "alice".to_owned(),
                    email: "alice@example.com".to_owned(),
                    password_hash: b"hash".to_vec(),
                    created_at: Utc::now().into(),
                    is_active: true,
                    role_id: 2,
                },
                moderator_row(),
            )]])
            .into_connection();

        let repo = PostgresUserRepository::new(db);
        let user = repo.get_by_id(42).await.unwrap();

        assert_eq!(user.id, 42);
        assert_eq!(user.username, "alice");
        assert_eq!(user.role.name, "moderator");
        assert_eq!(user.role.level, 2);
        assert_eq!(user.password_hash, b"hash".to_vec());
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<(user::Model, role::Model)>::new()])
            .into_connection();

        let repo = PostgresUserRepository::new(db);

        assert!(matches!(repo.get_by_id(7).await, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn test_get_role_by_name() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![moderator_row()]])
            .into_connection();

        let repo = PostgresRoleRepository::new(db);
        let role = repo.get_by_name("moderator").await.unwrap();

        assert_eq!(role.id, 2);
        assert_eq!(role.level, 2);
    }

    #[tokio::test]
    async fn test_get_missing_role() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![Vec::<role::Model>::new()])
            .into_connection();

        let repo = PostgresRoleRepository::new(db);

        assert!(matches!(
            repo.get_by_name("superuser").await,
            Err(RepoError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_find_post_by_id() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![post_row(9, 42)]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);
        let post = repo.get_by_id(9).await.unwrap();

        assert_eq!(post.title, "Test Post");
        assert_eq!(post.id, 9);
        assert_eq!(post.user_id, 42);
    }

    #[tokio::test]
    async fn test_update_post_returns_stored_row() {
        let mut stored = post_row(9, 42);
        stored.title = "Edited".to_owned();

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results(vec![vec![stored]])
            .into_connection();

        let repo = PostgresPostRepository::new(db);
        let updated = repo
            .update(Post::new(9, 42, "Edited", "Content"))
            .await
            .unwrap();

        assert_eq!(updated.title, "Edited");
    }

    #[tokio::test]
    async fn test_delete_missing_post() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();

        let repo = PostgresPostRepository::new(db);

        assert!(matches!(repo.delete(9).await, Err(RepoError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete_post() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results(vec![MockExecResult {
                last_insert_id: 0,
                rows_affected: 1,
            }])
            .into_connection();

        let repo = PostgresPostRepository::new(db);

        assert!(repo.delete(9).await.is_ok());
    }
}
