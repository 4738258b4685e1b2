//! End-to-end admission with the JWT verifier, in-memory cache and local limiter.

#![cfg(all(feature = "auth", feature = "rate-limit"))]

use std::sync::Arc;
use std::time::Duration;

use gatekeep_core::admission::{IdentityResolver, RoleAuthorizer, UserCache};
use gatekeep_core::domain::{Post, User};
use gatekeep_core::ports::TokenService;
use gatekeep_core::{AccessRequirement, AdmissionError, AdmissionPipeline, AdmissionRequest};
use gatekeep_infra::database::default_roles;
use gatekeep_infra::{
    DistributedFixedWindowLimiter, InMemoryCache, InMemoryCounterStore, InMemoryRoleRepository,
    InMemoryUserRepository, JwtConfig, JwtTokenService, LocalFixedWindowLimiter, RateLimitConfig,
};

const CLIENT: &str = "203.0.113.7";

fn tokens() -> Arc<JwtTokenService> {
    Arc::new(JwtTokenService::new(JwtConfig {
        secret: "integration-secret".to_string(),
        ..JwtConfig::default()
    }))
}

fn users() -> InMemoryUserRepository {
    let roles = default_roles();
    InMemoryUserRepository::with_users([
        User::new(1, "alice", "alice@example.com", roles[0].clone()),
        User::new(2, "mod", "mod@example.com", roles[1].clone()),
    ])
}

fn pipeline(tokens: Arc<JwtTokenService>) -> AdmissionPipeline {
    let cache = UserCache::new(Arc::new(InMemoryCache::new()), Duration::from_secs(3600));
    AdmissionPipeline::new(
        tokens,
        IdentityResolver::new(Arc::new(users()), cache),
        RoleAuthorizer::new(Arc::new(InMemoryRoleRepository::default())),
    )
}

fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

#[tokio::test(start_paused = true)]
async fn test_quota_applies_after_authentication() {
    let tokens = tokens();
    let limiter = Arc::new(LocalFixedWindowLimiter::new(RateLimitConfig::new(
        20,
        Duration::from_secs(5),
    )));
    let pipeline = pipeline(tokens.clone()).with_rate_limiter(limiter);

    let err = pipeline
        .admit(&AdmissionRequest::new(None, CLIENT))
        .await
        .unwrap_err();
    assert!(matches!(err, AdmissionError::Unauthenticated(_)));

    let header = bearer(&tokens.generate_token(1).unwrap());
    for _ in 0..20 {
        let admitted = pipeline
            .admit(&AdmissionRequest::new(Some(&header), CLIENT))
            .await
            .unwrap();
        assert_eq!(admitted.identity.user_id(), 1);
    }

    tokio::time::advance(Duration::from_secs(2)).await;

    let err = pipeline
        .admit(&AdmissionRequest::new(Some(&header), CLIENT))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        AdmissionError::TooManyRequests {
            retry_after: Duration::from_secs(3)
        }
    );

    tokio::time::advance(Duration::from_secs(3)).await;

    assert!(
        pipeline
            .admit(&AdmissionRequest::new(Some(&header), CLIENT))
            .await
            .is_ok()
    );
}

#[tokio::test(start_paused = true)]
async fn test_distributed_limiter_reports_full_window() {
    let tokens = tokens();
    let limiter = Arc::new(DistributedFixedWindowLimiter::new(
        Arc::new(InMemoryCounterStore::new()),
        RateLimitConfig::new(2, Duration::from_secs(5)),
    ));
    let pipeline = pipeline(tokens.clone()).with_rate_limiter(limiter);
    let header = bearer(&tokens.generate_token(1).unwrap());

    for _ in 0..2 {
        pipeline
            .admit(&AdmissionRequest::new(Some(&header), CLIENT))
            .await
            .unwrap();
    }

    let err = pipeline
        .admit(&AdmissionRequest::new(Some(&header), CLIENT))
        .await
        .unwrap_err();
    assert_eq!(err.retry_after(), Some(Duration::from_secs(5)));
}

#[tokio::test]
async fn test_ownership_gate() {
    let tokens = tokens();
    let pipeline = pipeline(tokens.clone());
    let post = Post::new(10, 1, "Hello", "World");

    let delete = AccessRequirement::OwnerOrRole {
        owner_id: post.user_id,
        role: "admin".to_string(),
    };
    let edit = AccessRequirement::OwnerOrRole {
        owner_id: post.user_id,
        role: "moderator".to_string(),
    };

    let owner = bearer(&tokens.generate_token(1).unwrap());
    let moderator = bearer(&tokens.generate_token(2).unwrap());

    let owner_delete = AdmissionRequest::new(Some(&owner), CLIENT).requiring(delete.clone());
    assert!(pipeline.admit(&owner_delete).await.is_ok());

    let mod_edit = AdmissionRequest::new(Some(&moderator), CLIENT).requiring(edit);
    assert!(pipeline.admit(&mod_edit).await.is_ok());

    let mod_delete = AdmissionRequest::new(Some(&moderator), CLIENT).requiring(delete);
    assert_eq!(
        pipeline.admit(&mod_delete).await.unwrap_err(),
        AdmissionError::Forbidden
    );
}

#[tokio::test]
async fn test_unknown_subject_is_unauthenticated() {
    let tokens = tokens();
    let pipeline = pipeline(tokens.clone());
    let header = bearer(&tokens.generate_token(404).unwrap());

    let err = pipeline
        .admit(&AdmissionRequest::new(Some(&header), CLIENT))
        .await
        .unwrap_err();

    assert!(matches!(err, AdmissionError::Unauthenticated(_)));
}
