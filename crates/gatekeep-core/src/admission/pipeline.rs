//! Per-request admission state machine.
//!
//! `Start -> TokenChecked -> IdentityResolved -> RoleChecked -> RateLimited -> Admitted`,
//! with a rejection possible from every state. Each stage owns its own
//! critical section; nothing is locked across the whole traversal.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::AuthenticatedIdentity;
use crate::error::AdmissionError;
use crate::ports::{RateLimitResult, RateLimiter, TokenService};

use super::{DEFAULT_STAGE_TIMEOUT, IdentityResolver, ResolveError, RoleAuthorizer};

/// Last state a request reached in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionStage {
    Start,
    TokenChecked,
    IdentityResolved,
    RoleChecked,
    RateLimited,
    Admitted,
}

/// Which caller attribute the rate limiter counts against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RateLimitKey {
    /// The client's network address.
    #[default]
    ClientAddr,
    /// The authenticated user id.
    User,
}

impl std::str::FromStr for RateLimitKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "client" | "ip" | "addr" => Ok(Self::ClientAddr),
            "user" => Ok(Self::User),
            other => Err(format!("unknown rate limit key: {other}")),
        }
    }
}

/// What the action being admitted demands beyond authentication.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AccessRequirement {
    #[default]
    Authenticated,
    /// Owners pass unconditionally; everyone else needs `role` or better.
    OwnerOrRole { owner_id: i64, role: String },
}

/// The parts of an inbound request the pipeline looks at.
#[derive(Debug, Clone)]
pub struct AdmissionRequest<'a> {
    /// Raw `Authorization` header value.
    pub authorization: Option<&'a str>,
    pub client_addr: &'a str,
    pub requirement: AccessRequirement,
}

impl<'a> AdmissionRequest<'a> {
    pub fn new(authorization: Option<&'a str>, client_addr: &'a str) -> Self {
        Self {
            authorization,
            client_addr,
            requirement: AccessRequirement::Authenticated,
        }
    }

    pub fn requiring(mut self, requirement: AccessRequirement) -> Self {
        self.requirement = requirement;
        self
    }
}

/// A request that passed every stage.
#[derive(Debug, Clone)]
pub struct Admitted {
    pub identity: AuthenticatedIdentity,
    /// Quota state after counting this request; `None` when rate limiting is off.
    pub rate_limit: Option<RateLimitResult>,
}

/// Composes token verification, identity resolution, authorization and rate limiting.
#[derive(Clone)]
pub struct AdmissionPipeline {
    tokens: Arc<dyn TokenService>,
    identities: IdentityResolver,
    authorizer: RoleAuthorizer,
    limiter: Option<Arc<dyn RateLimiter>>,
    limit_key: RateLimitKey,
    stage_timeout: Duration,
}

impl AdmissionPipeline {
    pub fn new(
        tokens: Arc<dyn TokenService>,
        identities: IdentityResolver,
        authorizer: RoleAuthorizer,
    ) -> Self {
        Self {
            tokens,
            identities,
            authorizer,
            limiter: None,
            limit_key: RateLimitKey::default(),
            stage_timeout: DEFAULT_STAGE_TIMEOUT,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn with_rate_limit_key(mut self, key: RateLimitKey) -> Self {
        self.limit_key = key;
        self
    }

    pub fn with_stage_timeout(mut self, timeout: Duration) -> Self {
        self.stage_timeout = timeout;
        self
    }

    pub fn identities(&self) -> &IdentityResolver {
        &self.identities
    }

    pub fn rate_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Decide whether `request` may reach the downstream handler.
    pub async fn admit(&self, request: &AdmissionRequest<'_>) -> Result<Admitted, AdmissionError> {
        let identity = self.authenticate(request.authorization).await?;
        self.admit_identity(identity, &request.requirement, request.client_addr)
            .await
    }

    /// First half of [`admit`](Self::admit): verify the bearer token and
    /// resolve its subject.
    ///
    /// Callers that need the authenticated caller before they can build the
    /// access requirement (e.g. loading the resource whose owner matters)
    /// run this, then finish with [`admit_identity`](Self::admit_identity).
    pub async fn authenticate(
        &self,
        authorization: Option<&str>,
    ) -> Result<AuthenticatedIdentity, AdmissionError> {
        let mut stage = AdmissionStage::Start;
        let outcome = self.verify_and_resolve(authorization, &mut stage).await;
        if let Err(e) = &outcome {
            log_rejection(stage, e);
        }
        outcome
    }

    /// Second half of [`admit`](Self::admit): role check, then quota.
    pub async fn admit_identity(
        &self,
        identity: AuthenticatedIdentity,
        requirement: &AccessRequirement,
        client_addr: &str,
    ) -> Result<Admitted, AdmissionError> {
        let mut stage = AdmissionStage::IdentityResolved;
        let outcome = self
            .authorize_and_limit(identity, requirement, client_addr, &mut stage)
            .await;

        match &outcome {
            Ok(admitted) => tracing::debug!(
                user_id = admitted.identity.user_id(),
                stage = ?stage,
                "Request admitted"
            ),
            Err(e) => log_rejection(stage, e),
        }

        outcome
    }

    async fn verify_and_resolve(
        &self,
        authorization: Option<&str>,
        stage: &mut AdmissionStage,
    ) -> Result<AuthenticatedIdentity, AdmissionError> {
        let token = bearer_token(authorization)?;

        let claims = self
            .tokens
            .validate_token(token)
            .map_err(|e| AdmissionError::unauthenticated(e.to_string()))?;
        *stage = AdmissionStage::TokenChecked;

        // Resolution failures are auth failures, not 404s, so user existence never leaks.
        let user = self
            .identities
            .resolve(claims.subject)
            .await
            .map_err(|e| match e {
                ResolveError::NotFound(_) => AdmissionError::unauthenticated("unknown subject"),
                ResolveError::Repository(err) => {
                    tracing::error!(user_id = claims.subject, error = %err, "Identity lookup failed");
                    AdmissionError::unauthenticated("identity could not be resolved")
                }
            })?;
        *stage = AdmissionStage::IdentityResolved;

        Ok(AuthenticatedIdentity::new(user))
    }

    async fn authorize_and_limit(
        &self,
        identity: AuthenticatedIdentity,
        requirement: &AccessRequirement,
        client_addr: &str,
        stage: &mut AdmissionStage,
    ) -> Result<Admitted, AdmissionError> {
        if let AccessRequirement::OwnerOrRole { owner_id, role } = requirement {
            if identity.owns(*owner_id) {
                tracing::debug!(user_id = identity.user_id(), "Owner access, skipping role check");
            } else {
                match self.authorizer.authorize(&identity.user, role).await {
                    Ok(true) => {}
                    Ok(false) => return Err(AdmissionError::Forbidden),
                    Err(e) => {
                        tracing::error!(required = %role, error = %e, "Role check failed");
                        return Err(AdmissionError::internal(e.to_string()));
                    }
                }
            }
            *stage = AdmissionStage::RoleChecked;
        }

        let rate_limit = match &self.limiter {
            Some(limiter) => {
                let key = match self.limit_key {
                    RateLimitKey::ClientAddr => client_addr.to_string(),
                    RateLimitKey::User => format!("user:{}", identity.user_id()),
                };
                let result = self.check_quota(limiter.as_ref(), &key).await?;
                *stage = AdmissionStage::RateLimited;
                Some(result)
            }
            None => None,
        };

        *stage = AdmissionStage::Admitted;
        Ok(Admitted {
            identity,
            rate_limit,
        })
    }

    // Store failures propagate as Internal: the quota check is required, not best-effort.
    async fn check_quota(
        &self,
        limiter: &dyn RateLimiter,
        key: &str,
    ) -> Result<RateLimitResult, AdmissionError> {
        let result = match tokio::time::timeout(self.stage_timeout, limiter.allow(key)).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::error!(key = %key, error = %e, "Rate limiter unavailable");
                return Err(AdmissionError::internal(e.to_string()));
            }
            Err(_) => {
                tracing::error!(key = %key, "Rate limiter timed out");
                return Err(AdmissionError::internal("rate limiter timed out"));
            }
        };

        if !result.allowed {
            tracing::warn!(
                key = %key,
                retry_after_ms = result.retry_after.as_millis() as u64,
                "Rate limit exceeded"
            );
            return Err(AdmissionError::TooManyRequests {
                retry_after: result.retry_after,
            });
        }

        Ok(result)
    }
}

fn log_rejection(stage: AdmissionStage, err: &AdmissionError) {
    tracing::debug!(stage = ?stage, reason = err.reason(), error = %err, "Request rejected");
}

/// Extract the token from a `Bearer <token>` header value.
fn bearer_token(header: Option<&str>) -> Result<&str, AdmissionError> {
    let header =
        header.ok_or_else(|| AdmissionError::unauthenticated("authorization header is missing"))?;

    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err(AdmissionError::unauthenticated("authorization header is malformed")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::admission::UserCache;
    use crate::domain::{Role, User};
    use crate::error::RepoError;
    use crate::ports::{AuthError, RateLimitError, RoleRepository, TokenClaims, UserRepository};

    /// Tokens look like `valid-<user id>`; anything else fails verification.
    struct FakeTokens;

    impl TokenService for FakeTokens {
        fn generate_token(&self, user_id: i64) -> Result<String, AuthError> {
            Ok(format!("valid-{user_id}"))
        }

        fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
            if token == "expired" {
                return Err(AuthError::TokenExpired);
            }
            token
                .strip_prefix("valid-")
                .and_then(|id| id.parse().ok())
                .map(|subject| TokenClaims { subject, exp: 0 })
                .ok_or_else(|| AuthError::InvalidToken("bad signature".to_string()))
        }

        fn expiration_seconds(&self) -> i64 {
            3600
        }
    }

    struct Users(HashMap<i64, User>);

    #[async_trait]
    impl UserRepository for Users {
        async fn get_by_id(&self, id: i64) -> Result<User, RepoError> {
            self.0.get(&id).cloned().ok_or(RepoError::NotFound)
        }
    }

    #[derive(Default)]
    struct CountingRoles {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RoleRepository for CountingRoles {
        async fn get_by_name(&self, name: &str) -> Result<Role, RepoError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match name {
                "user" => Ok(Role::new(1, "user", 1)),
                "moderator" => Ok(Role::new(2, "moderator", 5)),
                "admin" => Ok(Role::new(3, "admin", 10)),
                _ => Err(RepoError::NotFound),
            }
        }
    }

    /// Permits the first `limit` calls, then denies with a fixed hint.
    struct CountingLimiter {
        limit: usize,
        seen: AtomicUsize,
    }

    #[async_trait]
    impl RateLimiter for CountingLimiter {
        async fn allow(&self, _key: &str) -> Result<RateLimitResult, RateLimitError> {
            let n = self.seen.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= self.limit {
                Ok(RateLimitResult::permit((self.limit - n) as u32))
            } else {
                Ok(RateLimitResult::deny(Duration::from_secs(4)))
            }
        }
    }

    struct DownLimiter;

    #[async_trait]
    impl RateLimiter for DownLimiter {
        async fn allow(&self, _key: &str) -> Result<RateLimitResult, RateLimitError> {
            Err(RateLimitError::Backend("connection refused".to_string()))
        }
    }

    struct KeyRecorder(std::sync::Mutex<Vec<String>>);

    #[async_trait]
    impl RateLimiter for KeyRecorder {
        async fn allow(&self, key: &str) -> Result<RateLimitResult, RateLimitError> {
            self.0.lock().unwrap().push(key.to_string());
            Ok(RateLimitResult::permit(1))
        }
    }

    fn users() -> Users {
        let editor = User::new(1, "editor", "editor@example.com", Role::new(1, "user", 1));
        let admin = User::new(2, "root", "root@example.com", Role::new(3, "admin", 10));
        let mid = User::new(3, "mid", "mid@example.com", Role::new(4, "custom", 5));
        Users([(1, editor), (2, admin), (3, mid)].into_iter().collect())
    }

    fn pipeline(roles: Arc<CountingRoles>) -> AdmissionPipeline {
        AdmissionPipeline::new(
            Arc::new(FakeTokens),
            IdentityResolver::new(Arc::new(users()), UserCache::disabled()),
            RoleAuthorizer::new(roles),
        )
    }

    fn owner_or(owner_id: i64, role: &str) -> AccessRequirement {
        AccessRequirement::OwnerOrRole {
            owner_id,
            role: role.to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_header_is_unauthenticated() {
        let pipeline = pipeline(Arc::default());

        let err = pipeline
            .admit(&AdmissionRequest::new(None, "10.0.0.1"))
            .await
            .unwrap_err();

        assert_eq!(err, AdmissionError::unauthenticated("authorization header is missing"));
    }

    #[tokio::test]
    async fn test_malformed_header_is_unauthenticated() {
        let pipeline = pipeline(Arc::default());

        for header in ["valid-1", "Token valid-1", "Bearer", "Bearer a b"] {
            let err = pipeline
                .admit(&AdmissionRequest::new(Some(header), "10.0.0.1"))
                .await
                .unwrap_err();
            assert_eq!(err.status_code(), 401, "header {header:?}");
        }
    }

    #[tokio::test]
    async fn test_invalid_or_expired_token_is_unauthenticated() {
        let pipeline = pipeline(Arc::default());

        for header in ["Bearer forged", "Bearer expired"] {
            let err = pipeline
                .admit(&AdmissionRequest::new(Some(header), "10.0.0.1"))
                .await
                .unwrap_err();
            assert!(matches!(err, AdmissionError::Unauthenticated(_)));
        }
    }

    #[tokio::test]
    async fn test_unknown_subject_is_unauthenticated_not_not_found() {
        let pipeline = pipeline(Arc::default());

        let err = pipeline
            .admit(&AdmissionRequest::new(Some("Bearer valid-404"), "10.0.0.1"))
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), 401);
    }

    #[tokio::test]
    async fn test_valid_token_is_admitted_with_identity() {
        let pipeline = pipeline(Arc::default());

        let admitted = pipeline
            .admit(&AdmissionRequest::new(Some("Bearer valid-1"), "10.0.0.1"))
            .await
            .unwrap();

        assert_eq!(admitted.identity.user_id(), 1);
        assert!(admitted.rate_limit.is_none());
    }

    #[tokio::test]
    async fn test_owner_bypasses_role_check() {
        let roles = Arc::new(CountingRoles::default());
        let pipeline = pipeline(roles.clone());

        let request = AdmissionRequest::new(Some("Bearer valid-1"), "10.0.0.1")
            .requiring(owner_or(1, "admin"));
        let admitted = pipeline.admit(&request).await.unwrap();

        assert_eq!(admitted.identity.user_id(), 1);
        assert_eq!(roles.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_insufficient_role_is_forbidden() {
        let roles = Arc::new(CountingRoles::default());
        let pipeline = pipeline(roles.clone());

        let request = AdmissionRequest::new(Some("Bearer valid-3"), "10.0.0.1")
            .requiring(owner_or(99, "admin"));
        let err = pipeline.admit(&request).await.unwrap_err();

        assert_eq!(err, AdmissionError::Forbidden);
        assert_eq!(roles.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_matching_role_level_is_admitted() {
        let pipeline = pipeline(Arc::default());

        let request = AdmissionRequest::new(Some("Bearer valid-2"), "10.0.0.1")
            .requiring(owner_or(99, "admin"));

        assert!(pipeline.admit(&request).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_required_role_is_internal() {
        let pipeline = pipeline(Arc::default());

        let request = AdmissionRequest::new(Some("Bearer valid-2"), "10.0.0.1")
            .requiring(owner_or(99, "superuser"));
        let err = pipeline.admit(&request).await.unwrap_err();

        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_quota_exceeded_is_too_many_requests() {
        let limiter = Arc::new(CountingLimiter {
            limit: 2,
            seen: AtomicUsize::new(0),
        });
        let pipeline = pipeline(Arc::default()).with_rate_limiter(limiter);
        let request = AdmissionRequest::new(Some("Bearer valid-1"), "10.0.0.1");

        assert!(pipeline.admit(&request).await.is_ok());
        let second = pipeline.admit(&request).await.unwrap();
        let err = pipeline.admit(&request).await.unwrap_err();

        assert_eq!(second.rate_limit.unwrap().remaining, 0);
        assert_eq!(
            err,
            AdmissionError::TooManyRequests {
                retry_after: Duration::from_secs(4)
            }
        );
    }

    #[tokio::test]
    async fn test_limiter_outage_is_internal_not_admitted() {
        let pipeline = pipeline(Arc::default()).with_rate_limiter(Arc::new(DownLimiter));

        let err = pipeline
            .admit(&AdmissionRequest::new(Some("Bearer valid-1"), "10.0.0.1"))
            .await
            .unwrap_err();

        assert!(matches!(err, AdmissionError::Internal(_)));
    }

    #[tokio::test]
    async fn test_rejected_requests_are_not_counted() {
        let limiter = Arc::new(CountingLimiter {
            limit: 10,
            seen: AtomicUsize::new(0),
        });
        let pipeline = pipeline(Arc::default()).with_rate_limiter(limiter.clone());

        let _ = pipeline.admit(&AdmissionRequest::new(None, "10.0.0.1")).await;
        let request = AdmissionRequest::new(Some("Bearer valid-3"), "10.0.0.1")
            .requiring(owner_or(99, "admin"));
        let _ = pipeline.admit(&request).await;

        assert_eq!(limiter.seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_key_selection() {
        let recorder = Arc::new(KeyRecorder(std::sync::Mutex::new(Vec::new())));
        let by_addr = pipeline(Arc::default()).with_rate_limiter(recorder.clone());
        let by_user = by_addr.clone().with_rate_limit_key(RateLimitKey::User);
        let request = AdmissionRequest::new(Some("Bearer valid-2"), "192.0.2.7");

        by_addr.admit(&request).await.unwrap();
        by_user.admit(&request).await.unwrap();

        let keys = recorder.0.lock().unwrap().clone();
        assert_eq!(keys, vec!["192.0.2.7".to_string(), "user:2".to_string()]);
    }

    #[tokio::test]
    async fn test_split_admission_matches_single_call() {
        let roles = Arc::new(CountingRoles::default());
        let limiter = Arc::new(CountingLimiter {
            limit: 10,
            seen: AtomicUsize::new(0),
        });
        let pipeline = pipeline(roles.clone()).with_rate_limiter(limiter.clone());

        let identity = pipeline.authenticate(Some("Bearer valid-3")).await.unwrap();
        assert_eq!(identity.user_id(), 3);
        assert_eq!(roles.calls.load(Ordering::SeqCst), 0);
        assert_eq!(limiter.seen.load(Ordering::SeqCst), 0);

        let err = pipeline
            .admit_identity(identity, &owner_or(99, "admin"), "10.0.0.1")
            .await
            .unwrap_err();
        assert_eq!(err, AdmissionError::Forbidden);
        assert_eq!(limiter.seen.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_authenticate_rejects_before_any_lookup() {
        let pipeline = pipeline(Arc::default());

        let err = pipeline.authenticate(None).await.unwrap_err();
        assert_eq!(err.status_code(), 401);
        let err = pipeline.authenticate(Some("Bearer forged")).await.unwrap_err();
        assert_eq!(err.status_code(), 401);
    }

    #[test]
    fn test_rate_limit_key_parse() {
        assert_eq!("user".parse::<RateLimitKey>(), Ok(RateLimitKey::User));
        assert_eq!("client".parse::<RateLimitKey>(), Ok(RateLimitKey::ClientAddr));
        assert!("cookie".parse::<RateLimitKey>().is_err());
    }
}
