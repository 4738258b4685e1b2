//! Admission control: identity resolution, role authorization and the
//! per-request pipeline that composes them with a rate limiter.

mod authorizer;
mod basic;
mod identity;
mod pipeline;
mod user_cache;

use std::time::Duration;

pub use authorizer::{AuthorizeError, RoleAuthorizer};
pub use basic::BasicCredentials;
pub use identity::{IdentityResolver, ResolveError};
pub use pipeline::{
    AccessRequirement, AdmissionPipeline, AdmissionRequest, AdmissionStage, Admitted,
    RateLimitKey,
};
pub use user_cache::UserCache;

/// Ceiling applied to every collaborator call made during admission.
pub const DEFAULT_STAGE_TIMEOUT: Duration = Duration::from_secs(5);
