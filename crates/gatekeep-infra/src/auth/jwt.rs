//! HMAC (HS256) bearer tokens.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use gatekeep_core::ports::{AuthError, TokenClaims, TokenService};

const DEFAULT_SECRET: &str = "change-me-in-production";
const DEFAULT_ISSUER: &str = "gatekeep";
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3 * 24 * 3600);

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub token_ttl: Duration,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: DEFAULT_SECRET.to_string(),
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_ISSUER.to_string(),
            token_ttl: DEFAULT_TOKEN_TTL,
        }
    }
}

impl JwtConfig {
    /// Reads `JWT_SECRET`, `JWT_ISSUER`, `JWT_AUDIENCE` and
    /// `JWT_TOKEN_TTL_HOURS`. Falling back to the built-in secret is logged,
    /// at error level when `APP_ENV` says production.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let config = Self {
            secret: std::env::var("JWT_SECRET").unwrap_or(defaults.secret),
            issuer: std::env::var("JWT_ISSUER").unwrap_or(defaults.issuer),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or(defaults.audience),
            token_ttl: std::env::var("JWT_TOKEN_TTL_HOURS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
                .map(|h| Duration::from_secs(h * 3600))
                .unwrap_or(defaults.token_ttl),
        };

        if config.secret == DEFAULT_SECRET {
            let production = matches!(
                std::env::var("APP_ENV").as_deref(),
                Ok("production") | Ok("prod")
            );
            if production {
                tracing::error!("JWT_SECRET is unset in production; tokens are signed with a public default");
            } else {
                tracing::warn!("JWT_SECRET is unset, using the development default");
            }
        }

        config
    }
}

/// Registered claims written into every token.
#[derive(Debug, Serialize, Deserialize)]
struct AccessClaims {
    sub: i64,
    iss: String,
    aud: String,
    iat: i64,
    nbf: i64,
    exp: i64,
}

/// Issues and verifies HS256 tokens for a single issuer and audience.
///
/// Verification rejects a bad signature, a different issuer or audience,
/// and any token outside its `nbf..exp` range. No clock leeway is granted.
pub struct JwtTokenService {
    signing: EncodingKey,
    verifying: DecodingKey,
    validation: Validation,
    config: JwtConfig,
}

impl JwtTokenService {
    pub fn new(config: JwtConfig) -> Self {
        let mut validation = Validation::default();
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_audience(&[config.audience.as_str()]);
        // `sub` is numeric; jsonwebtoken only counts string subjects as present,
        // so its presence is enforced by deserialization instead.
        validation.set_required_spec_claims(&["exp", "iss", "aud"]);
        validation.validate_nbf = true;
        validation.leeway = 0;

        Self {
            signing: EncodingKey::from_secret(config.secret.as_bytes()),
            verifying: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            config,
        }
    }
}

fn rejection(err: JwtError) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::ImmatureSignature => AuthError::InvalidToken("token not yet valid".into()),
        ErrorKind::InvalidIssuer => AuthError::InvalidToken("unexpected issuer".into()),
        ErrorKind::InvalidAudience => AuthError::InvalidToken("unexpected audience".into()),
        _ => AuthError::InvalidToken(err.to_string()),
    }
}

impl TokenService for JwtTokenService {
    fn generate_token(&self, user_id: i64) -> Result<String, AuthError> {
        let issued = Utc::now().timestamp();
        let claims = AccessClaims {
            sub: user_id,
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
            iat: issued,
            nbf: issued,
            exp: issued + self.expiration_seconds(),
        };

        encode(&Header::default(), &claims, &self.signing)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))
    }

    fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError> {
        let data = decode::<AccessClaims>(token, &self.verifying, &self.validation).map_err(rejection)?;
        Ok(TokenClaims {
            subject: data.claims.sub,
            exp: data.claims.exp,
        })
    }

    fn expiration_seconds(&self) -> i64 {
        i64::try_from(self.config.token_ttl.as_secs()).unwrap_or(i64::MAX)
    }
}
