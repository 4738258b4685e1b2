//! Authentication ports.

/// Claims carried by a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    /// Subject: the user id the token was issued for.
    pub subject: i64,
    pub exp: i64,
}

/// Token service trait for signed bearer tokens.
///
/// Verification is a pure in-memory check: no I/O, no side effects.
pub trait TokenService: Send + Sync {
    /// Issue a token for a user.
    fn generate_token(&self, user_id: i64) -> Result<String, AuthError>;

    /// Validate a token's signature, expiry and issuer, and decode its claims.
    fn validate_token(&self, token: &str) -> Result<TokenClaims, AuthError>;

    /// Lifetime of issued tokens.
    fn expiration_seconds(&self) -> i64;
}

/// Authentication errors.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token: {0}")]
    InvalidToken(String),

    #[error("Missing authorization header")]
    MissingAuth,

    #[error("Malformed authorization header: {0}")]
    MalformedAuth(String),
}
