//! Static basic-credential check for service-to-service endpoints.
//!
//! Runs beside the token pipeline, never through it: no cache, no rate limit.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::AdmissionError;

#[derive(Clone)]
pub struct BasicCredentials {
    username: String,
    password: String,
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var("AUTH_BASIC_USER").unwrap_or_else(|_| "admin".to_string()),
            std::env::var("AUTH_BASIC_PASS").unwrap_or_else(|_| "admin".to_string()),
        )
    }

    /// Check an `Authorization: Basic <base64(user:pass)>` header value.
    pub fn verify(&self, header: Option<&str>) -> Result<(), AdmissionError> {
        let header =
            header.ok_or_else(|| AdmissionError::unauthenticated("authorization header is missing"))?;

        let encoded = match header.split_once(' ') {
            Some(("Basic", encoded)) if !encoded.is_empty() && !encoded.contains(' ') => encoded,
            _ => return Err(AdmissionError::unauthenticated("authorization header is malformed")),
        };

        let decoded = STANDARD
            .decode(encoded)
            .map_err(|_| AdmissionError::unauthenticated("authorization header is malformed"))?;
        let decoded = String::from_utf8(decoded)
            .map_err(|_| AdmissionError::unauthenticated("authorization header is malformed"))?;

        let (user, pass) = decoded
            .split_once(':')
            .ok_or_else(|| AdmissionError::unauthenticated("invalid credentials"))?;

        // Evaluate both comparisons so timing does not reveal which field was wrong.
        let user_ok = constant_time_eq(user.as_bytes(), self.username.as_bytes());
        let pass_ok = constant_time_eq(pass.as_bytes(), self.password.as_bytes());
        if user_ok & pass_ok {
            Ok(())
        } else {
            Err(AdmissionError::unauthenticated("invalid credentials"))
        }
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
