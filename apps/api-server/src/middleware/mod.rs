//! Middleware modules.

pub mod admission;
pub mod basic_auth;
pub mod error;
mod identity;

pub use admission::Admission;
pub use basic_auth::BasicAuth;
pub use identity::CurrentUser;
