//! Domain entities - the core business objects.

mod post;
mod role;
mod user;

pub use post::Post;
pub use role::Role;
pub use user::{AuthenticatedIdentity, User};
