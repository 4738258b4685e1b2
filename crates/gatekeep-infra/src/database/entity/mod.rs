//! SeaORM entities for the `users`, `roles` and `posts` tables.

pub mod post;
pub mod role;
pub mod user;
