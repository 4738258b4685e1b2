//! # Gatekeep Core
//!
//! The domain layer of Gatekeep: entities, ports, and the admission pipeline
//! that authenticates, authorizes and rate-limits every request.
//! Infrastructure lives behind the traits in [`ports`].

pub mod admission;
pub mod domain;
pub mod error;
pub mod ports;

pub use admission::{AccessRequirement, AdmissionPipeline, AdmissionRequest, Admitted};
pub use error::{AdmissionError, RepoError};
