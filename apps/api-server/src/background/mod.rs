//! Background jobs.

mod scheduler;

pub use scheduler::{Scheduler, schedule_limiter_sweep};
