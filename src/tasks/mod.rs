//! Background Tasks Module
//!
//! Contains background tasks owned by the cache client.
//!
//! # Tasks
//! - Sweep: purges expired local entries and enforces the size bound

mod sweep;

pub use sweep::spawn_sweep_task;
