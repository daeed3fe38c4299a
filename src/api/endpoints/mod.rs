//! API endpoint handlers.
//!
//! Handlers validate wire input, then hand off to the `SyncCoordinator`
//! on the blocking pool.

pub mod glucose_records;
pub mod health;
