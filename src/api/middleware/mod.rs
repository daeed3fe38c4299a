//! API middleware stack.
//!
//! Execution order (outermost → innermost):
//! 1. Access log (every request, including rejected ones)
//! 2. API key check (`/v1` routes only)

pub mod audit;
pub mod auth;
