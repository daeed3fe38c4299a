//! Repository layer: entity-scoped database operations.
//!
//! Free functions over a borrowed `Connection`, so callers decide whether
//! several calls share one transaction.

mod glucose_record;
mod sync_checkpoint;

pub use glucose_record::*;
pub use sync_checkpoint::*;
