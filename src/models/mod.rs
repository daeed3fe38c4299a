pub mod enums;
pub mod glucose_record;
pub mod sync_checkpoint;

pub use enums::*;
pub use glucose_record::*;
pub use sync_checkpoint::*;
