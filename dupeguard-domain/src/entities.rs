// Domain entities
pub mod alert;
pub mod engine_config;
pub mod item_limit;
pub mod raw_event;
pub mod transaction;
pub mod verdict;

pub use alert::*;
pub use engine_config::*;
pub use item_limit::*;
pub use raw_event::*;
pub use transaction::*;
pub use verdict::*;
