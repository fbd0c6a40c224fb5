pub mod delivery_queries;
pub mod verdict_queries;

pub use delivery_queries::*;
pub use verdict_queries::*;
