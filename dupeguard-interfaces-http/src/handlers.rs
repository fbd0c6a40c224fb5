pub mod exemption_handlers;
pub mod ops_handlers;
pub mod verdict_handlers;

pub use exemption_handlers::*;
pub use ops_handlers::*;
pub use verdict_handlers::*;
