pub mod exemption_commands;
pub mod ingest_commands;

pub use exemption_commands::*;
pub use ingest_commands::*;
