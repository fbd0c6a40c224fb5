pub mod log_host;
pub mod log_transport;
pub mod replay_source;
pub mod webhook_transport;

pub use log_host::*;
pub use log_transport::*;
pub use replay_source::*;
pub use webhook_transport::*;
