// Engine operations: scheduling, dispatch, alert delivery and expiry
pub mod alert_queue;
pub mod dispatcher;
pub mod exemptions;
pub mod scheduler;
pub mod sink_worker;
pub mod sweeper;
pub mod verdict_registry;

pub use alert_queue::*;
pub use dispatcher::*;
pub use exemptions::*;
pub use scheduler::*;
pub use sink_worker::*;
pub use sweeper::*;
pub use verdict_registry::*;
