// Port traits (interfaces)
// Define what the domain needs from the host and from infrastructure

pub mod clock;
pub mod host;
pub mod repositories;
pub mod services;

pub use clock::*;
pub use host::*;
pub use repositories::*;
pub use services::*;
