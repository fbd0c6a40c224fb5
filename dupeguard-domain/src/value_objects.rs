// Domain value objects
pub mod identifiers;
pub mod mitigation_action;
pub mod severity;

pub use identifiers::*;
pub use mitigation_action::*;
pub use severity::*;
