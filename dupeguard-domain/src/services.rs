// Domain services
pub mod ledger;
pub mod matcher;
pub mod normalizer;
pub mod rules;

pub use ledger::*;
pub use matcher::*;
pub use normalizer::*;
pub use rules::*;
