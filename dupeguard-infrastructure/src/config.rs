pub mod app_config;
pub mod sections;
pub mod validation;

pub use app_config::*;
pub use sections::*;
pub use validation::*;
