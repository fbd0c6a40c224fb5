pub mod exemption_files;
pub mod item_limit_files;

pub use exemption_files::*;
pub use item_limit_files::*;
