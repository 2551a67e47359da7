pub mod commands;
pub mod queries;

pub use commands::*;
pub use queries::*;
