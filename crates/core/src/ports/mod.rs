pub mod codec;
pub mod image_source;
pub mod config;
pub mod time;

// Re-exports
pub use codec::*;
pub use image_source::*;
pub use config::*;
pub use time::*;
