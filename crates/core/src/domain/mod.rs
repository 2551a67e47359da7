pub mod payload;
pub mod slot;
pub mod session;
pub mod events;

// Re-exports for convenience
pub use payload::*;
pub use slot::*;
pub use session::*;
pub use events::*;
