//! QrSign Core - Pure rotation logic with no I/O dependencies
//!
//! This crate contains the payload template handling, the time-slot clock,
//! the session state machine and the ports (interfaces) for QrSign. It has no
//! dependencies on UI frameworks, QR libraries, clipboards or files - those
//! are handled by adapters.

pub mod domain;
pub mod ports;
pub mod app;
pub mod error;

// Re-exports for ergonomics
pub use domain::*;
pub use error::*;
