//! QrSign application library
//!
//! This exposes the public API of the QrSign application for testing and external usage.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod logging;
pub mod services;
pub mod tui;
