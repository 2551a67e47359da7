pub mod clipboard;
pub mod codec;
pub mod config_store;
pub mod file;
