pub mod rotation;
pub mod session_service;
