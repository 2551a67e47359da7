use thiserror::Error;

/// Core domain errors
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Payload has no createTime field")]
    NoTimestampField,

    #[error("createTime is not a valid date-time: {value}")]
    UnparsableTimestamp { value: String },

    #[error("No QR code found in the image")]
    DecodeFailed,

    #[error("No image available from {source_name}")]
    CaptureEmpty { source_name: String },

    #[error("No template loaded - generate or import a code first")]
    NoTemplate,

    #[error("Slot interval must be positive")]
    InvalidInterval,

    #[error("Invalid session transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Port error: {source}")]
    Port { source: anyhow::Error },
}

pub type Result<T> = std::result::Result<T, CoreError>;
