use crate::domain::payload::Identifiers;
use std::path::PathBuf;

/// Where an imported template is captured from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSource {
    /// Image currently on the system clipboard
    Clipboard,

    /// Image file on disk
    File(PathBuf),
}

/// Commands that can be sent to the session service
#[derive(Debug, Clone)]
pub enum Command {
    /// Create a fresh session from the given identifiers at the current time
    Generate { ids: Identifiers },

    /// Create a session from a captured QR code
    Import { source: ImportSource },

    /// Start rotating the active session
    Start,

    /// Stop rotating, keeping the template
    Stop,

    /// Quit the application
    Quit,
}
