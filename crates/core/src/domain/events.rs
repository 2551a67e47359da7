use super::{
    payload::TemplateSummary,
    slot::Slot,
};
use chrono::NaiveDateTime;

/// Domain events emitted by the session service
#[derive(Debug, Clone)]
pub enum Event {
    /// A template was generated or imported and is now the active session
    TemplateLoaded { summary: TemplateSummary },

    /// The displayed slot changed; `payload` is the text to encode
    SlotChanged { slot: Slot, payload: String },

    /// Poll-period clock reading for the countdown display
    Tick { now: NaiveDateTime, seconds_to_next: u64 },

    /// The rotation loop started
    RotationStarted,

    /// The rotation loop exited
    RotationStopped,

    /// An action failed; the active session is unchanged
    Error { msg: String },

    /// User requested to quit the application
    QuitRequested,
}
