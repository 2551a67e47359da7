use crate::domain::{Event, Slot, TemplateSummary};
use chrono::NaiveDateTime;

/// Read-only projection of the session for UI consumption
#[derive(Debug, Default)]
pub struct ReadProjection {
    /// The active template, if any
    pub template: Option<TemplateSummary>,

    /// Slot currently on display
    pub slot: Option<Slot>,

    /// Payload text for `slot`
    pub payload: Option<String>,

    /// Latest clock reading from the rotation loop
    pub now: Option<NaiveDateTime>,

    /// Countdown to the next slot while rotating
    pub seconds_to_next: Option<u64>,

    /// Whether the rotation loop is running
    pub rotating: bool,
}

impl ReadProjection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply an event to update the projection
    pub fn apply(&mut self, event: &Event) {
        match event {
            Event::TemplateLoaded { summary } => {
                self.template = Some(summary.clone());
                self.slot = None;
                self.payload = None;
                self.now = None;
                self.seconds_to_next = None;
                self.rotating = false;
            }

            Event::SlotChanged { slot, payload } => {
                self.slot = Some(*slot);
                self.payload = Some(payload.clone());
            }

            Event::Tick { now, seconds_to_next } => {
                self.now = Some(*now);
                self.seconds_to_next = Some(*seconds_to_next);
            }

            Event::RotationStarted => {
                self.rotating = true;
            }

            Event::RotationStopped => {
                self.rotating = false;
                self.seconds_to_next = None;
            }

            Event::Error { .. } | Event::QuitRequested => {}
        }
    }

    pub fn has_template(&self) -> bool {
        self.template.is_some()
    }
}
