use chrono::NaiveDateTime;
use qrsign_core::app::ReadProjection;
use qrsign_core::domain::{Event, Identifiers, TemplateOrigin};
use qrsign_core::ports::QrMatrix;

/// The TUI Model - this represents the complete UI state
/// This is separate from the core ReadProjection to allow UI-specific state
#[derive(Debug, Default)]
pub struct TuiModel {
    /// Core data from the session service
    pub projection: ReadProjection,

    /// Module grid of the payload on display
    pub qr: Option<QrMatrix>,

    /// Settings the next generated session is built from
    pub form: SessionForm,

    /// Current input state
    pub input: InputState,

    /// Current view mode
    pub mode: ViewMode,

    /// Wall-clock reading taken by the render loop
    pub wall_clock: Option<NaiveDateTime>,

    /// Error messages to display
    pub errors: Vec<String>,

    /// Status messages to display
    pub messages: Vec<String>,

    /// Whether the application should quit
    pub should_quit: bool,
}

/// Display label and custom identifiers for the session
#[derive(Debug, Default, Clone)]
pub struct SessionForm {
    /// Course shown next to the code, never part of the payload
    pub course_name: Option<String>,

    pub ids: Identifiers,
}

/// Input state for text input modes
#[derive(Debug, Default)]
pub struct InputState {
    /// Current input mode
    pub mode: InputMode,

    /// Current input text
    pub text: String,

    /// Input prompt text
    pub prompt: String,
}

/// Input modes for different text entry scenarios
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    None,
    CourseName,
    Id,
    SiteId,
    ClassLessonId,
    ImportPath,
}

/// Different view modes for the TUI
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    #[default]
    Main,
    Help,
}

impl TuiModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from preset identifiers, e.g. from the config file
    pub fn with_identifiers(ids: Identifiers) -> Self {
        Self {
            form: SessionForm {
                course_name: None,
                ids,
            },
            ..Self::default()
        }
    }

    /// Apply an event to update both projection and UI state
    pub fn apply_event(&mut self, event: &Event) {
        // First update the projection
        self.projection.apply(event);

        // Then handle UI-specific updates
        match event {
            Event::TemplateLoaded { summary } => {
                let message = match summary.origin {
                    TemplateOrigin::Generated => "Code generated - press Enter to start rotating".to_string(),
                    TemplateOrigin::Imported => {
                        format!("Template loaded (createTime {}) - press Enter to start rotating", summary.time_format.render(summary.epoch))
                    }
                };
                self.add_message(message);
            }

            Event::SlotChanged { .. } | Event::Tick { .. } => {}

            Event::RotationStarted => {
                self.add_message("Rotation started".to_string());
            }

            Event::RotationStopped => {
                self.add_message("Rotation stopped".to_string());
            }

            Event::Error { msg } => {
                self.add_error(msg.clone());
            }

            Event::QuitRequested => {
                self.should_quit = true;
            }
        }
    }

    /// Replace the displayed code
    pub fn set_qr(&mut self, matrix: QrMatrix) {
        self.qr = Some(matrix);
    }

    /// Latest status line, if any
    pub fn status(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }

    /// Time for the clock line: the rotation loop's reading while it runs
    pub fn display_time(&self) -> Option<NaiveDateTime> {
        if self.projection.rotating {
            self.projection.now.or(self.wall_clock)
        } else {
            self.wall_clock
        }
    }

    /// Enter a text input mode with a prompt and initial text
    pub fn begin_input(&mut self, mode: InputMode, prompt: &str, initial: &str) {
        self.input.mode = mode;
        self.input.prompt = prompt.to_string();
        self.input.text = initial.to_string();
    }

    /// Leave text input, discarding the text
    pub fn cancel_input(&mut self) {
        self.input.mode = InputMode::None;
        self.input.text.clear();
        self.input.prompt.clear();
    }

    pub fn is_editing(&self) -> bool {
        self.input.mode != InputMode::None
    }

    /// Clear all error messages
    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Add a status message
    pub fn add_message(&mut self, message: String) {
        self.messages.push(message);
    }

    /// Add an error message; it also becomes the status line
    pub fn add_error(&mut self, error: String) {
        self.messages.push(format!("Error: {error}"));
        self.errors.push(error);
    }
}
