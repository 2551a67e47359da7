use super::model::{InputMode, TuiModel, ViewMode};
use anyhow::Result;
use chrono::NaiveDateTime;
use crossterm::event::{KeyCode, KeyModifiers};
use qrsign_core::app::{Command, ImportSource};
use std::path::PathBuf;

/// Messages that can be sent from the TUI to the session service
#[derive(Debug, Clone)]
pub enum TuiMessage {
    /// Send a command to the session service
    Command(Command),

    /// No action needed
    None,
}

/// The Update function - handles user input and updates the model
/// This is the core of the MVU pattern's Update component
pub struct TuiUpdate;

impl TuiUpdate {
    /// Handle a key press and update the model accordingly
    /// Returns a TuiMessage that should be sent to the session service
    pub fn handle_key(model: &mut TuiModel, key: KeyCode, modifiers: KeyModifiers) -> Result<TuiMessage> {
        if key == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(TuiMessage::Command(Command::Quit));
        }

        // Handle input mode keys if we're in text input
        if model.is_editing() {
            return Self::handle_input_keys(model, key);
        }

        // Any key dismisses the error overlay
        if !model.errors.is_empty() {
            model.clear_errors();
            return Ok(TuiMessage::None);
        }

        match model.mode {
            ViewMode::Main => Self::handle_main_keys(model, key, modifiers),
            ViewMode::Help => Self::handle_help_keys(model),
        }
    }

    /// Record the render loop's clock reading
    pub fn handle_clock(model: &mut TuiModel, now: NaiveDateTime) -> Result<TuiMessage> {
        model.wall_clock = Some(now);
        Ok(TuiMessage::None)
    }

    /// Handle keys when in text input mode
    fn handle_input_keys(model: &mut TuiModel, key: KeyCode) -> Result<TuiMessage> {
        match key {
            KeyCode::Char(c) => {
                model.input.text.push(c);
                Ok(TuiMessage::None)
            }

            KeyCode::Backspace => {
                model.input.text.pop();
                Ok(TuiMessage::None)
            }

            KeyCode::Enter => {
                let text = std::mem::take(&mut model.input.text);
                let input_mode = model.input.mode;
                model.cancel_input();

                Self::process_input_submission(model, input_mode, text)
            }

            KeyCode::Esc => {
                model.cancel_input();
                Ok(TuiMessage::None)
            }

            _ => Ok(TuiMessage::None),
        }
    }

    /// Process submitted input text. Blank input clears the field.
    fn process_input_submission(model: &mut TuiModel, input_mode: InputMode, text: String) -> Result<TuiMessage> {
        let value = Some(text.trim().to_string()).filter(|v| !v.is_empty());

        match input_mode {
            InputMode::None => Ok(TuiMessage::None),

            InputMode::CourseName => {
                let message = match &value {
                    Some(name) => format!("Course set to {name}"),
                    None => "Course cleared".to_string(),
                };
                model.form.course_name = value;
                model.add_message(message);
                Ok(TuiMessage::None)
            }

            InputMode::Id => {
                model.form.ids.id = value;
                let shown = model.form.ids.id().map(str::to_owned);
                Self::report_identifier(model, "id", shown);
                Ok(TuiMessage::None)
            }

            InputMode::SiteId => {
                model.form.ids.site_id = value;
                let shown = model.form.ids.site_id().map(str::to_owned);
                Self::report_identifier(model, "siteId", shown);
                Ok(TuiMessage::None)
            }

            InputMode::ClassLessonId => {
                model.form.ids.class_lesson_id = value;
                let shown = model.form.ids.class_lesson_id().map(str::to_owned);
                Self::report_identifier(model, "classLessonId", shown);
                Ok(TuiMessage::None)
            }

            InputMode::ImportPath => match value {
                Some(path) => Ok(TuiMessage::Command(Command::Import {
                    source: ImportSource::File(PathBuf::from(path)),
                })),
                None => {
                    model.add_message("Import cancelled".to_string());
                    Ok(TuiMessage::None)
                }
            },
        }
    }

    fn report_identifier(model: &mut TuiModel, field: &str, value: Option<String>) {
        let message = match value {
            Some(value) => format!("{field} set to {value} - applies to the next generated code"),
            None => format!("{field} will be random"),
        };
        model.add_message(message);
    }

    /// Handle keys in the main view
    fn handle_main_keys(model: &mut TuiModel, key: KeyCode, modifiers: KeyModifiers) -> Result<TuiMessage> {
        if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
            return Ok(TuiMessage::None);
        }

        match key {
            KeyCode::Char('q') | KeyCode::Esc => Ok(TuiMessage::Command(Command::Quit)),

            KeyCode::Char('?') => {
                model.mode = ViewMode::Help;
                Ok(TuiMessage::None)
            }

            KeyCode::Char('g') => Ok(TuiMessage::Command(Command::Generate {
                ids: model.form.ids.clone(),
            })),

            KeyCode::Char('v') => Ok(TuiMessage::Command(Command::Import {
                source: ImportSource::Clipboard,
            })),

            KeyCode::Char('o') => {
                model.begin_input(InputMode::ImportPath, "Image file:", "");
                Ok(TuiMessage::None)
            }

            KeyCode::Enter | KeyCode::Char('s') => Ok(TuiMessage::Command(Command::Start)),

            KeyCode::Char('x') => Ok(TuiMessage::Command(Command::Stop)),

            KeyCode::Char('n') => {
                let current = model.form.course_name.clone().unwrap_or_default();
                model.begin_input(InputMode::CourseName, "Course name:", &current);
                Ok(TuiMessage::None)
            }

            KeyCode::Char('i') => {
                let current = model.form.ids.id().unwrap_or_default().to_string();
                model.begin_input(InputMode::Id, "id (blank = random):", &current);
                Ok(TuiMessage::None)
            }

            KeyCode::Char('t') => {
                let current = model.form.ids.site_id().unwrap_or_default().to_string();
                model.begin_input(InputMode::SiteId, "siteId (blank = random):", &current);
                Ok(TuiMessage::None)
            }

            KeyCode::Char('l') => {
                let current = model.form.ids.class_lesson_id().unwrap_or_default().to_string();
                model.begin_input(InputMode::ClassLessonId, "classLessonId (blank = random):", &current);
                Ok(TuiMessage::None)
            }

            KeyCode::Char('c') => {
                model.form.ids = Default::default();
                model.add_message("Custom identifiers cleared - all will be random".to_string());
                Ok(TuiMessage::None)
            }

            _ => Ok(TuiMessage::None),
        }
    }

    /// Handle keys in help view
    fn handle_help_keys(model: &mut TuiModel) -> Result<TuiMessage> {
        // Any key exits help
        model.mode = ViewMode::Main;
        Ok(TuiMessage::None)
    }
}
