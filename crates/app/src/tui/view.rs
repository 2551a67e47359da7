use super::model::{TuiModel, ViewMode};
use chrono::NaiveDateTime;
use qrsign_core::ports::QrMatrix;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Modules of light margin drawn around the code
pub const QUIET_ZONE: usize = 2;

/// The View component of MVU - responsible for rendering the model
pub struct TuiView;

impl TuiView {
    /// Render the entire TUI based on the current model state
    pub fn render(model: &TuiModel, frame: &mut Frame) {
        let size = frame.area();

        // Main layout
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1), // Title bar
                Constraint::Min(0),    // Main content
                Constraint::Length(3), // Status/input bar
            ])
            .split(size);

        Self::render_title_bar(model, frame, chunks[0]);

        match model.mode {
            ViewMode::Main => Self::render_main(model, frame, chunks[1]),
            ViewMode::Help => Self::render_help_view(frame, chunks[1]),
        }

        Self::render_status_bar(model, frame, chunks[2]);

        Self::render_overlays(model, frame, size);
    }

    fn render_title_bar(model: &TuiModel, frame: &mut Frame, area: Rect) {
        let title = match model.mode {
            ViewMode::Main => "QrSign - Check-in Code",
            ViewMode::Help => "QrSign - Help",
        };

        let rotating_indicator = if model.projection.rotating {
            " [ROTATING]"
        } else {
            ""
        };

        let title_paragraph = Paragraph::new(format!("{title}{rotating_indicator}"))
            .style(Style::default().fg(Color::White).bg(Color::Blue))
            .alignment(Alignment::Center);

        frame.render_widget(title_paragraph, area);
    }

    fn render_main(model: &TuiModel, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(44)])
            .split(area);

        Self::render_code(model, frame, chunks[0]);
        Self::render_info_panel(model, frame, chunks[1]);
    }

    fn render_code(model: &TuiModel, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Code");

        let Some(matrix) = &model.qr else {
            let empty_msg = Paragraph::new("No session. Press 'g' to generate a code or 'v' to import one.")
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(block);
            frame.render_widget(empty_msg, area);
            return;
        };

        let inner = block.inner(area);
        frame.render_widget(block, area);

        let side = matrix.width() + 2 * QUIET_ZONE;
        if usize::from(inner.width) < side || usize::from(inner.height) < side.div_ceil(2) {
            let too_small = Paragraph::new(format!("Enlarge the terminal to at least {}x{} to show the code", side + 2, side.div_ceil(2) + 2))
                .style(Style::default().fg(Color::Yellow))
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true });
            frame.render_widget(too_small, inner);
            return;
        }

        let code = Paragraph::new(qr_lines(matrix, QUIET_ZONE)).alignment(Alignment::Center);
        let top = inner.y + (inner.height - u16::try_from(side.div_ceil(2)).unwrap_or(inner.height)) / 2;
        let code_area = Rect {
            y: top,
            height: inner.height - (top - inner.y),
            ..inner
        };
        frame.render_widget(code, code_area);
    }

    fn render_info_panel(model: &TuiModel, frame: &mut Frame, area: Rect) {
        let label = Style::default().fg(Color::Cyan);
        let field = |name: &str, value: String| {
            Line::from(vec![Span::styled(format!("{name:<14}"), label), Span::raw(value)])
        };

        let course = model.form.course_name.clone().unwrap_or_else(|| "-".to_string());
        let mut lines = vec![
            Line::from(Span::styled(course, Style::default().add_modifier(Modifier::BOLD))),
            Line::from(""),
        ];

        let time = model.display_time().map(format_clock).unwrap_or_else(|| "--".to_string());
        lines.push(field("Time", time));

        let countdown = match model.projection.seconds_to_next {
            Some(secs) if model.projection.rotating => format!("next code in {secs} s"),
            _ => "not rotating".to_string(),
        };
        lines.push(field("Rotation", countdown));
        lines.push(Line::from(""));

        match &model.projection.template {
            Some(template) => {
                lines.push(field("Source", template.origin.to_string()));
                lines.push(field("Epoch", template.time_format.render(template.epoch)));
                lines.push(field("Time format", template.time_format.to_string()));
                if let Some(slot) = &model.projection.slot {
                    lines.push(field("Slot", template.time_format.render(slot.current)));
                }
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled("Template", label)));
                lines.push(Line::from(template.preview.clone()));
            }
            None => lines.push(field("Source", "none".to_string())),
        }

        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Next generated code", label)));
        let ids = &model.form.ids;
        lines.push(field("id", ids.id().unwrap_or("random").to_string()));
        lines.push(field("siteId", ids.site_id().unwrap_or("random").to_string()));
        lines.push(field("classLessonId", ids.class_lesson_id().unwrap_or("random").to_string()));

        let panel = Paragraph::new(lines)
            .block(Block::default().borders(Borders::ALL).title("Session"))
            .wrap(Wrap { trim: false });
        frame.render_widget(panel, area);
    }

    fn render_help_view(frame: &mut Frame, area: Rect) {
        let heading = Style::default().add_modifier(Modifier::UNDERLINED);
        let help_text = vec![
            Line::from(Span::styled("QrSign Help", Style::default().add_modifier(Modifier::BOLD))),
            Line::from(""),
            Line::from(Span::styled("Session:", heading)),
            Line::from("  g - Generate a new code"),
            Line::from("  v - Import a code from the clipboard image"),
            Line::from("  o - Import a code from an image file"),
            Line::from("  Enter/s - Start rotation"),
            Line::from("  x - Stop rotation"),
            Line::from(""),
            Line::from(Span::styled("Settings:", heading)),
            Line::from("  n - Set course name"),
            Line::from("  i / t / l - Set custom id / siteId / classLessonId"),
            Line::from("  c - Clear custom identifiers"),
            Line::from(""),
            Line::from(Span::styled("Global:", heading)),
            Line::from("  ? - Show this help"),
            Line::from("  Ctrl+C / Esc / q - Quit"),
            Line::from(""),
            Line::from("Press any key to close help..."),
        ];

        let help = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help"))
            .wrap(Wrap { trim: true });

        frame.render_widget(help, area);
    }

    /// Render the status/input bar at the bottom
    fn render_status_bar(model: &TuiModel, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        // Input line
        if model.is_editing() {
            let input_text = format!("{} {}", model.input.prompt, model.input.text);
            let input_paragraph = Paragraph::new(input_text).style(Style::default().fg(Color::Yellow));
            frame.render_widget(input_paragraph, chunks[0]);
        } else {
            frame.render_widget(Paragraph::new(""), chunks[0]);
        }

        let status_paragraph = Paragraph::new(Self::build_status_text(model))
            .style(Style::default().fg(Color::White).bg(Color::DarkGray));
        frame.render_widget(status_paragraph, chunks[1]);

        let hints_paragraph = Paragraph::new(Self::get_key_hints(model)).style(Style::default().fg(Color::Gray));
        frame.render_widget(hints_paragraph, chunks[2]);
    }

    fn build_status_text(model: &TuiModel) -> String {
        match model.status() {
            Some(status) => status.to_string(),
            None => "Ready".to_string(),
        }
    }

    fn get_key_hints(model: &TuiModel) -> String {
        if model.is_editing() {
            return "Enter Confirm | Esc Cancel".to_string();
        }
        match model.mode {
            ViewMode::Main => "g Generate | v Paste | o Open | Enter Start | x Stop | n Course | ? Help | q Quit",
            ViewMode::Help => "Any key to close",
        }
        .to_string()
    }

    fn render_overlays(model: &TuiModel, frame: &mut Frame, area: Rect) {
        if !model.errors.is_empty() {
            Self::render_error_overlay(model, frame, area);
        }
    }

    fn render_error_overlay(model: &TuiModel, frame: &mut Frame, area: Rect) {
        let popup_area = Self::centered_rect(60, 20, area);

        frame.render_widget(Clear, popup_area);

        let error_text: Vec<Line> = model.errors.iter().map(|error| Line::from(error.as_str())).collect();

        let error_popup = Paragraph::new(error_text)
            .block(Block::default().borders(Borders::ALL).title("Errors (any key to dismiss)"))
            .style(Style::default().fg(Color::Red))
            .wrap(Wrap { trim: true });

        frame.render_widget(error_popup, popup_area);
    }

    /// Helper to create centered rectangle
    fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
        let popup_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage((100 - percent_y) / 2),
                Constraint::Percentage(percent_y),
                Constraint::Percentage((100 - percent_y) / 2),
            ])
            .split(r);

        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ])
            .split(popup_layout[1])[1]
    }
}

/// Draw a module grid with Unicode half blocks, two module rows per line,
/// dark modules on a white background
pub fn qr_lines(matrix: &QrMatrix, quiet_zone: usize) -> Vec<Line<'static>> {
    let side = matrix.width() + 2 * quiet_zone;
    let dark = |x: usize, y: usize| {
        matches!(
            (x.checked_sub(quiet_zone), y.checked_sub(quiet_zone)),
            (Some(mx), Some(my)) if matrix.is_dark(mx, my)
        )
    };
    let style = Style::default().fg(Color::Black).bg(Color::White);

    (0..side)
        .step_by(2)
        .map(|y| {
            let row: String = (0..side)
                .map(|x| match (dark(x, y), y + 1 < side && dark(x, y + 1)) {
                    (true, true) => '█',
                    (true, false) => '▀',
                    (false, true) => '▄',
                    (false, false) => ' ',
                })
                .collect();
            Line::from(Span::styled(row, style))
        })
        .collect()
}

/// `YYYY-MM-DD HH:MM:SS`
pub fn format_clock(time: NaiveDateTime) -> String {
    time.format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use qrsign_core::domain::Event;
    use ratatui::{Terminal, backend::TestBackend};

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn test_qr_lines_use_half_blocks() {
        let matrix = QrMatrix::new(2, vec![true, false, true, true]);
        let lines = qr_lines(&matrix, 1);

        let text: Vec<String> = lines.iter().map(line_text).collect();
        assert_eq!(text, vec![" ▄  ", " ▀▀ "]);
    }

    #[test]
    fn test_format_clock() {
        let time = NaiveDateTime::parse_from_str("2025-03-13T12:00:07.400", "%Y-%m-%dT%H:%M:%S%.f").unwrap();
        assert_eq!(format_clock(time), "2025-03-13 12:00:07");
    }

    #[test]
    fn test_render_empty_and_error_state() {
        let mut model = TuiModel::new();
        model.apply_event(&Event::Error {
            msg: "No template loaded".to_string(),
        });

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|frame| TuiView::render(&model, frame)).unwrap();

        let buffer = terminal.backend().buffer();
        let content: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(content.contains("QrSign - Check-in Code"));
        assert!(content.contains("No template loaded"));
    }
}
