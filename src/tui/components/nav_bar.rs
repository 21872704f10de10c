//! # NavBar Component
//!
//! Bottom bar with the key hints and the status of the current operation.
//! Prev/next hints are dimmed while the matching button is disabled.

use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use crate::tui::component::Component;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub struct NavBar {
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub loading: bool,
    pub error: bool,
    /// Whether a trip is on screen; changes the wording of errors
    pub has_trip: bool,
    pub spinner_frame: usize,
}

impl NavBar {
    fn hint(label: &'static str, enabled: bool) -> Span<'static> {
        if enabled {
            Span::styled(label, Style::default().fg(Color::White))
        } else {
            Span::styled(label, Style::default().add_modifier(Modifier::DIM))
        }
    }

    fn status(&self) -> Option<Span<'static>> {
        if self.loading {
            let frame = SPINNER[self.spinner_frame % SPINNER.len()];
            Some(Span::styled(
                format!("{} Updating…", frame),
                Style::default().fg(Color::Yellow),
            ))
        } else if self.error && self.has_trip {
            Some(Span::styled(
                "⚠ Update failed, showing last known data",
                Style::default().fg(Color::Red),
            ))
        } else if self.error {
            Some(Span::styled("⚠ Update failed", Style::default().fg(Color::Red)))
        } else {
            None
        }
    }
}

impl Component for NavBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::bordered();
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let [hints_area, status_area] =
            Layout::horizontal([Constraint::Min(0), Constraint::Length(44)]).areas(inner);

        let hints = Line::from(vec![
            Self::hint("◀ prev", self.prev_enabled),
            Span::raw("  "),
            Self::hint("next ▶", self.next_enabled),
            Span::styled(
                "   r reload  f favorite  n now  [ ] day  q quit",
                Style::default().fg(Color::DarkGray),
            ),
        ]);
        frame.render_widget(Paragraph::new(hints), hints_area);

        if let Some(status) = self.status() {
            frame.render_widget(
                Paragraph::new(Line::from(status)).alignment(Alignment::Right),
                status_area,
            );
        }
    }
}
