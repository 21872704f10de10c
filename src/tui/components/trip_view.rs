//! # TripView Component
//!
//! Main area: the displayed trip and its calls, one row per stop.
//!
//! - Passed calls are dimmed and marked `✓`.
//! - The next call is marked `▶`.
//! - The call at the stop being watched is drawn bold.
//! - Delays from real-time estimates are appended as `+N min`.
//!
//! With no trip on screen the area shows a placeholder that depends on
//! whether a load is still running, has failed, or found nothing.

use std::sync::Arc;

use chrono_tz::Tz;
use ratatui::Frame;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph};

use crate::transit::{StopTime, TripDetail};
use crate::tui::component::Component;

pub const PASSED_MARK: &str = "✓";
pub const NEXT_MARK: &str = "▶";

pub struct TripView {
    pub trip: Option<Arc<TripDetail>>,
    pub trip_index: usize,
    /// Id of the stop whose departures we are browsing
    pub stop_id: String,
    pub zone: Tz,
    pub loading: bool,
    pub error: bool,
}

impl TripView {
    fn placeholder(&self) -> &'static str {
        if self.loading {
            "Loading trips…"
        } else if self.error {
            "Could not load trips. Press r to retry."
        } else {
            "No more trips for this day."
        }
    }

    fn call_line(&self, trip: &TripDetail, position: usize, call: &StopTime) -> Line<'static> {
        let passed = position < trip.completed_stops;
        let is_next = position == trip.completed_stops;

        let marker = if passed {
            PASSED_MARK
        } else if is_next {
            NEXT_MARK
        } else {
            " "
        };
        let time = call.expected().with_timezone(&self.zone).format("%H:%M");

        let mut style = Style::default();
        if passed {
            style = style.add_modifier(Modifier::DIM);
        } else if is_next {
            style = style.fg(Color::Green);
        }
        if call.stop_id == self.stop_id {
            style = style.add_modifier(Modifier::BOLD);
        }

        let mut spans = vec![Span::styled(
            format!("{} {}  {}", marker, time, call.stop_name),
            style,
        )];
        match call.delay_minutes() {
            Some(delay) if delay > 0 => spans.push(Span::styled(
                format!("  +{} min", delay),
                Style::default().fg(Color::Red),
            )),
            Some(delay) if delay < 0 => spans.push(Span::styled(
                format!("  {} min", delay),
                Style::default().fg(Color::Blue),
            )),
            _ => {}
        }
        Line::from(spans)
    }
}

impl Component for TripView {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let Some(trip) = self.trip.clone() else {
            let paragraph = Paragraph::new(self.placeholder())
                .block(Block::bordered().title("Trips"))
                .alignment(Alignment::Center);
            frame.render_widget(paragraph, area);
            return;
        };

        let title = format!(
            "Trip {} · line {} → {}",
            self.trip_index + 1,
            trip.line,
            trip.headsign
        );
        let lines: Vec<Line> = trip
            .stop_times
            .iter()
            .enumerate()
            .map(|(position, call)| self.call_line(&trip, position, call))
            .collect();

        let mut block = Block::bordered().title(title);
        if let Some(next) = trip.next_stop() {
            block = block.title_bottom(format!("next: {}", next.stop_name));
        }
        let paragraph = Paragraph::new(lines).block(block);
        frame.render_widget(paragraph, area);
    }
}
