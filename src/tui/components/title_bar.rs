//! # TitleBar Component
//!
//! Top status bar: which stop we are looking at, whether it is a favorite,
//! and the reference time the trip list was computed for.
//!
//! TitleBar is purely presentational. It receives all data as props and has
//! no internal state:
//!
//! ```rust,ignore
//! let mut title_bar = TitleBar::new("Piazza Castello".into(), Some(true), "Mon 02 Mar 08:00".into());
//! title_bar.render(frame, area);
//! ```
//!
//! ## Conditional Formatting
//!
//! 1. **Favorite known**: `"tripdeck | Piazza Castello ★ | Mon 02 Mar 08:00"`
//! 2. **Favorite unknown**: `"tripdeck | Piazza Castello | Mon 02 Mar 08:00"`
//!
//! The flag is unknown until the preferences store has answered; in that case
//! no star is drawn at all rather than a misleading empty one.

use crate::tui::component::Component;
use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

pub const FAVORITE_ON: &str = "★";
pub const FAVORITE_OFF: &str = "☆";

pub struct TitleBar {
    /// Stop name, or its `type/id` while the stop is still loading
    pub stop_label: String,
    /// Favorite flag for the stop; `None` while unknown
    pub favorite: Option<bool>,
    /// Reference time, already formatted in the controller's zone
    pub reference: String,
}

impl TitleBar {
    pub fn new(stop_label: String, favorite: Option<bool>, reference: String) -> Self {
        Self {
            stop_label,
            favorite,
            reference,
        }
    }
}

impl Component for TitleBar {
    fn render(&mut self, frame: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::raw("tripdeck | "),
            Span::styled(self.stop_label.clone(), Style::default().fg(Color::Cyan)),
        ];
        match self.favorite {
            Some(true) => {
                spans.push(Span::raw(" "));
                spans.push(Span::styled(FAVORITE_ON, Style::default().fg(Color::Yellow)));
            }
            Some(false) => {
                spans.push(Span::raw(" "));
                spans.push(Span::raw(FAVORITE_OFF));
            }
            None => {}
        }
        spans.push(Span::raw(format!(" | {}", self.reference)));

        frame.render_widget(Line::from(spans), area);
    }
}
