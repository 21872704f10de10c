//! # TUI Adapter
//!
//! The ratatui-specific layer. Renders the controller's state and
//! translates keyboard events into `core::action::Command` values.
//!
//! This is the only module that knows about ratatui and crossterm.
//!
//! ## Redraw Strategy
//!
//! The event loop uses conditional redraw to avoid unnecessary work:
//!
//! - **Animating** (an operation in flight): draws every ~80ms so the spinner moves.
//! - **Idle**: sleeps up to 500ms and only redraws on key events, terminal
//!   resize, or a change on the controller's state or favorite streams.

mod component;
mod components;
mod event;
mod ui;

use log::info;
use std::io::stdout;
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, Show};
use crossterm::execute;

use crate::core::action::{Effect, dispatch};
use crate::core::controller::TripController;
use crate::tui::event::{TuiEvent, poll_event_immediate, poll_event_timeout};
use crate::tui::ui::FrameProps;

struct TerminalModeGuard;

impl TerminalModeGuard {
    fn new() -> std::io::Result<Self> {
        execute!(stdout(), Hide)?;
        Ok(Self)
    }
}

impl Drop for TerminalModeGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), Show);
    }
}

/// Runs the interface until the user quits. Must be called from within the
/// tokio runtime that drives the controller's tasks.
pub fn run(controller: TripController) -> std::io::Result<()> {
    let mut state_rx = controller.subscribe();
    let mut favorite_rx = controller.favorite();
    let stop = controller.stop().clone();
    let zone = controller.zone();

    let mut terminal = ratatui::init();
    let _terminal_mode_guard = TerminalModeGuard::new();

    let start_time = Instant::now();
    let mut needs_redraw = true; // Force first frame

    loop {
        // Pick up whatever the controller's tasks published since the last frame
        if state_rx.has_changed().unwrap_or(false) {
            needs_redraw = true;
        }
        if favorite_rx.has_changed().unwrap_or(false) {
            needs_redraw = true;
        }
        let state = state_rx.borrow_and_update().clone();
        let favorite = *favorite_rx.borrow_and_update();

        let animating = !state.is_settled();
        if animating {
            needs_redraw = true;
        }

        if needs_redraw {
            let spinner_frame = (start_time.elapsed().as_secs_f32() * 12.0) as usize;
            let props = FrameProps {
                stop: &stop,
                zone,
                favorite,
                spinner_frame,
            };
            terminal.draw(|f| ui::draw_ui(f, &state, &props))?;
            needs_redraw = false;
        }

        // Dynamic poll timeout: short when animating (~12fps), long when idle
        let timeout = if animating {
            Duration::from_millis(80)
        } else {
            Duration::from_millis(500)
        };
        let first_event = poll_event_timeout(timeout);

        // Process first event + drain ALL pending events before next draw
        let mut should_quit = false;
        if first_event.is_some() {
            needs_redraw = true;
        }
        for event in first_event
            .into_iter()
            .chain(std::iter::from_fn(poll_event_immediate))
        {
            // Resize just needs a redraw (already flagged above)
            if matches!(event, TuiEvent::Resize) {
                continue;
            }
            if let Some(command) = event.command()
                && dispatch(&controller, command) == Effect::Quit
            {
                should_quit = true;
            }
        }

        if should_quit {
            break;
        }
    }

    info!("Shutting down interface");
    ratatui::restore();
    Ok(())
}
