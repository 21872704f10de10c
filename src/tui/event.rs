use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::core::action::Command;

/// TUI-specific input events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuiEvent {
    Quit,
    ForceQuit, // Ctrl+C
    Prev,
    Next,
    Reload,
    ToggleFavorite,
    Now,
    PrevDay,
    NextDay,
    Resize,
}

impl TuiEvent {
    /// The core command this event stands for, if any.
    pub fn command(&self) -> Option<Command> {
        match self {
            TuiEvent::Quit | TuiEvent::ForceQuit => Some(Command::Quit),
            TuiEvent::Prev => Some(Command::Prev),
            TuiEvent::Next => Some(Command::Next),
            TuiEvent::Reload => Some(Command::Reload),
            TuiEvent::ToggleFavorite => Some(Command::ToggleFavorite),
            TuiEvent::Now => Some(Command::ResetToNow),
            TuiEvent::PrevDay => Some(Command::ShiftDays(-1)),
            TuiEvent::NextDay => Some(Command::ShiftDays(1)),
            TuiEvent::Resize => None,
        }
    }
}

pub fn map_key(key_event: KeyEvent) -> Option<TuiEvent> {
    // Only react to presses; release/repeat events arrive on some terminals
    if key_event.kind != KeyEventKind::Press {
        return None;
    }
    match (key_event.modifiers, key_event.code) {
        (KeyModifiers::CONTROL, KeyCode::Char('c')) => Some(TuiEvent::ForceQuit),
        (_, KeyCode::Left | KeyCode::Char('h')) => Some(TuiEvent::Prev),
        (_, KeyCode::Right | KeyCode::Char('l')) => Some(TuiEvent::Next),
        (_, KeyCode::Char('r')) => Some(TuiEvent::Reload),
        (_, KeyCode::Char('f')) => Some(TuiEvent::ToggleFavorite),
        (_, KeyCode::Char('n')) => Some(TuiEvent::Now),
        (_, KeyCode::Char('[')) => Some(TuiEvent::PrevDay),
        (_, KeyCode::Char(']')) => Some(TuiEvent::NextDay),
        (_, KeyCode::Char('q') | KeyCode::Esc) => Some(TuiEvent::Quit),
        _ => None,
    }
}

/// Poll for an event without blocking (returns immediately)
pub fn poll_event_immediate() -> Option<TuiEvent> {
    poll_event_timeout(std::time::Duration::ZERO)
}

/// Poll for an event, blocking up to `timeout`.
pub fn poll_event_timeout(timeout: std::time::Duration) -> Option<TuiEvent> {
    match event::poll(timeout) {
        Ok(true) => {}
        Ok(false) => return None,
        Err(e) => {
            log::warn!("Event poll failed: {}", e);
            return None;
        }
    }
    match event::read() {
        Ok(Event::Key(key_event)) => {
            log::debug!("Key event: {:?} with modifiers {:?}", key_event.code, key_event.modifiers);
            map_key(key_event)
        }
        Ok(Event::Resize(..)) => Some(TuiEvent::Resize),
        Ok(_) => None,
        Err(e) => {
            log::warn!("Event read failed: {}", e);
            None
        }
    }
}
