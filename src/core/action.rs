//! # Commands
//!
//! Everything the presentation layer can ask of the controller becomes a
//! `Command`. User presses →? That's `Command::Next`.
//!
//! `dispatch()` hands the command to the controller and returns an `Effect`
//! for the caller. Commands are fire-and-forget: their results show up
//! asynchronously on the controller's state stream.
//!
//! ```text
//! Command  →  dispatch()  →  controller task(s)  →  UiState updates
//! ```

use chrono::{DateTime, Days, FixedOffset, TimeZone, Utc};
use log::{info, warn};

use crate::core::controller::TripController;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetReferenceDateTime(DateTime<FixedOffset>),
    /// Move the reference time by whole days, keeping the time of day.
    ShiftDays(i64),
    ResetToNow,
    Reload,
    Prev,
    Next,
    ToggleFavorite,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    Quit,
}

/// Moves `at` by calendar days, keeping the local time of day across DST changes.
fn shift_days<Z: TimeZone>(at: DateTime<Z>, days: i64) -> Option<DateTime<Z>> {
    let delta = Days::new(days.unsigned_abs());
    if days >= 0 {
        at.checked_add_days(delta)
    } else {
        at.checked_sub_days(delta)
    }
}

pub fn dispatch(controller: &TripController, command: Command) -> Effect {
    info!("Command: {:?}", command);
    match command {
        Command::SetReferenceDateTime(at) => {
            controller.set_reference_date_time(at);
        }
        Command::ShiftDays(days) => {
            let current = controller.state().reference_date_time;
            match shift_days(current, days) {
                Some(at) => {
                    controller.set_reference_date_time(at);
                }
                None => warn!("Cannot shift {} by {} days", current, days),
            }
        }
        Command::ResetToNow => {
            controller.set_reference_date_time(Utc::now());
        }
        Command::Reload => {
            controller.reload();
        }
        Command::Prev => {
            controller.prev_clicked();
        }
        Command::Next => {
            controller.next_clicked();
        }
        Command::ToggleFavorite => {
            controller.favorite_clicked();
        }
        Command::Quit => return Effect::Quit,
    }
    Effect::None
}
