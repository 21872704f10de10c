//! # Trip Browsing State
//!
//! The single source of truth the presentation layer observes.
//!
//! ```text
//! UiState
//! ├── stop: Option<Arc<Stop>>          // static metadata, None while loading/on failure
//! ├── trip_index: usize                // position in the day's trip list
//! ├── trip: Option<Arc<TripDetail>>    // displayed trip, None while loading/on failure
//! ├── prev_enabled / next_enabled      // derived from index + trip count
//! ├── reference_date_time: DateTime<Tz>
//! ├── loading: bool
//! └── error: bool
//! ```
//!
//! Snapshots are replaced wholesale through `StateStore::update`; observers
//! never see a half-applied change.

use std::sync::Arc;

use chrono::DateTime;
use chrono_tz::Tz;
use tokio::sync::watch;

use crate::transit::{Stop, TripDetail};

#[derive(Debug, Clone, PartialEq)]
pub struct UiState {
    pub stop: Option<Arc<Stop>>,
    pub trip_index: usize,
    pub trip: Option<Arc<TripDetail>>,
    pub prev_enabled: bool,
    pub next_enabled: bool,
    pub reference_date_time: DateTime<Tz>,
    pub loading: bool,
    pub error: bool,
}

impl UiState {
    /// State at controller start: nothing known yet, loading.
    pub fn initial(reference_date_time: DateTime<Tz>) -> Self {
        Self {
            stop: None,
            trip_index: 0,
            trip: None,
            prev_enabled: false,
            next_enabled: false,
            reference_date_time,
            loading: true,
            error: false,
        }
    }

    /// True once no operation is in flight.
    pub fn is_settled(&self) -> bool {
        !self.loading
    }
}

/// Enabled state of the prev/next buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavButtons {
    pub prev: bool,
    pub next: bool,
}

impl NavButtons {
    pub fn for_index(index: usize, count: usize) -> Self {
        Self {
            prev: index > 0,
            next: index + 1 < count,
        }
    }

    #[cfg(test)]
    pub const DISABLED: NavButtons = NavButtons {
        prev: false,
        next: false,
    };
}

/// Observable holder of the current `UiState`.
#[derive(Clone)]
pub struct StateStore {
    sender: Arc<watch::Sender<UiState>>,
}

impl StateStore {
    pub fn new(initial: UiState) -> Self {
        Self {
            sender: Arc::new(watch::Sender::new(initial)),
        }
    }

    /// Replaces the state with `f(current)` under the channel lock and
    /// notifies every subscriber.
    pub fn update(&self, f: impl FnOnce(&UiState) -> UiState) {
        self.sender.send_modify(|state| *state = f(state));
    }

    pub fn current(&self) -> UiState {
        self.sender.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.sender.subscribe()
    }
}
