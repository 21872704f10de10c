use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use super::types::{Stop, StopRef, StopType, TripDetail};

/// Errors a collaborator can report. The controller never propagates these;
/// they are logged and surfaced as the `error` flag.
#[derive(Debug)]
pub enum SourceError {
    /// Collaborator misconfigured (bad URL, missing file).
    Config(String),
    /// Network-level failure (timeout, DNS, connection refused).
    Network(String),
    /// Backend returned an error response.
    Api { status: u16, message: String },
    /// Failed to decode the backend's response.
    Parse(String),
    /// The requested stop, trip or index does not exist.
    NotFound(String),
    /// Local storage failure.
    Io(std::io::Error),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Config(msg) => write!(f, "config error: {msg}"),
            SourceError::Network(msg) => write!(f, "network error: {msg}"),
            SourceError::Api { status, message } => {
                write!(f, "API error (HTTP {status}): {message}")
            }
            SourceError::Parse(msg) => write!(f, "parse error: {msg}"),
            SourceError::NotFound(what) => write!(f, "not found: {what}"),
            SourceError::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<std::io::Error> for SourceError {
    fn from(e: std::io::Error) -> Self {
        SourceError::Io(e)
    }
}

/// Where stop metadata and a day's trips come from.
#[async_trait]
pub trait TransitSource: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_stop(&self, stop: &StopRef) -> Result<Stop, SourceError>;

    /// Fetches the ordered trips serving `stop` on the day of `at`.
    async fn fetch_day_trips(
        &self,
        stop: &StopRef,
        at: DateTime<Tz>,
    ) -> Result<Arc<dyn DayTrips>, SourceError>;
}

/// The trips of one stop for one reference date/time.
#[async_trait]
pub trait DayTrips: Send + Sync {
    fn count(&self) -> usize;

    async fn trip_at(&self, index: usize) -> Result<TripDetail, SourceError>;

    /// Fetches the live status of `current`, shown at `index`.
    async fn refresh_trip(
        &self,
        current: &TripDetail,
        index: usize,
        at: DateTime<Tz>,
    ) -> Result<TripDetail, SourceError>;
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Stop,
    Line,
}

/// Key of a favorite / recently viewed entry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct PrefKey {
    pub kind: EntryKind,
    pub id: String,
    pub stop_type: StopType,
}

impl PrefKey {
    pub fn stop(stop: &StopRef) -> Self {
        Self {
            kind: EntryKind::Stop,
            id: stop.id.clone(),
            stop_type: stop.stop_type,
        }
    }
}

impl fmt::Display for PrefKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            EntryKind::Stop => "stop",
            EntryKind::Line => "line",
        };
        write!(f, "{kind}:{}/{}", self.stop_type, self.id)
    }
}

/// User preferences: favorites and the recently viewed list.
#[async_trait]
pub trait Preferences: Send + Sync {
    /// Live favorite flag for `key`; `None` until known.
    fn favorite_flag(&self, key: &PrefKey) -> Result<watch::Receiver<Option<bool>>, SourceError>;

    async fn set_favorite(&self, key: &PrefKey, value: bool) -> Result<(), SourceError>;

    async fn register_access(&self, key: &PrefKey) -> Result<(), SourceError>;
}
