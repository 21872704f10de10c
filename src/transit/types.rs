use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Transport mode a stop is served by. Stop ids are only unique per type.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StopType {
    #[default]
    Bus,
    Tram,
    Metro,
    Rail,
}

impl StopType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopType::Bus => "bus",
            StopType::Tram => "tram",
            StopType::Metro => "metro",
            StopType::Rail => "rail",
        }
    }
}

impl fmt::Display for StopType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a stop: the `(id, type)` pair every collaborator is keyed by.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct StopRef {
    pub id: String,
    pub stop_type: StopType,
}

impl StopRef {
    pub fn new(id: impl Into<String>, stop_type: StopType) -> Self {
        Self {
            id: id.into(),
            stop_type,
        }
    }
}

impl fmt::Display for StopRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stop_type, self.id)
    }
}

/// Static stop metadata.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Stop {
    pub id: String,
    pub stop_type: StopType,
    pub name: String,
    #[serde(default)]
    pub lines: Vec<String>,
}

impl Stop {
    pub fn stop_ref(&self) -> StopRef {
        StopRef::new(self.id.clone(), self.stop_type)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct TripId(pub String);

impl TripId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TripId {
    fn from(value: &str) -> Self {
        TripId(value.to_string())
    }
}

/// One call of a trip at a stop.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StopTime {
    pub stop_id: String,
    pub stop_name: String,
    pub scheduled: DateTime<Utc>,
    /// Real-time estimate, if the feed has one for this call.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated: Option<DateTime<Utc>>,
}

impl StopTime {
    /// Best known time for this call: the estimate when present.
    pub fn expected(&self) -> DateTime<Utc> {
        self.estimated.unwrap_or(self.scheduled)
    }

    /// Signed delay in whole minutes, if an estimate is known.
    pub fn delay_minutes(&self) -> Option<i64> {
        self.estimated
            .map(|estimated| (estimated - self.scheduled).num_minutes())
    }
}

/// A single scheduled run with its progress along the route.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TripDetail {
    pub id: TripId,
    pub line: String,
    pub headsign: String,
    /// Number of stop times already passed.
    #[serde(default)]
    pub completed_stops: usize,
    pub stop_times: Vec<StopTime>,
}

impl TripDetail {
    /// A finished trip has no live status left to fetch.
    pub fn is_complete(&self) -> bool {
        self.completed_stops >= self.stop_times.len()
    }

    pub fn next_stop(&self) -> Option<&StopTime> {
        self.stop_times.get(self.completed_stops)
    }
}
