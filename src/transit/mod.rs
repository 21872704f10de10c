pub mod providers;
pub mod source;
pub mod types;

pub use providers::{FilePreferences, HttpTransitSource, TimetableSource};
pub use source::{DayTrips, EntryKind, PrefKey, Preferences, SourceError, TransitSource};
pub use types::{Stop, StopRef, StopTime, StopType, TripDetail, TripId};
