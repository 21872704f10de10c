//! Offline provider backed by a JSON timetable file.
//!
//! ```json
//! {
//!   "stops": [{ "id": "100", "stop_type": "bus", "name": "Piazza Castello" }],
//!   "trips": [{
//!     "id": "4-0800", "line": "4", "headsign": "Centro",
//!     "days": ["mon", "tue", "wed", "thu", "fri"],
//!     "stop_times": [{ "stop_id": "100", "stop_name": "Piazza Castello", "time": "08:00" }]
//!   }]
//! }
//! ```
//!
//! Times are `HH:MM` in the working time zone and may run past `24:00` for
//! trips that cross midnight. An empty `days` list means every day.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveDate, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use log::{debug, info, warn};
use serde::Deserialize;

use crate::transit::{
    DayTrips, SourceError, Stop, StopRef, StopTime, TransitSource, TripDetail, TripId,
};

pub type Clock = fn() -> DateTime<Utc>;

#[derive(Deserialize, Debug, Default)]
pub struct Timetable {
    #[serde(default)]
    pub stops: Vec<Stop>,
    #[serde(default)]
    pub trips: Vec<ScheduledTrip>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScheduledTrip {
    pub id: String,
    pub line: String,
    pub headsign: String,
    #[serde(default)]
    pub days: Vec<Weekday>,
    pub stop_times: Vec<ScheduledCall>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ScheduledCall {
    pub stop_id: String,
    pub stop_name: String,
    pub time: String,
}

/// Parses `HH:MM` into minutes after midnight. Hours may exceed 23.
fn parse_clock(value: &str) -> Option<u32> {
    let (hours, minutes) = value.trim().split_once(':')?;
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    if minutes >= 60 {
        return None;
    }
    hours.checked_mul(60)?.checked_add(minutes)
}

fn instant_on(date: NaiveDate, minutes: u32, zone: Tz) -> Option<DateTime<Utc>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    let local = midnight + Duration::minutes(i64::from(minutes));
    zone.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

impl ScheduledTrip {
    fn runs_on(&self, day: Weekday) -> bool {
        self.days.is_empty() || self.days.contains(&day)
    }

    fn minutes_at(&self, stop_id: &str) -> Option<u32> {
        self.stop_times
            .iter()
            .find(|call| call.stop_id == stop_id)
            .and_then(|call| parse_clock(&call.time))
    }

    /// Materializes this trip on `date`. Calls with unreadable times are skipped.
    fn on_date(&self, date: NaiveDate, zone: Tz) -> TripDetail {
        let stop_times = self
            .stop_times
            .iter()
            .filter_map(|call| {
                let Some(minutes) = parse_clock(&call.time) else {
                    warn!("Trip {}: bad time {:?} at stop {}", self.id, call.time, call.stop_id);
                    return None;
                };
                Some(StopTime {
                    stop_id: call.stop_id.clone(),
                    stop_name: call.stop_name.clone(),
                    scheduled: instant_on(date, minutes, zone)?,
                    estimated: None,
                })
            })
            .collect();
        TripDetail {
            id: TripId(self.id.clone()),
            line: self.line.clone(),
            headsign: self.headsign.clone(),
            completed_stops: 0,
            stop_times,
        }
    }
}

/// Sets `completed_stops` from the wall clock: every call at or before `now`.
fn with_progress(mut trip: TripDetail, now: DateTime<Utc>) -> TripDetail {
    trip.completed_stops = trip
        .stop_times
        .iter()
        .take_while(|st| st.scheduled <= now)
        .count();
    trip
}

pub struct TimetableSource {
    timetable: Arc<Timetable>,
    clock: Clock,
}

impl TimetableSource {
    pub fn new(timetable: Timetable) -> Self {
        Self {
            timetable: Arc::new(timetable),
            clock: Utc::now,
        }
    }

    pub fn load(path: &Path) -> Result<Self, SourceError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            SourceError::Config(format!("cannot read timetable {}: {e}", path.display()))
        })?;
        let timetable: Timetable =
            serde_json::from_str(&contents).map_err(|e| SourceError::Parse(e.to_string()))?;
        info!(
            "Loaded timetable from {}: {} stops, {} trips",
            path.display(),
            timetable.stops.len(),
            timetable.trips.len()
        );
        Ok(Self::new(timetable))
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn trips_for(&self, stop: &StopRef, at: DateTime<Tz>) -> Vec<TripDetail> {
        let date = at.date_naive();
        let from = at.hour() * 60 + at.minute();

        let mut calls: Vec<(u32, &ScheduledTrip)> = self
            .timetable
            .trips
            .iter()
            .filter(|trip| trip.runs_on(date.weekday()))
            .filter_map(|trip| trip.minutes_at(&stop.id).map(|m| (m, trip)))
            .filter(|(minutes, _)| *minutes >= from)
            .collect();
        calls.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));

        let now = (self.clock)();
        calls
            .into_iter()
            .map(|(_, trip)| with_progress(trip.on_date(date, at.timezone()), now))
            .collect()
    }
}

#[async_trait]
impl TransitSource for TimetableSource {
    fn name(&self) -> &str {
        "timetable"
    }

    async fn fetch_stop(&self, stop: &StopRef) -> Result<Stop, SourceError> {
        self.timetable
            .stops
            .iter()
            .find(|s| s.id == stop.id && s.stop_type == stop.stop_type)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("stop {stop}")))
    }

    async fn fetch_day_trips(
        &self,
        stop: &StopRef,
        at: DateTime<Tz>,
    ) -> Result<Arc<dyn DayTrips>, SourceError> {
        let trips = self.trips_for(stop, at);
        debug!("Timetable: {} trips at {} from {}", trips.len(), stop, at);
        Ok(Arc::new(TimetableDayTrips {
            trips,
            clock: self.clock,
        }))
    }
}

pub struct TimetableDayTrips {
    trips: Vec<TripDetail>,
    clock: Clock,
}

#[async_trait]
impl DayTrips for TimetableDayTrips {
    fn count(&self) -> usize {
        self.trips.len()
    }

    async fn trip_at(&self, index: usize) -> Result<TripDetail, SourceError> {
        self.trips
            .get(index)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("trip index {index}")))
    }

    async fn refresh_trip(
        &self,
        current: &TripDetail,
        _index: usize,
        _at: DateTime<Tz>,
    ) -> Result<TripDetail, SourceError> {
        let trip = self
            .trips
            .iter()
            .find(|t| t.id == current.id)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("trip {}", current.id)))?;
        Ok(with_progress(trip, (self.clock)()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transit::StopType;
    use chrono_tz::Europe::Rome;

    // Monday 2 March 2026, 08:30 Rome time (07:30 UTC).
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 7, 30, 0).unwrap()
    }

    fn sample() -> Timetable {
        let json = r#"{
            "stops": [
                { "id": "100", "stop_type": "bus", "name": "Piazza Castello" },
                { "id": "200", "stop_type": "tram", "name": "Porta Nuova" }
            ],
            "trips": [
                { "id": "late", "line": "4", "headsign": "Centro", "days": ["mon"],
                  "stop_times": [
                    { "stop_id": "100", "stop_name": "Piazza Castello", "time": "09:00" },
                    { "stop_id": "101", "stop_name": "Via Roma", "time": "09:10" } ] },
                { "id": "early", "line": "4", "headsign": "Centro", "days": ["mon", "tue"],
                  "stop_times": [
                    { "stop_id": "099", "stop_name": "Lingotto", "time": "08:10" },
                    { "stop_id": "100", "stop_name": "Piazza Castello", "time": "08:20" },
                    { "stop_id": "101", "stop_name": "Via Roma", "time": "08:40" } ] },
                { "id": "gone", "line": "4", "headsign": "Centro",
                  "stop_times": [
                    { "stop_id": "100", "stop_name": "Piazza Castello", "time": "06:00" } ] },
                { "id": "sunday", "line": "4", "headsign": "Centro", "days": ["sun"],
                  "stop_times": [
                    { "stop_id": "100", "stop_name": "Piazza Castello", "time": "10:00" } ] }
            ]
        }"#;
        serde_json::from_str(json).unwrap()
    }

    fn source() -> TimetableSource {
        TimetableSource::new(sample()).with_clock(fixed_now)
    }

    fn at(hour: u32, minute: u32) -> DateTime<Tz> {
        Rome.with_ymd_and_hms(2026, 3, 2, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_parse_clock() {
        assert_eq!(parse_clock("08:05"), Some(485));
        assert_eq!(parse_clock("25:10"), Some(25 * 60 + 10));
        assert_eq!(parse_clock("8:61"), None);
        assert_eq!(parse_clock("noon"), None);
        assert_eq!(parse_clock("99999999:00"), None);
    }

    #[tokio::test]
    async fn test_day_trips_filtered_by_day_and_time_and_sorted() {
        let stop = StopRef::new("100", StopType::Bus);
        let day = source().fetch_day_trips(&stop, at(8, 0)).await.unwrap();
        assert_eq!(day.count(), 2);
        assert_eq!(day.trip_at(0).await.unwrap().id, TripId::from("early"));
        assert_eq!(day.trip_at(1).await.unwrap().id, TripId::from("late"));
        assert!(matches!(day.trip_at(2).await, Err(SourceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_progress_follows_clock() {
        let stop = StopRef::new("100", StopType::Bus);
        let day = source().fetch_day_trips(&stop, at(8, 0)).await.unwrap();
        // 08:30: Lingotto and Piazza Castello passed, Via Roma ahead.
        let early = day.trip_at(0).await.unwrap();
        assert_eq!(early.completed_stops, 2);
        assert!(!early.is_complete());

        let refreshed = day.refresh_trip(&early, 0, at(8, 0)).await.unwrap();
        assert_eq!(refreshed.id, early.id);
        assert_eq!(refreshed.completed_stops, 2);
    }

    #[tokio::test]
    async fn test_scheduled_instants_use_zone() {
        let stop = StopRef::new("100", StopType::Bus);
        let day = source().fetch_day_trips(&stop, at(8, 0)).await.unwrap();
        let early = day.trip_at(0).await.unwrap();
        // 08:10 in Rome during winter time is 07:10 UTC.
        assert_eq!(
            early.stop_times[0].scheduled,
            Utc.with_ymd_and_hms(2026, 3, 2, 7, 10, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_fetch_stop_matches_id_and_type() {
        let src = source();
        let stop = src
            .fetch_stop(&StopRef::new("200", StopType::Tram))
            .await
            .unwrap();
        assert_eq!(stop.name, "Porta Nuova");

        let missing = src.fetch_stop(&StopRef::new("200", StopType::Bus)).await;
        assert!(matches!(missing, Err(SourceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_no_trips_left_gives_empty_day() {
        let stop = StopRef::new("100", StopType::Bus);
        let day = source().fetch_day_trips(&stop, at(23, 0)).await.unwrap();
        assert_eq!(day.count(), 0);
    }
}
