//! Test utilities shared across the crate.
//!
//! This module is only compiled during tests (`#[cfg(test)]`).
//!
//! The fakes record every call and can hold a call open on a [`Gate`] until
//! the test releases it, which is how races between navigation tasks are
//! staged deterministically.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Europe::Rome;
use chrono_tz::Tz;
use tokio::sync::{Semaphore, watch};
use tokio::time::{Duration, timeout};

use crate::core::controller::TripController;
use crate::transit::{
    DayTrips, PrefKey, Preferences, SourceError, Stop, StopRef, StopTime, StopType,
    TransitSource, TripDetail, TripId,
};

/// A call barrier: open gates let calls through, closed ones hold each call
/// until a permit is released.
#[derive(Default)]
pub struct Gate {
    permits: Mutex<Option<Arc<Semaphore>>>,
}

impl Gate {
    pub fn close(&self) {
        *self.permits.lock().unwrap() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release(&self, n: usize) {
        if let Some(sem) = self.permits.lock().unwrap().as_ref() {
            sem.add_permits(n);
        }
    }

    async fn pass(&self) {
        let sem = self.permits.lock().unwrap().clone();
        if let Some(sem) = sem {
            sem.acquire().await.unwrap().forget();
        }
    }
}

pub fn rome(day: u32, hour: u32, minute: u32) -> DateTime<Tz> {
    Rome.with_ymd_and_hms(2026, 3, day, hour, minute, 0).unwrap()
}

pub fn test_stop_ref() -> StopRef {
    StopRef::new("100", StopType::Bus)
}

pub fn test_stop() -> Stop {
    Stop {
        id: "100".to_string(),
        stop_type: StopType::Bus,
        name: "Piazza Castello".to_string(),
        lines: vec!["4".to_string(), "15".to_string()],
    }
}

/// A trip with `total` calls, `completed` of them already passed.
pub fn trip(id: &str, completed: usize, total: usize) -> TripDetail {
    let start = Utc.with_ymd_and_hms(2026, 3, 2, 7, 0, 0).unwrap();
    TripDetail {
        id: TripId::from(id),
        line: "4".to_string(),
        headsign: format!("Centro {id}"),
        completed_stops: completed,
        stop_times: (0..total)
            .map(|i| StopTime {
                stop_id: format!("s{i}"),
                stop_name: format!("Stop {i}"),
                scheduled: start + chrono::Duration::minutes(5 * i as i64),
                estimated: None,
            })
            .collect(),
    }
}

/// The live copy the fake returns when no refresh result is scripted.
pub fn live(trip: &TripDetail) -> TripDetail {
    let mut fresh = trip.clone();
    fresh.headsign = format!("{} (live)", trip.headsign);
    fresh
}

#[derive(Default)]
pub struct FakeDay {
    pub trips: Vec<TripDetail>,
    pub failing_indices: Mutex<HashSet<usize>>,
    /// Consumed in call order; `Err(())` makes that refresh fail.
    pub refresh_results: Mutex<VecDeque<Result<TripDetail, ()>>>,
    pub trip_at_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub trip_at_gate: Gate,
    pub refresh_gate: Gate,
}

impl FakeDay {
    pub fn new(trips: Vec<TripDetail>) -> Self {
        Self {
            trips,
            ..Default::default()
        }
    }

    pub fn fail_index(&self, index: usize) {
        self.failing_indices.lock().unwrap().insert(index);
    }

    pub fn script_refresh(&self, result: Result<TripDetail, ()>) {
        self.refresh_results.lock().unwrap().push_back(result);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn trip_at_calls(&self) -> usize {
        self.trip_at_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DayTrips for FakeDay {
    fn count(&self) -> usize {
        self.trips.len()
    }

    async fn trip_at(&self, index: usize) -> Result<TripDetail, SourceError> {
        self.trip_at_calls.fetch_add(1, Ordering::SeqCst);
        self.trip_at_gate.pass().await;
        if self.failing_indices.lock().unwrap().contains(&index) {
            return Err(SourceError::Network("scripted failure".to_string()));
        }
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
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.refresh_results.lock().unwrap().pop_front();
        self.refresh_gate.pass().await;
        match scripted {
            Some(Ok(trip)) => Ok(trip),
            Some(Err(())) => Err(SourceError::Network("scripted refresh failure".to_string())),
            None => Ok(live(current)),
        }
    }
}

pub struct FakeSource {
    pub day: Arc<FakeDay>,
    pub fail_stop: AtomicBool,
    pub fail_days: AtomicBool,
    pub stop_calls: AtomicUsize,
    pub day_calls: AtomicUsize,
    pub day_gate: Gate,
    pub references: Mutex<Vec<DateTime<Tz>>>,
}

impl FakeSource {
    pub fn new(trips: Vec<TripDetail>) -> Self {
        Self {
            day: Arc::new(FakeDay::new(trips)),
            fail_stop: AtomicBool::new(false),
            fail_days: AtomicBool::new(false),
            stop_calls: AtomicUsize::new(0),
            day_calls: AtomicUsize::new(0),
            day_gate: Gate::default(),
            references: Mutex::new(Vec::new()),
        }
    }

    pub fn day_calls(&self) -> usize {
        self.day_calls.load(Ordering::SeqCst)
    }

    pub fn stop_calls(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransitSource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    async fn fetch_stop(&self, stop: &StopRef) -> Result<Stop, SourceError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_stop.load(Ordering::SeqCst) {
            return Err(SourceError::NotFound(format!("stop {stop}")));
        }
        Ok(test_stop())
    }

    async fn fetch_day_trips(
        &self,
        _stop: &StopRef,
        at: DateTime<Tz>,
    ) -> Result<Arc<dyn DayTrips>, SourceError> {
        self.day_calls.fetch_add(1, Ordering::SeqCst);
        self.references.lock().unwrap().push(at);
        self.day_gate.pass().await;
        if self.fail_days.load(Ordering::SeqCst) {
            return Err(SourceError::Api {
                status: 503,
                message: "scripted".to_string(),
            });
        }
        Ok(self.day.clone())
    }
}

#[derive(Default)]
pub struct FakePreferences {
    pub flags: Mutex<HashMap<PrefKey, watch::Sender<Option<bool>>>>,
    pub accesses: Mutex<Vec<PrefKey>>,
    pub writes: Mutex<Vec<(PrefKey, bool)>>,
}

#[async_trait]
impl Preferences for FakePreferences {
    fn favorite_flag(&self, key: &PrefKey) -> Result<watch::Receiver<Option<bool>>, SourceError> {
        let mut flags = self.flags.lock().unwrap();
        Ok(flags
            .entry(key.clone())
            .or_insert_with(|| watch::Sender::new(None))
            .subscribe())
    }

    async fn set_favorite(&self, key: &PrefKey, value: bool) -> Result<(), SourceError> {
        self.writes.lock().unwrap().push((key.clone(), value));
        if let Some(sender) = self.flags.lock().unwrap().get(key) {
            sender.send_replace(Some(value));
        }
        Ok(())
    }

    async fn register_access(&self, key: &PrefKey) -> Result<(), SourceError> {
        self.accesses.lock().unwrap().push(key.clone());
        Ok(())
    }
}

pub struct Harness {
    pub controller: TripController,
    pub source: Arc<FakeSource>,
    pub prefs: Arc<FakePreferences>,
}

impl Harness {
    pub fn day(&self) -> &FakeDay {
        &self.source.day
    }
}

/// Starts a controller for stop 100 (bus) against fakes serving `trips`.
pub fn harness(trips: Vec<TripDetail>) -> Harness {
    harness_with(FakeSource::new(trips))
}

pub fn harness_with(source: FakeSource) -> Harness {
    let source = Arc::new(source);
    let prefs = Arc::new(FakePreferences::default());
    let controller = TripController::start(test_stop_ref(), Rome, source.clone(), prefs.clone());
    Harness {
        controller,
        source,
        prefs,
    }
}

/// Polls `condition` until it holds, failing the test after a second.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    timeout(Duration::from_secs(1), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
