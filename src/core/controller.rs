//! # Trip Navigation Controller
//!
//! Drives browsing through one stop's trips for a reference date/time.
//!
//! ```text
//!  command ──► preempt slot ──► spawn task ──► fetch (cancellable) ──► commit if current
//!                                                                         │
//!                                                   StateStore (watch) ◄──┘
//! ```
//!
//! Navigation commands (set reference, reload, prev, next) share one
//! [`NavigationSlot`]: each new command cancels the task in flight. The stop
//! metadata load is a [`OneShot`] task outside that slot. Favorite toggles
//! are fire-and-forget.
//!
//! Collaborator failures never escape: they are logged and turned into the
//! `error` flag. A failed refresh keeps the trip that was on screen.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, TimeZone};
use chrono_tz::Tz;
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::state::{NavButtons, StateStore, UiState};
use crate::core::task::{CancelAware, NavTicket, NavigationSlot, OneShot};
use crate::transit::{DayTrips, PrefKey, Preferences, StopRef, TransitSource, TripDetail};

/// The day's trips, owned by the navigation slot. `None` until a day has
/// been fetched for the current reference time.
type DayCache = Option<Arc<dyn DayTrips>>;

/// Resolves `index` against the cached day, if both are usable.
fn bounded(index: Option<usize>, day: &DayCache) -> Option<(usize, Arc<dyn DayTrips>)> {
    let day = day.as_ref()?;
    let index = index.filter(|i| *i < day.count())?;
    Some((index, day.clone()))
}

struct Inner {
    stop: StopRef,
    zone: Tz,
    source: Arc<dyn TransitSource>,
    preferences: Arc<dyn Preferences>,
    store: StateStore,
    nav: NavigationSlot<DayCache>,
    stop_loader: OneShot,
    favorite: watch::Receiver<Option<bool>>,
}

impl Inner {
    /// Applies `f` only while `ticket` is the current navigation task.
    fn commit(&self, ticket: &NavTicket, f: impl FnOnce(&UiState) -> UiState) -> bool {
        self.nav
            .with_current(ticket, |_| self.store.update(f))
            .is_some()
    }

    async fn load_stop(&self) {
        match self.source.fetch_stop(&self.stop).await {
            Ok(stop) => {
                info!("Loaded stop {} ({})", self.stop, stop.name);
                let stop = Arc::new(stop);
                self.store.update(|s| UiState {
                    stop: Some(stop),
                    ..s.clone()
                });
                if let Err(e) = self.preferences.register_access(&PrefKey::stop(&self.stop)).await {
                    warn!("Failed to register access to stop {}: {}", self.stop, e);
                }
            }
            Err(e) => warn!("Failed to load stop {}: {}", self.stop, e),
        }
    }

    async fn change_reference(&self, ticket: &NavTicket, at: DateTime<Tz>) {
        let reset = self.nav.with_current(ticket, |day| {
            *day = None;
            self.store.update(|s| UiState {
                trip_index: 0,
                trip: None,
                prev_enabled: false,
                next_enabled: false,
                reference_date_time: at,
                loading: true,
                error: false,
                ..s.clone()
            });
        });
        if reset.is_none() {
            return;
        }

        let fetched = match ticket.run(self.source.fetch_day_trips(&self.stop, at)).await {
            CancelAware::Value(result) => result,
            CancelAware::Cancelled => {
                debug!("Day fetch for stop {} at {} cancelled", self.stop, at);
                return;
            }
        };
        let day = match fetched {
            Ok(day) => day,
            Err(e) => {
                warn!("Failed to load trips for stop {} at {}: {}", self.stop, at, e);
                self.commit(ticket, |s| UiState {
                    loading: false,
                    error: true,
                    ..s.clone()
                });
                return;
            }
        };

        info!("Stop {}: {} trips from {}", self.stop, day.count(), at);
        if self.nav.with_current(ticket, |slot| *slot = Some(day)).is_none() {
            return;
        }
        // A fresh day is already current; no live refresh needed.
        self.load_index(ticket, Some(0), false).await;
    }

    async fn reload(&self, ticket: &NavTicket) {
        let Some((snapshot, day)) = self
            .nav
            .with_current(ticket, |day| (self.store.current(), day.clone()))
        else {
            return;
        };

        match (snapshot.trip.clone(), day) {
            (Some(trip), Some(day)) => {
                if !self.commit(ticket, |s| UiState {
                    loading: true,
                    error: false,
                    ..s.clone()
                }) {
                    return;
                }
                self.refresh_displayed(ticket, &day, &trip, snapshot.trip_index)
                    .await;
            }
            _ => {
                debug!("No trip shown at stop {}, reloading the day", self.stop);
                self.change_reference(ticket, snapshot.reference_date_time)
                    .await;
            }
        }
    }

    async fn load_index(&self, ticket: &NavTicket, index: Option<usize>, requested_by_user: bool) {
        let Some(target) = self.nav.with_current(ticket, |day| bounded(index, day)) else {
            return;
        };
        let Some((index, day)) = target else {
            if requested_by_user {
                debug!("Ignoring navigation to {:?} at stop {}", index, self.stop);
            } else {
                self.commit(ticket, |s| UiState {
                    loading: false,
                    error: false,
                    ..s.clone()
                });
            }
            return;
        };

        let count = day.count();
        let buttons = NavButtons::for_index(index, count);
        if !self.commit(ticket, |s| UiState {
            trip_index: index,
            trip: None,
            prev_enabled: buttons.prev,
            next_enabled: buttons.next,
            loading: true,
            error: false,
            ..s.clone()
        }) {
            return;
        }

        let trip = match ticket.run(day.trip_at(index)).await {
            CancelAware::Value(Ok(trip)) => Arc::new(trip),
            CancelAware::Value(Err(e)) => {
                warn!(
                    "Failed to load trip {} of {} at stop {}: {}",
                    index, count, self.stop, e
                );
                self.commit(ticket, |s| UiState {
                    loading: false,
                    error: true,
                    ..s.clone()
                });
                return;
            }
            CancelAware::Cancelled => {
                debug!("Load of trip {} at stop {} cancelled", index, self.stop);
                return;
            }
        };

        let complete = trip.is_complete();
        if !self.commit(ticket, |s| UiState {
            trip: Some(trip.clone()),
            loading: false,
            error: false,
            ..s.clone()
        }) {
            return;
        }

        if requested_by_user && !complete {
            debug!("Trip {} still running, fetching live status", trip.id);
            if !self.commit(ticket, |s| UiState {
                loading: true,
                error: false,
                ..s.clone()
            }) {
                return;
            }
            self.refresh_displayed(ticket, &day, &trip, index).await;
        }
    }

    /// Replaces the displayed trip with its live status. On failure the
    /// displayed trip is left as it was.
    async fn refresh_displayed(
        &self,
        ticket: &NavTicket,
        day: &Arc<dyn DayTrips>,
        trip: &TripDetail,
        index: usize,
    ) {
        let at = self.store.current().reference_date_time;
        match ticket.run(day.refresh_trip(trip, index, at)).await {
            CancelAware::Value(Ok(fresh)) => {
                let fresh = Arc::new(fresh);
                if !self.commit(ticket, |s| UiState {
                    trip: Some(fresh.clone()),
                    loading: false,
                    error: false,
                    ..s.clone()
                }) {
                    debug!("Refresh of trip {} superseded, dropping result", trip.id);
                }
            }
            CancelAware::Value(Err(e)) => {
                warn!(
                    "Failed to refresh trip {} (index {}) at stop {}: {}",
                    trip.id, index, self.stop, e
                );
                self.commit(ticket, |s| UiState {
                    loading: false,
                    error: true,
                    ..s.clone()
                });
            }
            CancelAware::Cancelled => {
                debug!("Refresh of trip {} cancelled", trip.id);
            }
        }
    }

    async fn toggle_favorite(&self) {
        let key = PrefKey::stop(&self.stop);
        let value = !self.favorite.borrow().unwrap_or(false);
        info!("Setting favorite {} to {}", key, value);
        if let Err(e) = self.preferences.set_favorite(&key, value).await {
            warn!("Failed to set favorite {}: {}", key, e);
        }
    }
}

/// Controller for browsing a stop's trips. Must be created inside a tokio
/// runtime; dropping it cancels the navigation task in flight.
pub struct TripController {
    inner: Arc<Inner>,
}

impl TripController {
    /// Creates the controller and launches the stop metadata load.
    pub fn start(
        stop: StopRef,
        zone: Tz,
        source: Arc<dyn TransitSource>,
        preferences: Arc<dyn Preferences>,
    ) -> Self {
        let favorite = match preferences.favorite_flag(&PrefKey::stop(&stop)) {
            Ok(rx) => rx,
            Err(e) => {
                warn!("Failed to read favorite flag for stop {}: {}", stop, e);
                watch::channel(None).1
            }
        };
        let now = chrono::Utc::now().with_timezone(&zone);
        info!(
            "Starting trip controller for stop {} ({} source, zone {})",
            stop,
            source.name(),
            zone
        );

        let inner = Arc::new(Inner {
            stop,
            zone,
            source,
            preferences,
            store: StateStore::new(UiState::initial(now)),
            nav: NavigationSlot::new(None),
            stop_loader: OneShot::new(),
            favorite,
        });

        let loader = inner.clone();
        inner.stop_loader.launch(async move { loader.load_stop().await });

        Self { inner }
    }

    pub fn stop(&self) -> &StopRef {
        &self.inner.stop
    }

    pub fn zone(&self) -> Tz {
        self.inner.zone
    }

    pub fn state(&self) -> UiState {
        self.inner.store.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<UiState> {
        self.inner.store.subscribe()
    }

    pub fn favorite(&self) -> watch::Receiver<Option<bool>> {
        self.inner.favorite.clone()
    }

    /// Starts a navigation task, cancelling the one in flight.
    fn launch<F, Fut>(&self, op: &str, task: F) -> JoinHandle<()>
    where
        F: FnOnce(Arc<Inner>, NavTicket) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ticket = self.inner.nav.preempt();
        debug!("Launching {} (generation {})", op, ticket.generation());
        tokio::spawn(task(self.inner.clone(), ticket))
    }

    /// Shows the trips for `time`, normalized to the working zone.
    pub fn set_reference_date_time<Z: TimeZone>(&self, time: DateTime<Z>) -> JoinHandle<()> {
        let at = time.with_timezone(&self.inner.zone);
        info!("Reference time set to {}", at);
        self.launch("set reference", move |inner, ticket| async move {
            inner.change_reference(&ticket, at).await
        })
    }

    pub fn reload(&self) -> JoinHandle<()> {
        info!("Reload requested");
        self.launch("reload", |inner, ticket| async move {
            inner.reload(&ticket).await
        })
    }

    /// Returns `None` when already at the first trip.
    pub fn prev_clicked(&self) -> Option<JoinHandle<()>> {
        let index = self.inner.store.current().trip_index.checked_sub(1);
        self.step_to(index)
    }

    /// Returns `None` when already at the last trip.
    pub fn next_clicked(&self) -> Option<JoinHandle<()>> {
        let index = self.inner.store.current().trip_index + 1;
        self.step_to(Some(index))
    }

    fn step_to(&self, index: Option<usize>) -> Option<JoinHandle<()>> {
        // Out-of-range steps leave the task in flight running: nothing is preempted.
        if self.inner.nav.peek(|day| bounded(index, day)).is_none() {
            debug!("Navigation to {:?} out of range, ignored", index);
            return None;
        }
        info!("Navigating to trip {:?}", index);
        Some(self.launch("load index", move |inner, ticket| async move {
            inner.load_index(&ticket, index, true).await
        }))
    }

    pub fn favorite_clicked(&self) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move { inner.toggle_favorite().await })
    }
}

impl Drop for TripController {
    fn drop(&mut self) {
        self.inner.nav.preempt();
    }
}
