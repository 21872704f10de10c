//! REST backend provider.
//!
//! Endpoints (all JSON):
//! - `GET {base}/stops/{type}/{id}`: stop metadata
//! - `GET {base}/stops/{type}/{id}/trips?at=<rfc3339>`: the day's trips
//! - `GET {base}/trips/{trip_id}?at=..&stop=..&stop_type=..&index=..`: live trip

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat};
use chrono_tz::Tz;
use log::{debug, info, warn};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::transit::{DayTrips, SourceError, Stop, StopRef, TransitSource, TripDetail};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1";

#[derive(Deserialize, Debug)]
struct DayTripsResponse {
    trips: Vec<TripDetail>,
}

/// Shared request plumbing for the source and the day sets it hands out.
#[derive(Clone)]
struct Backend {
    base_url: String,
    client: reqwest::Client,
}

impl Backend {
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = response.status();
        debug!("Response status for {}: {}", path, status);

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(SourceError::NotFound(path.to_string()));
        }
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            warn!("Transit API error: {} - {}", status.as_u16(), body);
            return Err(SourceError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| SourceError::Parse(e.to_string()))
    }
}

fn rfc3339(at: &DateTime<Tz>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, false)
}

pub struct HttpTransitSource {
    backend: Backend,
}

impl HttpTransitSource {
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        info!("HTTP transit source at {}", base_url);
        Self {
            backend: Backend {
                base_url,
                client: reqwest::Client::new(),
            },
        }
    }
}

#[async_trait]
impl TransitSource for HttpTransitSource {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_stop(&self, stop: &StopRef) -> Result<Stop, SourceError> {
        self.backend
            .get_json(&format!("/stops/{}/{}", stop.stop_type, stop.id), &[])
            .await
    }

    async fn fetch_day_trips(
        &self,
        stop: &StopRef,
        at: DateTime<Tz>,
    ) -> Result<Arc<dyn DayTrips>, SourceError> {
        let response: DayTripsResponse = self
            .backend
            .get_json(
                &format!("/stops/{}/{}/trips", stop.stop_type, stop.id),
                &[("at", rfc3339(&at))],
            )
            .await?;
        info!(
            "Fetched {} trips for stop {} at {}",
            response.trips.len(),
            stop,
            at
        );
        Ok(Arc::new(HttpDayTrips {
            backend: self.backend.clone(),
            stop: stop.clone(),
            trips: Mutex::new(response.trips),
        }))
    }
}

/// Day set backed by the snapshot the trips endpoint returned.
pub struct HttpDayTrips {
    backend: Backend,
    stop: StopRef,
    trips: Mutex<Vec<TripDetail>>,
}

#[async_trait]
impl DayTrips for HttpDayTrips {
    fn count(&self) -> usize {
        self.trips.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    async fn trip_at(&self, index: usize) -> Result<TripDetail, SourceError> {
        self.trips
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(index)
            .cloned()
            .ok_or_else(|| SourceError::NotFound(format!("trip index {index}")))
    }

    async fn refresh_trip(
        &self,
        current: &TripDetail,
        index: usize,
        at: DateTime<Tz>,
    ) -> Result<TripDetail, SourceError> {
        let fresh: TripDetail = self
            .backend
            .get_json(
                &format!("/trips/{}", current.id),
                &[
                    ("at", rfc3339(&at)),
                    ("stop", self.stop.id.clone()),
                    ("stop_type", self.stop.stop_type.to_string()),
                    ("index", index.to_string()),
                ],
            )
            .await?;

        // Keep the cached snapshot fresh for when the user navigates back.
        let mut trips = self.trips.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(slot) = trips.get_mut(index)
            && slot.id == fresh.id
        {
            *slot = fresh.clone();
        }
        Ok(fresh)
    }
}
