//! Fetches weather into the cache.
//!
//! At most one request per city and data kind is in flight through the
//! deduplicated loads; per-city failures are logged and recorded without
//! touching cached data or sibling fetches.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};

use crate::cache::{CityUpdate, CityWeatherCache, FetchStamp, WriteOutcome};
use crate::client::WeatherSource;
use crate::dashboard::StateChange;
use crate::error::{FetchFailure, WeatherError};
use crate::types::CurrentReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum FetchKind {
    Current,
    Forecast,
}

/// Result of a successful (non-error) load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Response merged into the cache
    Updated,
    /// Response arrived but newer data was already cached
    Discarded,
    /// Same request already in flight; nothing was sent
    Skipped,
}

/// Per-city results of one refresh sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub updated: Vec<String>,
    pub discarded: Vec<String>,
    pub failed: Vec<String>,
    pub skipped: Vec<String>,
}

type InFlightKey = (String, FetchKind);

/// Releases the in-flight mark when the fetch ends, however it ends.
/// Dropping the map entry closes the channel, which wakes any waiters.
struct InFlight<'a> {
    set: &'a Mutex<HashMap<InFlightKey, watch::Sender<()>>>,
    key: InFlightKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set.lock().remove(&self.key);
    }
}

enum Begin<'a> {
    Started(InFlight<'a>),
    /// Closes when the running fetch finishes
    Busy(watch::Receiver<()>),
}

pub struct RefreshController<S> {
    source: Arc<S>,
    cache: Arc<Mutex<CityWeatherCache>>,
    in_flight: Mutex<HashMap<InFlightKey, watch::Sender<()>>>,
    next_issue: AtomicU64,
    events: broadcast::Sender<StateChange>,
}

impl<S: WeatherSource> RefreshController<S> {
    pub fn new(
        source: Arc<S>,
        cache: Arc<Mutex<CityWeatherCache>>,
        events: broadcast::Sender<StateChange>,
    ) -> Self {
        Self {
            source,
            cache,
            in_flight: Mutex::new(HashMap::new()),
            next_issue: AtomicU64::new(0),
            events,
        }
    }

    fn begin(&self, city: &str, kind: FetchKind) -> Begin<'_> {
        let key = (city.to_string(), kind);
        let mut in_flight = self.in_flight.lock();
        if let Some(done) = in_flight.get(&key) {
            return Begin::Busy(done.subscribe());
        }
        let (done, _) = watch::channel(());
        in_flight.insert(key.clone(), done);
        Begin::Started(InFlight {
            set: &self.in_flight,
            key,
        })
    }

    fn issue(&self) -> u64 {
        self.next_issue.fetch_add(1, Ordering::Relaxed)
    }

    pub fn is_in_flight(&self, city: &str) -> bool {
        self.in_flight
            .lock()
            .keys()
            .any(|(c, _)| c == city)
    }

    /// Fetch current weather for `city` unless a fetch is already running.
    pub async fn load_current(&self, city: &str) -> Result<FetchOutcome, WeatherError> {
        let Begin::Started(_in_flight) = self.begin(city, FetchKind::Current) else {
            tracing::debug!("Current weather for {} already in flight", city);
            return Ok(FetchOutcome::Skipped);
        };
        let (outcome, _) = self.fetch_current(city).await?;
        Ok(outcome)
    }

    /// Fetch a `days`-long forecast for `city` unless one is already running.
    pub async fn load_forecast(&self, city: &str, days: u32) -> Result<FetchOutcome, WeatherError> {
        let Begin::Started(_in_flight) = self.begin(city, FetchKind::Forecast) else {
            tracing::debug!("Forecast for {} already in flight", city);
            return Ok(FetchOutcome::Skipped);
        };

        let issue = self.issue();
        match self.source.forecast(city, days).await {
            Ok(report) => Ok(self.store(city, CityUpdate::forecast(report), issue)),
            Err(e) => Err(self.fail(city, issue, e)),
        }
    }

    /// Current weather for `city`, returned to the caller.
    ///
    /// If a current fetch for the city is already running, waits for it and
    /// answers from the cache; a fresh request is sent only when that fetch
    /// left nothing cached.
    pub async fn fetch_current_now(&self, city: &str) -> Result<CurrentReport, WeatherError> {
        loop {
            match self.begin(city, FetchKind::Current) {
                Begin::Started(_in_flight) => {
                    let (_, report) = self.fetch_current(city).await?;
                    return Ok(report);
                }
                Begin::Busy(mut done) => {
                    tracing::debug!("Waiting on in-flight current fetch for {}", city);
                    // Only ever resolves by the sender closing
                    let _ = done.changed().await;
                    let cached = self
                        .cache
                        .lock()
                        .get(city)
                        .and_then(|record| record.current.clone());
                    if let Some(report) = cached {
                        return Ok(report);
                    }
                }
            }
        }
    }

    async fn fetch_current(&self, city: &str) -> Result<(FetchOutcome, CurrentReport), WeatherError> {
        let issue = self.issue();
        match self.source.current(city).await {
            Ok(report) => {
                let outcome = self.store(city, CityUpdate::current(report.clone()), issue);
                Ok((outcome, report))
            }
            Err(e) => Err(self.fail(city, issue, e)),
        }
    }

    fn store(&self, city: &str, update: CityUpdate, issue: u64) -> FetchOutcome {
        let outcome = self
            .cache
            .lock()
            .put(city, update, FetchStamp::completed_now(issue));

        match outcome {
            WriteOutcome::Applied => {
                let _ = self.events.send(StateChange::CityUpdated {
                    city: city.to_string(),
                });
                FetchOutcome::Updated
            }
            WriteOutcome::Discarded => FetchOutcome::Discarded,
        }
    }

    fn fail(&self, city: &str, issue: u64, err: WeatherError) -> WeatherError {
        tracing::warn!("Weather fetch for {} failed: {}", city, err);
        let failure = FetchFailure::from(&err);
        let recorded = self
            .cache
            .lock()
            .record_failure(city, issue, failure.clone());
        if recorded {
            let _ = self.events.send(StateChange::CityFailed {
                city: city.to_string(),
                failure,
            });
        }
        err
    }

    /// Load current weather for every city concurrently. A failure for one
    /// city never affects the others.
    pub async fn refresh_all(&self, cities: &[String]) -> SweepReport {
        let mut pending = Vec::with_capacity(cities.len());
        for city in cities {
            pending.push(self.load_current(city));
        }
        let results = join_all(pending).await;

        let mut report = SweepReport::default();
        for (city, result) in cities.iter().zip(results) {
            let bucket = match result {
                Ok(FetchOutcome::Updated) => &mut report.updated,
                Ok(FetchOutcome::Discarded) => &mut report.discarded,
                Ok(FetchOutcome::Skipped) => &mut report.skipped,
                Err(_) => &mut report.failed,
            };
            bucket.push(city.clone());
        }

        tracing::info!(
            "Refresh sweep: {} updated, {} discarded, {} failed, {} skipped",
            report.updated.len(),
            report.discarded.len(),
            report.failed.len(),
            report.skipped.len()
        );
        report
    }
}

/// Favorites first, then the top cities, without duplicates
pub fn target_cities(favorites: &[String], top_cities: &[String]) -> Vec<String> {
    let mut targets: Vec<String> = Vec::with_capacity(favorites.len() + top_cities.len());
    for city in favorites.iter().chain(top_cities) {
        if !targets.contains(city) {
            targets.push(city.clone());
        }
    }
    targets
}
