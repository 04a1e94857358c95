//! Application state for the weather dashboard.
//!
//! [`Dashboard`] owns the cache, favorites, unit preference, refresh
//! interval and search state. Every mutation goes through a method and is
//! announced as a [`StateChange`] on a broadcast channel; renderers read the
//! accessors after each notification.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::autocomplete::AutocompleteController;
use crate::cache::{staleness_label, CityRecord, CityWeatherCache};
use crate::client::WeatherSource;
use crate::error::{FetchFailure, WeatherError};
use crate::favorites::FavoritesStore;
use crate::refresh::{self, RefreshController, SweepReport};
use crate::storage::LocalStorage;
use crate::types::{CurrentReport, SearchSuggestion, TemperatureUnit};

/// Cities refreshed alongside the favorites when none are configured
pub const DEFAULT_TOP_CITIES: [&str; 10] = [
    "Delhi",
    "Mumbai",
    "Bengaluru",
    "Chennai",
    "Kolkata",
    "Hyderabad",
    "Pune",
    "Ahmedabad",
    "Jaipur",
    "Lucknow",
];

const EVENT_CAPACITY: usize = 256;

/// Notification sent after a state mutation
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    CityUpdated { city: String },
    CityFailed { city: String, failure: FetchFailure },
    FavoritesChanged,
    UnitChanged(TemperatureUnit),
    RefreshIntervalChanged(Duration),
    SuggestionsChanged,
    SearchResultChanged,
    SweepFinished { updated: usize, failed: usize },
    DataCleared,
}

#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub unit: TemperatureUnit,
    pub refresh_interval: Duration,
    pub forecast_days: u32,
    pub debounce: Duration,
    pub top_cities: Vec<String>,
    pub top_city_count: usize,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            unit: TemperatureUnit::default(),
            refresh_interval: Duration::from_secs(60),
            forecast_days: 7,
            debounce: Duration::from_millis(300),
            top_cities: DEFAULT_TOP_CITIES.iter().map(|c| c.to_string()).collect(),
            top_city_count: 8,
        }
    }
}

struct Inner<S> {
    cache: Arc<Mutex<CityWeatherCache>>,
    refresh: RefreshController<S>,
    autocomplete: AutocompleteController<S>,
    favorites: Mutex<FavoritesStore>,
    unit: Mutex<TemperatureUnit>,
    interval: watch::Sender<Duration>,
    search_result: Mutex<Option<CurrentReport>>,
    loop_token: Mutex<Option<CancellationToken>>,
    forecast_days: u32,
    top_cities: Vec<String>,
    events: broadcast::Sender<StateChange>,
}

pub struct Dashboard<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for Dashboard<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

/// Keeps the periodic refresh running. Dropping it stops the loop.
#[must_use = "the refresh loop stops when the view is dropped"]
#[derive(Debug)]
pub struct ActiveView {
    token: CancellationToken,
}

impl ActiveView {
    pub fn deactivate(self) {
        self.token.cancel();
    }
}

impl Drop for ActiveView {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

impl<S: WeatherSource> Dashboard<S> {
    /// Build the dashboard and load favorites from `storage`.
    pub fn new(source: Arc<S>, storage: LocalStorage, settings: DashboardSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let cache = Arc::new(Mutex::new(CityWeatherCache::new()));
        let (interval, _) = watch::channel(settings.refresh_interval);
        let top_cities = settings
            .top_cities
            .into_iter()
            .take(settings.top_city_count)
            .collect();

        let inner = Inner {
            refresh: RefreshController::new(source.clone(), cache.clone(), events.clone()),
            autocomplete: AutocompleteController::new(source, settings.debounce, events.clone()),
            cache,
            favorites: Mutex::new(FavoritesStore::load(storage)),
            unit: Mutex::new(settings.unit),
            interval,
            search_result: Mutex::new(None),
            loop_token: Mutex::new(None),
            forecast_days: settings.forecast_days.max(1),
            top_cities,
            events,
        };

        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.inner.events.subscribe()
    }

    fn notify(&self, change: StateChange) {
        // No subscribers is fine
        let _ = self.inner.events.send(change);
    }

    // ---- lifecycle ----

    /// Start periodic refresh: one sweep now, then one per interval.
    /// Replaces any loop started by an earlier call.
    ///
    /// Must be called from within a tokio runtime.
    pub fn activate(&self) -> ActiveView {
        let token = CancellationToken::new();
        if let Some(previous) = self.inner.loop_token.lock().replace(token.clone()) {
            previous.cancel();
        }

        let dashboard = self.clone();
        let loop_token = token.clone();
        tokio::spawn(async move { dashboard.run_refresh_loop(loop_token).await });

        ActiveView { token }
    }

    pub fn is_active(&self) -> bool {
        self.inner
            .loop_token
            .lock()
            .as_ref()
            .is_some_and(|token| !token.is_cancelled())
    }

    async fn run_refresh_loop(self, token: CancellationToken) {
        let mut interval = self.inner.interval.subscribe();
        tracing::info!(
            "Refresh loop started, every {}s",
            interval.borrow().as_secs()
        );

        'sweeps: loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = self.refresh_now() => {}
            }

            loop {
                let period = *interval.borrow_and_update();
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break 'sweeps,
                    changed = interval.changed() => {
                        if changed.is_err() {
                            break 'sweeps;
                        }
                        tracing::debug!("Refresh interval changed, re-arming timer");
                    }
                    _ = tokio::time::sleep(period) => break,
                }
            }
        }

        tracing::info!("Refresh loop stopped");
    }

    /// Sweep every target city once
    pub async fn refresh_now(&self) -> SweepReport {
        let targets = self.target_cities();
        let report = self.inner.refresh.refresh_all(&targets).await;
        self.notify(StateChange::SweepFinished {
            updated: report.updated.len(),
            failed: report.failed.len(),
        });
        report
    }

    /// Load current conditions and the forecast for one city.
    /// Both requests run; the first error is returned.
    pub async fn load_city_details(&self, city: &str) -> Result<(), WeatherError> {
        let (current, forecast) = tokio::join!(
            self.inner.refresh.load_current(city),
            self.inner.refresh.load_forecast(city, self.inner.forecast_days)
        );
        current?;
        forecast?;
        Ok(())
    }

    // ---- favorites ----

    /// Flip favorite membership for `city` and return the new membership.
    ///
    /// A city with nothing cached is fetched first so it has data to show;
    /// a failed fetch does not stop it from being added.
    pub async fn toggle_favorite(&self, city: &str) -> Result<bool, WeatherError> {
        if city.trim().is_empty() {
            return Ok(false);
        }
        if self.is_favorite(city) {
            self.remove_favorite(city)?;
            return Ok(false);
        }

        let cached = self.inner.cache.lock().contains(city);
        if !cached {
            if let Err(e) = self.inner.refresh.fetch_current_now(city).await {
                tracing::warn!("Adding {} to favorites without data: {}", city, e);
            }
        }

        self.add_favorite(city)?;
        Ok(true)
    }

    pub fn add_favorite(&self, city: &str) -> Result<bool, WeatherError> {
        let result = self.inner.favorites.lock().add(city);
        if !matches!(result, Ok(false)) {
            self.notify(StateChange::FavoritesChanged);
        }
        result
    }

    pub fn remove_favorite(&self, city: &str) -> Result<bool, WeatherError> {
        let result = self.inner.favorites.lock().remove(city);
        if !matches!(result, Ok(false)) {
            self.notify(StateChange::FavoritesChanged);
        }
        result
    }

    pub fn favorites(&self) -> Vec<String> {
        self.inner.favorites.lock().list().to_vec()
    }

    pub fn is_favorite(&self, city: &str) -> bool {
        self.inner.favorites.lock().contains(city)
    }

    // ---- preferences ----

    pub fn unit(&self) -> TemperatureUnit {
        *self.inner.unit.lock()
    }

    pub fn set_unit(&self, unit: TemperatureUnit) {
        let previous = std::mem::replace(&mut *self.inner.unit.lock(), unit);
        if previous != unit {
            self.notify(StateChange::UnitChanged(unit));
        }
    }

    pub fn toggle_unit(&self) -> TemperatureUnit {
        let unit = self.unit().toggled();
        self.set_unit(unit);
        unit
    }

    pub fn refresh_interval(&self) -> Duration {
        *self.inner.interval.borrow()
    }

    /// Change the refresh period. A running loop re-arms with the new value.
    pub fn set_refresh_interval(&self, secs: u64) -> Result<(), WeatherError> {
        if secs == 0 {
            return Err(WeatherError::InvalidSetting(
                "refresh interval must be at least 1 second".to_string(),
            ));
        }
        let interval = Duration::from_secs(secs);
        let previous = self.inner.interval.send_replace(interval);
        if previous != interval {
            tracing::info!("Refresh interval set to {}s", secs);
            self.notify(StateChange::RefreshIntervalChanged(interval));
        }
        Ok(())
    }

    // ---- search ----

    /// Feed search box text to the autocomplete controller. Blank text also
    /// clears the last selected search result.
    pub fn update_query(&self, text: &str) {
        if text.trim().is_empty() && self.inner.search_result.lock().take().is_some() {
            self.notify(StateChange::SearchResultChanged);
        }
        self.inner.autocomplete.update_query(text);
    }

    /// Fetch current weather for a picked suggestion and keep it as the
    /// search result. On failure the search result is cleared.
    pub async fn select_search_suggestion(
        &self,
        suggestion: &SearchSuggestion,
    ) -> Result<CurrentReport, WeatherError> {
        self.inner.autocomplete.select(&suggestion.name);

        let result = self.inner.refresh.fetch_current_now(&suggestion.name).await;
        *self.inner.search_result.lock() = result.as_ref().ok().cloned();
        self.notify(StateChange::SearchResultChanged);
        result
    }

    pub fn query(&self) -> String {
        self.inner.autocomplete.query()
    }

    pub fn suggestions(&self) -> Vec<SearchSuggestion> {
        self.inner.autocomplete.suggestions()
    }

    pub fn search_result(&self) -> Option<CurrentReport> {
        self.inner.search_result.lock().clone()
    }

    // ---- cache reads ----

    pub fn city(&self, name: &str) -> Option<CityRecord> {
        self.inner.cache.lock().get(name).cloned()
    }

    pub fn last_failure(&self, name: &str) -> Option<FetchFailure> {
        self.inner.cache.lock().last_failure(name).cloned()
    }

    pub fn staleness_label(&self, name: &str, now: DateTime<Utc>) -> Option<String> {
        let last_updated = self.inner.cache.lock().get(name)?.last_updated;
        staleness_label(last_updated, now)
    }

    /// Label for the most recently refreshed city
    pub fn overall_staleness_label(&self, now: DateTime<Utc>) -> Option<String> {
        let latest = self.inner.cache.lock().latest_update();
        staleness_label(latest, now)
    }

    /// Rounded current temperature in the selected unit, e.g. `"21°C"`
    pub fn display_temperature(&self, name: &str) -> Option<String> {
        let unit = self.unit();
        let temperature = self
            .inner
            .cache
            .lock()
            .get(name)?
            .current
            .as_ref()?
            .current
            .temperature(unit);
        Some(format!("{}{}", temperature.round() as i64, unit.symbol()))
    }

    /// Favorites first, then the configured top cities
    pub fn target_cities(&self) -> Vec<String> {
        let favorites = self.favorites();
        refresh::target_cities(&favorites, &self.inner.top_cities)
    }

    pub fn top_cities(&self) -> &[String] {
        &self.inner.top_cities
    }

    /// Forget all weather data, favorites (including the stored copy) and
    /// search state.
    pub fn clear_all_data(&self) -> Result<(), WeatherError> {
        self.inner.cache.lock().clear();
        self.inner.autocomplete.clear();
        *self.inner.search_result.lock() = None;
        let result = self.inner.favorites.lock().clear();

        tracing::info!("Cleared all dashboard data");
        self.notify(StateChange::DataCleared);
        result
    }
}
