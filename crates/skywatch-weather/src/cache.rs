//! In-memory city → weather cache.
//!
//! Records live for the whole session. Staleness is only ever shown to the
//! user (see [`staleness_label`]); it never invalidates data.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::FetchFailure;
use crate::types::{CurrentReport, ForecastReport};

/// Order in which a fetch was sent, and when its response arrived.
///
/// `issue` comes from a monotonic counter, so ordering survives wall-clock
/// steps; `completed_at` is only used for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchStamp {
    pub issue: u64,
    pub completed_at: DateTime<Utc>,
}

impl FetchStamp {
    pub fn new(issue: u64, completed_at: DateTime<Utc>) -> Self {
        Self {
            issue,
            completed_at,
        }
    }

    /// Stamp for fetch number `issue` completing now
    pub fn completed_now(issue: u64) -> Self {
        Self::new(issue, Utc::now())
    }
}

/// Partial data from one fetch; absent fields leave the record untouched
#[derive(Debug, Clone, Default)]
pub struct CityUpdate {
    pub current: Option<CurrentReport>,
    pub forecast: Option<ForecastReport>,
}

impl CityUpdate {
    pub fn current(report: CurrentReport) -> Self {
        Self {
            current: Some(report),
            forecast: None,
        }
    }

    pub fn forecast(report: ForecastReport) -> Self {
        Self {
            current: None,
            forecast: Some(report),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CityRecord {
    pub current: Option<CurrentReport>,
    pub forecast: Option<ForecastReport>,
    /// Completion time of the most recent accepted fetch
    pub last_updated: Option<DateTime<Utc>>,
    current_issue: Option<u64>,
    forecast_issue: Option<u64>,
}

impl CityRecord {
    pub fn has_current(&self) -> bool {
        self.current.is_some()
    }

    /// Issue number of the newest fetch whose data is held
    fn latest_issue(&self) -> Option<u64> {
        self.current_issue.max(self.forecast_issue)
    }
}

/// Whether a write reached the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// Every field in the update was older than what is already stored
    Discarded,
}

#[derive(Debug, Default)]
pub struct CityWeatherCache {
    records: HashMap<String, CityRecord>,
    /// Latest failure per city, with the issue number of the failed fetch
    failures: HashMap<String, (u64, FetchFailure)>,
}

fn is_newer(stored: Option<u64>, incoming: u64) -> bool {
    stored.map_or(true, |stored| incoming >= stored)
}

impl CityWeatherCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, city: &str) -> Option<&CityRecord> {
        self.records.get(city)
    }

    pub fn contains(&self, city: &str) -> bool {
        self.records.contains_key(city)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Merge `update` into the record for `city`, creating it if needed.
    ///
    /// Each field is only replaced by data from a request issued no earlier
    /// than the one that produced the stored value, so a slow response
    /// cannot overwrite a newer one. A failure recorded by a later request
    /// survives the write.
    pub fn put(&mut self, city: &str, update: CityUpdate, stamp: FetchStamp) -> WriteOutcome {
        let existing = self.records.get(city);
        let apply_current = update.current.is_some()
            && is_newer(existing.and_then(|r| r.current_issue), stamp.issue);
        let apply_forecast = update.forecast.is_some()
            && is_newer(existing.and_then(|r| r.forecast_issue), stamp.issue);

        if !apply_current && !apply_forecast {
            tracing::debug!("Discarding stale response for {}", city);
            return WriteOutcome::Discarded;
        }

        let record = self.records.entry(city.to_string()).or_default();
        if apply_current {
            record.current = update.current;
            record.current_issue = Some(stamp.issue);
        }
        if apply_forecast {
            record.forecast = update.forecast;
            record.forecast_issue = Some(stamp.issue);
        }
        record.last_updated = Some(match record.last_updated {
            Some(previous) if previous > stamp.completed_at => previous,
            _ => stamp.completed_at,
        });

        if self
            .failures
            .get(city)
            .is_some_and(|(failed_issue, _)| *failed_issue <= stamp.issue)
        {
            self.failures.remove(city);
        }
        WriteOutcome::Applied
    }

    /// Remember that fetch number `issue` for `city` failed. Cached data is
    /// kept. Returns false, recording nothing, when newer data or a newer
    /// failure is already held.
    pub fn record_failure(&mut self, city: &str, issue: u64, failure: FetchFailure) -> bool {
        let superseded_by_data = self
            .records
            .get(city)
            .and_then(CityRecord::latest_issue)
            .is_some_and(|latest| latest > issue);
        let superseded_by_failure = self
            .failures
            .get(city)
            .is_some_and(|(failed_issue, _)| *failed_issue > issue);
        if superseded_by_data || superseded_by_failure {
            tracing::debug!("Ignoring stale failure for {}", city);
            return false;
        }

        self.failures.insert(city.to_string(), (issue, failure));
        true
    }

    pub fn last_failure(&self, city: &str) -> Option<&FetchFailure> {
        self.failures.get(city).map(|(_, failure)| failure)
    }

    /// Most recent `last_updated` across all cities
    pub fn latest_update(&self) -> Option<DateTime<Utc>> {
        self.records.values().filter_map(|r| r.last_updated).max()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.failures.clear();
    }
}

/// Render-time label for data last refreshed at `last_updated`.
/// `None` means nothing was ever fetched.
pub fn staleness_label(last_updated: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Option<String> {
    let secs = (now - last_updated?).num_seconds().max(0);
    Some(if secs < 60 {
        format!("Updated {}s ago", secs)
    } else if secs < 3600 {
        format!("Updated {}m ago", secs / 60)
    } else {
        format!("Updated {}h ago", secs / 3600)
    })
}
