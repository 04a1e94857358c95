//! Weather dashboard state layer for Skywatch
//!
//! Keeps a city → weather cache fresh against a WeatherAPI-style HTTP
//! source, with debounced search, persisted favorites and change
//! notifications for whatever renders the dashboard.

pub mod autocomplete;
pub mod cache;
pub mod client;
pub mod dashboard;
pub mod error;
pub mod favorites;
pub mod refresh;
pub mod scheduler;
pub mod storage;
pub mod types;

#[cfg(test)]
mod testing;

pub use autocomplete::AutocompleteController;
pub use cache::{staleness_label, CityRecord, CityUpdate, CityWeatherCache, FetchStamp, WriteOutcome};
pub use client::{WeatherClient, WeatherSource};
pub use dashboard::{ActiveView, Dashboard, DashboardSettings, StateChange};
pub use error::{FetchFailure, FailureKind, WeatherError};
pub use favorites::FavoritesStore;
pub use refresh::{FetchOutcome, RefreshController, SweepReport};
pub use scheduler::Scheduler;
pub use storage::LocalStorage;
pub use types::*;
