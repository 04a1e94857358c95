//! Favorite cities: ordered, duplicate-free, persisted on every change.

use crate::error::WeatherError;
use crate::storage::LocalStorage;

/// Storage key for the favorites list
pub const FAVORITES_KEY: &str = "favorites";

#[derive(Debug)]
pub struct FavoritesStore {
    storage: LocalStorage,
    cities: Vec<String>,
}

impl FavoritesStore {
    /// Load favorites from storage. Missing or unreadable data yields an empty set.
    pub fn load(storage: LocalStorage) -> Self {
        let stored = match storage.read::<Vec<String>>(FAVORITES_KEY) {
            Ok(Some(cities)) => cities,
            Ok(None) => Vec::new(),
            Err(e) => {
                tracing::warn!("Ignoring unreadable favorites, starting empty: {}", e);
                Vec::new()
            }
        };

        let mut cities: Vec<String> = Vec::with_capacity(stored.len());
        for city in stored {
            if !city.trim().is_empty() && !cities.contains(&city) {
                cities.push(city);
            }
        }

        tracing::info!("Loaded {} favorite cities", cities.len());
        Self { storage, cities }
    }

    pub fn list(&self) -> &[String] {
        &self.cities
    }

    pub fn contains(&self, city: &str) -> bool {
        self.cities.iter().any(|c| c == city)
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Append `city` unless already present. Returns whether the set changed.
    ///
    /// The in-memory set is updated even if the write fails; the error
    /// reports the failed write.
    pub fn add(&mut self, city: &str) -> Result<bool, WeatherError> {
        if city.trim().is_empty() || self.contains(city) {
            return Ok(false);
        }
        self.cities.push(city.to_string());
        self.persist()?;
        Ok(true)
    }

    /// Remove `city` if present. Returns whether the set changed.
    pub fn remove(&mut self, city: &str) -> Result<bool, WeatherError> {
        let before = self.cities.len();
        self.cities.retain(|c| c != city);
        if self.cities.len() == before {
            return Ok(false);
        }
        self.persist()?;
        Ok(true)
    }

    /// Drop every favorite, including the stored copy
    pub fn clear(&mut self) -> Result<(), WeatherError> {
        self.cities.clear();
        self.storage.remove(FAVORITES_KEY)
    }

    fn persist(&self) -> Result<(), WeatherError> {
        self.storage.write(FAVORITES_KEY, &self.cities)
    }
}
