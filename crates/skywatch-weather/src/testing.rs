//! In-memory weather source for unit tests.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::NaiveDate;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::client::WeatherSource;
use crate::error::WeatherError;
use crate::types::*;

#[derive(Debug, Clone)]
pub(crate) struct Call {
    pub kind: &'static str,
    pub query: String,
    pub at: Instant,
}

#[derive(Default)]
pub(crate) struct FakeSource {
    calls: Mutex<Vec<Call>>,
    failing: Mutex<HashSet<String>>,
    delays: Mutex<HashMap<String, Duration>>,
    temperatures: Mutex<HashMap<String, f64>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_city(&self, query: &str) {
        self.failing.lock().insert(query.to_string());
    }

    pub fn recover_city(&self, query: &str) {
        self.failing.lock().remove(query);
    }

    pub fn delay_city(&self, query: &str, delay: Duration) {
        self.delays.lock().insert(query.to_string(), delay);
    }

    pub fn set_temperature(&self, city: &str, temp_c: f64) {
        self.temperatures.lock().insert(city.to_string(), temp_c);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, kind: &str, query: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.kind == kind && c.query == query)
            .count()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.kind == kind).count()
    }

    /// Record the call and snapshot everything the response depends on,
    /// so later reconfiguration does not change an in-flight answer.
    fn begin(&self, kind: &'static str, query: &str) -> (Option<Duration>, bool, f64) {
        self.calls.lock().push(Call {
            kind,
            query: query.to_string(),
            at: Instant::now(),
        });
        let delay = self.delays.lock().get(query).copied();
        let failing = self.failing.lock().contains(query);
        let temp = self.temperatures.lock().get(query).copied().unwrap_or(20.0);
        (delay, failing, temp)
    }

    async fn finish(delay: Option<Duration>, failing: bool) -> Result<(), WeatherError> {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if failing {
            return Err(WeatherError::Status {
                status: 500,
                body: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}

pub(crate) fn sample_current(city: &str, temp_c: f64) -> CurrentReport {
    CurrentReport {
        location: Location {
            name: city.to_string(),
            region: String::new(),
            country: "Testland".to_string(),
            localtime: None,
        },
        current: CurrentWeather {
            temp_c,
            temp_f: temp_c * 9.0 / 5.0 + 32.0,
            condition: Condition {
                text: "Clear".to_string(),
                icon: "//cdn.weatherapi.com/weather/64x64/day/113.png".to_string(),
            },
            humidity: 40,
            wind_kph: 8.0,
            feelslike_c: temp_c - 1.0,
            feelslike_f: (temp_c - 1.0) * 9.0 / 5.0 + 32.0,
            pressure_mb: 1010.0,
            vis_km: 10.0,
            cloud: 10,
            uv: 3.0,
        },
    }
}

pub(crate) fn sample_forecast(city: &str, temp_c: f64, days: u32) -> ForecastReport {
    let base = sample_current(city, temp_c);
    let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let forecastday = (0..days)
        .map(|offset| ForecastDay {
            date: start + chrono::Days::new(u64::from(offset)),
            day: DaySummary {
                avgtemp_c: temp_c,
                avgtemp_f: base.current.temp_f,
                condition: base.current.condition.clone(),
            },
            astro: Astro {
                sunrise: "06:00 AM".to_string(),
                sunset: "07:00 PM".to_string(),
            },
            hour: (0..24)
                .map(|h| HourlyEntry {
                    time: format!("{} {:02}:00", start + chrono::Days::new(u64::from(offset)), h),
                    temp_c,
                    temp_f: base.current.temp_f,
                })
                .collect(),
        })
        .collect();

    ForecastReport {
        location: base.location,
        current: base.current,
        forecast: ForecastBundle { forecastday },
    }
}

impl WeatherSource for FakeSource {
    async fn current(&self, city: &str) -> Result<CurrentReport, WeatherError> {
        let (delay, failing, temp) = self.begin("current", city);
        Self::finish(delay, failing).await?;
        Ok(sample_current(city, temp))
    }

    async fn forecast(&self, city: &str, days: u32) -> Result<ForecastReport, WeatherError> {
        let (delay, failing, temp) = self.begin("forecast", city);
        Self::finish(delay, failing).await?;
        Ok(sample_forecast(city, temp, days))
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchSuggestion>, WeatherError> {
        let (delay, failing, _) = self.begin("search", query);
        Self::finish(delay, failing).await?;
        Ok(vec![
            SearchSuggestion {
                name: format!("{}don", query),
                region: "Greater London".to_string(),
                country: "United Kingdom".to_string(),
            },
            SearchSuggestion {
                name: format!("{}grad", query),
                region: String::new(),
                country: "Nowhere".to_string(),
            },
        ])
    }
}
