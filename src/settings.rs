//! Turns the loaded [`Config`] into dashboard settings.
//!
//! The core and weather crates each define a `TemperatureUnit`; neither
//! depends on the other, so the mapping between them lives here.

use std::time::Duration;

use skywatch_core::Config;
use skywatch_weather::{DashboardSettings, TemperatureUnit};

pub fn temperature_unit(unit: skywatch_core::TemperatureUnit) -> TemperatureUnit {
    match unit {
        skywatch_core::TemperatureUnit::Celsius => TemperatureUnit::Celsius,
        skywatch_core::TemperatureUnit::Fahrenheit => TemperatureUnit::Fahrenheit,
    }
}

pub fn dashboard_settings(config: &Config) -> DashboardSettings {
    let weather = &config.weather;
    DashboardSettings {
        unit: temperature_unit(weather.temperature_unit),
        refresh_interval: Duration::from_secs(weather.refresh_interval_secs),
        forecast_days: weather.forecast_days,
        debounce: Duration::from_millis(weather.debounce_ms),
        top_cities: weather.top_cities.clone(),
        top_city_count: weather.top_city_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_units_map_one_to_one() {
        assert_eq!(
            temperature_unit(skywatch_core::TemperatureUnit::Celsius),
            TemperatureUnit::Celsius
        );
        assert_eq!(
            temperature_unit(skywatch_core::TemperatureUnit::Fahrenheit),
            TemperatureUnit::Fahrenheit
        );
        assert_eq!(
            temperature_unit(skywatch_core::TemperatureUnit::default()),
            TemperatureUnit::default()
        );
    }

    #[test]
    fn test_dashboard_settings_from_config() {
        let mut config = Config::default();
        config.weather.temperature_unit = skywatch_core::TemperatureUnit::Fahrenheit;
        config.weather.refresh_interval_secs = 120;
        config.weather.debounce_ms = 250;
        config.weather.top_cities = vec!["Lima".into(), "Oslo".into()];
        config.weather.top_city_count = 1;

        let settings = dashboard_settings(&config);

        assert_eq!(settings.unit, TemperatureUnit::Fahrenheit);
        assert_eq!(settings.refresh_interval, Duration::from_secs(120));
        assert_eq!(settings.debounce, Duration::from_millis(250));
        assert_eq!(settings.forecast_days, config.weather.forecast_days);
        assert_eq!(settings.top_cities, vec!["Lima", "Oslo"]);
        assert_eq!(settings.top_city_count, 1);
    }
}
