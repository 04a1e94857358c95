use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
}

impl TemperatureUnit {
    /// Pick the value matching this unit from a Celsius/Fahrenheit pair
    pub fn select(self, celsius: f64, fahrenheit: f64) -> f64 {
        match self {
            Self::Celsius => celsius,
            Self::Fahrenheit => fahrenheit,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
        }
    }

    /// The other unit
    pub fn toggled(self) -> Self {
        match self {
            Self::Celsius => Self::Fahrenheit,
            Self::Fahrenheit => Self::Celsius,
        }
    }
}

/// Condition text and icon as sent by the weather API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub text: String,
    pub icon: String,
}

impl Condition {
    /// Icon URL with a scheme; the API sends protocol-relative paths.
    pub fn icon_url(&self) -> String {
        if self.icon.starts_with("//") {
            format!("https:{}", self.icon)
        } else {
            self.icon.clone()
        }
    }
}

/// Resolved location for a weather response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub localtime: Option<String>,
}

/// Current conditions. Fields are passed through from the API unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentWeather {
    pub temp_c: f64,
    pub temp_f: f64,
    pub condition: Condition,
    pub humidity: u8,
    pub wind_kph: f64,
    pub feelslike_c: f64,
    pub feelslike_f: f64,
    #[serde(default)]
    pub pressure_mb: f64,
    #[serde(default)]
    pub vis_km: f64,
    #[serde(default)]
    pub cloud: u8,
    #[serde(default)]
    pub uv: f64,
}

impl CurrentWeather {
    pub fn temperature(&self, unit: TemperatureUnit) -> f64 {
        unit.select(self.temp_c, self.temp_f)
    }

    pub fn feels_like(&self, unit: TemperatureUnit) -> f64 {
        unit.select(self.feelslike_c, self.feelslike_f)
    }
}

/// Body of `/current.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentReport {
    pub location: Location,
    pub current: CurrentWeather,
}

/// Daily aggregate inside a forecast day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaySummary {
    pub avgtemp_c: f64,
    pub avgtemp_f: f64,
    pub condition: Condition,
}

impl DaySummary {
    pub fn average_temperature(&self, unit: TemperatureUnit) -> f64 {
        unit.select(self.avgtemp_c, self.avgtemp_f)
    }
}

/// Sunrise/sunset, kept as the API's local-time strings ("06:12 AM")
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Astro {
    pub sunrise: String,
    pub sunset: String,
}

/// Hourly forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyEntry {
    /// Local timestamp, "YYYY-MM-DD HH:MM"
    pub time: String,
    pub temp_c: f64,
    pub temp_f: f64,
}

impl HourlyEntry {
    /// The "HH:MM" part of `time`
    pub fn clock_time(&self) -> &str {
        self.time
            .split_once(' ')
            .map(|(_, clock)| clock)
            .unwrap_or(&self.time)
    }

    pub fn temperature(&self, unit: TemperatureUnit) -> f64 {
        unit.select(self.temp_c, self.temp_f)
    }
}

/// Daily forecast entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub day: DaySummary,
    pub astro: Astro,
    #[serde(default)]
    pub hour: Vec<HourlyEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastBundle {
    pub forecastday: Vec<ForecastDay>,
}

/// Body of `/forecast.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastReport {
    pub location: Location,
    pub current: CurrentWeather,
    pub forecast: ForecastBundle,
}

impl ForecastReport {
    pub fn days(&self) -> &[ForecastDay] {
        &self.forecast.forecastday
    }

    /// Hourly breakdown of the first forecast day (empty if there is none)
    pub fn first_day_hourly(&self) -> &[HourlyEntry] {
        self.forecast
            .forecastday
            .first()
            .map(|day| day.hour.as_slice())
            .unwrap_or(&[])
    }
}

/// One entry of `/search.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchSuggestion {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub country: String,
}

impl SearchSuggestion {
    /// "Name, Region, Country" with empty parts skipped
    pub fn label(&self) -> String {
        [&self.name, &self.region, &self.country]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_current_json() -> serde_json::Value {
        serde_json::json!({
            "location": {
                "name": "Paris",
                "region": "Ile-de-France",
                "country": "France",
                "localtime": "2024-05-01 14:00"
            },
            "current": {
                "temp_c": 18.0,
                "temp_f": 64.4,
                "condition": {"text": "Sunny", "icon": "//cdn.weatherapi.com/weather/64x64/day/113.png", "code": 1000},
                "humidity": 55,
                "wind_kph": 11.2,
                "feelslike_c": 17.5,
                "feelslike_f": 63.5,
                "pressure_mb": 1016.0,
                "vis_km": 10.0,
                "cloud": 0,
                "uv": 5.0,
                "gust_kph": 14.0
            }
        })
    }

    #[test]
    fn test_current_report_parses_and_ignores_extra_fields() {
        let report: CurrentReport = serde_json::from_value(sample_current_json()).unwrap();
        assert_eq!(report.location.name, "Paris");
        assert_eq!(report.current.humidity, 55);
        assert_eq!(report.current.condition.text, "Sunny");
    }

    #[test]
    fn test_current_report_missing_temperature_is_error() {
        let mut json = sample_current_json();
        json["current"]
            .as_object_mut()
            .unwrap()
            .remove("temp_c");
        assert!(serde_json::from_value::<CurrentReport>(json).is_err());
    }

    #[test]
    fn test_unit_selection() {
        let report: CurrentReport = serde_json::from_value(sample_current_json()).unwrap();
        assert_eq!(report.current.temperature(TemperatureUnit::Celsius), 18.0);
        assert_eq!(report.current.temperature(TemperatureUnit::Fahrenheit), 64.4);
        assert_eq!(report.current.feels_like(TemperatureUnit::Fahrenheit), 63.5);
    }

    #[test]
    fn test_unit_defaults_and_toggle() {
        assert_eq!(TemperatureUnit::default(), TemperatureUnit::Celsius);
        assert_eq!(TemperatureUnit::Celsius.toggled(), TemperatureUnit::Fahrenheit);
        assert_eq!(TemperatureUnit::Fahrenheit.symbol(), "°F");
    }

    #[test]
    fn test_icon_url_adds_scheme() {
        let condition = Condition {
            text: "Sunny".into(),
            icon: "//cdn.weatherapi.com/113.png".into(),
        };
        assert_eq!(condition.icon_url(), "https://cdn.weatherapi.com/113.png");
    }

    #[test]
    fn test_forecast_first_day_hourly() {
        let json = serde_json::json!({
            "location": {"name": "Delhi", "region": "Delhi", "country": "India"},
            "current": sample_current_json()["current"].clone(),
            "forecast": {
                "forecastday": [
                    {
                        "date": "2024-05-01",
                        "day": {"avgtemp_c": 30.0, "avgtemp_f": 86.0, "condition": {"text": "Hot", "icon": ""}},
                        "astro": {"sunrise": "05:40 AM", "sunset": "06:55 PM"},
                        "hour": [
                            {"time": "2024-05-01 00:00", "temp_c": 27.0, "temp_f": 80.6},
                            {"time": "2024-05-01 01:00", "temp_c": 26.5, "temp_f": 79.7}
                        ]
                    },
                    {
                        "date": "2024-05-02",
                        "day": {"avgtemp_c": 31.0, "avgtemp_f": 87.8, "condition": {"text": "Hot", "icon": ""}},
                        "astro": {"sunrise": "05:39 AM", "sunset": "06:56 PM"}
                    }
                ]
            }
        });

        let report: ForecastReport = serde_json::from_value(json).unwrap();
        assert_eq!(report.days().len(), 2);
        assert_eq!(report.first_day_hourly().len(), 2);
        assert_eq!(report.first_day_hourly()[1].clock_time(), "01:00");
        assert!(report.days()[1].hour.is_empty());
        assert_eq!(
            report.days()[0].day.average_temperature(TemperatureUnit::Fahrenheit),
            86.0
        );
    }

    #[test]
    fn test_suggestion_label_skips_empty_parts() {
        let s = SearchSuggestion {
            name: "London".into(),
            region: "City of London, Greater London".into(),
            country: "United Kingdom".into(),
        };
        assert_eq!(
            s.label(),
            "London, City of London, Greater London, United Kingdom"
        );

        let bare = SearchSuggestion {
            name: "Lonar".into(),
            region: String::new(),
            country: "India".into(),
        };
        assert_eq!(bare.label(), "Lonar, India");
    }
}
