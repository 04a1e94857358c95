//! WeatherAPI HTTP client.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::error::WeatherError;
use crate::types::{CurrentReport, ForecastReport, SearchSuggestion};

const USER_AGENT: &str = concat!("Skywatch/", env!("CARGO_PKG_VERSION"));

/// Source of weather data. `WeatherClient` is the HTTP implementation;
/// anything that can answer the three queries can drive the dashboard.
pub trait WeatherSource: Send + Sync + 'static {
    /// Current conditions for a city query
    fn current(
        &self,
        city: &str,
    ) -> impl Future<Output = Result<CurrentReport, WeatherError>> + Send;

    /// Current conditions plus a `days`-long forecast
    fn forecast(
        &self,
        city: &str,
        days: u32,
    ) -> impl Future<Output = Result<ForecastReport, WeatherError>> + Send;

    /// Location suggestions for partial input
    fn search(
        &self,
        query: &str,
    ) -> impl Future<Output = Result<Vec<SearchSuggestion>, WeatherError>> + Send;
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

impl WeatherClient {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, WeatherError> {
        let url = format!("{}/{}", self.base_url, endpoint);

        let response = self
            .client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::debug!("{} returned status {}", endpoint, status);
            return Err(WeatherError::from_status(status, &text));
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| WeatherError::Malformed(format!("{}: {}", endpoint, e)))
    }
}

impl WeatherSource for WeatherClient {
    #[instrument(skip(self), level = "debug")]
    async fn current(&self, city: &str) -> Result<CurrentReport, WeatherError> {
        self.get_json("current.json", &[("q", city.to_string())])
            .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn forecast(&self, city: &str, days: u32) -> Result<ForecastReport, WeatherError> {
        self.get_json(
            "forecast.json",
            &[
                ("q", city.to_string()),
                ("days", days.to_string()),
                ("aqi", "no".to_string()),
                ("alerts", "no".to_string()),
            ],
        )
        .await
    }

    #[instrument(skip(self), level = "debug")]
    async fn search(&self, query: &str) -> Result<Vec<SearchSuggestion>, WeatherError> {
        self.get_json("search.json", &[("q", query.to_string())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn current_body(name: &str, temp_c: f64) -> serde_json::Value {
        serde_json::json!({
            "location": {"name": name, "region": "", "country": "India"},
            "current": {
                "temp_c": temp_c,
                "temp_f": temp_c * 9.0 / 5.0 + 32.0,
                "condition": {"text": "Haze", "icon": "//cdn/143.png"},
                "humidity": 40,
                "wind_kph": 9.0,
                "feelslike_c": temp_c,
                "feelslike_f": temp_c * 9.0 / 5.0 + 32.0
            }
        })
    }

    fn client(server: &MockServer) -> WeatherClient {
        WeatherClient::new(&server.uri(), "test_key", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_current_sends_key_and_query() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current.json"))
            .and(query_param("key", "test_key"))
            .and(query_param("q", "Delhi"))
            .respond_with(ResponseTemplate::new(200).set_body_json(current_body("Delhi", 31.0)))
            .expect(1)
            .mount(&mock_server)
            .await;

        let report = client(&mock_server).current("Delhi").await.unwrap();

        assert_eq!(report.location.name, "Delhi");
        assert_eq!(report.current.temp_c, 31.0);
    }

    #[tokio::test]
    async fn test_forecast_query_parameters() {
        let mock_server = MockServer::start().await;
        let mut body = current_body("Pune", 25.0);
        body["forecast"] = serde_json::json!({"forecastday": []});

        Mock::given(method("GET"))
            .and(path("/forecast.json"))
            .and(query_param("q", "Pune"))
            .and(query_param("days", "7"))
            .and(query_param("aqi", "no"))
            .and(query_param("alerts", "no"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(&mock_server)
            .await;

        let report = client(&mock_server).forecast("Pune", 7).await.unwrap();

        assert!(report.days().is_empty());
        assert_eq!(report.location.name, "Pune");
    }

    #[tokio::test]
    async fn test_search_results() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/search.json"))
            .and(query_param("q", "Lon"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": 1, "name": "London", "region": "City of London, Greater London", "country": "United Kingdom"},
                {"id": 2, "name": "Londrina", "region": "Parana", "country": "Brazil"}
            ])))
            .mount(&mock_server)
            .await;

        let results = client(&mock_server).search("Lon").await.unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[1].country, "Brazil");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current.json"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {"code": 1006, "message": "No matching location found."}
            })))
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).current("Atlantis").await;

        match result {
            Err(err @ WeatherError::Status { status: 400, .. }) => {
                assert!(err.is_fetch_failure());
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_body_is_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"location": {}})),
            )
            .mount(&mock_server)
            .await;

        let result = client(&mock_server).current("Delhi").await;

        assert!(matches!(result, Err(WeatherError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_timeout_is_network_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/current.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(current_body("Delhi", 30.0))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let client =
            WeatherClient::new(&mock_server.uri(), "k", Duration::from_millis(50)).unwrap();
        let result = client.current("Delhi").await;

        match result {
            Err(WeatherError::Network(e)) => assert!(e.is_timeout()),
            other => panic!("expected timeout, got {other:?}"),
        }
    }
}
