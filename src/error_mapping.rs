//! Maps weather-layer errors to skywatch_core::AppError for user-facing messages.

use skywatch_core::{
    AppError, ConfigError, NetworkError, ReqwestErrorExt, StorageError,
    WeatherError as CoreWeatherError,
};
use skywatch_weather::WeatherError;

pub fn to_app_error(e: WeatherError) -> AppError {
    match e {
        WeatherError::Network(e) => AppError::Network(e.into_network_error()),
        WeatherError::Status { status, body } => {
            AppError::Weather(CoreWeatherError::from_status(status, &body))
        }
        WeatherError::Malformed(s) => AppError::Network(NetworkError::InvalidResponse(s)),
        WeatherError::Storage(s) => AppError::Storage(StorageError::WriteFailed(s)),
        WeatherError::InvalidSetting(s) => AppError::Config(ConfigError::Invalid(s)),
    }
}
