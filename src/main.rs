mod error_mapping;
mod settings;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use skywatch_core::Config;
use skywatch_weather::{Dashboard, LocalStorage, StateChange, WeatherClient};
use tokio::sync::broadcast::error::RecvError;

use crate::error_mapping::to_app_error;
use crate::settings::dashboard_settings;

fn log_change(dashboard: &Dashboard<WeatherClient>, change: &StateChange) {
    match change {
        StateChange::CityUpdated { city } => {
            let temperature = dashboard.display_temperature(city).unwrap_or_else(|| "--".into());
            let label = dashboard
                .staleness_label(city, Utc::now())
                .unwrap_or_default();
            tracing::info!("{}: {} ({})", city, temperature, label);
        }
        StateChange::CityFailed { city, failure } => {
            tracing::warn!("{}: refresh failed: {}", city, failure.message);
        }
        StateChange::SweepFinished { updated, failed } => {
            tracing::info!(
                "Sweep done: {} updated, {} failed. {}",
                updated,
                failed,
                dashboard
                    .overall_staleness_label(Utc::now())
                    .unwrap_or_else(|| "Never updated".into())
            );
        }
        other => tracing::debug!("State change: {:?}", other),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    skywatch_core::init()?;

    let (config, _validation) = Config::load_validated()?;

    let client = WeatherClient::new(
        &config.weather.api_url,
        &config.weather.api_key,
        Duration::from_secs(config.weather.timeout_secs),
    )
    .map_err(to_app_error)
    .context("Failed to create weather client")?;

    let dashboard = Dashboard::new(
        Arc::new(client),
        LocalStorage::new(config.storage.data_dir.clone()),
        dashboard_settings(&config),
    );

    tracing::info!(
        "Skywatch started: {} favorites, {} top cities, refresh every {}s",
        dashboard.favorites().len(),
        dashboard.top_cities().len(),
        dashboard.refresh_interval().as_secs()
    );

    // Any command-line arguments are cities to show in detail
    for city in std::env::args().skip(1) {
        match dashboard.load_city_details(&city).await {
            Ok(()) => {
                if let Some(forecast) = dashboard.city(&city).and_then(|r| r.forecast) {
                    let unit = dashboard.unit();
                    for day in forecast.days() {
                        println!(
                            "{} {}: {:.0}{} {}",
                            city,
                            day.date,
                            day.day.average_temperature(unit),
                            unit.symbol(),
                            day.day.condition.text
                        );
                    }
                }
            }
            Err(e) => {
                let err = to_app_error(e);
                tracing::debug!("Detail load for {} failed: {}", city, err);
                eprintln!("{}: {}", city, err.user_message());
            }
        }
    }

    let mut events = dashboard.subscribe();
    let view = dashboard.activate();

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            result = &mut shutdown => {
                result.context("Failed to listen for Ctrl-C")?;
                break;
            }
            event = events.recv() => match event {
                Ok(change) => log_change(&dashboard, &change),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("Skipped {} dashboard updates", missed);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    view.deactivate();
    tracing::info!("Skywatch shutting down");

    Ok(())
}
