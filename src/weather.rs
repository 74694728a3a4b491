// 🌤️ Weather - forecast for the wedding day
//
// Open-Meteo daily forecast (no API key). Only ~16 days ahead are
// available, so an event further out simply has no forecast yet.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Days of forecast requested from the API (its maximum)
pub const FORECAST_DAYS: u32 = 16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyForecast {
    pub date: NaiveDate,
    pub temp_max_c: Option<f64>,
    pub temp_min_c: Option<f64>,
    /// Percent, 0-100
    pub precipitation_chance: Option<f64>,
    pub weather_code: Option<u8>,
    pub summary: String,
}

// Column-oriented payload: `daily.time[i]` pairs with `daily.<field>[i]`
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    daily: DailySeries,
}

#[derive(Debug, Deserialize)]
struct DailySeries {
    time: Vec<NaiveDate>,
    #[serde(default)]
    temperature_2m_max: Vec<Option<f64>>,
    #[serde(default)]
    temperature_2m_min: Vec<Option<f64>>,
    #[serde(default)]
    precipitation_probability_max: Vec<Option<f64>>,
    #[serde(default, alias = "weathercode")]
    weather_code: Vec<Option<u8>>,
}

/// Forecast request URL for one location
pub fn forecast_url(base_url: &str, latitude: f64, longitude: f64, timezone: &str) -> String {
    format!(
        "{}?latitude={}&longitude={}&daily=weather_code,temperature_2m_max,temperature_2m_min,precipitation_probability_max&timezone={}&forecast_days={}",
        base_url.trim_end_matches('/'),
        latitude,
        longitude,
        urlencoding::encode(timezone),
        FORECAST_DAYS
    )
}

/// Pick `date` out of a forecast response. `None` when the date is not covered.
pub fn parse_forecast(body: &str, date: NaiveDate) -> Result<Option<DailyForecast>> {
    let response: ForecastResponse =
        serde_json::from_str(body).context("Failed to parse forecast JSON")?;
    let daily = response.daily;

    let Some(idx) = daily.time.iter().position(|d| *d == date) else {
        return Ok(None);
    };

    let at = |series: &[Option<f64>]| series.get(idx).copied().flatten();
    let weather_code = daily.weather_code.get(idx).copied().flatten();

    Ok(Some(DailyForecast {
        date,
        temp_max_c: at(&daily.temperature_2m_max),
        temp_min_c: at(&daily.temperature_2m_min),
        precipitation_chance: at(&daily.precipitation_probability_max),
        weather_code,
        summary: weather_code
            .map(describe_weather_code)
            .unwrap_or("Unknown")
            .to_string(),
    }))
}

/// Short text for a WMO weather interpretation code
pub fn describe_weather_code(code: u8) -> &'static str {
    match code {
        0 => "Clear sky",
        1 => "Mainly clear",
        2 => "Partly cloudy",
        3 => "Overcast",
        45 | 48 => "Fog",
        51 | 53 | 55 => "Drizzle",
        56 | 57 => "Freezing drizzle",
        61 | 63 | 65 => "Rain",
        66 | 67 => "Freezing rain",
        71 | 73 | 75 | 77 => "Snow",
        80..=82 => "Rain showers",
        85 | 86 => "Snow showers",
        95 => "Thunderstorm",
        96 | 99 => "Thunderstorm with hail",
        _ => "Unknown",
    }
}

// ============================================================================
// HTTP CLIENT + CACHE (server only)
// ============================================================================

#[cfg(feature = "server")]
pub use client::{WeatherClient, WeatherReport};

#[cfg(feature = "server")]
mod client {
    use super::*;
    use crate::config::{EventConfig, WeatherConfig};
    use anyhow::anyhow;
    use chrono::{DateTime, Duration, Utc};
    use std::time::Duration as StdDuration;
    use tokio::sync::RwLock;
    use tracing::{debug, info, warn};

    /// After a failed fetch, upstream is left alone this long (seconds)
    const RETRY_BACKOFF_SECS: i64 = 60;

    /// What /api/weather returns
    #[derive(Debug, Clone, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct WeatherReport {
        pub event_date: NaiveDate,
        pub venue: String,
        pub available: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub forecast: Option<DailyForecast>,
        pub fetched_at: DateTime<Utc>,
    }

    #[derive(Default)]
    struct CacheState {
        report: Option<WeatherReport>,
        failed_at: Option<DateTime<Utc>>,
    }

    pub struct WeatherClient {
        http: reqwest::Client,
        url: String,
        event: EventConfig,
        ttl: Duration,
        cache: RwLock<CacheState>,
    }

    impl WeatherClient {
        pub fn new(weather: &WeatherConfig, event: &EventConfig) -> Result<Self> {
            let ttl = Duration::try_minutes(weather.cache_ttl_minutes)
                .filter(|ttl| *ttl > Duration::zero())
                .ok_or_else(|| {
                    anyhow!(
                        "weather cache TTL out of range: {} minutes",
                        weather.cache_ttl_minutes
                    )
                })?;

            let http = reqwest::Client::builder()
                .timeout(StdDuration::from_secs(weather.timeout_secs))
                .build()
                .context("Failed to build HTTP client")?;

            Ok(WeatherClient {
                http,
                url: forecast_url(&weather.base_url, event.latitude, event.longitude, &event.timezone),
                event: event.clone(),
                ttl,
                cache: RwLock::new(CacheState::default()),
            })
        }

        /// Cached report, refetched once older than the TTL
        pub async fn report(&self) -> Result<WeatherReport> {
            self.report_at(Utc::now()).await
        }

        /// Same as `report`, with the clock passed in
        pub async fn report_at(&self, now: DateTime<Utc>) -> Result<WeatherReport> {
            if let Some(cached) = self.fresh(&*self.cache.read().await, now) {
                debug!("weather cache hit");
                return Ok(cached);
            }

            // One refresh at a time; waiters see its result on the re-check
            let mut state = self.cache.write().await;
            if let Some(cached) = self.fresh(&state, now) {
                debug!("weather cache filled while waiting");
                return Ok(cached);
            }

            if let Some(failed_at) = state.failed_at {
                if now - failed_at < Duration::seconds(RETRY_BACKOFF_SECS) {
                    return match &state.report {
                        Some(stale) => Ok(stale.clone()),
                        None => Err(anyhow!("forecast service failed recently; retrying later")),
                    };
                }
            }

            match self.fetch(now).await {
                Ok(report) => {
                    state.report = Some(report.clone());
                    state.failed_at = None;
                    Ok(report)
                }
                Err(e) => {
                    state.failed_at = Some(now);
                    match &state.report {
                        Some(stale) => {
                            warn!(error = %format!("{:#}", e), "forecast refresh failed; serving stale report");
                            Ok(stale.clone())
                        }
                        None => Err(e),
                    }
                }
            }
        }

        fn fresh(&self, state: &CacheState, now: DateTime<Utc>) -> Option<WeatherReport> {
            state
                .report
                .as_ref()
                .filter(|cached| now - cached.fetched_at < self.ttl)
                .cloned()
        }

        async fn fetch(&self, now: DateTime<Utc>) -> Result<WeatherReport> {
            info!(url = %self.url, "fetching forecast");

            let body = self
                .http
                .get(&self.url)
                .send()
                .await
                .context("Forecast request failed")?
                .error_for_status()
                .context("Forecast service returned an error")?
                .text()
                .await
                .context("Failed to read forecast body")?;

            let forecast = parse_forecast(&body, self.event.date)?;

            Ok(WeatherReport {
                event_date: self.event.date,
                venue: self.event.venue.clone(),
                available: forecast.is_some(),
                forecast,
                fetched_at: now,
            })
        }
    }

}
