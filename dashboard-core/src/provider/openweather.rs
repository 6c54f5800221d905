use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    aggregate::summarize_history,
    config::ClientConfig,
    error::{FetchError, RequestError},
    model::{
        Condition, CurrentConditions, Forecast, ForecastEntry, HistoricalSample, HourlyPoint,
        Location, fixed_offset,
    },
};

use super::WeatherSource;

/// OpenWeatherMap client for the `/weather`, `/forecast` and
/// `/onecall/timemachine` endpoints, always in metric units.
#[derive(Debug, Clone)]
pub struct OpenWeatherSource {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherSource {
    /// Fails on a blank API key, before any request can be made.
    pub fn new(config: ClientConfig) -> Result<Self, FetchError> {
        if config.api_key.trim().is_empty() {
            return Err(FetchError::missing_api_key());
        }

        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| FetchError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_key: config.api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        location: &Location,
        extra: &[(&str, String)],
    ) -> Result<T, RequestError> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(%url, lat = location.latitude, lon = location.longitude, "requesting");

        let mut query = vec![
            ("lat", location.latitude.to_string()),
            ("lon", location.longitude.to_string()),
        ];
        query.extend(extra.iter().cloned());
        query.push(("appid", self.api_key.clone()));
        query.push(("units", "metric".to_string()));

        let res = self.http.get(&url).query(&query).send().await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            tracing::debug!(%url, %status, body = %truncate_body(&body), "request failed");
            let message = serde_json::from_str::<OwError>(&body)
                .ok()
                .and_then(|payload| payload.message);
            return Err(RequestError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

#[derive(Debug, Deserialize)]
struct OwError {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    temp_min: f64,
    temp_max: f64,
    humidity: u8,
    #[serde(default)]
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: u32,
    main: String,
    description: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
}

#[derive(Debug, Default, Deserialize)]
struct OwClouds {
    all: u8,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    #[serde(default)]
    clouds: OwClouds,
    visibility: Option<u32>,
    sys: OwSys,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwCity {
    #[serde(default)]
    name: String,
    #[serde(default)]
    timezone: i32,
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    #[serde(default)]
    pop: f64,
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    city: OwCity,
    list: Vec<OwForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct OwHourly {
    dt: i64,
    temp: f64,
    humidity: u8,
    wind_speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwTimemachineResponse {
    #[serde(default)]
    timezone_offset: i32,
    #[serde(default)]
    data: Vec<OwHourly>,
}

fn first_condition(weather: Vec<OwWeather>) -> Condition {
    weather
        .into_iter()
        .next()
        .map(|w| Condition {
            id: w.id,
            main: w.main,
            description: w.description,
            icon: w.icon,
        })
        .unwrap_or_else(Condition::unknown)
}

impl TryFrom<OwCurrentResponse> for CurrentConditions {
    type Error = RequestError;

    fn try_from(raw: OwCurrentResponse) -> Result<Self, Self::Error> {
        Ok(CurrentConditions {
            place: raw.name,
            observed_at: unix_to_utc(raw.dt)?,
            temperature: raw.main.temp,
            feels_like: raw.main.feels_like,
            temp_min: raw.main.temp_min,
            temp_max: raw.main.temp_max,
            humidity: raw.main.humidity,
            pressure: raw.main.pressure,
            wind_speed: raw.wind.speed,
            cloud_cover: raw.clouds.all,
            visibility: raw.visibility,
            sunrise: unix_to_utc(raw.sys.sunrise)?,
            sunset: unix_to_utc(raw.sys.sunset)?,
            condition: first_condition(raw.weather),
            timezone_offset: raw.timezone,
        })
    }
}

impl TryFrom<OwForecastEntry> for ForecastEntry {
    type Error = RequestError;

    fn try_from(raw: OwForecastEntry) -> Result<Self, Self::Error> {
        Ok(ForecastEntry {
            at: unix_to_utc(raw.dt)?,
            temperature: raw.main.temp,
            feels_like: raw.main.feels_like,
            temp_min: raw.main.temp_min,
            temp_max: raw.main.temp_max,
            humidity: raw.main.humidity,
            wind_speed: raw.wind.speed,
            precipitation_chance: raw.pop,
            condition: first_condition(raw.weather),
        })
    }
}

#[async_trait]
impl WeatherSource for OpenWeatherSource {
    async fn current(&self, location: &Location) -> Result<CurrentConditions, RequestError> {
        let raw: OwCurrentResponse = self.get_json("/weather", location, &[]).await?;
        raw.try_into()
    }

    async fn forecast(&self, location: &Location) -> Result<Forecast, RequestError> {
        let raw: OwForecastResponse = self.get_json("/forecast", location, &[]).await?;

        let entries = raw
            .list
            .into_iter()
            .map(ForecastEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Forecast {
            city: raw.city.name,
            timezone_offset: raw.city.timezone,
            entries,
        })
    }

    async fn historical(
        &self,
        location: &Location,
        at: DateTime<Utc>,
    ) -> Result<HistoricalSample, RequestError> {
        let raw: OwTimemachineResponse = self
            .get_json(
                "/onecall/timemachine",
                location,
                &[("dt", at.timestamp().to_string())],
            )
            .await?;

        let points = raw
            .data
            .into_iter()
            .map(|h| -> Result<HourlyPoint, RequestError> {
                Ok(HourlyPoint {
                    at: unix_to_utc(h.dt)?,
                    temperature: h.temp,
                    humidity: h.humidity,
                    wind_speed: h.wind_speed,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let date = at.with_timezone(&fixed_offset(raw.timezone_offset)).date_naive();
        summarize_history(date, &points).ok_or(RequestError::NoData)
    }
}

fn unix_to_utc(ts: i64) -> Result<DateTime<Utc>, RequestError> {
    DateTime::from_timestamp(ts, 0).ok_or(RequestError::InvalidTimestamp(ts))
}

fn truncate_body(body: &str) -> &str {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => &body[..cut],
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_key_is_rejected_before_any_request() {
        let err = OpenWeatherSource::new(ClientConfig::new("  ")).unwrap_err();
        assert!(matches!(err, FetchError::Configuration(_)));
    }

    #[test]
    fn trailing_slash_is_dropped_from_base_url() {
        let source =
            OpenWeatherSource::new(ClientConfig::new("KEY").with_base_url("http://localhost:1/"))
                .expect("client builds");
        assert_eq!(source.base_url, "http://localhost:1");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let body = "é".repeat(300);
        assert_eq!(truncate_body(&body).chars().count(), 200);
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn missing_weather_array_maps_to_unknown_condition() {
        assert_eq!(first_condition(Vec::new()), Condition::unknown());
    }
}
