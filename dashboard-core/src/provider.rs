use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use crate::{
    error::RequestError,
    model::{CurrentConditions, Forecast, HistoricalSample, Location},
};

pub mod openweather;

pub use openweather::OpenWeatherSource;

/// Upstream weather data for a location.
///
/// One method per endpoint; each call is independent so the fetcher can
/// run them concurrently and judge their failures separately.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn current(&self, location: &Location) -> Result<CurrentConditions, RequestError>;

    async fn forecast(&self, location: &Location) -> Result<Forecast, RequestError>;

    /// Archive averages for the calendar day containing `at`.
    async fn historical(
        &self,
        location: &Location,
        at: DateTime<Utc>,
    ) -> Result<HistoricalSample, RequestError>;
}
