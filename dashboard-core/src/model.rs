use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregate::{self, DailyAggregate};
use crate::error::FetchError;

/// A place the dashboard shows weather for.
///
/// Replaced wholesale whenever the user picks a new place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub display_name: String,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64, display_name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            display_name: display_name.into(),
        }
    }

    /// Location named after its own coordinates, e.g. `"51.51, -0.13"`.
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, format!("{latitude:.2}, {longitude:.2}"))
    }
}

/// Raw latitude/longitude pair, as reported by a positioning source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Weather condition as classified by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub id: u32,
    /// Condition group, e.g. "Rain" or "Clear". Used as the grouping key.
    pub main: String,
    pub description: String,
    pub icon: String,
}

impl Condition {
    pub fn unknown() -> Self {
        Self {
            id: 0,
            main: "Unknown".to_string(),
            description: "unknown".to_string(),
            icon: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Place name reported by the provider.
    pub place: String,
    pub observed_at: DateTime<Utc>,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u8,
    pub pressure: u32,
    pub wind_speed: f64,
    pub cloud_cover: u8,
    /// Metres. The provider omits it for some stations.
    pub visibility: Option<u32>,
    pub sunrise: DateTime<Utc>,
    pub sunset: DateTime<Utc>,
    pub condition: Condition,
    /// Shift from UTC in seconds at the location.
    pub timezone_offset: i32,
}

impl CurrentConditions {
    pub fn offset(&self) -> FixedOffset {
        fixed_offset(self.timezone_offset)
    }
}

/// One 3-hour forecast sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub at: DateTime<Utc>,
    pub temperature: f64,
    pub feels_like: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    /// Probability of precipitation, 0.0 to 1.0.
    pub precipitation_chance: f64,
    pub condition: Condition,
}

/// The raw forecast: entries in the order the provider sent them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub city: String,
    pub timezone_offset: i32,
    pub entries: Vec<ForecastEntry>,
}

impl Forecast {
    pub fn offset(&self) -> FixedOffset {
        fixed_offset(self.timezone_offset)
    }

    /// Entries grouped into location-local calendar days.
    pub fn daily(&self) -> Vec<DailyAggregate> {
        aggregate::group_by_day(&self.entries, self.offset())
    }
}

/// One hourly point from the archive endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyPoint {
    pub at: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: u8,
    pub wind_speed: f64,
}

/// Averages over one past day of archive data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSample {
    pub date: NaiveDate,
    pub temperature: f64,
    pub humidity: u8,
    pub wind_speed: f64,
    pub samples: usize,
}

/// Everything fetched for one location.
///
/// `current` is mandatory: a bundle only exists once current conditions
/// arrived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherBundle {
    pub current: CurrentConditions,
    pub forecast: Option<Forecast>,
    pub historical: Option<Vec<HistoricalSample>>,
}

impl WeatherBundle {
    pub fn new(current: CurrentConditions, forecast: Option<Forecast>) -> Self {
        Self {
            current,
            forecast,
            historical: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchState {
    #[default]
    Idle,
    Loading,
    Ready { bundle: WeatherBundle },
    PartialFailure { bundle: WeatherBundle, warning: FetchError },
    Failed { error: FetchError },
}

impl FetchState {
    pub fn bundle(&self) -> Option<&WeatherBundle> {
        match self {
            FetchState::Ready { bundle } | FetchState::PartialFailure { bundle, .. } => {
                Some(bundle)
            }
            _ => None,
        }
    }

    pub fn bundle_mut(&mut self) -> Option<&mut WeatherBundle> {
        match self {
            FetchState::Ready { bundle } | FetchState::PartialFailure { bundle, .. } => {
                Some(bundle)
            }
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&FetchError> {
        match self {
            FetchState::Failed { error } => Some(error),
            FetchState::PartialFailure { warning, .. } => Some(warning),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        !matches!(self, FetchState::Idle | FetchState::Loading)
    }
}

/// What the presentation layer observes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardState {
    /// Id of the fetch cycle that produced `fetch`; 0 before the first one.
    pub request_id: u64,
    pub location: Option<Location>,
    pub fetch: FetchState,
}

pub(crate) fn fixed_offset(seconds: i32) -> FixedOffset {
    FixedOffset::east_opt(seconds).unwrap_or_else(|| Utc.fix())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_name_uses_two_decimals() {
        let loc = Location::from_coordinates(51.50735, -0.12776);
        assert_eq!(loc.display_name, "51.51, -0.13");
    }

    #[test]
    fn out_of_range_offset_falls_back_to_utc() {
        assert_eq!(fixed_offset(3600).local_minus_utc(), 3600);
        assert_eq!(fixed_offset(i32::MAX).local_minus_utc(), 0);
    }

    #[test]
    fn only_settled_bundles_are_exposed() {
        assert!(FetchState::Loading.bundle().is_none());
        assert!(!FetchState::Loading.is_settled());

        let failed = FetchState::Failed {
            error: FetchError::Mandatory("boom".into()),
        };
        assert!(failed.bundle().is_none());
        assert!(failed.is_settled());
        assert!(failed.error().is_some());
    }
}
