//! Core library for the weather dashboard.
//!
//! This crate defines:
//! - Configuration & API key handling
//! - Location resolution (reference cities, device position)
//! - The OpenWeatherMap source behind the `WeatherSource` abstraction
//! - The fetch cycle with partial-failure handling and supersession
//! - Daily and historical aggregation of fetched data
//!
//! It is used by `dashboard-cli`, but any other front end can drive
//! `WeatherFetcher` and observe its published `DashboardState`.

pub mod aggregate;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod location;
pub mod model;
pub mod provider;

pub use aggregate::{DailyAggregate, condition_distribution, group_by_day, hourly_detail};
pub use config::{ClientConfig, Config};
pub use error::{FetchError, GeolocationError, RequestError};
pub use fetcher::WeatherFetcher;
pub use location::{DeviceLabel, Geolocator, LocationSelector};
pub use model::{
    Condition, Coordinates, CurrentConditions, DashboardState, FetchState, Forecast,
    ForecastEntry, HistoricalSample, HourlyPoint, Location, WeatherBundle,
};
pub use provider::{OpenWeatherSource, WeatherSource};
