//! Turning user input into a [`Location`]: matching against the
//! reference city list, or asking a positioning source for the device's
//! coordinates.

use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;

use crate::{
    error::GeolocationError,
    model::{Coordinates, Location},
};

/// Queries shorter than this produce no suggestions.
pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_SUGGESTIONS: usize = 5;

const REFERENCE_CITIES: &[(&str, f64, f64)] = &[
    ("New York", 40.7128, -74.0060),
    ("London", 51.5074, -0.1278),
    ("Tokyo", 35.6762, 139.6503),
    ("Paris", 48.8566, 2.3522),
    ("Sydney", -33.8688, 151.2093),
    ("Mumbai", 19.0760, 72.8777),
    ("Beijing", 39.9042, 116.4074),
    ("Dubai", 25.2048, 55.2708),
    ("São Paulo", -23.5505, -46.6333),
    ("Cairo", 30.0444, 31.2357),
];

pub fn reference_cities() -> Vec<Location> {
    REFERENCE_CITIES
        .iter()
        .map(|(name, lat, lon)| Location::new(*lat, *lon, *name))
        .collect()
}

/// The first `count` reference cities, for quick picks.
pub fn popular_cities(count: usize) -> Vec<Location> {
    reference_cities().into_iter().take(count).collect()
}

pub fn default_location() -> Location {
    let (name, lat, lon) = REFERENCE_CITIES[0];
    Location::new(lat, lon, name)
}

/// Suggestions from the reference list for a free-text query.
pub fn suggest(query: &str) -> Vec<Location> {
    suggest_from(&reference_cities(), query)
}

/// Case-insensitive substring match, at most [`MAX_SUGGESTIONS`] results
/// in list order.
pub fn suggest_from(candidates: &[Location], query: &str) -> Vec<Location> {
    if query.chars().count() < MIN_QUERY_CHARS {
        return Vec::new();
    }
    let needle = query.to_lowercase();
    candidates
        .iter()
        .filter(|loc| loc.display_name.to_lowercase().contains(&needle))
        .take(MAX_SUGGESTIONS)
        .cloned()
        .collect()
}

/// Exact (case-insensitive) name lookup in the reference list.
pub fn find_city(name: &str) -> Option<Location> {
    reference_cities()
        .into_iter()
        .find(|loc| loc.display_name.eq_ignore_ascii_case(name.trim()))
}

/// Source of the device's current position.
#[async_trait]
pub trait Geolocator: Send + Sync + Debug {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError>;
}

/// Position taken from configuration. Reports `Unavailable` when unset.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredPosition {
    position: Option<Coordinates>,
}

impl ConfiguredPosition {
    pub fn new(position: Option<Coordinates>) -> Self {
        Self { position }
    }
}

#[async_trait]
impl Geolocator for ConfiguredPosition {
    async fn current_position(&self) -> Result<Coordinates, GeolocationError> {
        self.position.ok_or(GeolocationError::Unavailable)
    }
}

/// How a device position is named, since there is no reverse geocoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceLabel {
    /// `"lat, lon"` with two decimals.
    #[default]
    Coordinates,
    /// The fixed label "Current Location".
    CurrentLocation,
}

impl DeviceLabel {
    pub fn location_for(self, at: Coordinates) -> Location {
        match self {
            DeviceLabel::Coordinates => Location::from_coordinates(at.latitude, at.longitude),
            DeviceLabel::CurrentLocation => {
                Location::new(at.latitude, at.longitude, "Current Location")
            }
        }
    }
}

/// Ask `geolocator` for the device position, giving up after `timeout`.
pub async fn locate_device(
    geolocator: &dyn Geolocator,
    timeout: Duration,
    label: DeviceLabel,
) -> Result<Location, GeolocationError> {
    match tokio::time::timeout(timeout, geolocator.current_position()).await {
        Ok(Ok(at)) => Ok(label.location_for(at)),
        Ok(Err(err)) => Err(err),
        Err(_) => Err(GeolocationError::Timeout),
    }
}

/// The location currently driving the dashboard.
#[derive(Debug, Clone)]
pub struct LocationSelector {
    current: Location,
    label: DeviceLabel,
}

impl Default for LocationSelector {
    fn default() -> Self {
        Self::new(default_location())
    }
}

impl LocationSelector {
    pub fn new(initial: Location) -> Self {
        Self {
            current: initial,
            label: DeviceLabel::default(),
        }
    }

    pub fn with_label(mut self, label: DeviceLabel) -> Self {
        self.label = label;
        self
    }

    pub fn current(&self) -> &Location {
        &self.current
    }

    pub fn search(&self, query: &str) -> Vec<Location> {
        suggest(query)
    }

    pub fn select(&mut self, location: Location) -> &Location {
        tracing::debug!(location = %location.display_name, "location selected");
        self.current = location;
        &self.current
    }

    /// Switch to the device position. On failure the current location is
    /// kept and the failure is logged.
    pub async fn use_device_location(
        &mut self,
        geolocator: &dyn Geolocator,
        timeout: Duration,
    ) -> Result<&Location, GeolocationError> {
        match locate_device(geolocator, timeout, self.label).await {
            Ok(location) => Ok(self.select(location)),
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    "device location unavailable, keeping current location"
                );
                Err(err)
            }
        }
    }
}
