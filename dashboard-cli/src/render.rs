//! Plain-text rendering of a dashboard snapshot.

use std::fmt;

use dashboard_core::{
    CurrentConditions, DashboardState, FetchState, Forecast, HistoricalSample,
    condition_distribution, hourly_detail,
};

/// Text view of one snapshot with a selected forecast day.
pub struct DashboardView<'a> {
    state: &'a DashboardState,
    selected_day: usize,
}

impl<'a> DashboardView<'a> {
    pub fn new(state: &'a DashboardState, selected_day: usize) -> Self {
        Self {
            state,
            selected_day,
        }
    }
}

fn whole(value: f64) -> i64 {
    value.round() as i64
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl fmt::Display for DashboardView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bundle = match &self.state.fetch {
            FetchState::Idle => return Ok(()),
            FetchState::Loading => return writeln!(f, "Loading weather data..."),
            FetchState::Failed { error } => return writeln!(f, "{error}"),
            FetchState::Ready { bundle } => bundle,
            FetchState::PartialFailure { bundle, warning } => {
                writeln!(f, "Warning: {warning}")?;
                writeln!(f)?;
                bundle
            }
        };

        let name = self
            .state
            .location
            .as_ref()
            .map(|l| l.display_name.as_str())
            .unwrap_or(bundle.current.place.as_str());
        write_current(f, name, &bundle.current)?;

        if let Some(forecast) = &bundle.forecast {
            writeln!(f)?;
            write_forecast(f, forecast, self.selected_day)?;
        }

        if let Some(history) = &bundle.historical {
            writeln!(f)?;
            write_history(f, history)?;
        }

        Ok(())
    }
}

fn write_current(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    current: &CurrentConditions,
) -> fmt::Result {
    let offset = current.offset();
    writeln!(f, "{name}")?;
    writeln!(
        f,
        "  {}, {}°C (feels like {}°C)  H: {}°  L: {}°",
        capitalize(&current.condition.description),
        whole(current.temperature),
        whole(current.feels_like),
        whole(current.temp_max),
        whole(current.temp_min),
    )?;
    writeln!(
        f,
        "  Humidity {}%  Pressure {} hPa  Wind {} m/s  Clouds {}%",
        current.humidity,
        current.pressure,
        whole(current.wind_speed),
        current.cloud_cover,
    )?;
    if let Some(visibility) = current.visibility {
        writeln!(f, "  Visibility {:.1} km", f64::from(visibility) / 1000.0)?;
    }
    writeln!(
        f,
        "  Sunrise {}  Sunset {}",
        current.sunrise.with_timezone(&offset).format("%H:%M"),
        current.sunset.with_timezone(&offset).format("%H:%M"),
    )
}

fn write_forecast(f: &mut fmt::Formatter<'_>, forecast: &Forecast, selected: usize) -> fmt::Result {
    let days = forecast.daily();
    let offset = forecast.offset();

    writeln!(f, "Forecast")?;
    for (index, day) in days.iter().enumerate() {
        let marker = if index == selected { '>' } else { ' ' };
        writeln!(
            f,
            "{marker} {:<10} {:<14} {:>4}° / {:>4}°  humidity {:>3}%  wind {} m/s",
            day.date.format("%a %d %b").to_string(),
            day.condition,
            whole(day.temp_max),
            whole(day.temp_min),
            day.humidity,
            whole(day.wind_speed),
        )?;
    }

    let distribution = condition_distribution(&forecast.entries)
        .into_iter()
        .map(|(main, count)| format!("{main} {count}"))
        .collect::<Vec<_>>()
        .join(", ");
    if !distribution.is_empty() {
        writeln!(f, "  Conditions: {distribution}")?;
    }

    // A stale selection simply shows no hourly section.
    if let (Some(entries), Some(day)) = (hourly_detail(&days, selected), days.get(selected)) {
        writeln!(f)?;
        writeln!(f, "Hourly forecast for {}", day.weekday)?;
        for entry in entries {
            writeln!(
                f,
                "  {}  {:>4}°  {:<16} humidity {:>3}%  wind {} m/s  rain {:>3.0}%",
                entry.at.with_timezone(&offset).format("%H:%M"),
                whole(entry.temperature),
                capitalize(&entry.condition.description),
                entry.humidity,
                whole(entry.wind_speed),
                entry.precipitation_chance * 100.0,
            )?;
        }
    }

    Ok(())
}

fn write_history(f: &mut fmt::Formatter<'_>, history: &[HistoricalSample]) -> fmt::Result {
    writeln!(f, "Past days")?;
    for sample in history {
        writeln!(
            f,
            "  {:<10} {:>4}°  humidity {:>3}%  wind {} m/s",
            sample.date.format("%a %d %b").to_string(),
            whole(sample.temperature),
            sample.humidity,
            whole(sample.wind_speed),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dashboard_core::{Condition, FetchError, ForecastEntry, Location, WeatherBundle};

    fn condition(main: &str, description: &str) -> Condition {
        Condition {
            id: 800,
            main: main.into(),
            description: description.into(),
            icon: "01d".into(),
        }
    }

    fn bundle() -> WeatherBundle {
        let at = |h| Utc.with_ymd_and_hms(2024, 3, 4, h, 0, 0).unwrap();
        let current = CurrentConditions {
            place: "London".into(),
            observed_at: at(12),
            temperature: 11.4,
            feels_like: 9.6,
            temp_min: 9.8,
            temp_max: 12.4,
            humidity: 71,
            pressure: 1009,
            wind_speed: 5.1,
            cloud_cover: 75,
            visibility: Some(10_000),
            sunrise: at(6),
            sunset: at(18),
            condition: condition("Rain", "light rain"),
            timezone_offset: 0,
        };
        let entry = ForecastEntry {
            at: at(15),
            temperature: 12.0,
            feels_like: 11.0,
            temp_min: 10.0,
            temp_max: 14.0,
            humidity: 60,
            wind_speed: 3.0,
            precipitation_chance: 0.4,
            condition: condition("Rain", "light rain"),
        };
        WeatherBundle::new(
            current,
            Some(Forecast {
                city: "London".into(),
                timezone_offset: 0,
                entries: vec![entry],
            }),
        )
    }

    fn state(fetch: FetchState) -> DashboardState {
        DashboardState {
            request_id: 1,
            location: Some(Location::new(51.5, -0.12, "London")),
            fetch,
        }
    }

    #[test]
    fn ready_state_shows_current_and_hourly_detail() {
        let state = state(FetchState::Ready { bundle: bundle() });
        let text = DashboardView::new(&state, 0).to_string();

        assert!(text.starts_with("London\n"));
        assert!(text.contains("Light rain, 11°C (feels like 10°C)"));
        assert!(text.contains("Hourly forecast for Monday"));
        assert!(text.contains("Conditions: Rain 1"));
    }

    #[test]
    fn stale_day_selection_skips_hourly_detail() {
        let state = state(FetchState::Ready { bundle: bundle() });
        let text = DashboardView::new(&state, 7).to_string();

        assert!(text.contains("Forecast"));
        assert!(!text.contains("Hourly forecast"));
    }

    #[test]
    fn partial_failure_shows_warning_and_current_only() {
        let mut partial = bundle();
        partial.forecast = None;
        let state = state(FetchState::PartialFailure {
            bundle: partial,
            warning: FetchError::Degraded("Internal error".into()),
        });
        let text = DashboardView::new(&state, 0).to_string();

        assert!(text.starts_with("Warning: Failed to fetch forecast: Internal error"));
        assert!(text.contains("Humidity 71%"));
        assert!(!text.contains("Forecast\n"));
    }
}
