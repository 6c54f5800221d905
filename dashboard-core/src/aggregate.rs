//! Derived views over fetched data: per-day forecast summaries, the
//! condition distribution, and per-day archive averages.
//!
//! Everything here is recomputed from the raw entries and never mutated
//! in place.

use std::collections::HashMap;

use chrono::{FixedOffset, NaiveDate};
use serde::Serialize;

use crate::model::{ForecastEntry, HistoricalSample, HourlyPoint};

/// Summary of all forecast entries that fall on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyAggregate {
    pub date: NaiveDate,
    /// Weekday name, e.g. "Monday".
    pub weekday: String,
    /// Lowest of the entries' reported minimums.
    pub temp_min: f64,
    /// Highest of the entries' reported maximums.
    pub temp_max: f64,
    /// Mean humidity, rounded.
    pub humidity: u8,
    /// Mean wind speed, rounded.
    pub wind_speed: f64,
    /// Most frequent condition group; ties go to the first one seen.
    pub condition: String,
    pub entries: Vec<ForecastEntry>,
}

/// Group forecast entries by location-local calendar day.
///
/// Days come out in first-seen order, which is chronological for
/// provider data.
pub fn group_by_day(entries: &[ForecastEntry], offset: FixedOffset) -> Vec<DailyAggregate> {
    let mut index: HashMap<NaiveDate, usize> = HashMap::new();
    let mut days: Vec<(NaiveDate, Vec<ForecastEntry>)> = Vec::new();

    for entry in entries {
        let date = entry.at.with_timezone(&offset).date_naive();
        let slot = *index.entry(date).or_insert_with(|| {
            days.push((date, Vec::new()));
            days.len() - 1
        });
        days[slot].1.push(entry.clone());
    }

    days.into_iter()
        .filter_map(|(date, entries)| summarize_day(date, entries))
        .collect()
}

fn summarize_day(date: NaiveDate, entries: Vec<ForecastEntry>) -> Option<DailyAggregate> {
    let condition = most_frequent(&condition_distribution(&entries))?;
    let count = entries.len() as f64;

    let temp_min = entries.iter().map(|e| e.temp_min).fold(f64::INFINITY, f64::min);
    let temp_max = entries
        .iter()
        .map(|e| e.temp_max)
        .fold(f64::NEG_INFINITY, f64::max);
    let humidity = entries.iter().map(|e| f64::from(e.humidity)).sum::<f64>() / count;
    let wind_speed = entries.iter().map(|e| e.wind_speed).sum::<f64>() / count;

    Some(DailyAggregate {
        date,
        weekday: date.format("%A").to_string(),
        temp_min,
        temp_max,
        humidity: humidity.round().clamp(0.0, 100.0) as u8,
        wind_speed: wind_speed.round(),
        condition,
        entries,
    })
}

/// How often each condition group occurs, in first-seen order.
pub fn condition_distribution(entries: &[ForecastEntry]) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = Vec::new();
    for entry in entries {
        match counts.iter_mut().find(|(main, _)| *main == entry.condition.main) {
            Some((_, count)) => *count += 1,
            None => counts.push((entry.condition.main.clone(), 1)),
        }
    }
    counts
}

fn most_frequent(counts: &[(String, usize)]) -> Option<String> {
    let mut best: Option<&(String, usize)> = None;
    for candidate in counts {
        match best {
            Some((_, top)) if *top >= candidate.1 => {}
            _ => best = Some(candidate),
        }
    }
    best.map(|(main, _)| main.clone())
}

/// Entries of the selected day, or `None` when the selection no longer
/// exists (for example after a refresh returned fewer days).
pub fn hourly_detail(days: &[DailyAggregate], selected: usize) -> Option<&[ForecastEntry]> {
    days.get(selected).map(|day| day.entries.as_slice())
}

/// Average one day of archive points. `None` for an empty day.
pub fn summarize_history(date: NaiveDate, points: &[HourlyPoint]) -> Option<HistoricalSample> {
    if points.is_empty() {
        return None;
    }
    let count = points.len() as f64;
    let temperature = points.iter().map(|p| p.temperature).sum::<f64>() / count;
    let humidity = points.iter().map(|p| f64::from(p.humidity)).sum::<f64>() / count;
    let wind_speed = points.iter().map(|p| p.wind_speed).sum::<f64>() / count;

    Some(HistoricalSample {
        date,
        temperature: temperature.round(),
        humidity: humidity.round().clamp(0.0, 100.0) as u8,
        wind_speed: wind_speed.round(),
        samples: points.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Condition;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn entry(
        when: DateTime<Utc>,
        min: f64,
        max: f64,
        humidity: u8,
        wind: f64,
        main: &str,
    ) -> ForecastEntry {
        ForecastEntry {
            at: when,
            temperature: (min + max) / 2.0,
            feels_like: (min + max) / 2.0,
            temp_min: min,
            temp_max: max,
            humidity,
            wind_speed: wind,
            precipitation_chance: 0.0,
            condition: Condition {
                id: 800,
                main: main.to_string(),
                description: main.to_lowercase(),
                icon: "01d".to_string(),
            },
        }
    }

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    #[test]
    fn aggregates_one_day() {
        let entries = vec![
            entry(at(4, 9), 10.0, 20.0, 40, 2.0, "Clear"),
            entry(at(4, 12), 12.0, 18.0, 60, 4.0, "Clear"),
        ];

        let days = group_by_day(&entries, utc());

        assert_eq!(days.len(), 1);
        let day = &days[0];
        assert_eq!(day.temp_min, 10.0);
        assert_eq!(day.temp_max, 20.0);
        assert_eq!(day.humidity, 50);
        assert_eq!(day.wind_speed, 3.0);
        assert_eq!(day.condition, "Clear");
        assert_eq!(day.weekday, "Monday");
    }

    #[test]
    fn min_max_come_from_entry_bounds_not_instant_temperature() {
        let mut cold = entry(at(4, 3), 5.0, 9.0, 50, 1.0, "Clouds");
        cold.temperature = 7.0;
        let mut warm = entry(at(4, 15), 11.0, 16.0, 50, 1.0, "Clouds");
        warm.temperature = 14.0;

        let days = group_by_day(&[cold, warm], utc());

        assert_eq!(days[0].temp_min, 5.0);
        assert_eq!(days[0].temp_max, 16.0);
    }

    #[test]
    fn mode_tie_goes_to_first_seen() {
        let entries = vec![
            entry(at(4, 9), 10.0, 20.0, 40, 2.0, "Rain"),
            entry(at(4, 12), 10.0, 20.0, 40, 2.0, "Clear"),
        ];

        let days = group_by_day(&entries, utc());

        assert_eq!(days[0].condition, "Rain");
    }

    #[test]
    fn mode_prefers_strict_majority() {
        let entries = vec![
            entry(at(4, 0), 10.0, 20.0, 40, 2.0, "Rain"),
            entry(at(4, 3), 10.0, 20.0, 40, 2.0, "Clear"),
            entry(at(4, 6), 10.0, 20.0, 40, 2.0, "Clear"),
        ];

        assert_eq!(group_by_day(&entries, utc())[0].condition, "Clear");
    }

    #[test]
    fn days_follow_first_seen_order() {
        let entries = vec![
            entry(at(4, 21), 1.0, 2.0, 40, 2.0, "Clear"),
            entry(at(5, 0), 1.0, 2.0, 40, 2.0, "Clear"),
            entry(at(5, 3), 1.0, 2.0, 40, 2.0, "Clear"),
            entry(at(6, 0), 1.0, 2.0, 40, 2.0, "Clear"),
        ];

        let days = group_by_day(&entries, utc());
        let dates: Vec<u32> = days.iter().map(|d| chrono::Datelike::day(&d.date)).collect();

        assert_eq!(dates, vec![4, 5, 6]);
        assert_eq!(days[1].entries.len(), 2);
    }

    #[test]
    fn days_are_cut_at_local_midnight() {
        // 22:00 UTC on the 4th is already the 5th in UTC+3.
        let entries = vec![
            entry(at(4, 18), 1.0, 2.0, 40, 2.0, "Clear"),
            entry(at(4, 22), 1.0, 2.0, 40, 2.0, "Clear"),
        ];

        let days = group_by_day(&entries, FixedOffset::east_opt(3 * 3600).unwrap());

        assert_eq!(days.len(), 2);
    }

    #[test]
    fn regrouping_flattened_days_is_stable() {
        let entries = vec![
            entry(at(4, 18), 3.0, 8.0, 71, 3.2, "Rain"),
            entry(at(4, 21), 2.0, 6.0, 80, 4.1, "Rain"),
            entry(at(5, 0), 1.0, 5.0, 90, 5.5, "Snow"),
            entry(at(5, 3), 0.0, 4.0, 85, 2.5, "Clouds"),
            entry(at(5, 6), 1.5, 7.0, 60, 1.0, "Snow"),
        ];

        let first = group_by_day(&entries, utc());
        let flattened: Vec<ForecastEntry> = first.iter().flat_map(|d| d.entries.clone()).collect();
        let second = group_by_day(&flattened, utc());

        assert_eq!(first, second);
    }

    #[test]
    fn empty_forecast_has_no_days() {
        assert!(group_by_day(&[], utc()).is_empty());
    }

    #[test]
    fn stale_selection_yields_no_detail() {
        let entries = vec![entry(at(4, 9), 10.0, 20.0, 40, 2.0, "Clear")];
        let days = group_by_day(&entries, utc());

        assert_eq!(hourly_detail(&days, 0).map(|e| e.len()), Some(1));
        assert!(hourly_detail(&days, 3).is_none());
    }

    #[test]
    fn distribution_counts_in_first_seen_order() {
        let entries = vec![
            entry(at(4, 0), 1.0, 2.0, 40, 2.0, "Clouds"),
            entry(at(4, 3), 1.0, 2.0, 40, 2.0, "Rain"),
            entry(at(4, 6), 1.0, 2.0, 40, 2.0, "Clouds"),
        ];

        assert_eq!(
            condition_distribution(&entries),
            vec![("Clouds".to_string(), 2), ("Rain".to_string(), 1)]
        );
    }

    #[test]
    fn history_day_is_averaged_and_rounded() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 3).unwrap();
        let points = vec![
            HourlyPoint {
                at: at(3, 0),
                temperature: 4.2,
                humidity: 70,
                wind_speed: 3.0,
            },
            HourlyPoint {
                at: at(3, 1),
                temperature: 5.6,
                humidity: 75,
                wind_speed: 4.4,
            },
        ];

        let sample = summarize_history(date, &points).unwrap();

        assert_eq!(sample.temperature, 5.0);
        assert_eq!(sample.humidity, 73);
        assert_eq!(sample.wind_speed, 4.0);
        assert_eq!(sample.samples, 2);
        assert!(summarize_history(date, &[]).is_none());
    }
}
