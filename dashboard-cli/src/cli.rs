use std::time::Duration;

use anyhow::{anyhow, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use dashboard_core::{
    Config, DeviceLabel, FetchState, Location, LocationSelector, WeatherFetcher,
    location::{self, ConfiguredPosition},
};
use inquire::{Password, PasswordDisplayMode, Select};

use crate::render::DashboardView;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "dashboard", version, about = "Weather dashboard")]
pub struct Cli {
    /// Print debug logs to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and a default city.
    Configure,

    /// List the reference cities.
    Cities {
        /// Only list the first N cities.
        #[arg(long, value_name = "N")]
        popular: Option<usize>,
    },

    /// Suggest reference cities matching a query.
    Search {
        /// At least two characters of a city name.
        query: String,
    },

    /// Show current weather, forecast and recent history.
    Show(ShowArgs),
}

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// City from the reference list; partial names pick the first match.
    city: Option<String>,

    #[arg(
        long,
        requires = "lon",
        allow_negative_numbers = true,
        conflicts_with_all = ["city", "here"]
    )]
    lat: Option<f64>,

    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Use the device position from the config file.
    #[arg(long, conflicts_with = "city")]
    here: bool,

    /// How to name the device position.
    #[arg(long, value_enum, default_value_t = LabelArg::Coordinates, requires = "here")]
    label: LabelArg,

    /// Day to show hourly detail for; 0 is the first forecast day.
    #[arg(long, default_value_t = 0)]
    day: usize,

    /// Print the dashboard state as JSON.
    #[arg(long)]
    json: bool,

    /// Don't wait for historical data.
    #[arg(long)]
    no_history: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LabelArg {
    /// "lat, lon" with two decimals.
    Coordinates,
    /// The fixed label "Current Location".
    Current,
}

impl From<LabelArg> for DeviceLabel {
    fn from(arg: LabelArg) -> Self {
        match arg {
            LabelArg::Coordinates => DeviceLabel::Coordinates,
            LabelArg::Current => DeviceLabel::CurrentLocation,
        }
    }
}

fn city_list(popular: Option<usize>) -> Vec<Location> {
    match popular {
        Some(count) => location::popular_cities(count),
        None => location::reference_cities(),
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Cities { popular } => {
                for city in city_list(popular) {
                    println!(
                        "{:<12} {:>9.4} {:>9.4}",
                        city.display_name, city.latitude, city.longitude
                    );
                }
                Ok(())
            }
            Command::Search { query } => {
                let found = location::suggest(&query);
                if found.is_empty() {
                    println!("No suggestions for '{query}'.");
                }
                for city in found {
                    println!("{}", city.display_name);
                }
                Ok(())
            }
            Command::Show(args) => show(args).await,
        }
    }
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let api_key = Password::new("OpenWeather API key:")
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()?;
    if api_key.trim().is_empty() {
        bail!("API key must not be empty");
    }
    config.set_api_key(api_key);

    let names: Vec<String> = location::reference_cities()
        .into_iter()
        .map(|city| city.display_name)
        .collect();
    let cursor = config
        .default_city
        .as_ref()
        .and_then(|current| names.iter().position(|name| name == current))
        .unwrap_or(0);
    let city = Select::new("Default city:", names)
        .with_starting_cursor(cursor)
        .prompt()?;
    config.default_city = Some(city);

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn show(args: ShowArgs) -> anyhow::Result<()> {
    let config = Config::load()?.with_env_overrides();
    let client = config.client_config()?;
    let timeout = client.timeout;
    let fetcher = WeatherFetcher::from_config(client)?;

    let location = resolve_location(&args, &config, timeout).await?;
    let state = fetcher.fetch_weather(&location).await;

    if state.bundle().is_some() && !args.no_history {
        fetcher.wait_for_historical().await;
    }
    let snapshot = fetcher.state();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else if state.bundle().is_some() {
        print!("{}", DashboardView::new(&snapshot, args.day));
    }

    match state {
        FetchState::Failed { error } => Err(error.into()),
        _ => Ok(()),
    }
}

async fn resolve_location(
    args: &ShowArgs,
    config: &Config,
    timeout: Duration,
) -> anyhow::Result<Location> {
    let mut selector = LocationSelector::default().with_label(args.label.into());
    if let Some(city) = config.default_city.as_deref().and_then(location::find_city) {
        selector.select(city);
    }

    if args.here {
        let geolocator = ConfiguredPosition::new(config.device);
        let outcome = selector
            .use_device_location(&geolocator, timeout)
            .await
            .map(|_| ());
        if let Err(err) = outcome {
            eprintln!(
                "{err}; set [device] latitude/longitude in {}. Showing {} instead.",
                Config::config_file_path()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|_| "the config file".to_string()),
                selector.current().display_name
            );
        }
    } else if let (Some(lat), Some(lon)) = (args.lat, args.lon) {
        selector.select(Location::from_coordinates(lat, lon));
    } else if let Some(query) = &args.city {
        let found = location::find_city(query)
            .or_else(|| selector.search(query).into_iter().next())
            .ok_or_else(|| {
                anyhow!(
                    "No city matches '{query}'. Run `dashboard cities` to list the known cities."
                )
            })?;
        selector.select(found);
    }

    Ok(selector.current().clone())
}
