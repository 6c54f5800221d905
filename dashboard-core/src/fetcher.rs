//! The fetch cycle: current conditions and forecast side by side, then a
//! background batch of archive days.
//!
//! Every call to [`WeatherFetcher::fetch_weather`] gets a request id.
//! Results are published only while their id is the latest one, so a
//! slow, superseded cycle can never overwrite a newer location's data.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use chrono::{Duration, Utc};
use futures_util::{
    FutureExt,
    future::{BoxFuture, Shared, join_all},
};
use parking_lot::Mutex;
use tokio::{sync::watch, task::AbortHandle};
use tracing::{debug, warn};

use crate::{
    config::{ClientConfig, DEFAULT_HISTORY_DAYS},
    error::{FetchError, RequestError},
    model::{
        CurrentConditions, DashboardState, FetchState, Forecast, HistoricalSample, Location,
        WeatherBundle,
    },
    provider::{OpenWeatherSource, WeatherSource},
};

#[derive(Debug)]
pub struct WeatherFetcher {
    source: Arc<dyn WeatherSource>,
    history_days: u32,
    latest: AtomicU64,
    state: Arc<watch::Sender<DashboardState>>,
    history_task: Mutex<Option<HistoryTask>>,
}

/// The running archive batch. `done` can be awaited by any number of
/// callers while `abort` stays usable for the next cycle.
struct HistoryTask {
    abort: AbortHandle,
    done: Shared<BoxFuture<'static, ()>>,
}

impl fmt::Debug for HistoryTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryTask")
            .field("finished", &self.abort.is_finished())
            .finish_non_exhaustive()
    }
}

impl WeatherFetcher {
    /// `history_days` is capped at [`DEFAULT_HISTORY_DAYS`].
    pub fn new(source: Arc<dyn WeatherSource>, history_days: u32) -> Self {
        let (state, _) = watch::channel(DashboardState::default());
        Self {
            source,
            history_days: history_days.min(DEFAULT_HISTORY_DAYS),
            latest: AtomicU64::new(0),
            state: Arc::new(state),
            history_task: Mutex::new(None),
        }
    }

    /// Fetcher backed by OpenWeatherMap.
    ///
    /// Fails with [`FetchError::Configuration`] without touching the
    /// network when the API key is missing.
    pub fn from_config(config: ClientConfig) -> Result<Self, FetchError> {
        let history_days = config.history_days;
        let source = OpenWeatherSource::new(config)?;
        Ok(Self::new(Arc::new(source), history_days))
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state.subscribe()
    }

    /// Snapshot of the published state.
    pub fn state(&self) -> DashboardState {
        self.state.borrow().clone()
    }

    /// Run one fetch cycle for `location` and return its outcome.
    ///
    /// The returned state is this cycle's own result. Whether it was
    /// published depends on no newer cycle having started meanwhile.
    pub async fn fetch_weather(&self, location: &Location) -> FetchState {
        let request_id = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        let previous = self.history_task.lock().take();
        if let Some(previous) = previous {
            previous.abort.abort();
        }

        self.publish(request_id, location, FetchState::Loading);
        debug!(request_id, location = %location.display_name, "fetching weather");

        let (current, forecast) = tokio::join!(
            self.source.current(location),
            self.source.forecast(location)
        );
        let state = settle(current, forecast);

        if !self.publish(request_id, location, state.clone()) {
            debug!(request_id, "discarding result of superseded fetch");
            return state;
        }

        if state.bundle().is_some() && self.history_days > 0 {
            self.spawn_history(request_id, location.clone());
        }

        state
    }

    /// Wait for the latest cycle's archive batch, if one is running.
    ///
    /// The batch stays registered while waiting, so a newer cycle can
    /// still abort it; the wait then ends early.
    pub async fn wait_for_historical(&self) {
        let done = self.history_task.lock().as_ref().map(|task| task.done.clone());
        if let Some(done) = done {
            done.await;
        }
    }

    fn publish(&self, request_id: u64, location: &Location, fetch: FetchState) -> bool {
        self.state.send_if_modified(|current| {
            if self.latest.load(Ordering::SeqCst) != request_id {
                return false;
            }
            *current = DashboardState {
                request_id,
                location: Some(location.clone()),
                fetch,
            };
            true
        })
    }

    fn spawn_history(&self, request_id: u64, location: Location) {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);
        let days = self.history_days;

        let handle = tokio::spawn(async move {
            let samples = fetch_history(source.as_ref(), &location, days).await;
            if samples.is_empty() {
                debug!(request_id, "no historical data available");
                return;
            }

            let found = samples.len();
            let attached = state.send_if_modified(|current| {
                if current.request_id != request_id {
                    return false;
                }
                match current.fetch.bundle_mut() {
                    Some(bundle) => {
                        bundle.historical = Some(samples);
                        true
                    }
                    None => false,
                }
            });

            if attached {
                debug!(request_id, days = found, "attached historical data");
            } else {
                debug!(request_id, "discarding historical data of superseded fetch");
            }
        });

        let task = HistoryTask {
            abort: handle.abort_handle(),
            done: handle
                .map(|res| match res {
                    Err(err) if !err.is_cancelled() => {
                        warn!(error = %err, "historical fetch task failed")
                    }
                    _ => {}
                })
                .boxed()
                .shared(),
        };

        let replaced = self.history_task.lock().replace(task);
        if let Some(replaced) = replaced {
            replaced.abort.abort();
        }
    }
}

fn settle(
    current: Result<CurrentConditions, RequestError>,
    forecast: Result<Forecast, RequestError>,
) -> FetchState {
    let current = match current {
        Ok(current) => current,
        Err(err) => {
            let error = FetchError::mandatory(&err);
            warn!(%error, "current conditions unavailable");
            return FetchState::Failed { error };
        }
    };

    match forecast {
        Ok(forecast) => FetchState::Ready {
            bundle: WeatherBundle::new(current, Some(forecast)),
        },
        Err(err) => {
            let warning = FetchError::degraded(&err);
            warn!(%warning, "continuing with current conditions only");
            FetchState::PartialFailure {
                bundle: WeatherBundle::new(current, None),
                warning,
            }
        }
    }
}

/// One archive request per trailing day, oldest first; failures are
/// dropped.
async fn fetch_history(
    source: &dyn WeatherSource,
    location: &Location,
    days: u32,
) -> Vec<HistoricalSample> {
    let now = Utc::now();
    let requests = (1..=days).rev().map(move |back| async move {
        let at = now - Duration::days(i64::from(back));
        match source.historical(location, at).await {
            Ok(sample) => Some(sample),
            Err(err) => {
                let err = FetchError::best_effort(&err);
                debug!(%err, days_back = back, "skipping historical day");
                None
            }
        }
    });

    join_all(requests).await.into_iter().flatten().collect()
}
