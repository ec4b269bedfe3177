//! Turns user search triggers into one stream of displayed weather.
//!
//! Two triggers feed the pipeline:
//!
//! - a committed city name, looked up with retries and backed by the cache
//! - a geolocation request, looked up once from the first accurate fix
//!
//! Both merge into a single output that never ends while the pipeline is alive:
//! every failure path resolves to a substitute value (a cached result or
//! [`WeatherResult::empty`]). Each trigger runs as its own task; a new search
//! does not cancel an older one, so results arrive in completion order.

use std::{fmt, sync::Arc};

use futures::StreamExt;
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    cache::ResultCache,
    client::WeatherClient,
    error::{FetchError, Notice},
    location::LocationProvider,
    model::WeatherResult,
    retry::RetryCoordinator,
};

/// A user action that starts a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchEvent {
    Text(String),
    Geolocate,
}

/// Input side of a running pipeline. Dropping it stops new searches; searches
/// already in flight still complete and emit.
#[derive(Debug, Clone)]
pub struct PipelineHandle {
    events: mpsc::UnboundedSender<SearchEvent>,
}

impl PipelineHandle {
    /// Returns `false` once the pipeline has shut down.
    pub fn submit_text(&self, text: impl Into<String>) -> bool {
        self.send(SearchEvent::Text(text.into()))
    }

    pub fn request_location(&self) -> bool {
        self.send(SearchEvent::Geolocate)
    }

    pub fn send(&self, event: SearchEvent) -> bool {
        self.events.send(event).is_ok()
    }
}

/// Everything the display side consumes.
#[derive(Debug)]
pub struct PipelineOutputs {
    /// Merged text and geo results.
    pub weather: mpsc::UnboundedReceiver<WeatherResult>,
    /// One message per failed lookup attempt, retried or not.
    pub notices: mpsc::UnboundedReceiver<Notice>,
    /// `true` while a search is in flight. The initial value is never announced.
    pub activity: watch::Receiver<bool>,
}

#[derive(Debug, Clone)]
struct Emitter {
    weather: mpsc::UnboundedSender<WeatherResult>,
    notices: mpsc::UnboundedSender<Notice>,
    activity: Arc<watch::Sender<bool>>,
}

impl Emitter {
    fn searching(&self) {
        self.activity.send_replace(true);
    }

    fn emit(&self, weather: WeatherResult) {
        if self.weather.send(weather).is_err() {
            tracing::trace!("weather output has no listener");
        }
        self.activity.send_replace(false);
    }

    fn notice(&self, err: &FetchError) {
        let notice = Notice::from(err);
        tracing::debug!(%notice, error = %err, "lookup failed");
        if self.notices.send(notice).is_err() {
            tracing::trace!("notice output has no listener");
        }
    }
}

pub struct SearchPipeline {
    client: Arc<dyn WeatherClient>,
    cache: ResultCache,
    retry: RetryCoordinator,
    location: Arc<dyn LocationProvider>,
    accuracy_m: f64,
}

impl fmt::Debug for SearchPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchPipeline")
            .field("client", &self.client)
            .field("cache_entries", &self.cache.len())
            .field("retry", &self.retry)
            .field("accuracy_m", &self.accuracy_m)
            .finish_non_exhaustive()
    }
}

impl SearchPipeline {
    pub fn new(
        client: Arc<dyn WeatherClient>,
        cache: ResultCache,
        retry: RetryCoordinator,
        location: Arc<dyn LocationProvider>,
        accuracy_m: f64,
    ) -> Self {
        Self { client, cache, retry, location, accuracy_m }
    }

    /// Start the driver task.
    pub fn spawn(self) -> (PipelineHandle, PipelineOutputs, JoinHandle<()>) {
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();
        let (weather_tx, weather_rx) = mpsc::unbounded_channel();
        let (notices_tx, notices_rx) = mpsc::unbounded_channel();
        let (activity_tx, activity_rx) = watch::channel(true);

        let emitter = Emitter {
            weather: weather_tx,
            notices: notices_tx,
            activity: Arc::new(activity_tx),
        };
        let pipeline = Arc::new(self);

        let driver = tokio::spawn(async move {
            while let Some(event) = events_rx.recv().await {
                pipeline.clone().dispatch(event, &emitter);
            }
            tracing::debug!("search pipeline stopped accepting triggers");
        });

        let handle = PipelineHandle { events: events_tx };
        let outputs = PipelineOutputs {
            weather: weather_rx,
            notices: notices_rx,
            activity: activity_rx,
        };

        (handle, outputs, driver)
    }

    fn dispatch(self: Arc<Self>, event: SearchEvent, emitter: &Emitter) {
        match event {
            SearchEvent::Text(text) => {
                if text.trim().is_empty() {
                    tracing::trace!("ignoring blank search");
                    return;
                }
                emitter.searching();
                tokio::spawn(self.text_search(text, emitter.clone()));
            }
            SearchEvent::Geolocate => {
                emitter.searching();
                tokio::spawn(self.geo_search(emitter.clone()));
            }
        }
    }

    async fn text_search(self: Arc<Self>, text: String, emitter: Emitter) {
        let client = &self.client;
        let cache = &self.cache;
        let notices = &emitter;
        let key = text.as_str();

        let result = self
            .retry
            .run(move |attempt| async move {
                tracing::debug!(city = key, attempt, "searching by city");
                match client.by_city(key).await {
                    Ok(weather) => {
                        // Written before the value goes out, so a follow-up
                        // search for the same key already sees it.
                        cache.put(key, weather.clone());
                        Ok(weather)
                    }
                    Err(err) => {
                        notices.notice(&err);
                        Err(err)
                    }
                }
            })
            .await;

        let weather = match result {
            Ok(weather) => weather,
            Err(err) => match self.cache.get(key) {
                Some(cached) => {
                    tracing::info!(city = key, error = %err, "serving cached weather");
                    cached
                }
                None => {
                    tracing::info!(city = key, error = %err, "no cached weather, showing empty");
                    WeatherResult::empty()
                }
            },
        };

        emitter.emit(weather);
    }

    async fn geo_search(self: Arc<Self>, emitter: Emitter) {
        let updates = self.location.updates();
        self.location.start_updating();

        let threshold = self.accuracy_m;
        let mut accurate =
            std::pin::pin!(updates.filter(move |fix| futures::future::ready(fix.is_within(threshold))));

        let Some(fix) = accurate.next().await else {
            tracing::warn!("location updates ended before an accurate fix");
            emitter.emit(WeatherResult::empty());
            return;
        };

        tracing::debug!(?fix, "searching by location");
        let weather = match self.client.by_coordinate(fix.coordinate).await {
            Ok(weather) => weather,
            Err(err) => {
                emitter.notice(&err);
                WeatherResult::empty()
            }
        };

        emitter.emit(weather);
    }
}
