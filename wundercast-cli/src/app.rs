//! Composition root: builds the long-lived services once and hands them to
//! the pipeline.

use std::sync::Arc;

use anyhow::anyhow;
use tokio::task::JoinHandle;
use wundercast_core::{
    Config, ConnectivityMonitor, CredentialStore, LocationFeed, LocationFix, PipelineHandle,
    PipelineOutputs, ResultCache, RetryCoordinator, SearchPipeline, TcpReachability, WeatherClient,
    WeatherResult, client_from_config,
};

use crate::{input, prompt::TerminalKeyPrompt, render};

pub struct App {
    pub handle: PipelineHandle,
    pub location: LocationFeed,
    pub credentials: CredentialStore,
    accuracy_m: f64,
    outputs: PipelineOutputs,
    reachability: JoinHandle<()>,
}

impl App {
    /// `api_key` overrides the configured key for this run.
    pub fn start(config: Config, api_key: Option<String>) -> Self {
        let key = api_key.unwrap_or_else(|| config.api_key().to_string());
        if key.is_empty() {
            tracing::warn!("no API key configured; you will be asked for one on first search");
        }

        let credentials = CredentialStore::with_key(key);
        let connectivity = ConnectivityMonitor::new();
        let reachability =
            connectivity.start(TcpReachability::new(config.reachability_host.clone()).into_stream());

        let retry = RetryCoordinator::new(
            config.retry,
            connectivity,
            credentials.clone(),
            Arc::new(TerminalKeyPrompt::new(credentials.clone())),
        );

        let client: Arc<dyn WeatherClient> = client_from_config(&config, credentials.clone()).into();
        let location = LocationFeed::new();
        let accuracy_m = config.location_accuracy_m;

        let pipeline = SearchPipeline::new(
            client,
            ResultCache::new(),
            retry,
            Arc::new(location.clone()),
            accuracy_m,
        );
        let (handle, outputs, _driver) = pipeline.spawn();

        Self { handle, location, credentials, accuracy_m, outputs, reachability }
    }

    /// Feed `fix` to the location search and start one.
    ///
    /// Returns `false` if the fix is dropped unsearched, either because it is
    /// too coarse or because the pipeline is gone.
    pub fn locate(&self, fix: LocationFix) -> anyhow::Result<bool> {
        let fix = input::require_accuracy(fix, self.accuracy_m)?;
        self.location.push(fix);
        Ok(self.handle.request_location())
    }

    /// Wait for the next displayed weather, showing notices and activity meanwhile.
    pub async fn next_weather(&mut self) -> Option<WeatherResult> {
        let outputs = &mut self.outputs;

        let weather = loop {
            tokio::select! {
                biased;

                Some(notice) = outputs.notices.recv() => eprintln!("{}", render::notice(&notice)),
                Ok(()) = outputs.activity.changed() => {
                    if *outputs.activity.borrow_and_update() {
                        eprintln!("{}", render::SEARCHING);
                    }
                }
                weather = outputs.weather.recv() => break weather,
            }
        };

        while let Ok(notice) = outputs.notices.try_recv() {
            eprintln!("{}", render::notice(&notice));
        }

        weather
    }

    pub async fn print_next_weather(&mut self) -> anyhow::Result<()> {
        let weather = self
            .next_weather()
            .await
            .ok_or_else(|| anyhow!("Search pipeline stopped unexpectedly"))?;

        println!("{}", render::weather(&weather));
        Ok(())
    }
}

impl Drop for App {
    fn drop(&mut self) {
        self.reachability.abort();
    }
}
