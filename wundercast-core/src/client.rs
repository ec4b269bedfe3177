use crate::{
    Config, CredentialStore,
    client::openweather::OpenWeatherClient,
    error::FetchError,
    model::{Coordinate, WeatherResult},
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// One-shot lookups against the weather service.
///
/// Implementations make exactly one request per call and never retry; that is
/// the retry coordinator's job.
#[async_trait]
pub trait WeatherClient: Send + Sync + Debug {
    async fn by_city(&self, name: &str) -> Result<WeatherResult, FetchError>;

    async fn by_coordinate(&self, coordinate: Coordinate) -> Result<WeatherResult, FetchError>;
}

/// Construct the OpenWeatherMap client described by `config`.
///
/// The key is not taken from `config` here: the client reads whatever
/// `credentials` holds at the moment of each request.
pub fn client_from_config(config: &Config, credentials: CredentialStore) -> Box<dyn WeatherClient> {
    Box::new(OpenWeatherClient::new(config.base_url.clone(), credentials))
}
