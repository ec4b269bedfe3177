use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{
    CredentialStore,
    error::{ApiError, FetchError},
    model::{Coordinate, WeatherResult},
};

use super::WeatherClient;

#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    base_url: String,
    credentials: CredentialStore,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(base_url: impl Into<String>, credentials: CredentialStore) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            http: Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/data/2.5/weather", self.base_url.trim_end_matches('/'))
    }

    async fn fetch_current(&self, query: &[(&str, String)]) -> Result<WeatherResult, FetchError> {
        let api_key = self.credentials.current();

        let res = self
            .http
            .get(self.endpoint())
            .query(query)
            .query(&[("appid", api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .map_err(classify_transport)?;

        let status = res.status();
        let body = res.text().await.map_err(classify_transport)?;

        if !status.is_success() {
            tracing::debug!(%status, body = %truncate_body(&body), "OpenWeather request rejected");
            return Err(classify_status(status).into());
        }

        let parsed: OwCurrentResponse = serde_json::from_str(&body).map_err(|e| {
            FetchError::Unclassified(format!("Failed to parse OpenWeather current JSON: {e}"))
        })?;

        Ok(parsed.into())
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

impl From<OwCurrentResponse> for WeatherResult {
    fn from(parsed: OwCurrentResponse) -> Self {
        let icon = parsed.weather.into_iter().next().map(|w| w.icon).unwrap_or_default();

        WeatherResult {
            city_name: parsed.name,
            temperature_c: parsed.main.temp,
            humidity_pct: parsed.main.humidity,
            icon,
        }
    }
}

#[async_trait]
impl WeatherClient for OpenWeatherClient {
    async fn by_city(&self, name: &str) -> Result<WeatherResult, FetchError> {
        tracing::debug!(city = name, "looking up weather by city");
        self.fetch_current(&[("q", name.to_string())]).await
    }

    async fn by_coordinate(&self, coordinate: Coordinate) -> Result<WeatherResult, FetchError> {
        tracing::debug!(?coordinate, "looking up weather by coordinate");
        self.fetch_current(&[
            ("lat", coordinate.latitude.to_string()),
            ("lon", coordinate.longitude.to_string()),
        ])
        .await
    }
}

fn classify_status(status: StatusCode) -> ApiError {
    match status {
        StatusCode::NOT_FOUND => ApiError::CityNotFound,
        StatusCode::UNAUTHORIZED => ApiError::InvalidKey,
        _ => ApiError::ServerFailure,
    }
}

fn classify_transport(err: reqwest::Error) -> FetchError {
    if err.is_connect() {
        FetchError::NetworkUnavailable
    } else {
        FetchError::Unclassified(err.to_string())
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert_eq!(classify_status(StatusCode::NOT_FOUND), ApiError::CityNotFound);
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), ApiError::InvalidKey);
        assert_eq!(classify_status(StatusCode::INTERNAL_SERVER_ERROR), ApiError::ServerFailure);
        assert_eq!(classify_status(StatusCode::TOO_MANY_REQUESTS), ApiError::ServerFailure);
    }

    #[test]
    fn parses_current_weather_payload() {
        let body = r#"{
            "name": "London",
            "main": {"temp": 14.5, "humidity": 72, "pressure": 1012},
            "weather": [{"id": 500, "main": "Rain", "icon": "10d"}],
            "cod": 200
        }"#;

        let parsed: OwCurrentResponse = serde_json::from_str(body).unwrap();
        let result = WeatherResult::from(parsed);
        assert_eq!(result.city_name, "London");
        assert_eq!(result.temperature_c, 14.5);
        assert_eq!(result.humidity_pct, 72);
        assert_eq!(result.icon, "10d");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let cut = truncate_body(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client = OpenWeatherClient::new("http://localhost:1/", CredentialStore::new());
        assert_eq!(client.endpoint(), "http://localhost:1/data/2.5/weather");
    }
}
