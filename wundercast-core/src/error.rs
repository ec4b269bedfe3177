use thiserror::Error;

/// Failures reported by the weather service itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("city not found")]
    CityNotFound,
    #[error("server failure")]
    ServerFailure,
    #[error("API key rejected")]
    InvalidKey,
}

/// Everything a single lookup can fail with.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The transport could not reach the network at all.
    #[error("not connected to the internet")]
    NetworkUnavailable,

    #[error("request failed: {0}")]
    Unclassified(String),
}

impl FetchError {
    pub fn is_invalid_key(&self) -> bool {
        matches!(self, FetchError::Api(ApiError::InvalidKey))
    }

    pub fn is_network_unavailable(&self) -> bool {
        matches!(self, FetchError::NetworkUnavailable)
    }
}

/// A one-shot, user-facing message raised whenever a lookup fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: &'static str,
}

impl From<&FetchError> for Notice {
    fn from(err: &FetchError) -> Self {
        let message = match err {
            FetchError::Api(ApiError::CityNotFound) => "City Name is invalid",
            FetchError::Api(ApiError::ServerFailure) => "Server error",
            FetchError::Api(ApiError::InvalidKey) => "Key is invalid",
            FetchError::NetworkUnavailable => "No internet connection",
            FetchError::Unclassified(_) => "An error occurred",
        };
        Self { message }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message)
    }
}
