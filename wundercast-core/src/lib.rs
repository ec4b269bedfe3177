//! Core library for the `wundercast` weather lookup tool.
//!
//! This crate defines:
//! - Configuration handling
//! - The weather service client and its error taxonomy
//! - Shared live state: connectivity and the API key
//! - The search pipeline: retry, caching and fallback for user searches
//!
//! It is used by `wundercast-cli`, but can also be embedded in other front ends;
//! anything that can feed text, location fixes and reachability changes can
//! drive the pipeline.

pub mod cache;
pub mod client;
pub mod config;
pub mod connectivity;
pub mod credentials;
pub mod error;
pub mod location;
pub mod model;
pub mod pipeline;
pub mod retry;

pub use cache::ResultCache;
pub use client::{WeatherClient, client_from_config};
pub use config::{Config, RetryConfig};
pub use connectivity::{
    ConnectivityMonitor, ConnectivityState, ReachabilityFlags, ReachabilityType, TcpReachability,
};
pub use credentials::{CredentialStore, KeyPrompt};
pub use error::{ApiError, FetchError, Notice};
pub use location::{LocationFeed, LocationProvider};
pub use model::{Coordinate, LocationFix, WeatherResult};
pub use pipeline::{PipelineHandle, PipelineOutputs, SearchEvent, SearchPipeline};
pub use retry::{RetryCoordinator, RetryState};
