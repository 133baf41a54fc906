//! Waypoint Core Library
//!
//! This crate provides the API gateway client for the waypoint backend: a
//! façade that turns the backend's REST endpoints (waypoints, tags, clusters,
//! location, import, suggestions, search history, version) into a uniform
//! asynchronous request/response/event protocol.
//!
//! # Architecture
//!
//! - **Transport**: one HTTP request per call, raced against a timeout
//! - **Offline gate**: a negative port short-circuits every operation into a
//!   synthetic success without network I/O
//! - **Tag normalizer**: every tag list is returned in one canonical shape
//! - **Events**: each operation emits `started`, then exactly one of
//!   `succeeded`/`failed`, mirrored by a generic `requestSucceeded`/`requestFailed`
//!
//! # Quick Start
//!
//! ```text
//! let client = ApiClient::new(Config::load()?)?;
//! let mut events = client.subscribe();
//!
//! client.get_waypoints().wait().await;
//! while let Ok(event) = events.try_recv() {
//!     println!("{}", event.name());
//! }
//! ```
//!
//! # Modules
//!
//! - `gateway`: The operation façade (main entry point)
//! - `transport`: HTTP dispatch, timeout and outcome classification
//! - `events`: Event types and the subscriber bus
//! - `models`: Waypoints, clusters, location, version, search entries
//! - `tags`: Tag representation and normalization
//! - `config`: Client configuration

pub mod config;
pub mod error;
pub mod events;
pub mod gateway;
pub mod models;
pub mod tags;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{GatewayError, GatewayResult};
pub use events::{EventBus, GatewayEvent, RequestContext};
pub use gateway::{ApiClient, CallHandle, RequestOptions};
pub use models::{
    Cluster, ClusterQuery, ImportRequest, Location, RecentSearches, SearchEntry, VersionInfo,
    Waypoint,
};
pub use tags::{dedupe, normalize, RawTag, Tag};
pub use transport::{Body, Method, Transport, TransportError};
