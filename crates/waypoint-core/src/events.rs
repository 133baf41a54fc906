//! Gateway events
//!
//! Every operation emits `*Started`, then exactly one terminal event
//! (`succeeded` or `failed`) mirrored by a generic `RequestSucceeded` or
//! `RequestFailed` carrying the request kind and correlation context.
//!
//! Events are fanned out to every subscriber of the [`EventBus`].

use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::trace;

use crate::models::{
    Cluster, ClusterQuery, ImportRequest, Location, SearchEntry, VersionInfo, Waypoint,
};
use crate::tags::Tag;

/// Opaque correlation value threaded through generic events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestContext(pub Value);

impl RequestContext {
    /// Context carrying the serialized original input of an operation
    pub fn from_input<T: Serialize>(input: &T) -> Self {
        Self(serde_json::to_value(input).unwrap_or(Value::Null))
    }
}

impl From<Value> for RequestContext {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Events emitted by the gateway client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum GatewayEvent {
    WaypointsLoadStarted,
    WaypointsLoaded {
        waypoints: Vec<Waypoint>,
    },
    WaypointsLoadFailed {
        message: String,
    },

    WaypointAddStarted {
        waypoint: Waypoint,
    },
    WaypointAdded {
        saved: Waypoint,
        original: Waypoint,
    },
    WaypointAddFailed {
        original: Waypoint,
        message: String,
    },

    WaypointDeleteStarted {
        waypoint: Waypoint,
    },
    WaypointDeleted {
        waypoint: Waypoint,
    },
    WaypointDeleteFailed {
        waypoint: Waypoint,
        message: String,
    },

    WaypointRenameStarted {
        waypoint: Waypoint,
        new_name: String,
    },
    WaypointRenamed {
        renamed: Waypoint,
        original: Waypoint,
    },
    WaypointRenameFailed {
        original: Waypoint,
        new_name: String,
        message: String,
    },

    TagsLoadStarted {
        waypoint: Waypoint,
    },
    TagsLoaded {
        waypoint: Waypoint,
        tags: Vec<Tag>,
    },
    TagsLoadFailed {
        waypoint: Waypoint,
        message: String,
    },

    TagAddStarted {
        waypoint: Waypoint,
        tag: String,
    },
    TagAdded {
        waypoint: Waypoint,
        tags: Vec<Tag>,
        tag: String,
    },
    TagAddFailed {
        waypoint: Waypoint,
        tag: String,
        message: String,
    },

    TagDeleteStarted {
        waypoint: Waypoint,
        tag: String,
    },
    TagDeleted {
        waypoint: Waypoint,
        tags: Vec<Tag>,
        tag: String,
    },
    TagDeleteFailed {
        waypoint: Waypoint,
        tag: String,
        message: String,
    },

    ClustersLoadStarted {
        query: ClusterQuery,
    },
    ClustersLoaded {
        clusters: Vec<Cluster>,
        query: ClusterQuery,
    },
    ClustersLoadFailed {
        query: ClusterQuery,
        message: String,
    },

    LocationLoadStarted,
    LocationLoaded {
        location: Location,
    },
    LocationLoadFailed {
        message: String,
    },

    ImportStarted {
        request: ImportRequest,
    },
    ImportFinished {
        result: Value,
        request: ImportRequest,
    },
    ImportFailed {
        request: ImportRequest,
        message: String,
    },

    SuggestStarted {
        query: String,
    },
    SuggestionsLoaded {
        query: String,
        suggestions: Vec<Value>,
    },
    SuggestFailed {
        query: String,
        message: String,
    },

    RecentSearchesLoadStarted {
        limit: u32,
    },
    /// Legacy shape: plain query strings
    RecentSearchesLoaded {
        queries: Vec<String>,
    },
    /// Enriched shape: entries with optional coordinates
    RecentSearchEntriesLoaded {
        entries: Vec<SearchEntry>,
    },
    RecentSearchesLoadFailed {
        limit: u32,
        message: String,
    },

    VersionLoadStarted,
    VersionLoaded {
        version: VersionInfo,
    },
    VersionLoadFailed {
        message: String,
    },

    /// Mirrors every successful terminal event
    RequestSucceeded {
        kind: String,
        payload: Value,
        context: RequestContext,
    },
    /// Mirrors every failed terminal event
    RequestFailed {
        kind: String,
        message: String,
        context: RequestContext,
    },
}

impl GatewayEvent {
    /// Signal name of this event
    pub fn name(&self) -> &'static str {
        match self {
            GatewayEvent::WaypointsLoadStarted => "waypointsLoadStarted",
            GatewayEvent::WaypointsLoaded { .. } => "waypointsLoaded",
            GatewayEvent::WaypointsLoadFailed { .. } => "waypointsLoadFailed",
            GatewayEvent::WaypointAddStarted { .. } => "waypointAddStarted",
            GatewayEvent::WaypointAdded { .. } => "waypointAdded",
            GatewayEvent::WaypointAddFailed { .. } => "waypointAddFailed",
            GatewayEvent::WaypointDeleteStarted { .. } => "waypointDeleteStarted",
            GatewayEvent::WaypointDeleted { .. } => "waypointDeleted",
            GatewayEvent::WaypointDeleteFailed { .. } => "waypointDeleteFailed",
            GatewayEvent::WaypointRenameStarted { .. } => "waypointRenameStarted",
            GatewayEvent::WaypointRenamed { .. } => "waypointRenamed",
            GatewayEvent::WaypointRenameFailed { .. } => "waypointRenameFailed",
            GatewayEvent::TagsLoadStarted { .. } => "tagsLoadStarted",
            GatewayEvent::TagsLoaded { .. } => "tagsLoaded",
            GatewayEvent::TagsLoadFailed { .. } => "tagsLoadFailed",
            GatewayEvent::TagAddStarted { .. } => "tagAddStarted",
            GatewayEvent::TagAdded { .. } => "tagAdded",
            GatewayEvent::TagAddFailed { .. } => "tagAddFailed",
            GatewayEvent::TagDeleteStarted { .. } => "tagDeleteStarted",
            GatewayEvent::TagDeleted { .. } => "tagDeleted",
            GatewayEvent::TagDeleteFailed { .. } => "tagDeleteFailed",
            GatewayEvent::ClustersLoadStarted { .. } => "clustersLoadStarted",
            GatewayEvent::ClustersLoaded { .. } => "clustersLoaded",
            GatewayEvent::ClustersLoadFailed { .. } => "clustersLoadFailed",
            GatewayEvent::LocationLoadStarted => "locationLoadStarted",
            GatewayEvent::LocationLoaded { .. } => "locationLoaded",
            GatewayEvent::LocationLoadFailed { .. } => "locationLoadFailed",
            GatewayEvent::ImportStarted { .. } => "importStarted",
            GatewayEvent::ImportFinished { .. } => "importFinished",
            GatewayEvent::ImportFailed { .. } => "importFailed",
            GatewayEvent::SuggestStarted { .. } => "suggestStarted",
            GatewayEvent::SuggestionsLoaded { .. } => "suggestionsLoaded",
            GatewayEvent::SuggestFailed { .. } => "suggestFailed",
            GatewayEvent::RecentSearchesLoadStarted { .. } => "recentSearchesLoadStarted",
            GatewayEvent::RecentSearchesLoaded { .. } => "recentSearchesLoaded",
            GatewayEvent::RecentSearchEntriesLoaded { .. } => "recentSearchEntriesLoaded",
            GatewayEvent::RecentSearchesLoadFailed { .. } => "recentSearchesLoadFailed",
            GatewayEvent::VersionLoadStarted => "versionLoadStarted",
            GatewayEvent::VersionLoaded { .. } => "versionLoaded",
            GatewayEvent::VersionLoadFailed { .. } => "versionLoadFailed",
            GatewayEvent::RequestSucceeded { .. } => "requestSucceeded",
            GatewayEvent::RequestFailed { .. } => "requestFailed",
        }
    }

    /// Whether this is a failure event (specific or generic)
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            GatewayEvent::WaypointsLoadFailed { .. }
                | GatewayEvent::WaypointAddFailed { .. }
                | GatewayEvent::WaypointDeleteFailed { .. }
                | GatewayEvent::WaypointRenameFailed { .. }
                | GatewayEvent::TagsLoadFailed { .. }
                | GatewayEvent::TagAddFailed { .. }
                | GatewayEvent::TagDeleteFailed { .. }
                | GatewayEvent::ClustersLoadFailed { .. }
                | GatewayEvent::LocationLoadFailed { .. }
                | GatewayEvent::ImportFailed { .. }
                | GatewayEvent::SuggestFailed { .. }
                | GatewayEvent::RecentSearchesLoadFailed { .. }
                | GatewayEvent::VersionLoadFailed { .. }
                | GatewayEvent::RequestFailed { .. }
        )
    }

    /// Whether this is one of the cross-cutting generic events
    pub fn is_generic(&self) -> bool {
        matches!(
            self,
            GatewayEvent::RequestSucceeded { .. } | GatewayEvent::RequestFailed { .. }
        )
    }

    /// Failure message, if this is a failure event
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            GatewayEvent::WaypointsLoadFailed { message }
            | GatewayEvent::WaypointAddFailed { message, .. }
            | GatewayEvent::WaypointDeleteFailed { message, .. }
            | GatewayEvent::WaypointRenameFailed { message, .. }
            | GatewayEvent::TagsLoadFailed { message, .. }
            | GatewayEvent::TagAddFailed { message, .. }
            | GatewayEvent::TagDeleteFailed { message, .. }
            | GatewayEvent::ClustersLoadFailed { message, .. }
            | GatewayEvent::LocationLoadFailed { message }
            | GatewayEvent::ImportFailed { message, .. }
            | GatewayEvent::SuggestFailed { message, .. }
            | GatewayEvent::RecentSearchesLoadFailed { message, .. }
            | GatewayEvent::VersionLoadFailed { message }
            | GatewayEvent::RequestFailed { message, .. } => Some(message),
            _ => None,
        }
    }
}

/// Fan-out of gateway events to any number of subscribers
///
/// Emission never blocks; subscribers whose receiver was dropped are pruned
/// on the next emission.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<GatewayEvent>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<GatewayEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Deliver `event` to every live subscriber
    pub fn emit(&self, event: GatewayEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        trace!("emit {} to {} subscriber(s)", event.name(), subscribers.len());
    }

    /// Number of live subscribers (as of the last emission)
    #[cfg(test)]
    fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
