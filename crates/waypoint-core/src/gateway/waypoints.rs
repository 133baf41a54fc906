//! Waypoint listing and CRUD

use serde_json::{json, Value};
use tracing::{info, warn};

use super::{payload, ApiClient, Call, CallHandle, Outcome};
use crate::error::GatewayResult;
use crate::events::{GatewayEvent, RequestContext};
use crate::models::{parse_list, Waypoint};
use crate::transport::{with_query, Body, Method};

/// Query parameters identifying a waypoint
pub(super) fn identity_params(waypoint: &Waypoint) -> Vec<(&'static str, String)> {
    vec![
        ("name", waypoint.name.clone()),
        ("lat", waypoint.lat.to_string()),
        ("lon", waypoint.lon.to_string()),
    ]
}

/// Check an identifying waypoint, logging the rejection
pub(super) fn validated(operation: &str, waypoint: &Waypoint) -> GatewayResult<()> {
    waypoint.validate_identity().map_err(|e| {
        warn!("{} rejected: {}", operation, e);
        e
    })
}

fn add_body(waypoint: &Waypoint) -> Value {
    let mut body = json!({
        "name": waypoint.name,
        "lat": waypoint.lat,
        "lon": waypoint.lon,
    });
    if !waypoint.tags.is_empty() {
        let raw: Vec<&str> = waypoint.tags.iter().map(|t| t.raw.as_str()).collect();
        body["tags"] = json!(raw);
    }
    body
}

impl ApiClient {
    /// Load every saved waypoint
    pub fn get_waypoints(&self) -> CallHandle {
        let call = Call::new(
            Method::Get,
            with_query("/api/waypoints", &[("emoji", "true")]),
        );
        self.emit(GatewayEvent::WaypointsLoadStarted);

        self.execute(
            call,
            RequestContext::default(),
            || {
                Outcome::new(
                    GatewayEvent::WaypointsLoaded {
                        waypoints: Vec::new(),
                    },
                    Value::Array(Vec::new()),
                )
            },
            |body| {
                let waypoints = parse_list::<Waypoint>(&body, "waypoints").unwrap_or_else(|| {
                    warn!("Unreadable waypoint list, treating as empty");
                    Vec::new()
                });
                let payload = payload(&waypoints);
                Outcome::new(GatewayEvent::WaypointsLoaded { waypoints }, payload)
            },
            |message| {
                vec![GatewayEvent::WaypointsLoadFailed {
                    message: message.to_string(),
                }]
            },
        )
    }

    /// Save a new waypoint
    ///
    /// The saved record falls back to the input when the backend answer
    /// cannot be read.
    pub fn add_waypoint(&self, waypoint: Waypoint) -> GatewayResult<CallHandle> {
        validated("add waypoint", &waypoint)?;

        let call = Call::new(Method::Post, "/api/bookmarks").body(Body::Json(add_body(&waypoint)));
        let context = RequestContext::from_input(&waypoint);
        info!("Adding waypoint '{}'", waypoint.name);
        self.emit(GatewayEvent::WaypointAddStarted {
            waypoint: waypoint.clone(),
        });

        let echoed = waypoint.clone();
        let failed = waypoint.clone();
        Ok(self.execute(
            call,
            context,
            move || {
                let payload = payload(&echoed);
                Outcome::new(
                    GatewayEvent::WaypointAdded {
                        saved: echoed.clone(),
                        original: echoed,
                    },
                    payload,
                )
            },
            move |body| {
                let saved = serde_json::from_str::<Waypoint>(&body).unwrap_or_else(|_| {
                    warn!("Unreadable saved waypoint, echoing input");
                    waypoint.clone()
                });
                let payload = payload(&saved);
                Outcome::new(
                    GatewayEvent::WaypointAdded {
                        saved,
                        original: waypoint,
                    },
                    payload,
                )
            },
            move |message| {
                vec![GatewayEvent::WaypointAddFailed {
                    original: failed,
                    message: message.to_string(),
                }]
            },
        ))
    }

    /// Delete a waypoint by its identifying triple
    pub fn delete_waypoint(&self, waypoint: Waypoint) -> GatewayResult<CallHandle> {
        validated("delete waypoint", &waypoint)?;

        let call = Call::new(
            Method::Delete,
            with_query("/api/bookmarks", &identity_params(&waypoint)),
        );
        let context = RequestContext::from_input(&waypoint);
        info!("Deleting waypoint '{}'", waypoint.name);
        self.emit(GatewayEvent::WaypointDeleteStarted {
            waypoint: waypoint.clone(),
        });

        let echoed = waypoint.clone();
        let failed = waypoint.clone();
        Ok(self.execute(
            call,
            context,
            move || {
                let payload = payload(&echoed);
                Outcome::new(GatewayEvent::WaypointDeleted { waypoint: echoed }, payload)
            },
            move |_| {
                let payload = payload(&waypoint);
                Outcome::new(GatewayEvent::WaypointDeleted { waypoint }, payload)
            },
            move |message| {
                vec![GatewayEvent::WaypointDeleteFailed {
                    waypoint: failed,
                    message: message.to_string(),
                }]
            },
        ))
    }

    /// Rename a waypoint
    ///
    /// A blank or unchanged name is reported as a failed rename without any
    /// request being sent.
    pub fn rename_waypoint(&self, waypoint: Waypoint, new_name: &str) -> GatewayResult<CallHandle> {
        validated("rename waypoint", &waypoint)?;

        let new_name = new_name.trim().to_string();
        let call = Call::new(Method::Patch, "/api/bookmarks").body(Body::Json(json!({
            "oldName": waypoint.name,
            "lat": waypoint.lat,
            "lon": waypoint.lon,
            "newName": new_name,
        })));
        let context = RequestContext::from_input(&json!({
            "waypoint": waypoint,
            "newName": new_name,
        }));

        let rejection = if new_name.is_empty() {
            Some("new name is empty")
        } else if new_name == waypoint.name {
            Some("no change")
        } else {
            None
        };
        if let Some(message) = rejection {
            return Ok(self.reject(
                &call,
                message,
                GatewayEvent::WaypointRenameFailed {
                    original: waypoint,
                    new_name,
                    message: message.to_string(),
                },
                context,
            ));
        }

        info!("Renaming waypoint '{}' to '{}'", waypoint.name, new_name);
        self.emit(GatewayEvent::WaypointRenameStarted {
            waypoint: waypoint.clone(),
            new_name: new_name.clone(),
        });

        let renamed = Waypoint {
            name: new_name.clone(),
            ..waypoint.clone()
        };
        let offline_renamed = renamed.clone();
        let offline_original = waypoint.clone();
        let failed = waypoint.clone();
        Ok(self.execute(
            call,
            context,
            move || {
                let payload = payload(&offline_renamed);
                Outcome::new(
                    GatewayEvent::WaypointRenamed {
                        renamed: offline_renamed,
                        original: offline_original,
                    },
                    payload,
                )
            },
            move |body| {
                let renamed = serde_json::from_str::<Waypoint>(&body).unwrap_or(renamed);
                let payload = payload(&renamed);
                Outcome::new(
                    GatewayEvent::WaypointRenamed {
                        renamed,
                        original: waypoint,
                    },
                    payload,
                )
            },
            move |message| {
                vec![GatewayEvent::WaypointRenameFailed {
                    original: failed,
                    new_name,
                    message: message.to_string(),
                }]
            },
        ))
    }
}
