//! Per-waypoint tag operations

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::waypoints::{identity_params, validated};
use super::{payload, ApiClient, Call, CallHandle, Outcome};
use crate::error::{GatewayError, GatewayResult};
use crate::events::{GatewayEvent, RequestContext};
use crate::models::Waypoint;
use crate::tags::{dedupe, merge_tag, normalize, normalize_value, remove_tag, Tag};
use crate::transport::{with_query, Body, Method};

/// Tag list from a bare array or an object with a `tags` field
fn parse_tags(body: &str) -> Option<Vec<Tag>> {
    match serde_json::from_str::<Value>(body).ok()? {
        Value::Array(items) => Some(normalize(items)),
        Value::Object(map) => map.get("tags").map(|tags| normalize_value(Some(tags))),
        _ => None,
    }
}

fn checked_tag(operation: &str, tag: &str) -> GatewayResult<String> {
    let tag = tag.trim();
    if tag.is_empty() {
        warn!("{} rejected: tag is empty", operation);
        return Err(GatewayError::Validation("tag is empty".to_string()));
    }
    Ok(tag.to_string())
}

impl ApiClient {
    /// Load the tags of one waypoint
    pub fn fetch_tags(&self, waypoint: Waypoint) -> GatewayResult<CallHandle> {
        validated("fetch tags", &waypoint)?;

        let mut params = identity_params(&waypoint);
        params.push(("emoji", "true".to_string()));
        let call = Call::new(Method::Get, with_query("/api/tags", &params));
        let context = RequestContext::from_input(&waypoint);
        self.emit(GatewayEvent::TagsLoadStarted {
            waypoint: waypoint.clone(),
        });

        let echoed = waypoint.clone();
        let failed = waypoint.clone();
        Ok(self.execute(
            call,
            context,
            move || {
                let tags: Vec<Tag> = Vec::new();
                let payload = payload(&tags);
                Outcome::new(
                    GatewayEvent::TagsLoaded {
                        waypoint: echoed,
                        tags,
                    },
                    payload,
                )
            },
            move |body| {
                let tags = parse_tags(&body).unwrap_or_else(|| {
                    warn!("Unreadable tag list for '{}', treating as empty", waypoint.name);
                    Vec::new()
                });
                let payload = payload(&tags);
                Outcome::new(GatewayEvent::TagsLoaded { waypoint, tags }, payload)
            },
            move |message| {
                vec![GatewayEvent::TagsLoadFailed {
                    waypoint: failed,
                    message: message.to_string(),
                }]
            },
        ))
    }

    /// Attach a tag to a waypoint
    ///
    /// The resulting list never holds the same raw value twice.
    pub fn add_tag(&self, waypoint: Waypoint, tag: &str) -> GatewayResult<CallHandle> {
        validated("add tag", &waypoint)?;
        let tag = checked_tag("add tag", tag)?;

        let call = Call::new(Method::Post, with_query("/api/tags", &[("emoji", "true")])).body(
            Body::Json(json!({
                "name": waypoint.name,
                "lat": waypoint.lat,
                "lon": waypoint.lon,
                "tags": [tag],
            })),
        );
        let context = RequestContext::from_input(&json!({ "waypoint": waypoint, "tag": tag }));
        debug!("Adding tag '{}' to '{}'", tag, waypoint.name);
        self.emit(GatewayEvent::TagAddStarted {
            waypoint: waypoint.clone(),
            tag: tag.clone(),
        });

        let (echoed, echoed_tag) = (waypoint.clone(), tag.clone());
        let (failed, failed_tag) = (waypoint.clone(), tag.clone());
        Ok(self.execute(
            call,
            context,
            move || {
                let tags = merge_tag(&echoed.tags, &echoed_tag);
                let payload = payload(&tags);
                Outcome::new(
                    GatewayEvent::TagAdded {
                        waypoint: echoed,
                        tags,
                        tag: echoed_tag,
                    },
                    payload,
                )
            },
            move |body| {
                let tags = match parse_tags(&body) {
                    Some(tags) => dedupe(tags),
                    None => merge_tag(&waypoint.tags, &tag),
                };
                let payload = payload(&tags);
                Outcome::new(GatewayEvent::TagAdded { waypoint, tags, tag }, payload)
            },
            move |message| {
                vec![GatewayEvent::TagAddFailed {
                    waypoint: failed,
                    tag: failed_tag,
                    message: message.to_string(),
                }]
            },
        ))
    }

    /// Detach a tag from a waypoint
    pub fn delete_tag(&self, waypoint: Waypoint, tag: &str) -> GatewayResult<CallHandle> {
        validated("delete tag", &waypoint)?;
        let tag = checked_tag("delete tag", tag)?;

        let mut params = identity_params(&waypoint);
        params.push(("tag", tag.clone()));
        params.push(("emoji", "true".to_string()));
        let call = Call::new(Method::Delete, with_query("/api/tags", &params));
        let context = RequestContext::from_input(&json!({ "waypoint": waypoint, "tag": tag }));
        debug!("Removing tag '{}' from '{}'", tag, waypoint.name);
        self.emit(GatewayEvent::TagDeleteStarted {
            waypoint: waypoint.clone(),
            tag: tag.clone(),
        });

        let (echoed, echoed_tag) = (waypoint.clone(), tag.clone());
        let (failed, failed_tag) = (waypoint.clone(), tag.clone());
        Ok(self.execute(
            call,
            context,
            move || {
                let tags = remove_tag(&echoed.tags, &echoed_tag);
                let payload = payload(&tags);
                Outcome::new(
                    GatewayEvent::TagDeleted {
                        waypoint: echoed,
                        tags,
                        tag: echoed_tag,
                    },
                    payload,
                )
            },
            move |body| {
                let tags = parse_tags(&body).unwrap_or_else(|| remove_tag(&waypoint.tags, &tag));
                let payload = payload(&tags);
                Outcome::new(GatewayEvent::TagDeleted { waypoint, tags, tag }, payload)
            },
            move |message| {
                vec![GatewayEvent::TagDeleteFailed {
                    waypoint: failed,
                    tag: failed_tag,
                    message: message.to_string(),
                }]
            },
        ))
    }

    /// Every tag in use across all waypoints
    ///
    /// Returns directly instead of emitting events; offline yields an empty
    /// list.
    pub async fn distinct_tags(&self) -> GatewayResult<Vec<Tag>> {
        let Some(transport) = self.inner.transport.as_ref() else {
            return Ok(Vec::new());
        };

        let path = with_query("/api/tags", &[("distinct", "true"), ("emoji", "true")]);
        let body = transport.send(Method::Get, &path, Body::Empty, None).await?;
        Ok(parse_tags(&body).map(dedupe).unwrap_or_else(|| {
            warn!("Unreadable distinct tag list, treating as empty");
            Vec::new()
        }))
    }
}
