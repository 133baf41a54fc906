//! Data models for the waypoint backend
//!
//! Defines the transfer objects exchanged with the backend: waypoints,
//! clusters, location fixes, version info and search history entries.
//! All of them are transient; the client keeps none of them around.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::GatewayError;
use crate::tags::{deserialize_tags, Tag};

/// A saved location
///
/// Identity is the triple `(name, lat, lon)`; there is no separate ID.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Waypoint {
    /// Display name
    pub name: String,
    /// Latitude in degrees
    pub lat: f64,
    /// Longitude in degrees
    pub lon: f64,
    /// Tags, always in canonical form
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<Tag>,
}

impl Waypoint {
    /// Create an untagged waypoint
    pub fn new(name: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            name: name.into(),
            lat,
            lon,
            tags: Vec::new(),
        }
    }

    /// Builder-style tag assignment
    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<crate::tags::RawTag>,
    {
        self.tags = crate::tags::normalize(tags);
        self
    }

    /// Check that the identifying triple is usable
    pub fn validate_identity(&self) -> Result<(), GatewayError> {
        if self.name.trim().is_empty() {
            return Err(GatewayError::Validation(
                "waypoint name is empty".to_string(),
            ));
        }
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(GatewayError::Validation(format!(
                "waypoint '{}' has invalid latitude {}",
                self.name, self.lat
            )));
        }
        if !self.lon.is_finite() || !(-180.0..=180.0).contains(&self.lon) {
            return Err(GatewayError::Validation(format!(
                "waypoint '{}' has invalid longitude {}",
                self.name, self.lon
            )));
        }
        Ok(())
    }
}

/// A map cluster of waypoints
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cluster {
    /// Cluster centroid latitude
    pub lat: f64,
    /// Cluster centroid longitude
    pub lon: f64,
    /// Number of points in the cluster
    #[serde(default)]
    pub count: u64,
    /// Name, when the cluster is a single waypoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_tags")]
    pub tags: Vec<Tag>,
}

/// Parameters of a cluster query
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ClusterQuery {
    /// Map zoom level
    pub zoom: f64,
    /// Grid cell size in pixels
    pub grid: u32,
    /// Only cluster saved bookmarks
    #[serde(default)]
    pub bookmarks_only: bool,
}

/// Current device location as reported by the backend
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub accuracy_m: f64,
}

/// Backend version information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionInfo {
    #[serde(default = "default_version_name")]
    pub name: String,
    #[serde(default = "unknown")]
    pub version: String,
    #[serde(default = "unknown")]
    pub commit: String,
}

impl VersionInfo {
    /// Placeholder used in offline mode
    pub fn offline() -> Self {
        Self {
            name: default_version_name(),
            version: "offline".to_string(),
            commit: "n/a (backend disabled)".to_string(),
        }
    }

    /// Placeholder used when the backend answer cannot be parsed
    pub fn unknown() -> Self {
        Self {
            name: default_version_name(),
            version: unknown(),
            commit: unknown(),
        }
    }
}

fn default_version_name() -> String {
    "waypoint-server".to_string()
}

fn unknown() -> String {
    "unknown".to_string()
}

/// One entry of the search history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchEntry {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
}

impl SearchEntry {
    /// Entry without coordinates
    pub fn plain(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            lat: None,
            lon: None,
        }
    }
}

/// Recent searches in both the legacy and enriched shapes
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct RecentSearches {
    /// Legacy plain query list
    pub queries: Vec<String>,
    /// Enriched entries; synthesized from `queries` when the backend omits them
    pub entries: Vec<SearchEntry>,
}

impl RecentSearches {
    /// Parse the backend payload
    ///
    /// Accepts a bare array of strings, or an object with a legacy list
    /// (`queries` or `items`) and an optional `entries` list.
    pub fn from_json(body: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(body).ok()?;
        let (legacy, entries) = match &value {
            Value::Array(_) => (Some(&value), None),
            Value::Object(map) => (
                map.get("queries").or_else(|| map.get("items")),
                map.get("entries"),
            ),
            _ => return None,
        };

        let queries: Vec<String> = match legacy {
            Some(v) => serde_json::from_value(v.clone()).ok()?,
            None => Vec::new(),
        };

        let entries = match entries {
            Some(v) if !v.is_null() => serde_json::from_value(v.clone()).ok()?,
            _ => queries.iter().map(SearchEntry::plain).collect(),
        };

        Some(Self { queries, entries })
    }
}

/// Request body for a directory import
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImportRequest {
    pub dir: String,
    #[serde(default)]
    pub recursive: bool,
}

/// Parse a list payload that is either a bare array or wrapped under `key`
///
/// Returns `None` when the body is not valid JSON or does not match.
/// Elements that do not deserialize are skipped.
pub(crate) fn parse_list<T: DeserializeOwned>(body: &str, key: &str) -> Option<Vec<T>> {
    let value: Value = serde_json::from_str(body).ok()?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove(key)? {
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            _ => return None,
        },
        _ => return None,
    };

    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    if parsed.len() < total {
        warn!(
            "Skipped {} malformed '{}' entries",
            total - parsed.len(),
            key
        );
    }
    Some(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_waypoint_tags_normalized_on_deserialize() {
        let wp: Waypoint = serde_json::from_value(json!({
            "name": "Summit",
            "lat": 46.5,
            "lon": 8.0,
            "tags": ["peak", { "raw": "view", "emoji": "👀" }]
        }))
        .unwrap();

        assert_eq!(wp.tags[0], Tag::new("peak"));
        assert_eq!(wp.tags[1].display, "👀 view");
    }

    #[test]
    fn test_waypoint_missing_tags() {
        let wp: Waypoint =
            serde_json::from_value(json!({ "name": "A", "lat": 1.0, "lon": 2.0, "tags": null }))
                .unwrap();
        assert!(wp.tags.is_empty());
    }

    #[test]
    fn test_validate_identity() {
        assert!(Waypoint::new("Camp", 45.0, 7.0).validate_identity().is_ok());
        assert!(Waypoint::new("  ", 45.0, 7.0).validate_identity().is_err());
        assert!(Waypoint::new("Camp", f64::NAN, 7.0)
            .validate_identity()
            .is_err());
        assert!(Waypoint::new("Camp", 45.0, 190.0)
            .validate_identity()
            .is_err());
    }

    #[test]
    fn test_parse_list_shapes() {
        let bare: Vec<Waypoint> =
            parse_list(r#"[{"name":"A","lat":1,"lon":2}]"#, "waypoints").unwrap();
        assert_eq!(bare.len(), 1);

        let wrapped: Vec<Waypoint> =
            parse_list(r#"{"waypoints":[{"name":"A","lat":1,"lon":2}]}"#, "waypoints").unwrap();
        assert_eq!(wrapped[0].name, "A");

        assert!(parse_list::<Waypoint>("not json", "waypoints").is_none());

        let partial: Vec<Waypoint> =
            parse_list(r#"[{"name":"A","lat":1,"lon":2},{"bogus":true}]"#, "waypoints").unwrap();
        assert_eq!(partial.len(), 1);
        assert!(parse_list::<Waypoint>(r#"{"other":[]}"#, "waypoints").is_none());
    }

    #[test]
    fn test_recent_searches_legacy_only() {
        let recent = RecentSearches::from_json(r#"["cafe","park"]"#).unwrap();
        assert_eq!(recent.queries, vec!["cafe", "park"]);
        assert_eq!(recent.entries[1], SearchEntry::plain("park"));
    }

    #[test]
    fn test_recent_searches_enriched() {
        let recent = RecentSearches::from_json(
            r#"{"queries":["cafe"],"entries":[{"query":"cafe","lat":1.5,"lon":2.5}]}"#,
        )
        .unwrap();
        assert_eq!(recent.entries[0].lat, Some(1.5));
        assert_eq!(recent.queries, vec!["cafe"]);
    }

    #[test]
    fn test_recent_searches_garbage() {
        assert!(RecentSearches::from_json("{").is_none());
        assert!(RecentSearches::from_json("42").is_none());
    }

    #[test]
    fn test_version_defaults() {
        let v: VersionInfo = serde_json::from_str(r#"{"version":"1.2.3"}"#).unwrap();
        assert_eq!(v.version, "1.2.3");
        assert_eq!(v.commit, "unknown");
        assert_eq!(VersionInfo::offline().version, "offline");
    }
}
