//! Tag representation and normalization
//!
//! The backend returns tags either as plain strings or as partially populated
//! objects. Everything leaving this crate carries the canonical [`Tag`] shape,
//! produced by [`normalize`]. Normalization is idempotent: feeding canonical
//! tags back through it yields the same values.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Canonical (enriched) tag record
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawTag")]
pub struct Tag {
    /// Tag value as stored by the backend
    pub raw: String,
    /// Optional emoji decoration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<String>,
    /// Text shown to users
    pub display: String,
}

impl Tag {
    /// Create a plain tag whose display text is the raw value
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        Self {
            display: raw.clone(),
            raw,
            emoji: None,
        }
    }

    /// Create a tag decorated with an emoji
    ///
    /// An empty emoji yields the same tag as [`Tag::new`].
    pub fn with_emoji(raw: impl Into<String>, emoji: impl Into<String>) -> Self {
        let raw = raw.into();
        let emoji = Some(emoji.into()).filter(|e| !e.is_empty());
        Self {
            display: compose_display(&raw, emoji.as_deref()),
            raw,
            emoji,
        }
    }
}

/// A tag value in any shape the backend (or a caller) may supply
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "Value")]
pub enum RawTag {
    /// Plain string tag
    Text(String),
    /// Object with some of `raw`, `emoji`, `display`
    Object(Map<String, Value>),
    /// Any other JSON value (number, bool, null, array)
    Scalar(Value),
}

impl From<Value> for RawTag {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => RawTag::Text(s),
            Value::Object(map) => RawTag::Object(map),
            other => RawTag::Scalar(other),
        }
    }
}

impl From<&str> for RawTag {
    fn from(value: &str) -> Self {
        RawTag::Text(value.to_string())
    }
}

impl From<String> for RawTag {
    fn from(value: String) -> Self {
        RawTag::Text(value)
    }
}

impl From<Tag> for RawTag {
    fn from(tag: Tag) -> Self {
        let mut map = Map::new();
        map.insert("raw".to_string(), Value::String(tag.raw));
        if let Some(emoji) = tag.emoji {
            map.insert("emoji".to_string(), Value::String(emoji));
        }
        map.insert("display".to_string(), Value::String(tag.display));
        RawTag::Object(map)
    }
}

impl From<&Tag> for RawTag {
    fn from(tag: &Tag) -> Self {
        RawTag::from(tag.clone())
    }
}

impl From<RawTag> for Tag {
    fn from(raw: RawTag) -> Self {
        raw.into_tag()
    }
}

impl RawTag {
    /// Whether this value carries nothing at all (JSON null)
    pub fn is_null(&self) -> bool {
        matches!(self, RawTag::Scalar(Value::Null))
    }

    /// Convert into the canonical tag shape
    pub fn into_tag(self) -> Tag {
        match self {
            RawTag::Text(s) => Tag::new(s),
            RawTag::Object(map) => object_to_tag(map),
            RawTag::Scalar(Value::Null) => Tag::new(""),
            RawTag::Scalar(value) => Tag::new(stringify(&value)),
        }
    }
}

/// Normalize a list of tag values into canonical tags
///
/// Null elements are dropped; every other element yields exactly one tag.
pub fn normalize<I, T>(tags: I) -> Vec<Tag>
where
    I: IntoIterator<Item = T>,
    T: Into<RawTag>,
{
    tags.into_iter()
        .map(Into::into)
        .filter(|raw: &RawTag| !raw.is_null())
        .map(RawTag::into_tag)
        .collect()
}

/// Normalize an arbitrary JSON value holding a tag list
///
/// `null`/missing yields an empty list; a single non-array value is treated
/// as a one-element list.
pub fn normalize_value(value: Option<&Value>) -> Vec<Tag> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(items)) => normalize(items.iter().cloned()),
        Some(other) => normalize([other.clone()]),
    }
}

/// Serde helper for tag list fields that may be absent, null, or mixed-shape
pub fn deserialize_tags<'de, D>(deserializer: D) -> Result<Vec<Tag>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(normalize_value(value.as_ref()))
}

/// Append `tag` to `current` unless a tag with the same raw value exists
pub fn merge_tag(current: &[Tag], tag: &str) -> Vec<Tag> {
    let mut merged = normalize(current);
    if !merged.iter().any(|t| t.raw == tag) {
        merged.push(Tag::new(tag));
    }
    merged
}

/// Remove every occurrence of `tag` (by raw value) from `current`
pub fn remove_tag(current: &[Tag], tag: &str) -> Vec<Tag> {
    normalize(current)
        .into_iter()
        .filter(|t| t.raw != tag)
        .collect()
}

/// Drop later tags whose raw value was already seen
pub fn dedupe(tags: Vec<Tag>) -> Vec<Tag> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter()
        .filter(|t| seen.insert(t.raw.clone()))
        .collect()
}

fn object_to_tag(map: Map<String, Value>) -> Tag {
    let raw = string_field(&map, "raw");
    let display = string_field(&map, "display");
    let emoji = string_field(&map, "emoji");

    match (raw, display) {
        (Some(raw), Some(display)) => Tag {
            raw,
            emoji,
            display,
        },
        (Some(raw), None) => {
            // An empty emoji must not leave a leading space in the display
            let emoji = emoji.filter(|e| !e.is_empty());
            Tag {
                display: compose_display(&raw, emoji.as_deref()),
                raw,
                emoji,
            }
        }
        (None, Some(display)) => Tag {
            raw: display.clone(),
            emoji,
            display,
        },
        (None, None) => {
            let text = stringify(&Value::Object(map));
            Tag {
                raw: text.clone(),
                emoji,
                display: text,
            }
        }
    }
}

fn compose_display(raw: &str, emoji: Option<&str>) -> String {
    match emoji {
        Some(emoji) => format!("{} {}", emoji, raw),
        None => raw.to_string(),
    }
}

/// Field as a string; absent and null count as missing
fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(stringify(other)),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{}", other)),
    }
}
