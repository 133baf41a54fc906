//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output (results and failures only)
//! - JSON output (--json flag), one line per received event
//! - Quiet mode for scripting (--quiet flag)

use serde_json::Value;

use waypoint_core::{Cluster, GatewayEvent, SearchEntry, Tag, Waypoint};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
#[derive(Debug, Clone, Copy)]
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Print one gateway event
    pub fn print_event(&self, event: &GatewayEvent) {
        if self.format == OutputFormat::Json {
            match serde_json::to_string(event) {
                Ok(line) => println!("{}", line),
                Err(e) => eprintln!("Warning: could not serialize {}: {}", event.name(), e),
            }
            return;
        }

        // Every failure is mirrored by exactly one RequestFailed; report that one
        if event.is_generic() {
            if let GatewayEvent::RequestFailed { kind, message, .. } = event {
                eprintln!("✗ {}: {}", kind, message);
            }
            return;
        }
        if event.is_failure() {
            return;
        }

        match event {
            GatewayEvent::WaypointsLoaded { waypoints } => self.print_waypoints(waypoints),
            GatewayEvent::WaypointAdded { saved, .. } => {
                self.success(&format!("Added {}", describe(saved)))
            }
            GatewayEvent::WaypointDeleted { waypoint } => {
                self.success(&format!("Deleted {}", describe(waypoint)))
            }
            GatewayEvent::WaypointRenamed { renamed, original } => {
                self.success(&format!("Renamed '{}' to '{}'", original.name, renamed.name))
            }
            GatewayEvent::TagsLoaded { tags, .. }
            | GatewayEvent::TagAdded { tags, .. }
            | GatewayEvent::TagDeleted { tags, .. } => self.print_tags(tags),
            GatewayEvent::ClustersLoaded { clusters, .. } => self.print_clusters(clusters),
            GatewayEvent::LocationLoaded { location } => match self.format {
                OutputFormat::Human => println!(
                    "Location: {:.6}, {:.6} (±{} m)",
                    location.lat, location.lon, location.accuracy_m
                ),
                _ => println!("{} {}", location.lat, location.lon),
            },
            GatewayEvent::ImportFinished { result, request } => {
                self.success(&format!("Imported {}", request.dir));
                if self.format == OutputFormat::Human {
                    println!("{}", pretty(result));
                }
            }
            GatewayEvent::SuggestionsLoaded { suggestions, .. } => {
                self.print_suggestions(suggestions)
            }
            GatewayEvent::RecentSearchEntriesLoaded { entries } => self.print_entries(entries),
            GatewayEvent::VersionLoaded { version } => match self.format {
                OutputFormat::Human => println!(
                    "{} {} (commit {})",
                    version.name, version.version, version.commit
                ),
                _ => println!("{}", version.version),
            },
            // Started events and the legacy recent-search list carry
            // nothing new for a terminal
            _ => {}
        }
    }

    /// Print a list of waypoints
    pub fn print_waypoints(&self, waypoints: &[Waypoint]) {
        match self.format {
            OutputFormat::Human => {
                if waypoints.is_empty() {
                    println!("No waypoints found.");
                    return;
                }
                for waypoint in waypoints {
                    let tags: Vec<&str> = waypoint.tags.iter().map(|t| t.display.as_str()).collect();
                    println!(
                        "{:<30} {:>10.5} {:>11.5}  {}",
                        truncate(&waypoint.name, 30),
                        waypoint.lat,
                        waypoint.lon,
                        tags.join(", ")
                    );
                }
                println!("\n{} waypoint(s)", waypoints.len());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(waypoints).unwrap_or_default());
            }
            OutputFormat::Quiet => {
                for waypoint in waypoints {
                    println!("{}", waypoint.name);
                }
            }
        }
    }

    /// Print a list of tags
    pub fn print_tags(&self, tags: &[Tag]) {
        match self.format {
            OutputFormat::Human => {
                if tags.is_empty() {
                    println!("No tags found.");
                    return;
                }
                for tag in tags {
                    println!("{}", tag.display);
                }
                println!("\n{} tag(s)", tags.len());
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(tags).unwrap_or_default());
            }
            OutputFormat::Quiet => {
                for tag in tags {
                    println!("{}", tag.raw);
                }
            }
        }
    }

    fn print_clusters(&self, clusters: &[Cluster]) {
        if clusters.is_empty() {
            self.message("No clusters.");
            return;
        }
        for cluster in clusters {
            match self.format {
                OutputFormat::Human => println!(
                    "{:>10.5} {:>11.5}  {:>5}  {}",
                    cluster.lat,
                    cluster.lon,
                    cluster.count,
                    cluster.name.as_deref().unwrap_or("")
                ),
                _ => println!("{} {} {}", cluster.lat, cluster.lon, cluster.count),
            }
        }
    }

    fn print_suggestions(&self, suggestions: &[Value]) {
        if suggestions.is_empty() {
            self.message("No suggestions.");
            return;
        }
        for suggestion in suggestions {
            println!("{}", suggestion_label(suggestion));
        }
    }

    fn print_entries(&self, entries: &[SearchEntry]) {
        if entries.is_empty() {
            self.message("No recent searches.");
            return;
        }
        for entry in entries {
            match (self.format, entry.lat, entry.lon) {
                (OutputFormat::Human, Some(lat), Some(lon)) => {
                    println!("{}  ({:.5}, {:.5})", entry.query, lat, lon)
                }
                _ => println!("{}", entry.query),
            }
        }
    }

    /// Print a raw response body (ignored in JSON mode, the event carries it)
    pub fn raw(&self, body: &str) {
        match self.format {
            OutputFormat::Human => match serde_json::from_str::<Value>(body) {
                Ok(value) => println!("{}", pretty(&value)),
                Err(_) => println!("{}", body),
            },
            OutputFormat::Quiet => println!("{}", body),
            OutputFormat::Json => {}
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

/// `'name' (lat, lon)`
fn describe(waypoint: &Waypoint) -> String {
    format!("'{}' ({}, {})", waypoint.name, waypoint.lat, waypoint.lon)
}

/// Best human label for a suggestion of unknown shape
fn suggestion_label(suggestion: &Value) -> String {
    match suggestion {
        Value::String(s) => s.clone(),
        Value::Object(map) => ["name", "label", "display", "query"]
            .iter()
            .find_map(|key| map.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| suggestion.to_string()),
        other => other.to_string(),
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Truncate a string to max characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
