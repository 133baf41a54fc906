//! Waypoint CLI
//!
//! Command-line observer for the waypoint gateway client: every subcommand
//! drives one backend operation and prints the events it produces.

use std::fs::OpenOptions;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use waypoint_core::{ApiClient, Config, Method};

mod commands;
mod output;

use commands::waypoint::WaypointArgs;
use output::{Output, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "waypoint")]
#[command(about = "Waypoint - talk to the local waypoint backend")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON (one event per line)
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Backend port (negative disables the backend)
    #[arg(long, global = true, allow_negative_numbers = true, conflicts_with = "offline")]
    port: Option<i32>,

    /// Resolve every call locally without a backend
    #[arg(long, global = true)]
    offline: bool,

    /// Request timeout in milliseconds
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List all waypoints
    #[command(alias = "ls")]
    List,
    /// Save a new waypoint
    Add {
        #[command(flatten)]
        waypoint: WaypointArgs,
        /// Tags to attach
        #[arg(short, long)]
        tag: Vec<String>,
    },
    /// Delete a waypoint
    #[command(alias = "rm")]
    Delete {
        #[command(flatten)]
        waypoint: WaypointArgs,
    },
    /// Rename a waypoint
    Rename {
        #[command(flatten)]
        waypoint: WaypointArgs,
        /// New name
        new_name: String,
    },
    /// Show the tags of a waypoint
    Tags {
        #[command(flatten)]
        waypoint: WaypointArgs,
    },
    /// Add or remove a tag
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },
    /// List every tag in use
    DistinctTags,
    /// Load map clusters
    Clusters {
        /// Zoom level
        zoom: f64,
        /// Grid cell size in pixels
        grid: u32,
        /// Only cluster saved bookmarks
        #[arg(long)]
        bookmarks_only: bool,
    },
    /// Show the current device location
    Location,
    /// Import waypoints from a directory on the backend host
    Import {
        /// Directory to import
        dir: String,
        /// Descend into subdirectories
        #[arg(short, long)]
        recursive: bool,
    },
    /// Search suggestions
    Suggest {
        /// Partial query
        query: String,
    },
    /// Recent searches
    Recent {
        /// Maximum number of entries
        #[arg(short, long, default_value_t = 10)]
        limit: u32,
    },
    /// Record a search in the history
    History {
        /// Search query
        query: String,
        #[arg(long, allow_negative_numbers = true)]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true)]
        lon: Option<f64>,
    },
    /// Show backend version
    Version,
    /// Call an arbitrary backend endpoint
    Request {
        /// Path including query string, e.g. /api/version
        path: String,
        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: Method,
        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,
    },
    /// Show configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Debug)]
enum TagCommands {
    /// Attach a tag to a waypoint
    Add {
        #[command(flatten)]
        waypoint: WaypointArgs,
        /// Tag to attach
        tag: String,
    },
    /// Detach a tag from a waypoint
    #[command(alias = "remove")]
    Rm {
        #[command(flatten)]
        waypoint: WaypointArgs,
        /// Tag to detach
        tag: String,
    },
}

#[derive(Subcommand, Debug, Clone, Copy)]
enum ConfigCommands {
    /// Show effective configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let mut config = Config::load().context("Failed to load configuration")?;
    apply_overrides(&mut config, &cli);
    init_logging(&config, cli.verbose);

    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => commands::config::show(&config, &output),
        };
    }

    let client = ApiClient::new(config).context("Failed to create gateway client")?;
    debug!("Running {:?}", cli.command);

    match cli.command {
        Commands::List => commands::waypoint::list(&client, &output).await,
        Commands::Add { waypoint, tag } => {
            commands::waypoint::add(&client, waypoint, tag, &output).await
        }
        Commands::Delete { waypoint } => commands::waypoint::delete(&client, waypoint, &output).await,
        Commands::Rename { waypoint, new_name } => {
            commands::waypoint::rename(&client, waypoint, new_name, &output).await
        }
        Commands::Tags { waypoint } => commands::tag::show(&client, waypoint, &output).await,
        Commands::Tag { command } => match command {
            TagCommands::Add { waypoint, tag } => {
                commands::tag::add(&client, waypoint, tag, &output).await
            }
            TagCommands::Rm { waypoint, tag } => {
                commands::tag::remove(&client, waypoint, tag, &output).await
            }
        },
        Commands::DistinctTags => commands::tag::distinct(&client, &output).await,
        Commands::Clusters {
            zoom,
            grid,
            bookmarks_only,
        } => commands::system::clusters(&client, zoom, grid, bookmarks_only, &output).await,
        Commands::Location => commands::system::location(&client, &output).await,
        Commands::Import { dir, recursive } => {
            commands::system::import(&client, dir, recursive, &output).await
        }
        Commands::Suggest { query } => commands::search::suggest(&client, query, &output).await,
        Commands::Recent { limit } => commands::search::recent(&client, limit, &output).await,
        Commands::History { query, lat, lon } => {
            commands::search::history(&client, query, lat, lon, &output).await
        }
        Commands::Version => commands::system::version(&client, &output).await,
        Commands::Request { path, method, body } => {
            commands::system::request(&client, path, method, body, &output).await
        }
        Commands::Config { .. } => Ok(()), // Handled above
    }
}

/// Fold command-line overrides into the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if cli.offline {
        config.api_port = -1;
    } else if let Some(port) = cli.port {
        config.api_port = port;
    }
    if let Some(timeout_ms) = cli.timeout_ms {
        config.request_timeout_ms = timeout_ms;
    }
}

/// Initialize logging to stderr, or to `log_file` when configured
///
/// `RUST_LOG` takes precedence over the `--verbose` default.
fn init_logging(config: &Config, verbose: bool) {
    let log_level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "waypoint_core={},waypoint_cli={}",
            log_level, log_level
        ))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false);

    // Ignore the error if a subscriber is already installed
    if let Some(path) = &config.log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                let _ = subscriber.with_writer(file).try_init();
                return;
            }
            Err(e) => {
                eprintln!("Warning: Could not open log file {:?}: {}", path, e);
            }
        }
    }
    let _ = subscriber.with_writer(std::io::stderr).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_negative_coordinates() {
        let cli = parse(&["waypoint", "add", "Cape", "-33.9", "-18.4", "-t", "coast"]);
        match cli.command {
            Commands::Add { waypoint, tag } => {
                assert_eq!(waypoint.lat, -33.9);
                assert_eq!(waypoint.lon, -18.4);
                assert_eq!(tag, vec!["coast"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_port_conflicts_with_offline() {
        assert!(Cli::try_parse_from(["waypoint", "--port", "1", "--offline", "list"]).is_err());
    }

    #[test]
    fn test_overrides() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            &parse(&["waypoint", "--port", "5000", "--timeout-ms", "250", "version"]),
        );
        assert_eq!(config.api_port, 5000);
        assert_eq!(config.request_timeout_ms, 250);

        apply_overrides(&mut config, &parse(&["waypoint", "--offline", "version"]));
        assert!(config.is_offline());
    }

    #[test]
    fn test_request_method_parsing() {
        let cli = parse(&["waypoint", "request", "/api/x", "-m", "patch", "-b", "{}"]);
        match cli.command {
            Commands::Request { method, body, .. } => {
                assert_eq!(method, Method::Patch);
                assert_eq!(body.as_deref(), Some("{}"));
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["waypoint", "request", "/x", "-m", "TRACE"]).is_err());
    }

    #[test]
    fn test_tag_subcommands() {
        let cli = parse(&["waypoint", "tag", "rm", "Hut", "46.1", "7.9", "ski"]);
        assert!(matches!(
            cli.command,
            Commands::Tag {
                command: TagCommands::Rm { .. }
            }
        ));
    }
}
