//! Waypoint command handlers

use anyhow::Result;
use clap::Args;

use waypoint_core::{ApiClient, Waypoint};

use super::observe;
use crate::output::Output;

/// Identifying triple of a waypoint
#[derive(Args, Debug, Clone)]
pub struct WaypointArgs {
    /// Waypoint name
    pub name: String,
    /// Latitude in degrees
    #[arg(allow_negative_numbers = true)]
    pub lat: f64,
    /// Longitude in degrees
    #[arg(allow_negative_numbers = true)]
    pub lon: f64,
}

impl WaypointArgs {
    pub fn waypoint(&self) -> Waypoint {
        Waypoint::new(self.name.clone(), self.lat, self.lon)
    }
}

/// List all waypoints
pub async fn list(client: &ApiClient, output: &Output) -> Result<()> {
    observe(client, output, |client| Ok(client.get_waypoints())).await
}

/// Save a new waypoint
pub async fn add(
    client: &ApiClient,
    args: WaypointArgs,
    tags: Vec<String>,
    output: &Output,
) -> Result<()> {
    let waypoint = args.waypoint().with_tags(tags);
    observe(client, output, |client| client.add_waypoint(waypoint)).await
}

/// Delete a waypoint
pub async fn delete(client: &ApiClient, args: WaypointArgs, output: &Output) -> Result<()> {
    observe(client, output, |client| {
        client.delete_waypoint(args.waypoint())
    })
    .await
}

/// Rename a waypoint
pub async fn rename(
    client: &ApiClient,
    args: WaypointArgs,
    new_name: String,
    output: &Output,
) -> Result<()> {
    observe(client, output, |client| {
        client.rename_waypoint(args.waypoint(), &new_name)
    })
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;
    use waypoint_core::Config;

    fn offline() -> (ApiClient, Output) {
        (
            ApiClient::new(Config::offline()).unwrap(),
            Output::new(OutputFormat::Quiet),
        )
    }

    fn camp() -> WaypointArgs {
        WaypointArgs {
            name: "Camp".to_string(),
            lat: 46.5,
            lon: 7.25,
        }
    }

    #[tokio::test]
    async fn test_offline_commands_succeed() {
        let (client, output) = offline();
        list(&client, &output).await.unwrap();
        add(&client, camp(), vec!["lake".to_string()], &output)
            .await
            .unwrap();
        delete(&client, camp(), &output).await.unwrap();
        rename(&client, camp(), "Base".to_string(), &output)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unchanged_rename_fails() {
        let (client, output) = offline();
        let err = rename(&client, camp(), "Camp".to_string(), &output)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "no change");
    }

    #[tokio::test]
    async fn test_invalid_waypoint_is_an_error() {
        let (client, output) = offline();
        let args = WaypointArgs {
            lat: 123.0,
            ..camp()
        };
        assert!(delete(&client, args, &output).await.is_err());
    }
}
