//! Tag command handlers

use anyhow::Result;

use waypoint_core::ApiClient;

use super::observe;
use super::waypoint::WaypointArgs;
use crate::output::Output;

/// Show the tags of a waypoint
pub async fn show(client: &ApiClient, args: WaypointArgs, output: &Output) -> Result<()> {
    observe(client, output, |client| client.fetch_tags(args.waypoint())).await
}

/// Attach a tag
pub async fn add(client: &ApiClient, args: WaypointArgs, tag: String, output: &Output) -> Result<()> {
    observe(client, output, |client| client.add_tag(args.waypoint(), &tag)).await
}

/// Detach a tag
pub async fn remove(
    client: &ApiClient,
    args: WaypointArgs,
    tag: String,
    output: &Output,
) -> Result<()> {
    observe(client, output, |client| {
        client.delete_tag(args.waypoint(), &tag)
    })
    .await
}

/// List every tag in use across all waypoints
pub async fn distinct(client: &ApiClient, output: &Output) -> Result<()> {
    let tags = client.distinct_tags().await?;
    output.print_tags(&tags);
    Ok(())
}
