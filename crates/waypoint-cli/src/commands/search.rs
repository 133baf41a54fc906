//! Search command handlers

use anyhow::Result;

use waypoint_core::ApiClient;

use super::observe;
use crate::output::Output;

pub async fn suggest(client: &ApiClient, query: String, output: &Output) -> Result<()> {
    if query.trim().is_empty() {
        output.message("Nothing to search for.");
        return Ok(());
    }
    observe(client, output, |client| Ok(client.suggest(&query))).await
}

pub async fn recent(client: &ApiClient, limit: u32, output: &Output) -> Result<()> {
    observe(client, output, |client| Ok(client.recent_searches(limit))).await
}

/// Record a search in the backend history
pub async fn history(
    client: &ApiClient,
    query: String,
    lat: Option<f64>,
    lon: Option<f64>,
    output: &Output,
) -> Result<()> {
    if query.trim().is_empty() {
        output.message("Nothing to record.");
        return Ok(());
    }
    observe(client, output, |client| {
        Ok(client.record_history(&query, lat, lon))
    })
    .await?;
    output.success(&format!("Recorded '{}'", query.trim()));
    Ok(())
}
