//! Command handlers

pub mod config;
pub mod search;
pub mod system;
pub mod tag;
pub mod waypoint;

use anyhow::{bail, Result};

use waypoint_core::{ApiClient, CallHandle, GatewayResult};

use crate::output::Output;

/// Start one call, wait for its terminal event and print everything emitted
///
/// Fails when any failure event was received.
pub async fn observe<F>(client: &ApiClient, output: &Output, start: F) -> Result<()>
where
    F: FnOnce(&ApiClient) -> GatewayResult<CallHandle>,
{
    let mut events = client.subscribe();
    start(client)?.wait().await;

    let mut failure = None;
    while let Ok(event) = events.try_recv() {
        if failure.is_none() {
            failure = event.failure_message().map(str::to_string);
        }
        output.print_event(&event);
    }

    match failure {
        Some(message) => bail!(message),
        None => Ok(()),
    }
}
