//! Cluster, location, import, version and raw request handlers

use anyhow::{Context, Result};

use waypoint_core::{ApiClient, Body, ClusterQuery, ImportRequest, Method, RequestOptions};

use super::observe;
use crate::output::Output;

/// Load map clusters
pub async fn clusters(
    client: &ApiClient,
    zoom: f64,
    grid: u32,
    bookmarks_only: bool,
    output: &Output,
) -> Result<()> {
    let query = ClusterQuery {
        zoom,
        grid,
        bookmarks_only,
    };
    observe(client, output, |client| client.clusters(query)).await
}

pub async fn location(client: &ApiClient, output: &Output) -> Result<()> {
    observe(client, output, |client| Ok(client.location())).await
}

/// Import waypoints from a directory on the backend host
pub async fn import(client: &ApiClient, dir: String, recursive: bool, output: &Output) -> Result<()> {
    let request = ImportRequest { dir, recursive };
    observe(client, output, |client| client.import(request)).await
}

pub async fn version(client: &ApiClient, output: &Output) -> Result<()> {
    observe(client, output, |client| Ok(client.version())).await
}

/// Call an arbitrary endpoint and print the raw response body
pub async fn request(
    client: &ApiClient,
    path: String,
    method: Method,
    body: Option<String>,
    output: &Output,
) -> Result<()> {
    let body = match body {
        Some(text) => {
            let value: serde_json::Value =
                serde_json::from_str(&text).context("Request body is not valid JSON")?;
            Body::from(value)
        }
        None => Body::Empty,
    };

    let printer = *output;
    let options = RequestOptions::new(method)
        .body(body)
        .context(serde_json::json!({ "path": path }))
        .on_success(move |body| printer.raw(&body));

    observe(client, output, |client| Ok(client.request(&path, options))).await
}
