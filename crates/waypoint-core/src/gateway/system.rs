//! Map clusters, device location, directory import and backend version

use serde_json::{Map, Value};
use tracing::{info, warn};

use super::{offline, payload, ApiClient, Call, CallHandle, Outcome};
use crate::error::{GatewayError, GatewayResult};
use crate::events::{GatewayEvent, RequestContext};
use crate::models::{parse_list, Cluster, ClusterQuery, ImportRequest, Location, VersionInfo};
use crate::transport::{with_query, Body, Method};

fn cluster_path(query: &ClusterQuery) -> String {
    let mut params = vec![
        ("zoom", query.zoom.to_string()),
        ("grid", query.grid.to_string()),
    ];
    if query.bookmarks_only {
        params.push(("bookmarksOnly", "1".to_string()));
    }
    with_query("/api/clusters", &params)
}

impl ApiClient {
    /// Load map clusters for a zoom level and grid size
    pub fn clusters(&self, query: ClusterQuery) -> GatewayResult<CallHandle> {
        if !query.zoom.is_finite() || query.zoom < 0.0 || query.grid == 0 {
            warn!("clusters rejected: zoom {} grid {}", query.zoom, query.grid);
            return Err(GatewayError::Validation(format!(
                "invalid cluster query (zoom {}, grid {})",
                query.zoom, query.grid
            )));
        }

        let call = Call::new(Method::Get, cluster_path(&query));
        let context = RequestContext::from_input(&query);
        self.emit(GatewayEvent::ClustersLoadStarted { query });

        Ok(self.execute(
            call,
            context,
            move || {
                Outcome::new(
                    GatewayEvent::ClustersLoaded {
                        clusters: Vec::new(),
                        query,
                    },
                    Value::Array(Vec::new()),
                )
            },
            move |body| {
                let clusters = parse_list::<Cluster>(&body, "clusters").unwrap_or_else(|| {
                    warn!("Unreadable cluster list, treating as empty");
                    Vec::new()
                });
                let payload = payload(&clusters);
                Outcome::new(GatewayEvent::ClustersLoaded { clusters, query }, payload)
            },
            move |message| {
                vec![GatewayEvent::ClustersLoadFailed {
                    query,
                    message: message.to_string(),
                }]
            },
        ))
    }

    /// Load the device location known to the backend
    pub fn location(&self) -> CallHandle {
        let call = Call::new(Method::Get, "/api/location");
        self.emit(GatewayEvent::LocationLoadStarted);

        self.execute(
            call,
            RequestContext::default(),
            || {
                let location = offline::location();
                Outcome::new(GatewayEvent::LocationLoaded { location }, payload(&location))
            },
            |body| {
                let location = serde_json::from_str::<Location>(&body).unwrap_or_else(|_| {
                    warn!("Unreadable location, reporting 0,0");
                    Location::default()
                });
                Outcome::new(GatewayEvent::LocationLoaded { location }, payload(&location))
            },
            |message| {
                vec![GatewayEvent::LocationLoadFailed {
                    message: message.to_string(),
                }]
            },
        )
    }

    /// Import waypoints from a directory on the backend host
    ///
    /// Uses the import timeout instead of the request timeout.
    pub fn import(&self, request: ImportRequest) -> GatewayResult<CallHandle> {
        let request = ImportRequest {
            dir: request.dir.trim().to_string(),
            ..request
        };
        if request.dir.is_empty() {
            warn!("import rejected: directory is empty");
            return Err(GatewayError::Validation(
                "import directory is empty".to_string(),
            ));
        }

        let call = Call::new(Method::Post, "/api/import")
            .body(Body::Json(payload(&request)))
            .timeout(self.config().import_timeout());
        let context = RequestContext::from_input(&request);
        info!(
            "Importing from {} (recursive: {})",
            request.dir, request.recursive
        );
        self.emit(GatewayEvent::ImportStarted {
            request: request.clone(),
        });

        let echoed = request.clone();
        let failed = request.clone();
        Ok(self.execute(
            call,
            context,
            move || {
                let result = payload(&echoed);
                Outcome::new(
                    GatewayEvent::ImportFinished {
                        result: result.clone(),
                        request: echoed,
                    },
                    result,
                )
            },
            move |body| {
                let result = serde_json::from_str::<Value>(&body)
                    .unwrap_or_else(|_| Value::Object(Map::new()));
                Outcome::new(
                    GatewayEvent::ImportFinished {
                        result: result.clone(),
                        request,
                    },
                    result,
                )
            },
            move |message| {
                vec![GatewayEvent::ImportFailed {
                    request: failed,
                    message: message.to_string(),
                }]
            },
        ))
    }

    /// Load backend version information
    pub fn version(&self) -> CallHandle {
        let call = Call::new(Method::Get, "/api/version");
        self.emit(GatewayEvent::VersionLoadStarted);

        self.execute(
            call,
            RequestContext::default(),
            || {
                let version = offline::version();
                let payload = payload(&version);
                Outcome::new(GatewayEvent::VersionLoaded { version }, payload)
            },
            |body| {
                let version = serde_json::from_str::<VersionInfo>(&body).unwrap_or_else(|_| {
                    warn!("Unreadable version info");
                    VersionInfo::unknown()
                });
                let payload = payload(&version);
                Outcome::new(GatewayEvent::VersionLoaded { version }, payload)
            },
            |message| {
                vec![GatewayEvent::VersionLoadFailed {
                    message: message.to_string(),
                }]
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::Config;
    use crate::testing::{Reply, TestServer};
    use serde_json::json;
    use std::time::Duration;

    fn query() -> ClusterQuery {
        ClusterQuery {
            zoom: 12.5,
            grid: 64,
            bookmarks_only: true,
        }
    }

    #[test]
    fn test_cluster_path() {
        assert_eq!(
            cluster_path(&query()),
            "/api/clusters?zoom=12.5&grid=64&bookmarksOnly=1"
        );
        let all = ClusterQuery {
            bookmarks_only: false,
            ..query()
        };
        assert_eq!(cluster_path(&all), "/api/clusters?zoom=12.5&grid=64");
    }

    #[test]
    fn test_invalid_cluster_query() {
        let client = offline_client();
        let bad = ClusterQuery { grid: 0, ..query() };
        assert!(client.clusters(bad).unwrap_err().is_validation());
    }

    #[test]
    fn test_offline_placeholders() {
        let client = offline_client();
        let mut rx = client.subscribe();

        client.clusters(query()).unwrap();
        client.location();
        client.version();

        let events = drain(&mut rx);
        assert_eq!(
            names(&events),
            vec![
                "clustersLoadStarted",
                "clustersLoaded",
                "requestSucceeded",
                "locationLoadStarted",
                "locationLoaded",
                "requestSucceeded",
                "versionLoadStarted",
                "versionLoaded",
                "requestSucceeded",
            ]
        );
        assert_eq!(
            events[4],
            GatewayEvent::LocationLoaded {
                location: Location::default()
            }
        );
        assert_eq!(
            events[7],
            GatewayEvent::VersionLoaded {
                version: VersionInfo::offline()
            }
        );
    }

    #[tokio::test]
    async fn test_clusters_online() {
        let server = TestServer::start(vec![Reply::ok(
            r#"{"clusters":[{"lat":1.0,"lon":2.0,"count":3},{"lat":4,"lon":5,"count":1,"name":"Hut","tags":["x"]}]}"#,
        )])
        .await;
        let client = online_client(&server);
        let mut rx = client.subscribe();

        client.clusters(query()).unwrap().wait().await;

        match &drain(&mut rx)[1] {
            GatewayEvent::ClustersLoaded { clusters, query: q } => {
                assert_eq!(clusters.len(), 2);
                assert_eq!(clusters[1].name.as_deref(), Some("Hut"));
                assert_eq!(q, &query());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_location_online_and_garbage() {
        let server = TestServer::start(vec![
            Reply::ok(r#"{"lat":47.1,"lon":8.2,"accuracy_m":12.0}"#),
            Reply::ok("<html>"),
        ])
        .await;
        let client = online_client(&server);
        let mut rx = client.subscribe();

        client.location().wait().await;
        client.location().wait().await;

        let events = drain(&mut rx);
        assert_eq!(
            events[1],
            GatewayEvent::LocationLoaded {
                location: Location {
                    lat: 47.1,
                    lon: 8.2,
                    accuracy_m: 12.0
                }
            }
        );
        assert_eq!(
            events[4],
            GatewayEvent::LocationLoaded {
                location: Location::default()
            }
        );
    }

    #[tokio::test]
    async fn test_import_uses_import_timeout() {
        let server =
            TestServer::start(vec![Reply::ok(r#"{"imported":4}"#).delayed(Duration::from_millis(200))])
                .await;
        let client = ApiClient::new(Config {
            request_timeout_ms: 50,
            import_timeout_ms: 2000,
            ..Config::with_port(server.port() as i32)
        })
        .unwrap();
        let mut rx = client.subscribe();

        let request = ImportRequest {
            dir: " /data/gpx ".to_string(),
            recursive: true,
        };
        client.import(request).unwrap().wait().await;

        assert_eq!(
            server.requests()[0].json(),
            json!({"dir": "/data/gpx", "recursive": true})
        );
        let events = drain(&mut rx);
        assert_eq!(
            events[1],
            GatewayEvent::ImportFinished {
                result: json!({"imported": 4}),
                request: ImportRequest {
                    dir: "/data/gpx".to_string(),
                    recursive: true,
                },
            }
        );
    }

    #[test]
    fn test_import_requires_dir() {
        let client = offline_client();
        let request = ImportRequest {
            dir: "  ".to_string(),
            recursive: false,
        };
        assert!(client.import(request).is_err());
    }

    #[tokio::test]
    async fn test_version_online() {
        let server = TestServer::start(vec![Reply::ok(
            r#"{"name":"waypoint-server","version":"0.9.1","commit":"abc123"}"#,
        )])
        .await;
        let client = online_client(&server);
        let mut rx = client.subscribe();

        client.version().wait().await;

        match &drain(&mut rx)[1] {
            GatewayEvent::VersionLoaded { version } => {
                assert_eq!(version.version, "0.9.1");
                assert_eq!(version.commit, "abc123");
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
