//! Search suggestions and search history

use serde_json::{json, Value};
use tracing::{debug, warn};

use super::{payload, ApiClient, Call, CallHandle, Outcome};
use crate::events::{GatewayEvent, RequestContext};
use crate::models::{parse_list, RecentSearches, SearchEntry};
use crate::transport::{with_query, Body, Method};

fn recent_outcome(recent: RecentSearches) -> Outcome {
    let payload = payload(&recent);
    Outcome::with_events(
        vec![
            GatewayEvent::RecentSearchesLoaded {
                queries: recent.queries,
            },
            GatewayEvent::RecentSearchEntriesLoaded {
                entries: recent.entries,
            },
        ],
        payload,
    )
}

impl ApiClient {
    /// Suggestions for a partial search query
    ///
    /// A blank query does nothing.
    pub fn suggest(&self, query: &str) -> CallHandle {
        let query = query.trim().to_string();
        if query.is_empty() {
            debug!("Ignoring blank suggest query");
            return CallHandle::settled();
        }

        let call = Call::new(Method::Get, with_query("/api/suggest", &[("q", &query)]));
        let context = RequestContext::from_input(&query);
        self.emit(GatewayEvent::SuggestStarted {
            query: query.clone(),
        });

        let echoed = query.clone();
        let failed = query.clone();
        self.execute(
            call,
            context,
            move || {
                Outcome::new(
                    GatewayEvent::SuggestionsLoaded {
                        query: echoed,
                        suggestions: Vec::new(),
                    },
                    Value::Array(Vec::new()),
                )
            },
            move |body| {
                let suggestions = parse_list::<Value>(&body, "suggestions").unwrap_or_else(|| {
                    warn!("Unreadable suggestions for '{}'", query);
                    Vec::new()
                });
                let payload = Value::Array(suggestions.clone());
                Outcome::new(GatewayEvent::SuggestionsLoaded { query, suggestions }, payload)
            },
            move |message| {
                vec![GatewayEvent::SuggestFailed {
                    query: failed,
                    message: message.to_string(),
                }]
            },
        )
    }

    /// Most recent search queries, newest first
    ///
    /// Emits both the plain query list and the entries with coordinates.
    pub fn recent_searches(&self, limit: u32) -> CallHandle {
        let call = Call::new(
            Method::Get,
            with_query("/api/recent_suggest", &[("limit", limit.to_string())]),
        );
        let context = RequestContext::from_input(&json!({ "limit": limit }));
        self.emit(GatewayEvent::RecentSearchesLoadStarted { limit });

        self.execute(
            call,
            context,
            || recent_outcome(RecentSearches::default()),
            |body| {
                recent_outcome(RecentSearches::from_json(&body).unwrap_or_else(|| {
                    warn!("Unreadable recent searches, treating as empty");
                    RecentSearches::default()
                }))
            },
            move |message| {
                vec![GatewayEvent::RecentSearchesLoadFailed {
                    limit,
                    message: message.to_string(),
                }]
            },
        )
    }

    /// Record a search in the backend history
    ///
    /// Only the generic events are emitted. A blank query does nothing.
    pub fn record_history(&self, query: &str, lat: Option<f64>, lon: Option<f64>) -> CallHandle {
        let entry = SearchEntry {
            query: query.trim().to_string(),
            lat: lat.filter(|v| v.is_finite()),
            lon: lon.filter(|v| v.is_finite()),
        };
        if entry.query.is_empty() {
            debug!("Ignoring blank history entry");
            return CallHandle::settled();
        }

        let body = payload(&entry);
        let call = Call::new(Method::Post, "/api/history").body(Body::Json(body.clone()));
        self.execute(
            call,
            RequestContext::from_input(&entry),
            move || Outcome::generic(body),
            |body| {
                Outcome::generic(
                    serde_json::from_str::<Value>(&body).unwrap_or_else(|_| Value::String(body)),
                )
            },
            |_| Vec::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::testing::{Reply, TestServer};

    #[test]
    fn test_blank_queries_are_ignored() {
        let client = offline_client();
        let mut rx = client.subscribe();

        assert!(client.suggest("   ").is_settled());
        assert!(client.record_history("", Some(1.0), Some(2.0)).is_settled());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_offline_recent_searches_emits_both_shapes() {
        let client = offline_client();
        let mut rx = client.subscribe();

        client.recent_searches(10);

        let events = drain(&mut rx);
        assert_eq!(
            names(&events),
            vec![
                "recentSearchesLoadStarted",
                "recentSearchesLoaded",
                "recentSearchEntriesLoaded",
                "requestSucceeded"
            ]
        );
    }

    #[test]
    fn test_offline_history_is_generic_only() {
        let client = offline_client();
        let mut rx = client.subscribe();

        client.record_history("bakery", Some(46.0), None);

        assert_eq!(
            drain(&mut rx),
            vec![GatewayEvent::RequestSucceeded {
                kind: "POST /api/history (offline)".to_string(),
                payload: json!({"query": "bakery", "lat": 46.0}),
                context: RequestContext(json!({"query": "bakery", "lat": 46.0})),
            }]
        );
    }

    #[tokio::test]
    async fn test_suggest_online() {
        let server = TestServer::start(vec![Reply::ok(
            r#"{"suggestions":[{"name":"Café Nord","lat":1,"lon":2},"plain"]}"#,
        )])
        .await;
        let client = online_client(&server);
        let mut rx = client.subscribe();

        client.suggest("café n").wait().await;

        assert_eq!(server.requests()[0].path, "/api/suggest?q=caf%C3%A9+n");
        match &drain(&mut rx)[1] {
            GatewayEvent::SuggestionsLoaded { query, suggestions } => {
                assert_eq!(query, "café n");
                assert_eq!(suggestions.len(), 2);
                assert_eq!(suggestions[1], json!("plain"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_recent_searches_online() {
        let server = TestServer::start(vec![Reply::ok(
            r#"{"queries":["lake","hut"],"entries":[{"query":"lake","lat":1.0,"lon":2.0},{"query":"hut"}]}"#,
        )])
        .await;
        let client = online_client(&server);
        let mut rx = client.subscribe();

        client.recent_searches(5).wait().await;

        assert_eq!(server.requests()[0].path, "/api/recent_suggest?limit=5");
        let events = drain(&mut rx);
        assert_eq!(
            events[1],
            GatewayEvent::RecentSearchesLoaded {
                queries: vec!["lake".to_string(), "hut".to_string()]
            }
        );
        match &events[2] {
            GatewayEvent::RecentSearchEntriesLoaded { entries } => {
                assert_eq!(entries[0].lat, Some(1.0));
                assert_eq!(entries[1], SearchEntry::plain("hut"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_history_failure_is_generic_only() {
        let server = TestServer::start(vec![Reply::status(503, "busy")]).await;
        let client = online_client(&server);
        let mut rx = client.subscribe();

        client.record_history("lake", None, None).wait().await;

        assert_eq!(server.requests()[0].json(), json!({"query": "lake"}));
        let events = drain(&mut rx);
        assert_eq!(names(&events), vec!["requestFailed"]);
        assert_eq!(events[0].failure_message(), Some("HTTP 503 busy"));
    }
}
