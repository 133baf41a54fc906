//! API gateway client
//!
//! One method per backend operation. Every method follows the same skeleton:
//!
//! 1. Validate identifying arguments (rejections return an error, emit nothing)
//! 2. Emit `*Started`
//! 3. Offline mode: emit the synthesized success immediately, no I/O
//! 4. Online mode: spawn the request onto the tokio runtime, parse the body
//!    defensively, normalize tags, emit the terminal event
//! 5. Mirror the terminal event as `RequestSucceeded` / `RequestFailed`
//!
//! Methods return a [`CallHandle`] as soon as `*Started` has been emitted.
//!
//! ## Usage
//!
//! ```ignore
//! let client = ApiClient::new(Config::with_port(43098))?;
//! let mut events = client.subscribe();
//! client.add_waypoint(Waypoint::new("Camp", 46.1, 7.2))?.wait().await;
//! ```

mod offline;
mod search;
mod system;
mod tags;
mod waypoints;

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::GatewayResult;
use crate::events::{EventBus, GatewayEvent, RequestContext};
use crate::transport::{Body, Method, Transport, TransportError};

/// Handle to one in-flight operation
///
/// Dropping the handle does not cancel the call; the terminal event is still
/// emitted.
#[derive(Debug)]
pub struct CallHandle {
    task: Option<JoinHandle<()>>,
}

impl CallHandle {
    /// A call whose terminal event (if any) has already been emitted
    pub(crate) fn settled() -> Self {
        Self { task: None }
    }

    fn spawned(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }

    /// Whether the terminal event has been emitted
    pub fn is_settled(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Wait until the terminal event has been emitted
    pub async fn wait(self) {
        if let Some(task) = self.task {
            if let Err(e) = task.await {
                warn!("Gateway call task failed: {}", e);
            }
        }
    }
}

type Callback = Box<dyn FnOnce(String) + Send + 'static>;

/// Options for [`ApiClient::request`]
pub struct RequestOptions {
    pub method: Method,
    pub body: Body,
    /// Defaults to the configured request timeout
    pub timeout: Option<Duration>,
    pub context: RequestContext,
    /// Receives the raw response body (`{}` in offline mode)
    pub on_success: Option<Callback>,
    /// Receives the failure message
    pub on_error: Option<Callback>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: Method::Get,
            body: Body::Empty,
            timeout: None,
            context: RequestContext::default(),
            on_success: None,
            on_error: None,
        }
    }
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn context(mut self, context: impl Into<RequestContext>) -> Self {
        self.context = context.into();
        self
    }

    pub fn on_success(mut self, f: impl FnOnce(String) + Send + 'static) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(String) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for RequestOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestOptions")
            .field("method", &self.method)
            .field("body", &self.body)
            .field("timeout", &self.timeout)
            .field("context", &self.context)
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// One endpoint invocation
pub(crate) struct Call {
    method: Method,
    path: String,
    body: Body,
    timeout: Option<Duration>,
}

impl Call {
    pub(crate) fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: Body::Empty,
            timeout: None,
        }
    }

    pub(crate) fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub(crate) fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// `"<METHOD> <path>"` as reported in generic events
    pub(crate) fn kind(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Successful result of an operation: its specific events and the payload
/// mirrored in `RequestSucceeded`
pub(crate) struct Outcome {
    events: Vec<GatewayEvent>,
    payload: Value,
}

impl Outcome {
    pub(crate) fn new(event: GatewayEvent, payload: Value) -> Self {
        Self {
            events: vec![event],
            payload,
        }
    }

    pub(crate) fn with_events(events: Vec<GatewayEvent>, payload: Value) -> Self {
        Self { events, payload }
    }

    /// No specific event, only the generic mirror
    pub(crate) fn generic(payload: Value) -> Self {
        Self {
            events: Vec::new(),
            payload,
        }
    }
}

struct Inner {
    config: Config,
    transport: Option<Transport>,
    events: EventBus,
}

impl Inner {
    fn succeed(&self, kind: String, outcome: Outcome, context: RequestContext) {
        for event in outcome.events {
            self.events.emit(event);
        }
        self.events.emit(GatewayEvent::RequestSucceeded {
            kind,
            payload: outcome.payload,
            context,
        });
    }

    fn fail(
        &self,
        kind: String,
        message: String,
        events: Vec<GatewayEvent>,
        context: RequestContext,
    ) {
        warn!("{} failed: {}", kind, message);
        for event in events {
            self.events.emit(event);
        }
        self.events.emit(GatewayEvent::RequestFailed {
            kind,
            message,
            context,
        });
    }
}

/// Gateway client for the waypoint backend
///
/// Cheap to clone; clones share configuration, HTTP client and subscribers.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.inner.config)
            .finish()
    }
}

impl ApiClient {
    /// Create a client; no connection is made until the first call
    pub fn new(config: Config) -> GatewayResult<Self> {
        let transport = match config.base_url() {
            Some(base_url) => Some(Transport::new(base_url, config.request_timeout())?),
            None => None,
        };

        debug!(
            "Gateway client created ({})",
            config.base_url().as_deref().unwrap_or("offline")
        );

        Ok(Self {
            inner: Arc::new(Inner {
                config,
                transport,
                events: EventBus::new(),
            }),
        })
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Whether all operations are short-circuited locally
    pub fn is_offline(&self) -> bool {
        self.inner.transport.is_none()
    }

    /// Subscribe to every event emitted by this client
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<GatewayEvent> {
        self.inner.events.subscribe()
    }

    fn emit(&self, event: GatewayEvent) {
        self.inner.events.emit(event);
    }

    /// Generic escape hatch for endpoints without a dedicated method
    ///
    /// Same offline, timeout and event semantics as the dedicated methods;
    /// only the generic events are emitted.
    pub fn request(&self, path: &str, options: RequestOptions) -> CallHandle {
        let RequestOptions {
            method,
            body,
            timeout,
            context,
            on_success,
            on_error,
        } = options;

        let mut call = Call::new(method, path).body(body);
        if let Some(timeout) = timeout {
            call = call.timeout(timeout);
        }

        let on_success = Arc::new(Mutex::new(on_success));
        let offline_callback = Arc::clone(&on_success);

        self.execute(
            call,
            context,
            move || deliver(&offline_callback, "{}".to_string()),
            move |body| deliver(&on_success, body),
            move |message| {
                if let Some(callback) = on_error {
                    callback(message.to_string());
                }
                Vec::new()
            },
        )
    }

    /// Run `call` through the offline gate or the transport
    ///
    /// Exactly one of `offline`, `on_success`, `on_failure` is invoked.
    pub(crate) fn execute<O, S, F>(
        &self,
        call: Call,
        context: RequestContext,
        offline: O,
        on_success: S,
        on_failure: F,
    ) -> CallHandle
    where
        O: FnOnce() -> Outcome,
        S: FnOnce(String) -> Outcome + Send + 'static,
        F: FnOnce(&str) -> Vec<GatewayEvent> + Send + 'static,
    {
        let kind = call.kind();

        let Some(transport) = self.inner.transport.clone() else {
            debug!("{} short-circuited (offline)", kind);
            self.inner.succeed(offline::kind(&kind), offline(), context);
            return CallHandle::settled();
        };

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                let message = TransportError::Send(e.to_string()).to_string();
                let events = on_failure(&message);
                self.inner.fail(kind, message, events, context);
                return CallHandle::settled();
            }
        };

        let inner = Arc::clone(&self.inner);
        let task = runtime.spawn(async move {
            match transport
                .send(call.method, &call.path, call.body, call.timeout)
                .await
            {
                Ok(body) => {
                    let outcome = on_success(body);
                    inner.succeed(kind, outcome, context);
                }
                Err(e) => {
                    let message = e.to_string();
                    let events = on_failure(&message);
                    inner.fail(kind, message, events, context);
                }
            }
        });

        CallHandle::spawned(task)
    }

    /// Report a call rejected locally as a failed terminal event
    pub(crate) fn reject(
        &self,
        call: &Call,
        message: &str,
        event: GatewayEvent,
        context: RequestContext,
    ) -> CallHandle {
        self.inner
            .fail(call.kind(), message.to_string(), vec![event], context);
        CallHandle::settled()
    }
}

/// Hand a raw body to a caller callback (at most once)
fn deliver(callback: &Mutex<Option<Callback>>, body: String) -> Outcome {
    let payload = serde_json::from_str(&body).unwrap_or_else(|_| Value::String(body.clone()));
    let callback = callback
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .take();
    if let Some(callback) = callback {
        callback(body);
    }
    Outcome::generic(payload)
}

/// Serialize a result for the generic success event
pub(crate) fn payload<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::testing::TestServer;

    /// Client pointed at the scripted server
    pub(crate) fn online_client(server: &TestServer) -> ApiClient {
        ApiClient::new(Config::with_port(server.port() as i32)).unwrap()
    }

    pub(crate) fn offline_client() -> ApiClient {
        ApiClient::new(Config::offline()).unwrap()
    }

    /// Everything emitted so far
    pub(crate) fn drain(rx: &mut mpsc::UnboundedReceiver<GatewayEvent>) -> Vec<GatewayEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub(crate) fn names(events: &[GatewayEvent]) -> Vec<&'static str> {
        events.iter().map(GatewayEvent::name).collect()
    }
}
