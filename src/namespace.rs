/// Namespace registry: per-path handler tables and class-based namespaces.
///
/// Handlers are boxed async closures shared behind `Arc` so dispatch can
/// clone them out of the registry without holding the lock across an await.
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::Error;
use crate::transport::Environ;
use crate::value::{Payload, Value};

/// Catch-all handler key, invoked for events without an exact handler. The
/// event name is prepended to the handler's argument list.
pub const CATCH_ALL: &str = "*";

/// Lifecycle names that never route through the catch-all.
const RESERVED_EVENTS: [&str; 2] = ["connect", "disconnect"];

pub(crate) fn is_reserved(event: &str) -> bool {
    RESERVED_EVENTS.contains(&event)
}

/// Outcome of a connect handler. `Ok(false)` rejects with the default
/// message, `Err(Error::ConnectionRefused { .. })` rejects with detail.
pub type ConnectResult = Result<bool, Error>;

/// Return channel of event handlers. The payload becomes the ack reply when
/// the event carried an id; errors are logged at the dispatch boundary and
/// produce no ack.
pub type EventResult = anyhow::Result<Payload>;

pub(crate) type BoxedConnectFn =
    Arc<dyn Fn(String, Arc<Environ>) -> BoxFuture<'static, ConnectResult> + Send + Sync>;
pub(crate) type BoxedConnectAuthFn = Arc<
    dyn Fn(String, Arc<Environ>, Option<Value>) -> BoxFuture<'static, ConnectResult>
        + Send
        + Sync,
>;
pub(crate) type BoxedEventFn =
    Arc<dyn Fn(String, Vec<Value>) -> BoxFuture<'static, EventResult> + Send + Sync>;
pub(crate) type BoxedDisconnectFn =
    Arc<dyn Fn(String) -> BoxFuture<'static, ()> + Send + Sync>;

/// Connect handlers are tagged at registration by whether they consume the
/// client's auth payload.
#[derive(Clone)]
pub(crate) enum ConnectHandler {
    WithAuth(BoxedConnectAuthFn),
    WithoutAuth(BoxedConnectFn),
}

#[derive(Default)]
pub(crate) struct HandlerTable {
    pub(crate) connect: Option<ConnectHandler>,
    pub(crate) disconnect: Option<BoxedDisconnectFn>,
    pub(crate) events: HashMap<String, BoxedEventFn>,
}

/// A class-based namespace: one object owning the whole lifecycle of a path.
///
/// The default method bodies accept every connection, ignore disconnects and
/// drop events, so implementors only override what they need.
#[async_trait]
pub trait Namespace: Send + Sync {
    /// The namespace path this object serves, e.g. `/chat`.
    fn path(&self) -> &str;

    async fn on_connect(
        &self,
        _sid: &str,
        _environ: &Environ,
        _auth: Option<&Value>,
    ) -> ConnectResult {
        Ok(true)
    }

    async fn on_disconnect(&self, _sid: &str) {}

    async fn on_event(&self, _event: &str, _sid: &str, _args: Vec<Value>) -> EventResult {
        Ok(Payload::None)
    }
}

/// How an inbound event resolves: a table handler (optionally with the event
/// name prepended for the catch-all) or a namespace object.
pub(crate) enum EventDispatch {
    Handler(BoxedEventFn, bool),
    Object(Arc<dyn Namespace>),
}

#[derive(Default)]
pub(crate) struct NamespaceRegistry {
    tables: HashMap<String, HandlerTable>,
    objects: HashMap<String, Arc<dyn Namespace>>,
}

impl NamespaceRegistry {
    pub(crate) fn table_mut(&mut self, namespace: &str) -> &mut HandlerTable {
        self.tables.entry(namespace.to_string()).or_default()
    }

    pub(crate) fn register_object(&mut self, object: Arc<dyn Namespace>) {
        self.objects.insert(object.path().to_string(), object);
    }

    /// Resolve an event handler: exact key first, then the catch-all for
    /// non-reserved events, then the registered namespace object.
    pub(crate) fn resolve_event(&self, namespace: &str, event: &str) -> Option<EventDispatch> {
        if let Some(table) = self.tables.get(namespace) {
            if let Some(handler) = table.events.get(event) {
                return Some(EventDispatch::Handler(handler.clone(), false));
            }
            if !is_reserved(event) {
                if let Some(handler) = table.events.get(CATCH_ALL) {
                    return Some(EventDispatch::Handler(handler.clone(), true));
                }
            }
        }
        self.objects
            .get(namespace)
            .cloned()
            .map(EventDispatch::Object)
    }

    pub(crate) fn resolve_connect(
        &self,
        namespace: &str,
    ) -> (Option<ConnectHandler>, Option<Arc<dyn Namespace>>) {
        let handler = self
            .tables
            .get(namespace)
            .and_then(|table| table.connect.clone());
        if handler.is_some() {
            return (handler, None);
        }
        (None, self.objects.get(namespace).cloned())
    }

    pub(crate) fn resolve_disconnect(
        &self,
        namespace: &str,
    ) -> (Option<BoxedDisconnectFn>, Option<Arc<dyn Namespace>>) {
        let handler = self
            .tables
            .get(namespace)
            .and_then(|table| table.disconnect.clone());
        if handler.is_some() {
            return (handler, None);
        }
        (None, self.objects.get(namespace).cloned())
    }
}
