/// Socket.IO server facade.
///
/// Sits between the Engine.IO transport and user handlers: the transport
/// feeds `handle_eio_connect` / `handle_eio_message` / `handle_eio_disconnect`,
/// and the server drives the codec, the per-namespace connect state machine
/// and the manager's broadcast and ack bookkeeping.
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock as StdRwLock, Weak};
use std::time::Duration;

use tokio::sync::{oneshot, Mutex, RwLock};

use crate::error::{Error, Result, REFUSED_MESSAGE};
use crate::json::{JsonCodec, SerdeJsonCodec};
use crate::manager::{AckCallback, ClientManager, InMemoryManager, RoomTarget};
use crate::namespace::{
    BoxedEventFn, ConnectHandler, ConnectResult, EventDispatch, EventResult, Namespace,
    NamespaceRegistry,
};
use crate::packet::{refusal_body, Decoded, Packet, PacketType, PartialPacket, DEFAULT_NAMESPACE};
use crate::transport::{EngineIoTransport, Environ, Frame, Session, TransportKind};
use crate::value::{Payload, Value};

pub struct ServerBuilder {
    client_manager: Option<Arc<dyn ClientManager>>,
    async_handlers: bool,
    always_connect: bool,
    json: Arc<dyn JsonCodec>,
}

impl ServerBuilder {
    /// Replace the default in-memory manager, e.g. with a pub/sub-backed one.
    pub fn client_manager(mut self, manager: Arc<dyn ClientManager>) -> Self {
        self.client_manager = Some(manager);
        self
    }

    /// Run event handlers on their own tasks so the receive path is never
    /// blocked. Enabled by default; `call` requires it.
    pub fn async_handlers(mut self, enabled: bool) -> Self {
        self.async_handlers = enabled;
        self
    }

    /// Acknowledge CONNECT before running the connect handler, reversing
    /// with a DISCONNECT if the handler rejects.
    pub fn always_connect(mut self, enabled: bool) -> Self {
        self.always_connect = enabled;
        self
    }

    /// Swap the JSON encoder used by this server's packet codec.
    pub fn json(mut self, codec: Arc<dyn JsonCodec>) -> Self {
        self.json = codec;
        self
    }

    pub fn build(self, transport: Arc<dyn EngineIoTransport>) -> Server {
        let manager = self
            .client_manager
            .unwrap_or_else(|| Arc::new(InMemoryManager::new()));
        let inner = Arc::new(ServerInner {
            transport,
            manager,
            registry: StdRwLock::new(NamespaceRegistry::default()),
            environ: RwLock::new(HashMap::new()),
            partials: Mutex::new(HashMap::new()),
            json: self.json,
            async_handlers: self.async_handlers,
            always_connect: self.always_connect,
            manager_initialized: AtomicBool::new(false),
        });
        let server = Server { inner };
        server
            .inner
            .manager
            .attach(WeakServer(Arc::downgrade(&server.inner)));
        server
    }
}

pub(crate) struct ServerInner {
    transport: Arc<dyn EngineIoTransport>,
    manager: Arc<dyn ClientManager>,
    registry: StdRwLock<NamespaceRegistry>,
    environ: RwLock<HashMap<String, Arc<Environ>>>,
    partials: Mutex<HashMap<String, PartialPacket>>,
    json: Arc<dyn JsonCodec>,
    async_handlers: bool,
    always_connect: bool,
    manager_initialized: AtomicBool,
}

#[derive(Clone)]
pub struct Server {
    inner: Arc<ServerInner>,
}

/// Non-owning handle a manager keeps to reach the server without creating a
/// reference cycle.
#[derive(Clone)]
pub struct WeakServer(Weak<ServerInner>);

impl WeakServer {
    pub fn upgrade(&self) -> Option<Server> {
        self.0.upgrade().map(|inner| Server { inner })
    }
}

/// Targeting options for [`Server::emit`] and [`Server::send`].
#[derive(Default)]
pub struct EmitOpts {
    room: RoomTarget,
    skip_sid: Vec<String>,
    namespace: Option<String>,
    callback: Option<AckCallback>,
}

impl EmitOpts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Target a room, a sid, or a list of rooms. Alias of [`EmitOpts::room`].
    pub fn to(self, room: impl Into<RoomTarget>) -> Self {
        self.room(room)
    }

    pub fn room(mut self, room: impl Into<RoomTarget>) -> Self {
        self.room = room.into();
        self
    }

    /// Exclude a sid from the broadcast; may be given more than once.
    pub fn skip_sid(mut self, sid: impl Into<String>) -> Self {
        self.skip_sid.push(sid.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Invoke the callback with the client's ack arguments. Restricts the
    /// emit to a single sid.
    pub fn callback<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(Vec<Value>) + Send + Sync + 'static,
    {
        self.callback = Some(Box::new(callback));
        self
    }
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder {
            client_manager: None,
            async_handlers: true,
            always_connect: false,
            json: Arc::new(SerdeJsonCodec),
        }
    }

    /// Server with the default configuration.
    pub fn new(transport: Arc<dyn EngineIoTransport>) -> Self {
        Self::builder().build(transport)
    }

    /// The underlying Engine.IO transport.
    pub fn engine(&self) -> &Arc<dyn EngineIoTransport> {
        &self.inner.transport
    }

    pub fn manager(&self) -> &Arc<dyn ClientManager> {
        &self.inner.manager
    }

    /// Transport currently in use by an engine connection.
    pub fn transport(&self, eio_sid: &str) -> TransportKind {
        self.inner.transport.transport(eio_sid)
    }

    // ---- handler registration ----

    /// Register an event handler. The key `"*"` installs a catch-all that
    /// receives the event name as its first argument.
    pub fn on<F, Fut>(&self, event: &str, namespace: &str, handler: F)
    where
        F: Fn(String, Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = EventResult> + Send + 'static,
    {
        let handler: BoxedEventFn = Arc::new(move |sid, args| Box::pin(handler(sid, args)));
        self.inner
            .registry
            .write()
            .unwrap()
            .table_mut(namespace)
            .events
            .insert(event.to_string(), handler);
    }

    /// Register a connect handler that ignores the client auth payload.
    pub fn on_connect<F, Fut>(&self, namespace: &str, handler: F)
    where
        F: Fn(String, Arc<Environ>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ConnectResult> + Send + 'static,
    {
        let handler = ConnectHandler::WithoutAuth(Arc::new(move |sid, environ| {
            Box::pin(handler(sid, environ))
        }));
        self.inner.registry.write().unwrap().table_mut(namespace).connect = Some(handler);
    }

    /// Register a connect handler that receives the client auth payload,
    /// `None` when the CONNECT carried no data.
    pub fn on_connect_with_auth<F, Fut>(&self, namespace: &str, handler: F)
    where
        F: Fn(String, Arc<Environ>, Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ConnectResult> + Send + 'static,
    {
        let handler = ConnectHandler::WithAuth(Arc::new(move |sid, environ, auth| {
            Box::pin(handler(sid, environ, auth))
        }));
        self.inner.registry.write().unwrap().table_mut(namespace).connect = Some(handler);
    }

    pub fn on_disconnect<F, Fut>(&self, namespace: &str, handler: F)
    where
        F: Fn(String) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.inner.registry.write().unwrap().table_mut(namespace).disconnect =
            Some(Arc::new(move |sid| Box::pin(handler(sid))));
    }

    /// Install a class-based namespace for its configured path.
    pub fn register_namespace(&self, namespace: Arc<dyn Namespace>) -> Result<()> {
        if !namespace.path().starts_with('/') {
            return Err(Error::InvalidArgument(format!(
                "invalid namespace path {:?}",
                namespace.path()
            )));
        }
        self.inner.registry.write().unwrap().register_object(namespace);
        Ok(())
    }

    // ---- broadcast API ----

    /// Emit an event to the sids selected by `opts`, all of the default
    /// namespace when no room is given.
    pub async fn emit(
        &self,
        event: &str,
        data: impl Into<Payload>,
        opts: EmitOpts,
    ) -> Result<()> {
        let namespace = opts
            .namespace
            .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string());
        self.inner
            .manager
            .emit(
                event,
                data.into(),
                &namespace,
                opts.room,
                opts.skip_sid,
                opts.callback,
            )
            .await
            .map(|_| ())
    }

    /// Emit a `message` event.
    pub async fn send(&self, data: impl Into<Payload>, opts: EmitOpts) -> Result<()> {
        self.emit("message", data, opts).await
    }

    /// Emit to a single sid and wait for its acknowledgement. Returns the
    /// ack arguments, or [`Error::AckTimeout`] when none arrive in time.
    pub async fn call(
        &self,
        event: &str,
        data: impl Into<Payload>,
        sid: &str,
        namespace: &str,
        timeout: Duration,
    ) -> Result<Vec<Value>> {
        if !self.inner.async_handlers {
            return Err(Error::Unsupported(
                "call requires async_handlers".to_string(),
            ));
        }
        let (tx, rx) = oneshot::channel();
        let callback: AckCallback = Box::new(move |args| {
            let _ = tx.send(args);
        });
        let ack_id = self
            .inner
            .manager
            .emit(
                event,
                data.into(),
                namespace,
                RoomTarget::Room(sid.to_string()),
                Vec::new(),
                Some(callback),
            )
            .await?;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(args)) => Ok(args),
            Ok(Err(_)) => Err(Error::NotConnected(sid.to_string())),
            Err(_) => {
                if let Some(id) = ack_id {
                    self.inner.manager.drop_callback(sid, id).await;
                }
                Err(Error::AckTimeout(timeout))
            }
        }
    }

    // ---- lifecycle API ----

    /// Disconnect one sid from a namespace. A second call for an already
    /// disconnected sid is a no-op and emits nothing.
    pub async fn disconnect(&self, sid: &str, namespace: &str, ignore_queue: bool) -> Result<()> {
        let allowed = if ignore_queue {
            self.inner.manager.is_connected(sid, namespace).await
        } else {
            self.inner.manager.can_disconnect(sid, namespace).await
        };
        if !allowed {
            return Ok(());
        }
        let Some(eio_sid) = self.inner.manager.eio_sid_from_sid(sid, namespace).await else {
            return Ok(());
        };
        tracing::info!("Disconnecting {} [{}]", sid, namespace);
        let _ = self
            .send_packet(&eio_sid, &Packet::disconnect(namespace))
            .await;
        self.trigger_disconnect(namespace, sid).await;
        self.inner.manager.disconnect(sid, namespace).await;
        if !self.has_connected_namespaces(&eio_sid).await {
            self.inner.environ.write().await.remove(&eio_sid);
            self.inner.transport.disconnect(&eio_sid).await;
        }
        Ok(())
    }

    pub async fn enter_room(&self, sid: &str, room: &str, namespace: &str) {
        self.inner.manager.enter_room(sid, namespace, room).await;
    }

    pub async fn leave_room(&self, sid: &str, room: &str, namespace: &str) {
        self.inner.manager.leave_room(sid, namespace, room).await;
    }

    pub async fn close_room(&self, room: &str, namespace: &str) {
        self.inner.manager.close_room(room, namespace).await;
    }

    /// Rooms the sid is a member of, its personal room included.
    pub async fn rooms(&self, sid: &str, namespace: &str) -> Vec<String> {
        self.inner.manager.get_rooms(sid, namespace).await
    }

    // ---- user sessions ----

    pub async fn get_session(&self, sid: &str, namespace: &str) -> Result<Session> {
        let eio_sid = self.eio_sid(sid, namespace).await?;
        let mut store = self.inner.transport.get_session(&eio_sid).await?;
        Ok(store.remove(namespace).unwrap_or_default())
    }

    pub async fn save_session(&self, sid: &str, namespace: &str, session: Session) -> Result<()> {
        let eio_sid = self.eio_sid(sid, namespace).await?;
        let mut store = self.inner.transport.get_session(&eio_sid).await?;
        store.insert(namespace.to_string(), session);
        self.inner.transport.save_session(&eio_sid, store).await
    }

    /// Scoped session access: loads the mapping, applies `f` and persists
    /// the result.
    pub async fn session<F, R>(&self, sid: &str, namespace: &str, f: F) -> Result<R>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut session = self.get_session(sid, namespace).await?;
        let result = f(&mut session);
        self.save_session(sid, namespace, session).await?;
        Ok(result)
    }

    async fn eio_sid(&self, sid: &str, namespace: &str) -> Result<String> {
        self.inner
            .manager
            .eio_sid_from_sid(sid, namespace)
            .await
            .ok_or_else(|| Error::NotConnected(sid.to_string()))
    }

    // ---- transport callbacks ----

    /// Transport callback: a new engine connection was accepted.
    pub async fn handle_eio_connect(&self, eio_sid: &str, environ: Environ) {
        tracing::debug!("Engine connection {} established", eio_sid);
        if !self.inner.manager_initialized.swap(true, Ordering::SeqCst) {
            self.inner.manager.initialize();
        }
        self.inner
            .environ
            .write()
            .await
            .insert(eio_sid.to_string(), Arc::new(environ));
    }

    /// Transport callback: one frame arrived. While a binary packet is being
    /// reassembled its engine connection's frames are consumed as
    /// attachments; nothing else is decoded for it until the count is
    /// satisfied.
    pub async fn handle_eio_message(&self, eio_sid: &str, frame: Frame) -> Result<()> {
        let mut partials = self.inner.partials.lock().await;
        if let Some(partial) = partials.get_mut(eio_sid) {
            return match frame {
                Frame::Binary(buf) => {
                    let completed = match partial.add_attachment(buf) {
                        Ok(completed) => completed,
                        Err(err) => {
                            partials.remove(eio_sid);
                            return Err(err);
                        }
                    };
                    match completed {
                        Some(packet) => {
                            partials.remove(eio_sid);
                            drop(partials);
                            self.dispatch(eio_sid, packet).await
                        }
                        None => Ok(()),
                    }
                }
                Frame::Text(_) => {
                    partials.remove(eio_sid);
                    Err(Error::InvalidPacket(
                        "text frame while awaiting binary attachments".to_string(),
                    ))
                }
            };
        }
        drop(partials);

        match frame {
            Frame::Text(text) => match Packet::decode(&text, self.inner.json.as_ref())? {
                Decoded::Complete(packet) => self.dispatch(eio_sid, packet).await,
                Decoded::Partial(partial) => {
                    self.inner
                        .partials
                        .lock()
                        .await
                        .insert(eio_sid.to_string(), partial);
                    Ok(())
                }
            },
            Frame::Binary(_) => Err(Error::InvalidPacket(
                "unexpected binary frame".to_string(),
            )),
        }
    }

    /// Transport callback: the engine connection went away. Unknown
    /// connections are ignored.
    pub async fn handle_eio_disconnect(&self, eio_sid: &str) {
        for namespace in self.inner.manager.get_namespaces().await {
            if let Some(sid) = self
                .inner
                .manager
                .sid_from_eio_sid(eio_sid, &namespace)
                .await
            {
                self.trigger_disconnect(&namespace, &sid).await;
                self.inner.manager.disconnect(&sid, &namespace).await;
            }
        }
        self.inner.environ.write().await.remove(eio_sid);
        self.inner.partials.lock().await.remove(eio_sid);
    }

    // ---- outbound path ----

    /// Encode and deliver a packet: the text frame first, then its binary
    /// attachments in placeholder order. A transport failure tears down the
    /// engine connection's state; no further frames are emitted for it.
    pub async fn send_packet(&self, eio_sid: &str, packet: &Packet) -> Result<()> {
        let (text, attachments) = packet.encode(self.inner.json.as_ref());
        tracing::debug!("Sending to {}: {}", eio_sid, text);
        let mut result = self.inner.transport.send(eio_sid, Frame::Text(text)).await;
        if result.is_ok() {
            for buf in attachments {
                result = self.inner.transport.send(eio_sid, Frame::Binary(buf)).await;
                if result.is_err() {
                    break;
                }
            }
        }
        match result {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::error!(
                    "Delivery to {} failed: {}; dropping its connection state",
                    eio_sid,
                    err
                );
                self.teardown_engine(eio_sid).await;
                Err(err)
            }
        }
    }

    /// Clear all state for an engine connection without emitting frames or
    /// running disconnect handlers.
    async fn teardown_engine(&self, eio_sid: &str) {
        for namespace in self.inner.manager.get_namespaces().await {
            if let Some(sid) = self
                .inner
                .manager
                .sid_from_eio_sid(eio_sid, &namespace)
                .await
            {
                self.inner.manager.disconnect(&sid, &namespace).await;
            }
        }
        self.inner.environ.write().await.remove(eio_sid);
        self.inner.partials.lock().await.remove(eio_sid);
    }

    async fn has_connected_namespaces(&self, eio_sid: &str) -> bool {
        for namespace in self.inner.manager.get_namespaces().await {
            if self
                .inner
                .manager
                .sid_from_eio_sid(eio_sid, &namespace)
                .await
                .is_some()
            {
                return true;
            }
        }
        false
    }

    // ---- inbound dispatch ----

    async fn dispatch(&self, eio_sid: &str, packet: Packet) -> Result<()> {
        match packet.packet_type {
            PacketType::Connect => {
                let Packet { namespace, data, .. } = packet;
                self.handle_connect(eio_sid, &namespace, data).await
            }
            PacketType::Disconnect => {
                self.handle_disconnect(eio_sid, &packet.namespace).await;
                Ok(())
            }
            PacketType::Event | PacketType::BinaryEvent => {
                self.handle_event(eio_sid, packet).await
            }
            PacketType::Ack | PacketType::BinaryAck => self.handle_ack(eio_sid, packet).await,
            PacketType::ConnectError => Err(Error::UnexpectedPacket("CONNECT_ERROR")),
        }
    }

    async fn handle_connect(
        &self,
        eio_sid: &str,
        namespace: &str,
        auth: Option<Value>,
    ) -> Result<()> {
        let environ = self.inner.environ.read().await.get(eio_sid).cloned();
        let Some(environ) = environ else {
            tracing::warn!("CONNECT from unknown engine connection {}", eio_sid);
            return Ok(());
        };
        if self
            .inner
            .manager
            .sid_from_eio_sid(eio_sid, namespace)
            .await
            .is_some()
        {
            tracing::debug!("Duplicate CONNECT for {} [{}] ignored", eio_sid, namespace);
            return Ok(());
        }

        let sid = self.inner.manager.connect(eio_sid, namespace).await?;
        if self.inner.always_connect {
            self.send_packet(eio_sid, &Packet::connect(namespace, Some(&sid)))
                .await?;
        }

        let refusal = match self.trigger_connect(namespace, &sid, environ, auth).await {
            Ok(true) => None,
            Ok(false) => Some((REFUSED_MESSAGE.to_string(), None)),
            Err(Error::ConnectionRefused { message, data }) => {
                let data = if data.is_empty() {
                    None
                } else {
                    Some(Value::Array(data))
                };
                Some((message, data))
            }
            Err(other) => {
                tracing::error!("Connect handler for {} failed: {}", namespace, other);
                Some((REFUSED_MESSAGE.to_string(), None))
            }
        };

        match refusal {
            None => {
                if !self.inner.always_connect {
                    self.send_packet(eio_sid, &Packet::connect(namespace, Some(&sid)))
                        .await?;
                }
                tracing::info!("Client {} connected to {} as {}", eio_sid, namespace, sid);
                Ok(())
            }
            Some((message, data)) => {
                tracing::info!("Client {} rejected from {}: {}", eio_sid, namespace, message);
                if self.inner.always_connect {
                    let mut packet = Packet::disconnect(namespace);
                    packet.data = Some(refusal_body(&message, data));
                    let _ = self.send_packet(eio_sid, &packet).await;
                } else {
                    let _ = self
                        .send_packet(eio_sid, &Packet::connect_error(namespace, &message, data))
                        .await;
                }
                self.inner.manager.disconnect(&sid, namespace).await;
                Ok(())
            }
        }
    }

    async fn handle_disconnect(&self, eio_sid: &str, namespace: &str) {
        let Some(sid) = self
            .inner
            .manager
            .sid_from_eio_sid(eio_sid, namespace)
            .await
        else {
            return;
        };
        self.trigger_disconnect(namespace, &sid).await;
        self.inner.manager.disconnect(&sid, namespace).await;
        if !self.has_connected_namespaces(eio_sid).await {
            self.inner.environ.write().await.remove(eio_sid);
        }
    }

    async fn handle_event(&self, eio_sid: &str, packet: Packet) -> Result<()> {
        let namespace = packet.namespace;
        let Some(sid) = self
            .inner
            .manager
            .sid_from_eio_sid(eio_sid, &namespace)
            .await
        else {
            tracing::debug!("Event for unconnected namespace {} dropped", namespace);
            return Ok(());
        };

        let mut items = match packet.data {
            Some(Value::Array(items)) if !items.is_empty() => items,
            _ => {
                return Err(Error::InvalidPacket(
                    "event payload must be a non-empty array".to_string(),
                ))
            }
        };
        let event = match items.remove(0) {
            Value::String(event) => event,
            _ => {
                return Err(Error::InvalidPacket(
                    "event name must be a string".to_string(),
                ))
            }
        };
        let args = items;

        if self.inner.async_handlers {
            let server = self.clone();
            let eio_sid = eio_sid.to_string();
            tokio::spawn(async move {
                server
                    .run_event(eio_sid, namespace, event, sid, packet.id, args)
                    .await;
            });
            Ok(())
        } else {
            self.run_event(eio_sid.to_string(), namespace, event, sid, packet.id, args)
                .await;
            Ok(())
        }
    }

    async fn run_event(
        &self,
        eio_sid: String,
        namespace: String,
        event: String,
        sid: String,
        id: Option<u64>,
        args: Vec<Value>,
    ) {
        let dispatch = self
            .inner
            .registry
            .read()
            .unwrap()
            .resolve_event(&namespace, &event);
        let Some(dispatch) = dispatch else {
            tracing::debug!("No handler for {} [{}]", event, namespace);
            return;
        };

        let result = match dispatch {
            EventDispatch::Handler(handler, prepend_event) => {
                let mut call_args = args;
                if prepend_event {
                    call_args.insert(0, Value::String(event.clone()));
                }
                handler(sid.clone(), call_args).await
            }
            EventDispatch::Object(object) => object.on_event(&event, &sid, args).await,
        };

        match result {
            Ok(payload) => {
                if let Some(id) = id {
                    let packet = Packet::ack(&namespace, id, payload.into_args());
                    let _ = self.send_packet(&eio_sid, &packet).await;
                }
            }
            Err(err) => {
                tracing::error!("Handler for {} [{}] failed: {:#}", event, namespace, err);
            }
        }
    }

    async fn handle_ack(&self, eio_sid: &str, packet: Packet) -> Result<()> {
        let Some(sid) = self
            .inner
            .manager
            .sid_from_eio_sid(eio_sid, &packet.namespace)
            .await
        else {
            return Ok(());
        };
        let Some(id) = packet.id else {
            return Err(Error::InvalidPacket(
                "acknowledgement without an id".to_string(),
            ));
        };
        let args = match packet.data {
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
            None => Vec::new(),
        };
        self.inner.manager.trigger_callback(&sid, id, args).await;
        Ok(())
    }

    async fn trigger_connect(
        &self,
        namespace: &str,
        sid: &str,
        environ: Arc<Environ>,
        auth: Option<Value>,
    ) -> ConnectResult {
        let (handler, object) = self
            .inner
            .registry
            .read()
            .unwrap()
            .resolve_connect(namespace);
        if let Some(handler) = handler {
            return match handler {
                ConnectHandler::WithAuth(handler) => {
                    handler(sid.to_string(), environ, auth).await
                }
                ConnectHandler::WithoutAuth(handler) => handler(sid.to_string(), environ).await,
            };
        }
        if let Some(object) = object {
            return object.on_connect(sid, &environ, auth.as_ref()).await;
        }
        Ok(true)
    }

    async fn trigger_disconnect(&self, namespace: &str, sid: &str) {
        let (handler, object) = self
            .inner
            .registry
            .read()
            .unwrap()
            .resolve_disconnect(namespace);
        if let Some(handler) = handler {
            handler(sid.to_string()).await;
        } else if let Some(object) = object {
            object.on_disconnect(sid).await;
        }
    }
}
