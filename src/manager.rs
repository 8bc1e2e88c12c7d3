/// Session, room and acknowledgement bookkeeping.
///
/// The [`ClientManager`] trait is the seam for distributed deployments: a
/// pub/sub-backed implementation can fan broadcasts out to other processes
/// while honoring the same contract. [`InMemoryManager`] is the default and
/// keeps everything in process.
///
/// State per namespace:
/// - members: sid -> engine sid, one entry per connected session
/// - rooms: room name -> member sids; every session also sits in a personal
///   room named after its own sid, which is how single-sid emits are
///   expressed
///
/// Pending ack callbacks are keyed per sid with ids assigned monotonically
/// from 1.
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{Error, Result};
use crate::packet::Packet;
use crate::server::{Server, WeakServer};
use crate::value::{Payload, Value};

/// One-shot callback invoked with the arguments of the matching inbound ACK.
pub type AckCallback = Box<dyn FnOnce(Vec<Value>) + Send + Sync + 'static>;

/// Broadcast target selection for [`ClientManager::emit`].
#[derive(Debug, Clone, Default)]
pub enum RoomTarget {
    /// Every sid connected to the namespace.
    #[default]
    Broadcast,
    /// One room, or one sid via its personal room.
    Room(String),
    /// The union of several rooms.
    Rooms(Vec<String>),
}

impl From<&str> for RoomTarget {
    fn from(room: &str) -> Self {
        RoomTarget::Room(room.to_string())
    }
}

impl From<String> for RoomTarget {
    fn from(room: String) -> Self {
        RoomTarget::Room(room)
    }
}

impl From<Vec<String>> for RoomTarget {
    fn from(rooms: Vec<String>) -> Self {
        RoomTarget::Rooms(rooms)
    }
}

impl From<Vec<&str>> for RoomTarget {
    fn from(rooms: Vec<&str>) -> Self {
        RoomTarget::Rooms(rooms.into_iter().map(str::to_string).collect())
    }
}

#[async_trait]
pub trait ClientManager: Send + Sync {
    /// Install the back-reference used to reach the transport send path.
    /// Called once when the server is built.
    fn attach(&self, server: WeakServer);

    /// Invoked once, before the first connection is accepted.
    fn initialize(&self) {}

    /// Register a new session and return its freshly minted sid.
    async fn connect(&self, eio_sid: &str, namespace: &str) -> Result<String>;

    /// Remove a session from every room in the namespace and drop its
    /// pending acks. Safe to call more than once.
    async fn disconnect(&self, sid: &str, namespace: &str);

    async fn is_connected(&self, sid: &str, namespace: &str) -> bool;

    /// Distributed managers may veto or defer a server-initiated disconnect;
    /// the default is a plain connectivity check.
    async fn can_disconnect(&self, sid: &str, namespace: &str) -> bool {
        self.is_connected(sid, namespace).await
    }

    async fn sid_from_eio_sid(&self, eio_sid: &str, namespace: &str) -> Option<String>;

    async fn eio_sid_from_sid(&self, sid: &str, namespace: &str) -> Option<String>;

    /// Namespaces that currently have at least one session.
    async fn get_namespaces(&self) -> Vec<String>;

    async fn enter_room(&self, sid: &str, namespace: &str, room: &str);

    /// Leaving a room the sid is not in is a no-op.
    async fn leave_room(&self, sid: &str, namespace: &str, room: &str);

    /// Remove every member and evict the room.
    async fn close_room(&self, room: &str, namespace: &str);

    /// Rooms the sid is a member of, the personal room included.
    async fn get_rooms(&self, sid: &str, namespace: &str) -> Vec<String>;

    /// Deliver an event to the selected sids. A callback requires the target
    /// to be exactly one connected sid; the allocated ack id is returned so
    /// the caller can clean up if the ack never arrives.
    async fn emit(
        &self,
        event: &str,
        data: Payload,
        namespace: &str,
        room: RoomTarget,
        skip_sid: Vec<String>,
        callback: Option<AckCallback>,
    ) -> Result<Option<u64>>;

    /// Resolve a pending ack. Unknown ids are dropped.
    async fn trigger_callback(&self, sid: &str, id: u64, args: Vec<Value>);

    /// Discard a pending ack without invoking it.
    async fn drop_callback(&self, sid: &str, id: u64);

    /// Reserve the next ack id for the sid and store the callback under it.
    async fn generate_ack_id(&self, sid: &str, callback: AckCallback) -> u64;
}

#[derive(Default)]
struct NamespaceRooms {
    members: HashMap<String, String>,
    rooms: HashMap<String, HashSet<String>>,
}

#[derive(Default)]
struct AckTable {
    next_id: u64,
    pending: HashMap<u64, AckCallback>,
}

/// Default single-process manager.
pub struct InMemoryManager {
    server: OnceLock<WeakServer>,
    namespaces: RwLock<HashMap<String, NamespaceRooms>>,
    callbacks: RwLock<HashMap<String, AckTable>>,
}

impl InMemoryManager {
    pub fn new() -> Self {
        Self {
            server: OnceLock::new(),
            namespaces: RwLock::new(HashMap::new()),
            callbacks: RwLock::new(HashMap::new()),
        }
    }

    fn server(&self) -> Result<Server> {
        self.server
            .get()
            .and_then(WeakServer::upgrade)
            .ok_or_else(|| Error::Transport("server has shut down".to_string()))
    }
}

impl Default for InMemoryManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ClientManager for InMemoryManager {
    fn attach(&self, server: WeakServer) {
        let _ = self.server.set(server);
    }

    fn initialize(&self) {
        tracing::debug!("Client manager initialized");
    }

    async fn connect(&self, eio_sid: &str, namespace: &str) -> Result<String> {
        let server = self.server()?;
        let sid = server.engine().generate_id();

        let mut namespaces = self.namespaces.write().await;
        let ns = namespaces.entry(namespace.to_string()).or_default();
        ns.members.insert(sid.clone(), eio_sid.to_string());
        ns.rooms
            .entry(sid.clone())
            .or_default()
            .insert(sid.clone());

        tracing::info!("Session {} connected to {}", sid, namespace);
        Ok(sid)
    }

    async fn disconnect(&self, sid: &str, namespace: &str) {
        let mut namespaces = self.namespaces.write().await;
        let mut drop_namespace = false;
        if let Some(ns) = namespaces.get_mut(namespace) {
            if ns.members.remove(sid).is_some() {
                tracing::info!("Session {} disconnected from {}", sid, namespace);
            }
            for sids in ns.rooms.values_mut() {
                sids.remove(sid);
            }
            ns.rooms.retain(|_, sids| !sids.is_empty());
            drop_namespace = ns.members.is_empty() && ns.rooms.is_empty();
        }
        if drop_namespace {
            namespaces.remove(namespace);
        }
        drop(namespaces);

        self.callbacks.write().await.remove(sid);
    }

    async fn is_connected(&self, sid: &str, namespace: &str) -> bool {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .is_some_and(|ns| ns.members.contains_key(sid))
    }

    async fn sid_from_eio_sid(&self, eio_sid: &str, namespace: &str) -> Option<String> {
        let namespaces = self.namespaces.read().await;
        let ns = namespaces.get(namespace)?;
        ns.members
            .iter()
            .find(|(_, eio)| eio.as_str() == eio_sid)
            .map(|(sid, _)| sid.clone())
    }

    async fn eio_sid_from_sid(&self, sid: &str, namespace: &str) -> Option<String> {
        let namespaces = self.namespaces.read().await;
        namespaces.get(namespace)?.members.get(sid).cloned()
    }

    async fn get_namespaces(&self) -> Vec<String> {
        self.namespaces.read().await.keys().cloned().collect()
    }

    async fn enter_room(&self, sid: &str, namespace: &str, room: &str) {
        let mut namespaces = self.namespaces.write().await;
        let ns = namespaces.entry(namespace.to_string()).or_default();
        ns.rooms
            .entry(room.to_string())
            .or_default()
            .insert(sid.to_string());
        tracing::debug!("Session {} joined room {} [{}]", sid, room, namespace);
    }

    async fn leave_room(&self, sid: &str, namespace: &str, room: &str) {
        let mut namespaces = self.namespaces.write().await;
        if let Some(ns) = namespaces.get_mut(namespace) {
            if let Some(sids) = ns.rooms.get_mut(room) {
                sids.remove(sid);
                if sids.is_empty() {
                    ns.rooms.remove(room);
                }
            }
        }
        tracing::debug!("Session {} left room {} [{}]", sid, room, namespace);
    }

    async fn close_room(&self, room: &str, namespace: &str) {
        let mut namespaces = self.namespaces.write().await;
        if let Some(ns) = namespaces.get_mut(namespace) {
            if ns.rooms.remove(room).is_some() {
                tracing::info!("Room {} [{}] closed", room, namespace);
            }
        }
    }

    async fn get_rooms(&self, sid: &str, namespace: &str) -> Vec<String> {
        let namespaces = self.namespaces.read().await;
        let Some(ns) = namespaces.get(namespace) else {
            return Vec::new();
        };
        ns.rooms
            .iter()
            .filter(|(_, sids)| sids.contains(sid))
            .map(|(room, _)| room.clone())
            .collect()
    }

    async fn emit(
        &self,
        event: &str,
        data: Payload,
        namespace: &str,
        room: RoomTarget,
        skip_sid: Vec<String>,
        mut callback: Option<AckCallback>,
    ) -> Result<Option<u64>> {
        let server = self.server()?;

        let targets: Vec<(String, String)> = {
            let namespaces = self.namespaces.read().await;
            match namespaces.get(namespace) {
                Some(ns) => {
                    let selected: Vec<String> = match &room {
                        RoomTarget::Broadcast => ns.members.keys().cloned().collect(),
                        RoomTarget::Room(name) => ns
                            .rooms
                            .get(name)
                            .map(|sids| sids.iter().cloned().collect())
                            .unwrap_or_default(),
                        RoomTarget::Rooms(names) => {
                            let mut union = HashSet::new();
                            for name in names {
                                if let Some(sids) = ns.rooms.get(name) {
                                    union.extend(sids.iter().cloned());
                                }
                            }
                            union.into_iter().collect()
                        }
                    };
                    selected
                        .into_iter()
                        .filter(|sid| !skip_sid.iter().any(|skip| skip == sid))
                        .filter_map(|sid| {
                            ns.members
                                .get(&sid)
                                .map(|eio_sid| (sid.clone(), eio_sid.clone()))
                        })
                        .collect()
                }
                None => Vec::new(),
            }
        };

        let mut ack_id = None;
        if let Some(cb) = callback.take() {
            let single = matches!(&room, RoomTarget::Room(name)
                if targets.len() == 1 && targets[0].0 == *name);
            if !single {
                return Err(Error::InvalidArgument(
                    "callbacks can only be issued to a single client".to_string(),
                ));
            }
            ack_id = Some(self.generate_ack_id(&targets[0].0, cb).await);
        }

        let args = data.into_args();
        for (sid, eio_sid) in &targets {
            let packet = Packet::event(namespace, event, args.clone(), ack_id);
            // Send failures tear down the engine session inside send_packet;
            // the remaining targets still get their copies.
            if server.send_packet(eio_sid, &packet).await.is_err() {
                tracing::debug!("Dropped {} for {}", event, sid);
            }
        }
        Ok(ack_id)
    }

    async fn trigger_callback(&self, sid: &str, id: u64, args: Vec<Value>) {
        let callback = {
            let mut callbacks = self.callbacks.write().await;
            callbacks.get_mut(sid).and_then(|table| table.pending.remove(&id))
        };
        match callback {
            Some(callback) => callback(args),
            None => tracing::warn!("Unknown callback {} for session {}", id, sid),
        }
    }

    async fn drop_callback(&self, sid: &str, id: u64) {
        let mut callbacks = self.callbacks.write().await;
        if let Some(table) = callbacks.get_mut(sid) {
            table.pending.remove(&id);
        }
    }

    async fn generate_ack_id(&self, sid: &str, callback: AckCallback) -> u64 {
        let mut callbacks = self.callbacks.write().await;
        let table = callbacks.entry(sid.to_string()).or_default();
        table.next_id += 1;
        table.pending.insert(table.next_id, callback);
        table.next_id
    }
}
