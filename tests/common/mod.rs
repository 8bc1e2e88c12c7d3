#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use socketio_server::{
    EngineIoTransport, Error, Frame, Result, Server, Session, TransportKind,
};

/// In-memory Engine.IO stand-in. Records every outbound frame, keeps an
/// engine-level session store, and mints sequential ids ("1", "2", ...) so
/// tests can assert literal wire frames.
pub struct FakeEngine {
    frames: Mutex<Vec<(String, Frame)>>,
    sessions: Mutex<HashMap<String, HashMap<String, Session>>>,
    closed: Mutex<Vec<String>>,
    next_id: AtomicU64,
    fail_sends: AtomicBool,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            frames: Mutex::new(Vec::new()),
            sessions: Mutex::new(HashMap::new()),
            closed: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            fail_sends: AtomicBool::new(false),
        }
    }

    /// All frames sent to one engine connection, in order.
    pub fn sent_to(&self, eio_sid: &str) -> Vec<Frame> {
        self.frames
            .lock()
            .unwrap()
            .iter()
            .filter(|(sid, _)| sid == eio_sid)
            .map(|(_, frame)| frame.clone())
            .collect()
    }

    /// Text frames only, as strings.
    pub fn texts_to(&self, eio_sid: &str) -> Vec<String> {
        self.sent_to(eio_sid)
            .into_iter()
            .filter_map(|frame| match frame {
                Frame::Text(text) => Some(text),
                Frame::Binary(_) => None,
            })
            .collect()
    }

    pub fn sent_count(&self) -> usize {
        self.frames.lock().unwrap().len()
    }

    pub fn clear_frames(&self) {
        self.frames.lock().unwrap().clear();
    }

    /// Engine connections the server asked to close.
    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().unwrap().clone()
    }

    pub fn session_of(&self, eio_sid: &str) -> HashMap<String, Session> {
        self.sessions
            .lock()
            .unwrap()
            .get(eio_sid)
            .cloned()
            .unwrap_or_default()
    }

    /// Make every subsequent send fail with a transport error.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }
}

impl Default for FakeEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EngineIoTransport for FakeEngine {
    async fn send(&self, eio_sid: &str, frame: Frame) -> Result<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(Error::Transport("send failed".to_string()));
        }
        self.frames
            .lock()
            .unwrap()
            .push((eio_sid.to_string(), frame));
        Ok(())
    }

    async fn disconnect(&self, eio_sid: &str) {
        self.closed.lock().unwrap().push(eio_sid.to_string());
    }

    fn transport(&self, _eio_sid: &str) -> TransportKind {
        TransportKind::Polling
    }

    async fn get_session(&self, eio_sid: &str) -> Result<HashMap<String, Session>> {
        Ok(self.session_of(eio_sid))
    }

    async fn save_session(&self, eio_sid: &str, session: HashMap<String, Session>) -> Result<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert(eio_sid.to_string(), session);
        Ok(())
    }

    fn generate_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::SeqCst).to_string()
    }
}

/// Server with the default configuration on a fresh fake engine.
pub fn server() -> (Server, Arc<FakeEngine>) {
    let engine = Arc::new(FakeEngine::new());
    (Server::new(engine.clone()), engine)
}

/// Server with inline (synchronous) event dispatch, which most assertions
/// rely on.
pub fn sync_server() -> (Server, Arc<FakeEngine>) {
    let engine = Arc::new(FakeEngine::new());
    let server = Server::builder()
        .async_handlers(false)
        .build(engine.clone());
    (server, engine)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env(),
        )
        .with_test_writer()
        .try_init();
}

/// Drive a full handshake: engine connect plus a CONNECT packet for the
/// namespace. Returns nothing; the minted sid is deterministic.
pub async fn connect(server: &Server, eio_sid: &str, frame: &str) {
    server
        .handle_eio_connect(eio_sid, HashMap::from([("HTTP_HOST".to_string(), "test".to_string())]))
        .await;
    server
        .handle_eio_message(eio_sid, Frame::Text(frame.to_string()))
        .await
        .unwrap();
}
