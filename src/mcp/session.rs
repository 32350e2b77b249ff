//! Session channel - pairs one SSE stream with its POST message endpoint

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use hyper::body::Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, RwLock};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::dispatcher::{Dispatcher, ServerContext};
use super::sse::{keep_alive, SseEvent};
use crate::error::McpError;

/// Frames buffered per session before pushes wait for the client
pub const OUTBOUND_BUFFER: usize = 64;

/// Messages queued per session before POSTs are refused
pub const INBOUND_BUFFER: usize = 64;

/// Opaque session identifier, rendered as 32 hex digits
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(SessionId)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SessionState {
    Open,
    Closing,
    Closed,
}

/// What the table keeps for an open session
#[derive(Clone)]
struct SessionEntry {
    inbound: mpsc::Sender<String>,
    state: Arc<watch::Sender<SessionState>>,
}

/// Stream side of an opened session, owned by the SSE response
pub struct SessionHandle {
    id: SessionId,
    frames: mpsc::Receiver<Bytes>,
    state: watch::Receiver<SessionState>,
}

impl SessionHandle {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    /// Next encoded SSE frame; `None` once the session is closed
    pub async fn next_frame(&mut self) -> Option<Bytes> {
        self.frames.recv().await
    }

    pub fn into_frames(self) -> mpsc::Receiver<Bytes> {
        self.frames
    }
}

struct Inner {
    sessions: RwLock<HashMap<SessionId, SessionEntry>>,
    context: Arc<ServerContext>,
    messages_path: String,
    ping_interval: Duration,
}

/// Process-wide session table
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

impl SessionManager {
    pub fn new(
        context: Arc<ServerContext>,
        messages_path: impl Into<String>,
        ping_interval: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                sessions: RwLock::new(HashMap::new()),
                context,
                messages_path: messages_path.into(),
                ping_interval,
            }),
        }
    }

    /// URL announced in the `endpoint` event
    pub fn endpoint_url(&self, id: &SessionId) -> String {
        format!("{}?session_id={}", self.inner.messages_path, id)
    }

    /// Register a new session and start its worker
    pub async fn open(&self) -> SessionHandle {
        let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        let (state_tx, state_rx) = watch::channel(SessionState::Open);
        let state_tx = Arc::new(state_tx);

        let id = {
            let mut sessions = self.inner.sessions.write().await;
            let mut id = SessionId::new();
            while sessions.contains_key(&id) {
                id = SessionId::new();
            }
            sessions.insert(
                id,
                SessionEntry {
                    inbound: inbound_tx,
                    state: state_tx.clone(),
                },
            );
            id
        };

        // The channel is fresh, so the endpoint event is always the first frame
        let endpoint = SseEvent::endpoint(self.endpoint_url(&id)).encode();
        if outbound_tx.try_send(endpoint).is_err() {
            warn!("Failed to queue endpoint event for session {}", id);
        }

        let worker = SessionWorker {
            id,
            manager: self.clone(),
            dispatcher: Dispatcher::new(self.inner.context.clone()),
            inbound: inbound_rx,
            outbound: outbound_tx,
            state: state_tx.subscribe(),
            ping_interval: self.inner.ping_interval,
        };
        tokio::spawn(worker.run());

        info!("Session {} opened", id);
        SessionHandle {
            id,
            frames: outbound_rx,
            state: state_rx,
        }
    }

    /// Hand a raw POSTed message to the session's dispatcher without waiting for the reply
    pub async fn dispatch_inbound(&self, id: &SessionId, raw: String) -> Result<(), McpError> {
        let entry = {
            let sessions = self.inner.sessions.read().await;
            sessions.get(id).cloned()
        };
        let entry = entry.ok_or_else(|| McpError::SessionNotFound(id.to_string()))?;

        if *entry.state.borrow() != SessionState::Open {
            return Err(McpError::SessionNotFound(id.to_string()));
        }

        entry.inbound.try_send(raw).map_err(|e| match e {
            TrySendError::Full(_) => McpError::SessionBusy(id.to_string()),
            TrySendError::Closed(_) => McpError::SessionNotFound(id.to_string()),
        })?;
        debug!("Queued message for session {}", id);
        Ok(())
    }

    /// OPEN -> CLOSING -> CLOSED; returns false if the session was not in the table
    pub async fn close(&self, id: &SessionId) -> bool {
        let entry = {
            let sessions = self.inner.sessions.read().await;
            sessions.get(id).cloned()
        };
        let Some(entry) = entry else {
            return false;
        };

        entry.state.send_replace(SessionState::Closing);
        let removed = {
            let mut sessions = self.inner.sessions.write().await;
            sessions.remove(id).is_some()
        };
        entry.state.send_replace(SessionState::Closed);

        if removed {
            info!("Session {} closed", id);
        }
        removed
    }

    pub async fn close_all(&self) {
        let ids: Vec<SessionId> = {
            let sessions = self.inner.sessions.read().await;
            sessions.keys().copied().collect()
        };
        for id in ids {
            self.close(&id).await;
        }
    }

    /// State of a session still in the table
    pub async fn state(&self, id: &SessionId) -> Option<SessionState> {
        let sessions = self.inner.sessions.read().await;
        sessions.get(id).map(|entry| *entry.state.borrow())
    }

    pub async fn len(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

/// Task serving one session until the client leaves or the session is closed
struct SessionWorker {
    id: SessionId,
    manager: SessionManager,
    dispatcher: Dispatcher,
    inbound: mpsc::Receiver<String>,
    outbound: mpsc::Sender<Bytes>,
    state: watch::Receiver<SessionState>,
    ping_interval: Duration,
}

impl SessionWorker {
    async fn run(mut self) {
        let mut ping =
            tokio::time::interval_at(Instant::now() + self.ping_interval, self.ping_interval);
        ping.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = self.inbound.recv() => match message {
                    Some(raw) => {
                        self.deliver(&raw).await;
                        if !self.is_open() {
                            break;
                        }
                    }
                    None => break,
                },
                _ = self.outbound.closed() => {
                    debug!("Client of session {} disconnected", self.id);
                    break;
                }
                changed = self.state.changed() => {
                    if changed.is_err() || !self.is_open() {
                        break;
                    }
                }
                _ = ping.tick() => match self.outbound.try_send(keep_alive()) {
                    Ok(()) => {}
                    // Client is connected but not reading; it still has frames to drain
                    Err(TrySendError::Full(_)) => {
                        debug!("Skipped keep-alive for stalled session {}", self.id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!("Keep-alive failed for session {}", self.id);
                        break;
                    }
                },
            }
        }

        self.manager.close(&self.id).await;
        debug!("Session {} worker stopped", self.id);
    }

    fn is_open(&self) -> bool {
        *self.state.borrow() == SessionState::Open
    }

    async fn deliver(&mut self, raw: &str) {
        if !self.is_open() {
            return;
        }

        debug!("Received on session {}: {}", self.id, raw);
        let Some(response) = self.dispatcher.handle_message(raw).await else {
            return;
        };

        let payload = match serde_json::to_string(&response) {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize response on session {}: {}", self.id, e);
                return;
            }
        };

        // An in-flight request may outlive its session; its response is dropped
        if !self.is_open() {
            debug!("Session {} closed before its response was sent", self.id);
            return;
        }

        debug!("Sending on session {}: {}", self.id, payload);
        let frame = SseEvent::message(payload).encode();
        tokio::select! {
            sent = self.outbound.send(frame) => {
                if sent.is_err() {
                    debug!("Session {} stream is gone, response dropped", self.id);
                }
            }
            _ = wait_closed(&mut self.state) => {
                debug!("Session {} closed while its client was not reading", self.id);
            }
        }
    }
}

/// Resolves once the session leaves OPEN
async fn wait_closed(state: &mut watch::Receiver<SessionState>) {
    let _ = state.wait_for(|s| *s != SessionState::Open).await;
}
