//! Session table for the SSE transport.
//!
//! A session exists from the moment a client opens its event stream until
//! that stream is dropped. Each session owns the sending half of a bounded
//! channel; the SSE response drains the receiving half. Posted frames are
//! dispatched on their own tasks, so responses arrive in completion order.

use crate::error::{ServerError, ServerResult};
use crate::mcp::{Dispatcher, JsonRpcRequest, JsonRpcResponse};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};

/// Outbound frames buffered per session before dispatch tasks wait.
pub const SESSION_BUFFER: usize = 64;

pub type SessionId = String;

#[derive(Clone)]
pub struct SessionManager {
    dispatcher: Dispatcher,
    sessions: Arc<RwLock<HashMap<SessionId, mpsc::Sender<JsonRpcResponse>>>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a new session and hand back the stream of its responses.
    pub async fn open_session(&self) -> (SessionId, mpsc::Receiver<JsonRpcResponse>) {
        let session_id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(SESSION_BUFFER);

        let active = {
            let mut sessions = self.sessions.write().await;
            sessions.insert(session_id.clone(), tx);
            sessions.len()
        };

        info!(session_id = %session_id, active, "Session opened");
        (session_id, rx)
    }

    /// Accept one frame for `session_id`.
    ///
    /// Returns as soon as the frame is queued for dispatch. The response, if
    /// any, is pushed onto the session's stream when the handler finishes.
    pub async fn post_message(&self, session_id: &str, request: JsonRpcRequest) -> ServerResult<()> {
        if !self.contains(session_id).await {
            return Err(ServerError::transport(format!(
                "Unknown session: {}",
                session_id
            )));
        }

        debug!(session_id = %session_id, method = %request.method, "Frame accepted");

        let manager = self.clone();
        let session_id = session_id.to_string();
        tokio::spawn(async move {
            if let Some(response) = manager.dispatcher.handle(request).await {
                manager.deliver(&session_id, response).await;
            }
        });

        Ok(())
    }

    /// Push a response onto a session's stream. Returns `false` when the
    /// session is gone; the response is dropped.
    pub async fn deliver(&self, session_id: &str, response: JsonRpcResponse) -> bool {
        // Clone the sender so the table lock is not held while waiting on a
        // full channel.
        let sender = self.sessions.read().await.get(session_id).cloned();

        match sender {
            Some(tx) => {
                if tx.send(response).await.is_ok() {
                    true
                } else {
                    debug!(session_id = %session_id, "Session stream closed, response dropped");
                    false
                }
            }
            None => {
                debug!(session_id = %session_id, "Session gone, response dropped");
                false
            }
        }
    }

    pub async fn contains(&self, session_id: &str) -> bool {
        self.sessions.read().await.contains_key(session_id)
    }

    /// Remove a session. Its stream ends once buffered frames are drained.
    pub async fn close_session(&self, session_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(session_id).is_some();
        if removed {
            info!(session_id = %session_id, "Session closed");
        }
        removed
    }

    pub async fn close_all(&self) {
        let mut sessions = self.sessions.write().await;
        let count = sessions.len();
        sessions.clear();
        if count > 0 {
            info!(count, "Closed all sessions");
        }
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Guard that closes `session_id` when dropped. Held by the SSE stream
    /// so a client disconnect removes the session.
    pub fn guard(&self, session_id: SessionId) -> SessionGuard {
        SessionGuard {
            manager: self.clone(),
            session_id,
        }
    }
}

/// Closes its session on drop.
///
/// The `Drop` implementation spawns a task for the async removal. If the
/// runtime is already gone the session table is being torn down anyway.
pub struct SessionGuard {
    manager: SessionManager,
    session_id: SessionId,
}

impl SessionGuard {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let manager = self.manager.clone();
        let session_id = std::mem::take(&mut self.session_id);

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    manager.close_session(&session_id).await;
                });
            }
            Err(_) => warn!(session_id = %session_id, "No runtime to close session"),
        }
    }
}
