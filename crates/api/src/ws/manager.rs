use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::Message;
use futures::future::BoxFuture;
use serde::Serialize;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use teamdesk_core::connection::{ConnectionEvent, ConnectionState};
use teamdesk_core::identity::CallerIdentity;
use teamdesk_core::locks::LockManager;
use teamdesk_core::messages::ServerMessage;
use teamdesk_core::realtime::LIVENESS_TIMEOUT_SECS;
use teamdesk_core::roles::{Role, ADMIN_ONLY};
use teamdesk_core::types::{DbId, Timestamp};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Drops every lock held by a user once their last connection is gone.
///
/// Called while the registry write lock is held, so implementations must
/// never call back into [`WsManager`].
pub trait LockRelease: Send + Sync {
    /// Returns the number of locks released.
    fn release_all_for_user(&self, user_id: DbId) -> BoxFuture<'_, usize>;
}

impl LockRelease for LockManager {
    fn release_all_for_user(&self, user_id: DbId) -> BoxFuture<'_, usize> {
        Box::pin(LockManager::release_all_for_user(self, user_id))
    }
}

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// Caller identity resolved at admission. `None` only for connections
    /// registered without a session; those never receive role broadcasts.
    pub identity: Option<CallerIdentity>,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
    /// Last time the peer proved it was alive (admission or `pong`).
    pub last_liveness: Timestamp,
    pub state: ConnectionState,
    /// Cancelled when the server force-closes the transport.
    cancel: CancellationToken,
}

impl WsConnection {
    fn user_id(&self) -> Option<DbId> {
        self.identity.as_ref().map(|identity| identity.user_id)
    }

    fn transition(&mut self, conn_id: &str, event: ConnectionEvent) {
        match self.state.on(event) {
            Ok(next) => self.state = next,
            Err(e) => tracing::warn!(conn_id = %conn_id, error = %e, "Ignoring connection event"),
        }
    }

    /// Queue a message. A closed channel only means the socket task is gone.
    fn send(&self, conn_id: &str, message: Message) -> bool {
        match self.sender.send(message) {
            Ok(()) => true,
            Err(_) => {
                tracing::debug!(conn_id = %conn_id, "WebSocket send failed, channel closed");
                false
            }
        }
    }
}

/// What the upgrade handler needs to drive a freshly admitted connection.
pub struct Admission {
    /// Outbound messages to forward to the socket sink.
    pub receiver: mpsc::UnboundedReceiver<Message>,
    /// Fires when the server evicts or kicks this connection.
    pub cancel: CancellationToken,
}

/// Bookkeeping returned by [`WsManager::remove`].
#[derive(Debug)]
pub struct RemovedConnection {
    pub identity: Option<CallerIdentity>,
    /// No other connection of the same user remains.
    pub last_for_user: bool,
    /// Locks released because this was the user's last connection.
    pub released_locks: usize,
}

/// Row of the admin "active users" listing.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveConnection {
    /// User id of the connection's owner.
    pub id: Option<DbId>,
    pub connection_id: String,
    pub username: Option<String>,
    pub roles: Vec<Role>,
    pub last_liveness: Timestamp,
    pub connected_at: Timestamp,
}

/// Registry of active WebSocket connections.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application. Besides membership it tracks liveness,
/// fans out role-targeted messages, and (optionally) releases a user's
/// record locks once their last connection is gone.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
    liveness_timeout: chrono::Duration,
    lock_release: Option<Arc<dyn LockRelease>>,
}

impl WsManager {
    /// Create an empty registry with the default liveness window and no
    /// lock release on disconnect.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            liveness_timeout: chrono::Duration::seconds(LIVENESS_TIMEOUT_SECS as i64),
            lock_release: None,
        }
    }

    /// Override the maximum silence allowed before eviction.
    pub fn with_liveness_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.liveness_timeout =
            chrono::Duration::from_std(timeout).unwrap_or(self.liveness_timeout);
        self
    }

    /// Release every lock of a user once their last connection is removed.
    pub fn with_lock_release(mut self, locks: Arc<dyn LockRelease>) -> Self {
        self.lock_release = Some(locks);
        self
    }

    pub fn liveness_timeout(&self) -> chrono::Duration {
        self.liveness_timeout
    }

    /// Register a new connection in the `Open` state with liveness set to now.
    ///
    /// Re-using an id replaces the previous entry, whose socket task is
    /// cancelled.
    pub async fn admit(&self, conn_id: String, identity: Option<CallerIdentity>) -> Admission {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let now = chrono::Utc::now();

        let state = ConnectionState::Connecting
            .on(ConnectionEvent::Admitted)
            .unwrap_or(ConnectionState::Open);

        let conn = WsConnection {
            identity,
            sender: tx,
            connected_at: now,
            last_liveness: now,
            state,
            cancel: cancel.clone(),
        };
        if let Some(previous) = self.connections.write().await.insert(conn_id.clone(), conn) {
            tracing::warn!(conn_id = %conn_id, "Replacing connection with duplicate id");
            previous.cancel.cancel();
        }

        Admission {
            receiver: rx,
            cancel,
        }
    }

    /// Record a liveness response. Unknown ids are ignored.
    pub async fn touch(&self, conn_id: &str) {
        self.touch_at(conn_id, chrono::Utc::now()).await;
    }

    /// [`touch`](Self::touch) with an explicit clock reading.
    pub async fn touch_at(&self, conn_id: &str, now: Timestamp) {
        if let Some(conn) = self.connections.write().await.get_mut(conn_id) {
            conn.last_liveness = now;
        }
    }

    /// Remove a connection by its ID. Removing an absent id is a no-op.
    ///
    /// When lock release is enabled and no other connection of the same user
    /// remains, all of that user's locks are released.
    pub async fn remove(&self, conn_id: &str) -> Option<RemovedConnection> {
        let mut conns = self.connections.write().await;
        let mut conn = conns.remove(conn_id)?;
        let last_for_user = match conn.user_id() {
            Some(uid) => !conns.values().any(|other| other.user_id() == Some(uid)),
            None => false,
        };

        conn.transition(conn_id, ConnectionEvent::Removed);
        conn.cancel.cancel();

        // The registry stays write-locked until the release is done: a tab of
        // the same user admitted meanwhile would otherwise lose its locks.
        let mut released_locks = 0;
        if last_for_user {
            if let (Some(locks), Some(uid)) = (&self.lock_release, conn.user_id()) {
                released_locks = locks.release_all_for_user(uid).await;
                if released_locks > 0 {
                    tracing::info!(
                        conn_id = %conn_id,
                        user_id = uid,
                        released_locks,
                        "Released locks of disconnected user"
                    );
                }
            }
        }
        drop(conns);

        Some(RemovedConnection {
            identity: conn.identity,
            last_for_user,
            released_locks,
        })
    }

    /// Apply `action` to every connection whose identity satisfies `predicate`.
    ///
    /// Connections without an identity are skipped.
    pub async fn for_each_matching<P, A>(&self, mut predicate: P, mut action: A)
    where
        P: FnMut(&CallerIdentity) -> bool,
        A: FnMut(&str, &WsConnection),
    {
        let conns = self.connections.read().await;
        for (id, conn) in conns.iter() {
            if let Some(identity) = &conn.identity {
                if predicate(identity) {
                    action(id, conn);
                }
            }
        }
    }

    /// Send `message` to every open connection whose identity has at least
    /// one of `roles`.
    ///
    /// An empty `roles` slice reaches nobody. Anonymous connections are
    /// always skipped. Returns the number of connections the message was
    /// queued for.
    pub async fn broadcast_to_roles(&self, roles: &[Role], message: &ServerMessage) -> usize {
        if roles.is_empty() {
            return 0;
        }
        let payload = message.to_json();
        let mut delivered = 0;
        self.for_each_matching(
            |identity| identity.has_any_role(roles),
            |id, conn| {
                if conn.state.accepts_traffic() && conn.send(id, Message::Text(payload.clone().into()))
                {
                    delivered += 1;
                }
            },
        )
        .await;
        tracing::debug!(kind = message.kind(), delivered, "Broadcast to roles");
        delivered
    }

    /// Tell admins that the set of active connections changed.
    pub async fn notify_presence_changed(&self) {
        self.broadcast_to_roles(ADMIN_ONLY, &ServerMessage::RefreshActiveUsers)
            .await;
    }

    /// Find all connection IDs associated with a given user.
    pub async fn get_by_user(&self, user_id: DbId) -> Vec<String> {
        self.connections
            .read()
            .await
            .iter()
            .filter_map(|(id, conn)| {
                if conn.user_id() == Some(user_id) {
                    Some(id.clone())
                } else {
                    None
                }
            })
            .collect()
    }

    /// Send a message to all open connections belonging to a specific user.
    ///
    /// Returns the number of connections the message was sent to.
    pub async fn send_to_user(&self, user_id: DbId, message: &ServerMessage) -> usize {
        let payload = message.to_json();
        let conns = self.connections.read().await;
        let mut count = 0;
        for (id, conn) in conns.iter() {
            if conn.user_id() == Some(user_id)
                && conn.state.accepts_traffic()
                && conn.send(id, Message::Text(payload.clone().into()))
            {
                count += 1;
            }
        }
        count
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Snapshot of every registered connection, oldest first.
    pub async fn active_connections(&self) -> Vec<ActiveConnection> {
        let conns = self.connections.read().await;
        let mut rows: Vec<ActiveConnection> = conns
            .iter()
            .map(|(id, conn)| ActiveConnection {
                id: conn.user_id(),
                connection_id: id.clone(),
                username: conn.identity.as_ref().map(|i| i.username.clone()),
                roles: conn
                    .identity
                    .as_ref()
                    .map(|i| i.roles.clone())
                    .unwrap_or_default(),
                last_liveness: conn.last_liveness,
                connected_at: conn.connected_at,
            })
            .collect();
        rows.sort_by(|a, b| {
            a.connected_at
                .cmp(&b.connected_at)
                .then_with(|| a.connection_id.cmp(&b.connection_id))
        });
        rows
    }

    /// Forcibly disconnect every connection of `user_id`.
    ///
    /// Each connection receives a `KICK` message followed by a Close frame,
    /// then leaves the registry. Returns `false` if the user had no
    /// connection.
    pub async fn kick_user(&self, user_id: DbId, reason: &str) -> bool {
        let kick = Message::Text(ServerMessage::Kick(reason.to_string()).to_json().into());

        let conn_ids = {
            let mut conns = self.connections.write().await;
            let mut ids = Vec::new();
            for (id, conn) in conns.iter_mut() {
                if conn.user_id() != Some(user_id) {
                    continue;
                }
                conn.transition(id, ConnectionEvent::Kicked);
                conn.send(id, kick.clone());
                conn.send(id, Message::Close(None));
                ids.push(id.clone());
            }
            ids
        };

        for id in &conn_ids {
            self.remove(id).await;
        }

        if conn_ids.is_empty() {
            return false;
        }
        tracing::info!(user_id, connections = conn_ids.len(), "Kicked user");
        self.notify_presence_changed().await;
        true
    }

    /// One liveness tick at `now`.
    ///
    /// Connections silent for longer than the liveness window are moved to
    /// `Closing`, sent a Close frame, cancelled and removed. Every other open
    /// connection gets a `ping`. A failed send on one connection never stops
    /// the sweep. Returns the ids that were evicted.
    pub async fn sweep(&self, now: Timestamp) -> Vec<String> {
        let ping = Message::Text(ServerMessage::Ping.to_json().into());

        let stale = {
            let mut conns = self.connections.write().await;
            let mut stale = Vec::new();
            for (id, conn) in conns.iter_mut() {
                if now - conn.last_liveness > self.liveness_timeout {
                    conn.transition(id, ConnectionEvent::LivenessTimeout);
                    conn.send(id, Message::Close(None));
                    stale.push(id.clone());
                } else if conn.state.accepts_traffic() {
                    conn.send(id, ping.clone());
                }
            }
            stale
        };

        for id in &stale {
            tracing::info!(conn_id = %id, "Evicting unresponsive WebSocket connection");
            self.remove(id).await;
        }
        if !stale.is_empty() {
            self.notify_presence_changed().await;
        }
        stale
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for (id, conn) in conns.iter_mut() {
            conn.send(id, Message::Close(None));
            conn.cancel.cancel();
            conn.transition(id, ConnectionEvent::Removed);
        }
        conns.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
