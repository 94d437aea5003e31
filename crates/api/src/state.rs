use std::sync::Arc;

use teamdesk_core::locks::LockManager;

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`). The connection
/// registry and the lock table are created once per process and only ever
/// reached through this struct.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// WebSocket connection registry (browser clients).
    pub ws_manager: Arc<WsManager>,
    /// Advisory record locks.
    pub locks: Arc<LockManager>,
}

impl AppState {
    /// Wire the registry and lock table together according to `config`.
    pub fn new(config: ServerConfig) -> Self {
        let locks = Arc::new(LockManager::new());

        let mut ws_manager = WsManager::new().with_liveness_timeout(config.realtime.liveness_timeout());
        if config.realtime.release_locks_on_disconnect {
            ws_manager = ws_manager.with_lock_release(locks.clone());
        }

        Self {
            config: Arc::new(config),
            ws_manager: Arc::new(ws_manager),
            locks,
        }
    }
}
