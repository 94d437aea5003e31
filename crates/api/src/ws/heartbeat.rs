use std::sync::Arc;
use std::time::Duration;

use crate::ws::manager::WsManager;

/// Spawn the liveness monitor.
///
/// Every `interval` the task evicts connections that stayed silent longer
/// than the manager's liveness window and sends an application-level `ping`
/// to the rest. The cadence is fixed; there is no backoff. The returned
/// `JoinHandle` is aborted during shutdown.
pub fn start_heartbeat(ws_manager: Arc<WsManager>, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let evicted = ws_manager.sweep(chrono::Utc::now()).await;
            let count = ws_manager.connection_count().await;
            tracing::debug!(count, evicted = evicted.len(), "WebSocket heartbeat ping");
        }
    })
}
