pub mod admin;
pub mod events;
pub mod health;
pub mod locks;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /ws                                  WebSocket (session required)
///
/// /locks/acquire                       acquire a record lock (POST)
/// /locks/release                       release a record lock (POST)
/// /locks/{type}/{id}                   current holder (GET)
///
/// /admin/active-users                  list connections (admin only)
/// /admin/kick-user                     force-disconnect a user (POST, admin only)
/// /admin/locks                         list held locks (admin only)
///
/// /events/chart                        broadcast UPDATE_CHART (POST)
/// /events/login                        broadcast login to admins (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/locks", locks::router())
        .nest("/admin", admin::router())
        .nest("/events", events::router())
}
