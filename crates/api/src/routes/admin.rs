//! Route definitions for the `/admin` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::admin;
use crate::state::AppState;

/// Routes mounted at `/admin`.
///
/// All routes require the admin role (enforced by handler extractors).
///
/// ```text
/// GET    /active-users            -> list_active_users
/// POST   /kick-user               -> kick_user
/// GET    /locks                   -> list_locks
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/active-users", get(admin::list_active_users))
        .route("/kick-user", post(admin::kick_user))
        .route("/locks", get(admin::list_locks))
}
