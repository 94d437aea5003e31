use axum::routing::post;
use axum::Router;

use crate::handlers::events;
use crate::state::AppState;

/// Notification routes mounted at `/events`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chart", post(events::chart_changed))
        .route("/login", post(events::user_logged_in))
}
