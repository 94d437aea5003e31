//! Route definitions for advisory record locks.
//!
//! All endpoints require authentication via the `AuthUser` extractor.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::locks;
use crate::state::AppState;

/// Lock routes mounted at `/locks`.
///
/// ```text
/// POST /acquire            -> acquire_lock
/// POST /release            -> release_lock
/// GET  /{type}/{id}        -> get_lock_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/acquire", post(locks::acquire_lock))
        .route("/release", post(locks::release_lock))
        .route("/{kind}/{id}", get(locks::get_lock_status))
}
