//! Admin-only handlers for the real-time presence layer.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use teamdesk_core::locks::LockInfo;
use teamdesk_core::realtime::DEFAULT_KICK_REASON;
use teamdesk_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::state::AppState;
use crate::ws::manager::ActiveConnection;

/// Request body for `POST /admin/kick-user`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KickUserRequest {
    pub user_id: Option<DbId>,
    pub reason: Option<String>,
}

/// Reply of `POST /admin/kick-user`.
#[derive(Debug, Serialize)]
pub struct KickUserResponse {
    pub success: bool,
    /// `false` when the user had no active connection.
    pub kicked: bool,
}

/// GET /api/admin/active-users
pub async fn list_active_users(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<ActiveConnection>>> {
    let connections = state.ws_manager.active_connections().await;
    tracing::debug!(count = connections.len(), "Listing active connections");
    Ok(Json(connections))
}

/// POST /api/admin/kick-user
///
/// Sends `KICK` to every connection of the user, then closes them.
pub async fn kick_user(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<KickUserRequest>,
) -> AppResult<Json<KickUserResponse>> {
    let user_id = input
        .user_id
        .ok_or_else(|| AppError::BadRequest("User ID is required".into()))?;
    let reason = input.reason.as_deref().unwrap_or(DEFAULT_KICK_REASON);

    let kicked = state.ws_manager.kick_user(user_id, reason).await;
    tracing::info!(admin_id = admin.user_id(), user_id, kicked, "Kick requested");

    Ok(Json(KickUserResponse {
        success: true,
        kicked,
    }))
}

/// GET /api/admin/locks
pub async fn list_locks(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<Json<Vec<LockInfo>>> {
    Ok(Json(state.locks.snapshot().await))
}
