//! State-change notifications pushed over the real-time channel.
//!
//! Data mutations happen elsewhere; once they commit, the caller reports
//! them here so connected browsers refresh.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use teamdesk_core::messages::ServerMessage;
use teamdesk_core::realtime::LOGIN_NOTICE;
use teamdesk_core::roles::{ADMIN_ONLY, ALL_ROLES};

use crate::error::AppResult;
use crate::middleware::rbac::RequireAuth;
use crate::state::AppState;

/// Body of `POST /events/chart`; `data` is forwarded as the `UPDATE_CHART` payload.
#[derive(Debug, Default, Deserialize)]
pub struct ChartChange {
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct NotifyResponse {
    pub success: bool,
    /// Number of connections the message was queued for.
    pub notified: usize,
}

/// POST /api/events/chart
///
/// Ask every signed-in browser to reload its charts.
pub async fn chart_changed(
    RequireAuth(auth): RequireAuth,
    State(state): State<AppState>,
    Json(change): Json<ChartChange>,
) -> AppResult<Json<NotifyResponse>> {
    let notified = state
        .ws_manager
        .broadcast_to_roles(ALL_ROLES, &ServerMessage::UpdateChart(change.data))
        .await;
    tracing::debug!(user_id = auth.user_id(), notified, "Chart update broadcast");
    Ok(Json(NotifyResponse {
        success: true,
        notified,
    }))
}

/// POST /api/events/login
///
/// Called right after a successful login; tells admins someone signed in.
pub async fn user_logged_in(
    RequireAuth(auth): RequireAuth,
    State(state): State<AppState>,
) -> AppResult<Json<NotifyResponse>> {
    let notified = state
        .ws_manager
        .broadcast_to_roles(ADMIN_ONLY, &ServerMessage::Login(LOGIN_NOTICE.to_string()))
        .await;
    tracing::info!(user_id = auth.user_id(), username = %auth.identity.username, "User logged in");
    Ok(Json(NotifyResponse {
        success: true,
        notified,
    }))
}
