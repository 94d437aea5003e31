//! Handlers for advisory record locks.
//!
//! The UI calls `acquire` before opening an edit form and `release` when the
//! form closes. Locks are advisory: nothing here blocks a write to the
//! relational store.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use serde_json::json;
use teamdesk_core::locks::{validate_lock_target, AcquireResponse, LockHolder, LockKind, LockRequest};
use teamdesk_core::types::DbId;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// POST /api/locks/acquire
///
/// Lock a record for the caller. Contention is not an error: the reply is
/// `{ success: false, holder }` naming whoever holds the lock.
pub async fn acquire_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LockRequest>,
) -> AppResult<Json<AcquireResponse>> {
    validate_lock_target(input.id)?;

    let outcome = state.locks.acquire(input.kind, input.id, &auth.identity).await;

    if outcome.is_granted() {
        tracing::info!(
            user_id = auth.user_id(),
            kind = %input.kind,
            id = input.id,
            "Lock acquired"
        );
    } else {
        tracing::debug!(
            user_id = auth.user_id(),
            kind = %input.kind,
            id = input.id,
            "Lock denied"
        );
    }

    Ok(Json(outcome.into()))
}

/// POST /api/locks/release
///
/// Always answers `{ success: true }`, even for ids that could never be
/// locked: releasing a lock the caller does not hold silently does nothing.
pub async fn release_lock(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<LockRequest>,
) -> Json<serde_json::Value> {
    state.locks.release(input.kind, input.id, auth.user_id()).await;
    tracing::debug!(
        user_id = auth.user_id(),
        kind = %input.kind,
        id = input.id,
        "Lock release requested"
    );

    Json(json!({ "success": true }))
}

/// Reply of [`get_lock_status`].
#[derive(Debug, Serialize)]
pub struct LockStatus {
    pub locked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder: Option<LockHolder>,
}

/// GET /api/locks/{type}/{id}
///
/// Report who holds a record, if anyone.
pub async fn get_lock_status(
    _auth: AuthUser,
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, DbId)>,
) -> AppResult<Json<LockStatus>> {
    let kind: LockKind = kind.parse().map_err(AppError::BadRequest)?;
    validate_lock_target(id)?;

    let holder = state.locks.holder(kind, id).await;
    Ok(Json(LockStatus {
        locked: holder.is_some(),
        holder,
    }))
}
