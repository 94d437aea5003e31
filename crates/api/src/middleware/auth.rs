//! JWT-based authentication extractor for Axum handlers.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use teamdesk_core::error::CoreError;
use teamdesk_core::identity::CallerIdentity;
use teamdesk_core::types::DbId;

use crate::auth::jwt::validate_token;
use crate::error::AppError;
use crate::state::AppState;

/// Authenticated caller extracted from a JWT Bearer token in the
/// `Authorization` header.
///
/// ```ignore
/// async fn my_handler(auth: AuthUser) -> AppResult<Json<()>> {
///     tracing::info!(user_id = auth.user_id(), "handling request");
///     Ok(Json(()))
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub identity: CallerIdentity,
}

impl AuthUser {
    pub fn user_id(&self) -> DbId {
        self.identity.user_id
    }
}

/// Pull the token out of an `Authorization: Bearer <token>` header.
///
/// Returns `Ok(None)` when the header is absent.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<&str>, AppError> {
    let Some(header) = headers.get("authorization") else {
        return Ok(None);
    };
    let value = header.to_str().map_err(|_| {
        AppError::Core(CoreError::Unauthorized(
            "Invalid Authorization header".into(),
        ))
    })?;
    let token = value.strip_prefix("Bearer ").ok_or_else(|| {
        AppError::Core(CoreError::Unauthorized(
            "Invalid Authorization format. Expected: Bearer <token>".into(),
        ))
    })?;
    Ok(Some(token))
}

/// Validate `token` and resolve the caller identity it carries.
pub fn resolve_identity(token: &str, state: &AppState) -> Result<CallerIdentity, AppError> {
    let claims = validate_token(token, &state.config.jwt).map_err(|_| {
        AppError::Core(CoreError::Unauthorized("Invalid or expired token".into()))
    })?;
    Ok(claims.identity())
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?.ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(
                "Missing Authorization header".into(),
            ))
        })?;

        Ok(AuthUser {
            identity: resolve_identity(token, state)?,
        })
    }
}
