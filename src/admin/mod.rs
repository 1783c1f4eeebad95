pub mod permissions;
pub mod profiles;
pub mod site;
pub mod users;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tower_sessions::Session;

use crate::users::models::UserSession;

// Re-export commonly used items
pub use permissions::{AdminOperation, PermissionGuard, PermissionRepository};
pub use site::{AdminPresentation, AdminSite, AdminSiteError, ModelAdmin};
pub use users::{ModerationAction, ModerationOutcome, SignupModerator};

const MESSAGES_KEY: &str = "messages";

#[derive(Debug)]
pub enum AdminApiError {
    Unauthorized,
    Forbidden,
    NotFound(String),
    ValidationError(String),
    DatabaseError(String),
    InternalError(String),
}

impl IntoResponse for AdminApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AdminApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".to_string()),
            AdminApiError::Forbidden => (StatusCode::FORBIDDEN, "Permission denied".to_string()),
            AdminApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            AdminApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            AdminApiError::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AdminApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Only staff may enter the admin at all; finer checks go through the
/// model admin's permission guard.
pub(crate) async fn require_staff(session: &Session) -> Result<UserSession, AdminApiError> {
    let user_session: UserSession = session
        .get("user")
        .await
        .map_err(|e| AdminApiError::InternalError(format!("Failed to get session: {}", e)))?
        .ok_or(AdminApiError::Unauthorized)?;

    if user_session.is_staff || user_session.is_superuser {
        Ok(user_session)
    } else {
        Err(AdminApiError::Forbidden)
    }
}

/// Runs the view check of `admin`, accepting change permission as well.
pub(crate) async fn require_view(
    admin: &ModelAdmin,
    actor: &UserSession,
    object_id: Option<i64>,
) -> Result<(), AdminApiError> {
    for operation in [AdminOperation::View, AdminOperation::Change] {
        let allowed = admin
            .has_permission(actor, operation, object_id)
            .await
            .map_err(|e| AdminApiError::DatabaseError(format!("Permission check failed: {}", e)))?;
        if allowed {
            return Ok(());
        }
    }
    Err(AdminApiError::Forbidden)
}

/// Queues a one-shot message for the next admin page render.
pub(crate) async fn push_message(session: &Session, message: &str) -> Result<(), AdminApiError> {
    let mut messages: Vec<String> = session
        .get(MESSAGES_KEY)
        .await
        .map_err(|e| AdminApiError::InternalError(format!("Failed to get session: {}", e)))?
        .unwrap_or_default();
    messages.push(message.to_string());

    session
        .insert(MESSAGES_KEY, messages)
        .await
        .map_err(|e| AdminApiError::InternalError(format!("Failed to update session: {}", e)))
}

/// Drains queued messages.
pub(crate) async fn take_messages(session: &Session) -> Vec<String> {
    session
        .remove::<Vec<String>>(MESSAGES_KEY)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}
