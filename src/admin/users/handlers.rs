use axum::{
    extract::{Path, State},
    Json,
};
use tower_sessions::Session;
use tracing::warn;

use crate::admin::permissions::AdminOperation;
use crate::admin::site::{ModelAdmin, ModelAdminDescription};
use crate::admin::users::models::{AdminActionRequest, AdminUserRow};
use crate::admin::users::moderation::{ModerationAction, ModerationOutcome, SignupModerator};
use crate::admin::users::repository::AdminUserRepository;
use crate::admin::{push_message, require_staff, require_view, AdminApiError};
use crate::AppState;

fn user_admin(state: &AppState) -> Result<&ModelAdmin, AdminApiError> {
    state
        .admin
        .get("user")
        .ok_or_else(|| AdminApiError::NotFound("Model admin 'user'".to_string()))
}

/// Describe every registered model admin
pub async fn list_models(
    session: Session,
    State(state): State<AppState>,
) -> Result<Json<Vec<ModelAdminDescription>>, AdminApiError> {
    require_staff(&session).await?;
    Ok(Json(state.admin.describe()))
}

/// User change list with signup inlines
pub async fn list_users(
    session: Session,
    State(state): State<AppState>,
) -> Result<Json<Vec<AdminUserRow>>, AdminApiError> {
    let actor = require_staff(&session).await?;
    require_view(user_admin(&state)?, &actor, None).await?;

    let repo = AdminUserRepository::new(state.db.clone(), state.config.sentinels.clone());
    let rows = repo
        .list_with_signups()
        .await
        .map_err(|e| AdminApiError::DatabaseError(format!("Failed to list users: {}", e)))?;

    Ok(Json(rows))
}

/// One user; per-object grants apply here
pub async fn get_user(
    session: Session,
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> Result<Json<AdminUserRow>, AdminApiError> {
    let actor = require_staff(&session).await?;
    require_view(user_admin(&state)?, &actor, Some(user_id)).await?;

    let repo = AdminUserRepository::new(state.db.clone(), state.config.sentinels.clone());
    let row = repo
        .find_with_signup(user_id)
        .await
        .map_err(|e| AdminApiError::DatabaseError(format!("Failed to load user: {}", e)))?
        .ok_or_else(|| AdminApiError::NotFound("User".to_string()))?;

    Ok(Json(row))
}

/// Run a bulk action over the selected users
pub async fn run_user_action(
    session: Session,
    State(state): State<AppState>,
    Json(request): Json<AdminActionRequest>,
) -> Result<Json<ModerationOutcome>, AdminApiError> {
    let actor = require_staff(&session).await?;
    let admin = user_admin(&state)?;

    let action = ModerationAction::from_name(&request.action)
        .filter(|action| admin.has_action(action.name()))
        .ok_or_else(|| {
            AdminApiError::ValidationError(format!("Unknown action '{}'", request.action))
        })?;

    if request.selected.is_empty() {
        return Err(AdminApiError::ValidationError(
            "Items must be selected in order to perform actions on them".to_string(),
        ));
    }

    let allowed = admin
        .has_permission(&actor, AdminOperation::Change, None)
        .await
        .map_err(|e| AdminApiError::DatabaseError(format!("Permission check failed: {}", e)))?;
    if !allowed {
        warn!(
            "{} attempted {} without change permission",
            actor.username,
            action.name()
        );
        return Err(AdminApiError::Forbidden);
    }

    let moderator = SignupModerator::new(
        state.db.clone(),
        state.config.sentinels.clone(),
        state.mailer.clone(),
    );
    let outcome = moderator
        .process(&request.selected, action)
        .await
        .map_err(|e| AdminApiError::InternalError(format!("Failed to {}: {}", action.name(), e)))?;

    push_message(&session, &outcome.message).await?;

    Ok(Json(outcome))
}
