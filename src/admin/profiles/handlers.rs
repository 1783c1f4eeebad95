use axum::{extract::State, Json};
use tower_sessions::Session;

use crate::admin::profiles::models::Profile;
use crate::admin::profiles::repository::AdminProfileRepository;
use crate::admin::{require_staff, require_view, AdminApiError};
use crate::AppState;

/// List all profiles (staff with profile view permission)
pub async fn list_profiles(
    session: Session,
    State(state): State<AppState>,
) -> Result<Json<Vec<Profile>>, AdminApiError> {
    let actor = require_staff(&session).await?;
    let admin = state
        .admin
        .get("profile")
        .ok_or_else(|| AdminApiError::NotFound("Model admin 'profile'".to_string()))?;
    require_view(admin, &actor, None).await?;

    let repo = AdminProfileRepository::new(state.db.clone());
    let profiles = repo
        .list_all_profiles()
        .await
        .map_err(|e| AdminApiError::DatabaseError(format!("Failed to list profiles: {}", e)))?;

    Ok(Json(profiles))
}
