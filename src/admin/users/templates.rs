use askama::Template;
use axum::{extract::State, http::StatusCode, response::Html};
use tower_sessions::Session;

use crate::admin::site::ActionSpec;
use crate::admin::users::models::AdminUserRow;
use crate::admin::users::repository::AdminUserRepository;
use crate::admin::{require_staff, require_view, take_messages, AdminApiError};
use crate::AppState;

#[derive(Template)]
#[template(path = "admin/users/list.html")]
pub struct AdminUsersListTemplate {
    pub title: String,
    pub messages: Vec<String>,
    pub columns: Vec<&'static str>,
    pub actions: Vec<ActionSpec>,
    pub users: Vec<AdminUserRow>,
    pub staff_username: String,
}

fn status_code(error: AdminApiError) -> StatusCode {
    match error {
        AdminApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        AdminApiError::Forbidden => StatusCode::FORBIDDEN,
        AdminApiError::NotFound(_) => StatusCode::NOT_FOUND,
        AdminApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
        AdminApiError::DatabaseError(_) | AdminApiError::InternalError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Handler for the user change-list page
pub async fn admin_users_list_handler(
    session: Session,
    State(state): State<AppState>,
) -> Result<Html<String>, StatusCode> {
    let actor = require_staff(&session).await.map_err(status_code)?;
    let admin = state.admin.get("user").ok_or(StatusCode::NOT_FOUND)?;
    require_view(admin, &actor, None).await.map_err(status_code)?;

    let repo = AdminUserRepository::new(state.db.clone(), state.config.sentinels.clone());
    let users = repo
        .list_with_signups()
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let description = admin.describe();
    let template = AdminUsersListTemplate {
        title: format!("Users - {} administration", state.config.site_name),
        messages: take_messages(&session).await,
        columns: description.list_display,
        actions: description.actions,
        users,
        staff_username: actor.username,
    };

    Ok(Html(
        template
            .render()
            .unwrap_or_else(|_| "Template render error".to_string()),
    ))
}
