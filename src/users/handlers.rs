use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use time::Duration;
use tower_sessions::{Expiry, Session};
use tracing::{info, warn};

use crate::auth::{generate_activation_key, hash_password, verify_password};
use crate::database::is_constraint_violation;
use crate::signup::{activate_user, ActivationOutcome, NewRegistration, SignupRepository};
use crate::users::models::{
    CreateUserRequest, LoginRequest, LoginResponse, UserResponse, UserSession,
};
use crate::users::repository::UserRepository;
use crate::AppState;

#[derive(Debug)]
pub enum ApiError {
    UserAlreadyExists,
    ValidationError(String),
    NotFound(String),
    DatabaseError(String),
    InternalError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ApiError::UserAlreadyExists => (
                StatusCode::CONFLICT,
                "A user with that username already exists".to_string(),
            ),
            ApiError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::DatabaseError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

pub async fn register_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    if !is_valid_username(&request.username) {
        return Err(ApiError::ValidationError(
            "Username may only contain letters, digits and @/./+/-/_".to_string(),
        ));
    }

    if !is_valid_email(&request.email) {
        return Err(ApiError::ValidationError(
            "Invalid email format".to_string(),
        ));
    }

    if request.password.len() < 8 {
        return Err(ApiError::ValidationError(
            "Password must be at least 8 characters long".to_string(),
        ));
    }

    let user_repo = UserRepository::new(state.db.clone());
    match user_repo.username_exists(&request.username).await {
        Ok(true) => return Err(ApiError::UserAlreadyExists),
        Ok(false) => {}
        Err(e) => {
            return Err(ApiError::DatabaseError(format!(
                "Failed to check existing user: {}",
                e
            )))
        }
    }

    let password_hash = hash_password(&request.password)
        .map_err(|e| ApiError::InternalError(format!("Failed to hash password: {}", e)))?;
    let activation_key = generate_activation_key();

    let signups = SignupRepository::new(state.db.clone(), state.config.sentinels.clone());
    let (user, _signup) = signups
        .register(NewRegistration {
            username: request.username,
            email: request.email,
            password_hash,
            first_name: request.first_name.unwrap_or_default(),
            last_name: request.last_name.unwrap_or_default(),
            activation_key: activation_key.clone(),
        })
        .await
        .map_err(|e| {
            // Lost a race with a concurrent registration of the same name.
            if is_constraint_violation(e.as_ref()) {
                ApiError::UserAlreadyExists
            } else {
                ApiError::DatabaseError(format!("Failed to create user: {}", e))
            }
        })?;

    info!("New signup: {}", user.username);

    // The account is committed; staff can still moderate it without the link.
    if let Err(e) = state
        .mailer
        .send_activation_email(&user, &activation_key, state.config.moderate_registration)
        .await
    {
        warn!("Activation email to {} failed: {}", user.email, e);
    }

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// The link mailed to new registrants.
pub async fn activate_signup(
    State(state): State<AppState>,
    Path(activation_key): Path<String>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let signups = SignupRepository::new(state.db.clone(), state.config.sentinels.clone());
    let users = UserRepository::new(state.db.clone());

    let outcome = activate_user(
        &signups,
        &users,
        &activation_key,
        state.config.moderate_registration,
    )
    .await
    .map_err(|e| ApiError::DatabaseError(format!("Failed to activate: {}", e)))?
    .ok_or_else(|| ApiError::NotFound("Invalid or expired activation key".to_string()))?;

    let body = match outcome {
        ActivationOutcome::Activated(user) => json!({
            "status": "activated",
            "user": UserResponse::from(user),
            "message": "Your account has been activated",
        }),
        ActivationOutcome::PendingModeration(user) => json!({
            "status": "pending_moderation",
            "user": UserResponse::from(user),
            "message": "Your signup will be reviewed by staff",
        }),
    };

    Ok(Json(body))
}

pub async fn login_user(
    session: Session,
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user_repo = UserRepository::new(state.db.clone());

    let user = match user_repo.find_by_username(&request.username).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return Ok(Json(LoginResponse {
                success: false,
                user: None,
                message: "Invalid username or password".to_string(),
            }));
        }
        Err(e) => {
            return Err(ApiError::DatabaseError(format!("Failed to find user: {}", e)));
        }
    };

    let password_ok = verify_password(&request.password, &user.password_hash)
        .map_err(|e| ApiError::InternalError(format!("Failed to verify password: {}", e)))?;
    if !password_ok {
        return Ok(Json(LoginResponse {
            success: false,
            user: None,
            message: "Invalid username or password".to_string(),
        }));
    }

    if !user.is_active {
        warn!("Inactive user {} attempted to log in", user.username);
        return Ok(Json(LoginResponse {
            success: false,
            user: None,
            message: "This account is inactive".to_string(),
        }));
    }

    session
        .insert("user", UserSession::from(&user))
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to create session: {}", e)))?;

    if request.remember_me {
        session.set_expiry(Some(Expiry::OnInactivity(Duration::days(30))));
    }

    if let Err(e) = user_repo.record_login(user.id).await {
        warn!("Failed to record login for {}: {}", user.username, e);
    }

    Ok(Json(LoginResponse {
        success: true,
        user: Some(UserResponse::from(user)),
        message: "Login successful".to_string(),
    }))
}

pub async fn logout_user(session: Session) -> Result<Json<serde_json::Value>, ApiError> {
    session
        .flush()
        .await
        .map_err(|e| ApiError::InternalError(format!("Failed to clear session: {}", e)))?;

    Ok(Json(json!({
        "success": true,
        "message": "Logout successful"
    })))
}

fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username.len() <= 150
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

fn is_valid_email(email: &str) -> bool {
    // Must have exactly one @ separating local and domain parts
    let parts: Vec<&str> = email.split('@').collect();
    if parts.len() != 2 {
        return false;
    }

    let local = parts[0];
    let domain = parts[1];

    if local.is_empty() || !domain.contains('.') {
        return false;
    }

    let domain_parts: Vec<&str> = domain.split('.').collect();
    domain_parts.len() >= 2 && domain_parts.iter().all(|part| !part.is_empty())
}
