use axum::{body::Body, Router};
use http::{header, Request, Response, StatusCode};
use moderated_signup::{
    config::{AppConfig, EmailConfig},
    create_router,
    database::Database,
    mailer::Mailer,
    signup::{ActivationKey, SignupRepository},
    users::{User, UserRepository},
    AppState,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

static DB_COUNTER: AtomicU64 = AtomicU64::new(0);

pub const PASSWORD: &str = "password123";

/// Creates a test app state with a unique temporary database and an
/// in-memory mailer.
pub async fn create_test_app_state() -> AppState {
    let temp_dir = std::env::temp_dir();
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();

    let test_db_path = temp_dir
        .join(format!(
            "test_moderated_signup_{}_{}_{}.db",
            std::process::id(),
            timestamp,
            DB_COUNTER.fetch_add(1, Ordering::SeqCst)
        ))
        .to_string_lossy()
        .to_string();

    let config = Arc::new(AppConfig {
        database_url: test_db_path,
        environment: "test".to_string(),
        site_name: "Test Site".to_string(),
        base_url: "http://testserver".to_string(),
        ..AppConfig::default()
    });

    let db = Arc::new(Database::new(&config.database_url).await.unwrap());
    db.migrate().await.unwrap();

    let mailer = Mailer::in_memory(&config.site_name, &config.base_url);
    AppState::new(db, config, mailer).unwrap()
}

/// An SMTP mailer pointed at a port nothing listens on, so every send fails.
#[allow(dead_code)]
pub fn unreachable_smtp_mailer() -> Mailer {
    let config = AppConfig {
        email: Some(EmailConfig {
            smtp_url: "smtp://127.0.0.1:1".to_string(),
            from_address: "staff@example.com".to_string(),
        }),
        ..AppConfig::default()
    };
    Mailer::new(&config).unwrap()
}

/// Creates a test app with a fresh database for integration testing
#[allow(dead_code)]
pub async fn create_test_app() -> Router {
    create_router(create_test_app_state().await)
}

/// Creates an active account, optionally with an attached signup.
#[allow(dead_code)]
pub async fn seed_user(
    state: &AppState,
    username: &str,
    signup: Option<ActivationKey>,
    is_active: bool,
) -> User {
    let users = UserRepository::new(state.db.clone());
    let mut user = users
        .create_user(
            username,
            &format!("{}@example.com", username),
            PASSWORD,
            false,
            false,
        )
        .await
        .unwrap();

    if user.is_active != is_active {
        user.is_active = is_active;
        users.save(&user).await.unwrap();
    }

    if let Some(key) = signup {
        SignupRepository::new(state.db.clone(), state.config.sentinels.clone())
            .attach(user.id, key)
            .await
            .unwrap();
    }

    user
}

#[allow(dead_code)]
pub async fn seed_staff(state: &AppState, username: &str, is_superuser: bool) -> User {
    UserRepository::new(state.db.clone())
        .create_user(
            username,
            &format!("{}@example.com", username),
            PASSWORD,
            true,
            is_superuser,
        )
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn reload_user(state: &AppState, user_id: i64) -> User {
    UserRepository::new(state.db.clone())
        .find_by_id(user_id)
        .await
        .unwrap()
        .unwrap()
}

#[allow(dead_code)]
pub async fn signup_key(state: &AppState, user_id: i64) -> Option<ActivationKey> {
    SignupRepository::new(state.db.clone(), state.config.sentinels.clone())
        .find_for_user(user_id)
        .await
        .unwrap()
        .map(|signup| signup.activation_key)
}

/// Logs in through the API and returns the session cookie pair.
#[allow(dead_code)]
pub async fn login(app: &Router, username: &str) -> String {
    let response = send_json(
        app,
        "POST",
        "/api/users/login",
        None,
        json!({ "username": username, "password": PASSWORD }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.split(';').next())
        .unwrap_or("")
        .to_string()
}

#[allow(dead_code)]
pub async fn send_json(
    app: &Router,
    method: &str,
    uri: &str,
    cookie: Option<&str>,
    body: Value,
) -> Response<Body> {
    let mut builder = Request::builder()
        .uri(uri)
        .method(method)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    app.clone()
        .oneshot(
            builder
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn get(app: &Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().uri(uri).method("GET");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }

    app.clone()
        .oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[allow(dead_code)]
pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[allow(dead_code)]
pub async fn body_text(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}
