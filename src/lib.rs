use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use time::Duration;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};
use tracing::warn;

pub mod admin;
pub mod auth;
pub mod config;
pub mod database;
pub mod mailer;
pub mod signup;
pub mod users;

pub use admin::{AdminSite, AdminSiteError};
pub use config::AppConfig;
pub use database::Database;
pub use mailer::Mailer;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub config: Arc<AppConfig>,
    pub mailer: Mailer,
    pub admin: Arc<AdminSite>,
}

impl AppState {
    /// Builds the state and runs the admin site bootstrap.
    pub fn new(
        db: Arc<Database>,
        config: Arc<AppConfig>,
        mailer: Mailer,
    ) -> Result<Self, AdminSiteError> {
        let admin = Arc::new(AdminSite::bootstrap(db.clone())?);
        Ok(Self {
            db,
            config,
            mailer,
            admin,
        })
    }
}

pub fn create_router(app_state: AppState) -> Router {
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(app_state.config.environment == "production")
        .with_expiry(Expiry::OnInactivity(Duration::days(1)));

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/users/register", post(users::register_user))
        .route("/api/users/activate/:activation_key", get(users::activate_signup))
        .route("/api/users/login", post(users::login_user))
        .route("/api/users/logout", post(users::logout_user))
        .route("/admin/users", get(admin::users::admin_users_list_handler))
        .route("/api/admin/models", get(admin::users::list_models))
        .route("/api/admin/users", get(admin::users::list_users))
        .route("/api/admin/users/actions", post(admin::users::run_user_action))
        .route("/api/admin/users/:user_id", get(admin::users::get_user))
        .route("/api/admin/profiles", get(admin::profiles::list_profiles))
        .with_state(app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(session_layer)
                .layer(CompressionLayer::new())
                .layer(CorsLayer::permissive()),
        )
}

async fn health_handler(State(state): State<AppState>) -> Result<&'static str, StatusCode> {
    match state.db.health_check().await {
        Ok(_) => Ok("OK"),
        Err(e) => {
            warn!("Health check failed: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}
