use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use moderated_signup::{
    config::AppConfig, create_router, database::Database, mailer::Mailer,
    users::UserRepository, AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,tower_http=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Arc::new(AppConfig::load()?);
    info!("Configuration loaded successfully");

    // Initialize database
    let db = Arc::new(Database::new(&config.database_url).await?);
    info!("Database initialized successfully");

    db.migrate().await?;
    info!("Database migrations completed");

    if let Some(admin) = &config.bootstrap_admin {
        let user = UserRepository::new(db.clone())
            .ensure_superuser(&admin.username, &admin.email, &admin.password)
            .await?;
        info!("Bootstrap superuser: {}", user.username);
    }

    let mailer = Mailer::new(&config)?;
    let app_state = AppState::new(db, config.clone(), mailer)?;

    let app = create_router(app_state);

    let listener = TcpListener::bind(&config.server_address).await?;
    info!("Server starting on {}", config.server_address);

    axum::serve(listener, app).await?;

    Ok(())
}
