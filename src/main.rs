use axum::Server;
use config::Config;
use std::net::SocketAddr;

mod api;
mod config;
mod db;
mod errors;
mod logging;
mod schema;
mod services;
mod validation;

/// Result type for API
pub type Result<T> = std::result::Result<T, errors::ApiError>;

/// Static configuration instance for the API
static CONFIG: once_cell::sync::Lazy<Config> = once_cell::sync::Lazy::new(|| {
    dotenv::dotenv().ok();
    envy::from_env::<Config>().expect("Failed to load configuration")
});

/// Creates the configured admin account if it does not exist yet
async fn bootstrap_admin(db_client: &db::DbClient) {
    let (Some(username), Some(password)) = (
        CONFIG.bootstrap_admin_username.as_deref(),
        CONFIG.bootstrap_admin_password.as_deref(),
    ) else {
        return;
    };

    if let Err(e) = validation::validate_password(password) {
        tracing::warn!("Skipping admin bootstrap: {}", e);
        return;
    }

    let hash = services::auth::hash_password(password);
    match db_client.ensure_admin(username.trim(), &hash).await {
        Ok(true) => tracing::info!("Created admin account '{}'", username.trim()),
        Ok(false) => tracing::debug!("Admin account '{}' already exists", username.trim()),
        Err(e) => tracing::error!("Failed to bootstrap admin account: {}", e),
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    if let Err(e) = logging::setup_logging(&CONFIG.log_dir) {
        tracing_subscriber::fmt::init();
        tracing::warn!("Audit log disabled: {:#}", e);
    }

    // Initialize database and Redis connections
    let db_client = match db::DbClient::new(&CONFIG.database_url, &CONFIG.redis_url) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to create database pool: {}", e);
            return;
        }
    };

    bootstrap_admin(&db_client).await;

    let state = match api::AppState::new(db_client, CONFIG.clone()) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to initialize application state: {}", e);
            return;
        }
    };

    // Log initial health status
    let initial_health = state.jobs.get_health_status().await;
    tracing::info!("Background job initial status: {:?}", initial_health);

    state.jobs.start_all_jobs().await;

    // Setup API router and start server
    let app = api::initialize_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], CONFIG.port));
    tracing::info!("Server starting on {}", addr);

    if let Err(e) = Server::bind(&addr)
        .serve(app.into_make_service_with_connect_info::<SocketAddr>())
        .await
    {
        tracing::error!("Server error: {}", e);
    }
}
