use axum::{extract::State, http::StatusCode, Json};

use crate::api::state::AppState;

/// Health check endpoint that includes background job status
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let bg_health = state.jobs.get_health_status().await;

    let database_status = match state.db.get_db_conn().await {
        Err(e) => serde_json::json!({
            "status": "error",
            "message": e.to_string()
        }),
        Ok(_) => serde_json::json!("connected"),
    };

    let redis_status = match state.db.get_async_redis_conn().await {
        Err(e) => serde_json::json!({
            "status": "error",
            "message": e.to_string()
        }),
        Ok(_) => serde_json::json!("connected"),
    };

    let health_status = serde_json::json!({
        "status": "ok",
        "database": database_status,
        "redis": redis_status,
        "background_jobs": bg_health,
        "whatsapp_configured": state.whatsapp.is_configured(),
        "timestamp": chrono::Utc::now()
    });

    (StatusCode::OK, Json(health_status))
}
