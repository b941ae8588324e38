use axum::extract::State;
use tracing::warn;

use crate::api::{extractors::{AdminAuth, Json, Query}, state::AppState};
use crate::db::models::{DashboardStats, LoginParams, SearchQuery, TokenResponse, User};
use crate::errors::ApiError;
use crate::logging::audit;
use crate::services::auth::{verify_password, Role};
use crate::Result;

/// Handler for admin sign-in
///
/// # Endpoint: POST /admin/login
///
/// # Returns
/// * `Json<TokenResponse>` - Bearer token for the admin endpoints
pub(crate) async fn admin_login(
    State(state): State<AppState>,
    Json(params): Json<LoginParams>,
) -> Result<Json<TokenResponse>> {
    let username = params.username.trim();
    let admin = state
        .db
        .find_admin_by_username(username)
        .await?
        .filter(|admin| verify_password(&params.password, &admin.password_hash));

    let Some(admin) = admin else {
        warn!(target: crate::logging::AUDIT_TARGET, user = username, "Failed admin login");
        return Err(ApiError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    };

    let token = state.tokens.issue(admin.id, Role::Admin)?;
    audit(&format!("admin:{}", admin.id), "login", &admin.username, None);
    Ok(Json(TokenResponse { token }))
}

/// # Endpoint: GET /admin/stats
pub(crate) async fn dashboard_stats(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<DashboardStats>> {
    Ok(Json(state.db.dashboard_stats().await?))
}

/// # Endpoint: GET /admin/users?search=
pub(crate) async fn list_users(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<User>>> {
    Ok(Json(state.db.list_users(&query).await?))
}
