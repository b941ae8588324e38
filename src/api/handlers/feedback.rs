use axum::extract::State;

use crate::api::{
    extractors::{AdminAuth, Json},
    state::AppState,
};
use crate::db::models::{Feedback, FeedbackParams, FeedbackView};
use crate::errors::ApiError;
use crate::validation::validate_rating;
use crate::Result;

/// Handler for a customer rating the delivery of their order
///
/// # Endpoint: POST /api/feedback
///
/// Accepted once per delivered order, for the agent who delivered it.
pub(crate) async fn submit_feedback(
    State(state): State<AppState>,
    Json(params): Json<FeedbackParams>,
) -> Result<Json<Feedback>> {
    validate_rating(params.rating).map_err(ApiError::Validation)?;
    Ok(Json(state.db.create_feedback(params).await?))
}

/// # Endpoint: GET /admin/feedbacks
pub(crate) async fn list_feedbacks(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<Vec<FeedbackView>>> {
    Ok(Json(state.db.list_feedbacks().await?))
}
