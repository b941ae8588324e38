use axum::{extract::State, Json};

use crate::api::state::AppState;
use crate::db::models::{Category, MedicineWithCategory, RoomType};
use crate::Result;

/// # Endpoint: GET /medicines
pub(crate) async fn list_medicines(
    State(state): State<AppState>,
) -> Result<Json<Vec<MedicineWithCategory>>> {
    Ok(Json(state.db.list_medicines().await?))
}

/// # Endpoint: GET /categories
pub(crate) async fn list_categories(State(state): State<AppState>) -> Result<Json<Vec<Category>>> {
    Ok(Json(state.db.list_categories().await?))
}

/// # Endpoint: GET /api/room-types
pub(crate) async fn list_room_types(State(state): State<AppState>) -> Result<Json<Vec<RoomType>>> {
    Ok(Json(state.db.list_room_types().await?))
}
