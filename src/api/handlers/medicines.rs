use axum::extract::State;
use serde_json::json;

use crate::api::{extractors::{AdminAuth, Json, Path}, state::AppState};
use crate::db::models::{
    Medicine, MedicineParams, MedicinePatch, MedicineWithCategory, MessageResponse,
};
use crate::errors::ApiError;
use crate::logging::audit;
use crate::validation::{validate_price, validate_required, validate_stock};
use crate::Result;

fn validate_params(params: MedicineParams) -> std::result::Result<MedicineParams, String> {
    Ok(MedicineParams {
        name: validate_required("Name", &params.name)?,
        description: params.description.trim().to_string(),
        price: validate_price(params.price)?,
        stock: validate_stock(params.stock)?,
        category_id: params.category_id,
    })
}

fn validate_patch(patch: MedicinePatch) -> std::result::Result<MedicinePatch, String> {
    Ok(MedicinePatch {
        name: patch.name.map(|v| validate_required("Name", &v)).transpose()?,
        description: patch.description.map(|v| v.trim().to_string()),
        price: patch.price.map(validate_price).transpose()?,
        stock: patch.stock.map(validate_stock).transpose()?,
        category_id: patch.category_id,
    })
}

/// # Endpoint: GET /admin/medicines
pub(crate) async fn admin_list_medicines(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<Vec<MedicineWithCategory>>> {
    Ok(Json(state.db.list_medicines().await?))
}

/// # Endpoint: POST /admin/medicines
pub(crate) async fn create_medicine(
    State(state): State<AppState>,
    admin: AdminAuth,
    Json(params): Json<MedicineParams>,
) -> Result<Json<Medicine>> {
    let params = validate_params(params).map_err(ApiError::Validation)?;
    let medicine = state.db.create_medicine(params).await?;
    audit(
        &format!("admin:{}", admin.admin_id),
        "created_medicine",
        &format!("medicine:{}", medicine.id),
        Some(&json!({ "name": medicine.name, "stock": medicine.stock })),
    );
    Ok(Json(medicine))
}

/// # Endpoint: PATCH /admin/medicines/:id
pub(crate) async fn update_medicine(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(medicine_id): Path<i32>,
    Json(patch): Json<MedicinePatch>,
) -> Result<Json<Medicine>> {
    let patch = validate_patch(patch).map_err(ApiError::Validation)?;
    let medicine = state.db.update_medicine(medicine_id, patch).await?;
    audit(
        &format!("admin:{}", admin.admin_id),
        "updated_medicine",
        &format!("medicine:{medicine_id}"),
        None,
    );
    Ok(Json(medicine))
}

/// # Endpoint: DELETE /admin/medicines/:id
///
/// Refused while orders still reference the medicine.
pub(crate) async fn delete_medicine(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(medicine_id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    state.db.delete_medicine(medicine_id).await?;
    audit(
        &format!("admin:{}", admin.admin_id),
        "deleted_medicine",
        &format!("medicine:{medicine_id}"),
        None,
    );
    Ok(Json(MessageResponse::success("Medicine deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_medicine_params_are_checked() {
        let params = MedicineParams {
            name: "  Paracetamol ".into(),
            description: " 500mg ".into(),
            price: 2.5,
            stock: 40,
            category_id: 1,
        };
        let valid = validate_params(params.clone()).unwrap();
        assert_eq!(valid.name, "Paracetamol");
        assert_eq!(valid.description, "500mg");

        assert!(validate_params(MedicineParams {
            price: -1.0,
            ..params.clone()
        })
        .is_err());
        assert!(validate_params(MedicineParams { stock: -3, ..params }).is_err());
    }

    #[test]
    fn test_patch_only_checks_present_fields() {
        assert!(validate_patch(MedicinePatch::default()).is_ok());
        assert!(validate_patch(MedicinePatch {
            name: Some("   ".into()),
            ..Default::default()
        })
        .is_err());
    }
}
