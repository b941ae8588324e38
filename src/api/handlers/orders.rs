use axum::extract::{Multipart, State};
use std::path::{Path as FsPath, PathBuf};
use tracing::{error, info, warn};

use crate::api::{
    extractors::{Json, Path, Query},
    state::AppState,
};
use crate::db::models::{
    ModifyOrderParams, ModifyOrderResponse, OrderDetails, PlaceOrder, PlaceOrderForm,
    PlaceOrderResponse, TokenQuery, UploadedFile,
};
use crate::errors::ApiError;
use crate::logging::audit;
use crate::services::links::{self, LinkClaim};
use crate::services::whatsapp;
use crate::validation::{validate_phone, validate_quantity, validate_required};
use crate::Result;

/// Public path prefix the upload directory is served under
pub const UPLOADS_ROUTE: &str = "/uploads";

const MAX_EXTENSION_LEN: usize = 5;

fn parse_int(field: &str, value: &str) -> Result<i32> {
    value
        .trim()
        .parse()
        .map_err(|_| ApiError::Validation(format!("{field} must be a whole number")))
}

/// Reads the multipart order form. Unknown fields are ignored.
async fn read_order_form(mut multipart: Multipart) -> Result<PlaceOrderForm> {
    let mut form = PlaceOrderForm::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };
        match name.as_str() {
            "prescription" | "prescription_photo" => {
                let file_name = field.file_name().map(str::to_owned);
                let bytes = field.bytes().await?;
                if !bytes.is_empty() {
                    form.prescription = Some(UploadedFile {
                        file_name,
                        bytes: bytes.to_vec(),
                    });
                }
            }
            "user_name" => form.user_name = field.text().await?,
            "user_address" => form.user_address = field.text().await?,
            "phone_number" => form.phone_number = field.text().await?,
            "medicine_id" => form.medicine_id = Some(parse_int("medicine_id", &field.text().await?)?),
            "quantity" => form.quantity = Some(parse_int("quantity", &field.text().await?)?),
            _ => {}
        }
    }

    Ok(form)
}

/// Keeps a short alphanumeric extension from the client's file name
fn stored_file_name(original: Option<&str>) -> String {
    let extension = original
        .and_then(|name| FsPath::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(str::to_ascii_lowercase);

    let stem = uuid::Uuid::new_v4();
    match extension {
        Some(ext) => format!("{stem}.{ext}"),
        None => stem.to_string(),
    }
}

/// Writes the prescription into the upload directory and returns the file
/// path together with the public URL stored on the order
async fn save_prescription(upload_dir: &str, file: &UploadedFile) -> Result<(PathBuf, String)> {
    tokio::fs::create_dir_all(upload_dir).await?;
    let name = stored_file_name(file.file_name.as_deref());
    let path = FsPath::new(upload_dir).join(&name);
    tokio::fs::write(&path, &file.bytes).await?;
    Ok((path, format!("{UPLOADS_ROUTE}/{name}")))
}

fn validate_form(form: PlaceOrderForm) -> Result<(PlaceOrder, Option<UploadedFile>)> {
    let user_name = validate_required("Name", &form.user_name).map_err(ApiError::Validation)?;
    let user_address =
        validate_required("Address", &form.user_address).map_err(ApiError::Validation)?;
    let phone_number = validate_phone(&form.phone_number).map_err(ApiError::Validation)?;
    let medicine_id = form
        .medicine_id
        .ok_or_else(|| ApiError::Validation("medicine_id is required".to_string()))?;
    let quantity = validate_quantity(
        form.quantity
            .ok_or_else(|| ApiError::Validation("quantity is required".to_string()))?,
    )
    .map_err(ApiError::Validation)?;

    let order = PlaceOrder {
        user_name,
        user_address,
        phone_number,
        medicine_id,
        quantity,
        prescription_photo: None,
    };
    Ok((order, form.prescription))
}

/// Handler for placing a medicine order
///
/// # Endpoint: POST /order (multipart/form-data)
///
/// # Arguments
/// * `user_name`, `user_address`, `phone_number` - Customer details
/// * `medicine_id`, `quantity` - The ordered medicine
/// * `prescription` - Optional file, required for prescription-only categories
///
/// # Returns
/// * `Json<PlaceOrderResponse>` - The new order id and a link for modifying it
pub(crate) async fn place_order(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<PlaceOrderResponse>> {
    let form = read_order_form(multipart).await?;
    let (mut request, prescription) = validate_form(form)?;

    let saved = match &prescription {
        Some(file) => {
            let (path, url) = save_prescription(&state.config.upload_dir, file).await?;
            request.prescription_photo = Some(url);
            Some(path)
        }
        None => None,
    };

    let order = match state.db.place_order(request).await {
        Ok(order) => order,
        Err(e) => {
            if let Some(path) = saved {
                if let Err(remove_err) = tokio::fs::remove_file(&path).await {
                    warn!("Failed to remove unused upload {:?}: {}", path, remove_err);
                }
            }
            return Err(e);
        }
    };

    audit(
        &format!("customer:{}", order.phone_number),
        "placed_order",
        &format!("order:{}", order.id),
        None,
    );

    // The order is committed at this point; link and message are best effort
    let claim = LinkClaim {
        name: order.user_name.clone(),
        phone: order.phone_number.clone(),
        order_id: Some(order.id),
    };
    let modify_link = match state.db.store_link(&claim, state.config.link_ttl_seconds).await {
        Ok(token) => Some(links::link_url(&state.config.public_base_url, &token, &claim)),
        Err(e) => {
            error!("Failed to issue modification link for order {}: {}", order.id, e);
            None
        }
    };

    let confirmation = whatsapp::order_confirmation(&order, modify_link.as_deref());
    if let Err(e) = state.whatsapp.send_text(&order.phone_number, &confirmation).await {
        warn!("Failed to send confirmation for order {}: {}", order.id, e);
    }

    info!("Order {} accepted", order.id);
    Ok(Json(PlaceOrderResponse {
        order_id: order.id,
        modify_link,
    }))
}

/// # Endpoint: GET /order/:id
pub(crate) async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
) -> Result<Json<OrderDetails>> {
    Ok(Json(state.db.get_order_details(order_id).await?))
}

fn validate_modification(params: ModifyOrderParams) -> Result<ModifyOrderParams> {
    let user_name = params
        .user_name
        .map(|v| validate_required("Name", &v))
        .transpose()
        .map_err(ApiError::Validation)?;
    let user_address = params
        .user_address
        .map(|v| validate_required("Address", &v))
        .transpose()
        .map_err(ApiError::Validation)?;
    let phone_number = params
        .phone_number
        .map(|v| validate_phone(&v))
        .transpose()
        .map_err(ApiError::Validation)?;
    let quantity = params
        .quantity
        .map(validate_quantity)
        .transpose()
        .map_err(ApiError::Validation)?;

    Ok(ModifyOrderParams {
        user_name,
        user_address,
        phone_number,
        medicine_id: params.medicine_id,
        quantity,
    })
}

/// Handler for a customer changing a pending order
///
/// # Endpoint: PATCH /order/:id?token=
///
/// # Security
/// The token must be a live modification link issued for this order.
pub(crate) async fn modify_order(
    State(state): State<AppState>,
    Path(order_id): Path<i32>,
    Query(query): Query<TokenQuery>,
    Json(params): Json<ModifyOrderParams>,
) -> Result<Json<ModifyOrderResponse>> {
    let claim = state
        .db
        .get_link(&query.token)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Link is invalid or has expired".to_string()))?;
    if !claim.authorizes_order(order_id) {
        return Err(ApiError::Forbidden(
            "This link does not allow changes to this order".to_string(),
        ));
    }

    let params = validate_modification(params)?;
    let order = state.db.modify_order(order_id, params).await?;

    audit(
        &format!("customer:{}", claim.phone),
        "modified_order",
        &format!("order:{}", order.id),
        None,
    );
    Ok(Json(ModifyOrderResponse::new(order)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_file_name_keeps_safe_extension() {
        assert!(stored_file_name(Some("scan.PDF")).ends_with(".pdf"));
        assert!(!stored_file_name(Some("../../etc/passwd")).contains('/'));
        assert!(!stored_file_name(Some("x.p$p")).contains('.'));
        assert!(!stored_file_name(None).contains('.'));
    }

    #[test]
    fn test_form_validation() {
        let form = PlaceOrderForm {
            user_name: " Asha ".into(),
            user_address: "12 Lake Road".into(),
            phone_number: "9876543210".into(),
            medicine_id: Some(3),
            quantity: Some(2),
            prescription: None,
        };
        let (order, file) = validate_form(form.clone()).unwrap();
        assert_eq!(order.user_name, "Asha");
        assert!(file.is_none());

        let missing = PlaceOrderForm {
            medicine_id: None,
            ..form.clone()
        };
        assert!(matches!(validate_form(missing), Err(ApiError::Validation(_))));

        let too_many = PlaceOrderForm {
            quantity: Some(0),
            ..form
        };
        assert!(validate_form(too_many).is_err());
    }

    #[test]
    fn test_modification_validation() {
        let ok = validate_modification(ModifyOrderParams {
            user_name: Some("  Ravi ".into()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(ok.user_name.as_deref(), Some("Ravi"));

        let bad_phone = validate_modification(ModifyOrderParams {
            phone_number: Some("12".into()),
            ..Default::default()
        });
        assert!(matches!(bad_phone, Err(ApiError::Validation(_))));
    }

    #[tokio::test]
    async fn test_prescription_written_to_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let upload_dir = dir.path().join("uploads");
        let file = UploadedFile {
            file_name: Some("rx.jpg".into()),
            bytes: vec![1, 2, 3],
        };
        let (path, url) = save_prescription(upload_dir.to_str().unwrap(), &file)
            .await
            .unwrap();
        assert!(url.starts_with("/uploads/"));
        assert!(url.ends_with(".jpg"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), vec![1, 2, 3]);
    }
}
