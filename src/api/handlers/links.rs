use axum::extract::State;
use tracing::{info, warn};

use crate::api::{extractors::{AdminAuth, Json, Query}, state::AppState};
use crate::db::models::{IssueLinkParams, IssuedLinkResponse, TokenQuery};
use crate::errors::ApiError;
use crate::logging::audit;
use crate::services::links::{self, LinkClaim};
use crate::services::whatsapp;
use crate::validation::{validate_phone, validate_required};
use crate::Result;

/// Handler for resolving an access link
///
/// # Endpoint: GET /validate-token?token=
///
/// # Returns
/// * `Json<LinkClaim>` - Customer name, phone and the order a modification link is bound to
/// * 401 when the token is unknown or has expired
pub(crate) async fn validate_token(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
) -> Result<Json<LinkClaim>> {
    state
        .db
        .get_link(&query.token)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::Unauthorized("Link is invalid or has expired".to_string()))
}

/// Handler for issuing a customer link from the admin screen
///
/// # Endpoint: POST /admin/links
///
/// With `orderId` the link lets the customer modify that order; without it
/// the link opens the order form prefilled with the customer's details.
pub(crate) async fn issue_link(
    State(state): State<AppState>,
    admin: AdminAuth,
    Json(params): Json<IssueLinkParams>,
) -> Result<Json<IssuedLinkResponse>> {
    let name = validate_required("Name", &params.name).map_err(ApiError::Validation)?;
    let phone = validate_phone(&params.phone).map_err(ApiError::Validation)?;

    if let Some(order_id) = params.order_id {
        // 404 for unknown orders
        state.db.get_order(order_id).await?;
    }

    let claim = LinkClaim {
        name,
        phone,
        order_id: params.order_id,
    };
    let ttl = state.config.link_ttl_seconds;
    let token = state.db.store_link(&claim, ttl).await?;
    let url = links::link_url(&state.config.public_base_url, &token, &claim);

    audit(
        &format!("admin:{}", admin.admin_id),
        "issued_link",
        &claim.phone,
        claim.order_id.map(|id| serde_json::json!({ "orderId": id })).as_ref(),
    );

    if params.notify {
        match state
            .whatsapp
            .send_text(&claim.phone, &whatsapp::access_link(&claim.name, &url))
            .await
        {
            Ok(sent) => info!("Access link for {} relayed (sent: {})", claim.phone, sent),
            Err(e) => warn!("Failed to relay access link to {}: {}", claim.phone, e),
        }
    }

    Ok(Json(IssuedLinkResponse {
        token,
        url,
        expires_in_seconds: ttl,
    }))
}
