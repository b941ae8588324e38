use axum::extract::State;
use serde_json::json;
use tracing::{info, warn};

use crate::api::{extractors::{AdminAuth, Json, Path, Query}, state::AppState};
use crate::db::models::{
    AssignParams, MessageParams, Order, OrderDetails, OrderListQuery, RelayResponse,
    VerificationParams,
};
use crate::errors::ApiError;
use crate::logging::audit;
use crate::validation::validate_required;
use crate::Result;

fn actor(admin: &AdminAuth) -> String {
    format!("admin:{}", admin.admin_id)
}

/// # Endpoint: GET /admin/orders?userId=&status=&search=
pub(crate) async fn list_orders(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Query(filter): Query<OrderListQuery>,
) -> Result<Json<Vec<OrderDetails>>> {
    Ok(Json(state.db.list_orders(&filter).await?))
}

/// Handler for cancelling an order
///
/// # Endpoint: DELETE /admin/orders/:id
///
/// Stock goes back to the medicine and an assigned agent is released.
pub(crate) async fn cancel_order(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(order_id): Path<i32>,
) -> Result<Json<Order>> {
    let order = state.db.cancel_order(order_id).await?;
    audit(&actor(&admin), "cancelled_order", &format!("order:{order_id}"), None);
    Ok(Json(order))
}

/// # Endpoint: PUT /admin/orders/:id/verification
pub(crate) async fn set_order_verification(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(order_id): Path<i32>,
    Json(params): Json<VerificationParams>,
) -> Result<Json<Order>> {
    let order = state
        .db
        .set_order_verification(order_id, params.verification_status)
        .await?;
    audit(
        &actor(&admin),
        "set_verification",
        &format!("order:{order_id}"),
        Some(&json!({
            "verification_status": order.verification_status,
            "status": order.status,
        })),
    );
    Ok(Json(order))
}

/// Handler for assigning a verified order to a free delivery agent
///
/// # Endpoint: POST /admin/orders/:id/assign
pub(crate) async fn assign_order(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(order_id): Path<i32>,
    Json(params): Json<AssignParams>,
) -> Result<Json<Order>> {
    let order = state
        .db
        .assign_order(order_id, params.delivery_agent_id)
        .await?;
    audit(
        &actor(&admin),
        "assigned_order",
        &format!("order:{order_id}"),
        Some(&json!({ "delivery_agent_id": params.delivery_agent_id })),
    );
    Ok(Json(order))
}

/// Handler for messaging the customer of an order over WhatsApp
///
/// # Endpoint: POST /admin/orders/:id/message
pub(crate) async fn message_customer(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(order_id): Path<i32>,
    Json(params): Json<MessageParams>,
) -> Result<Json<RelayResponse>> {
    let body = validate_required("Message", &params.message).map_err(ApiError::Validation)?;
    let order = state.db.get_order(order_id).await?;

    let sent = state.whatsapp.send_text(&order.phone_number, &body).await?;
    if sent {
        info!("Message relayed for order {}", order.id);
    } else {
        warn!("Message for order {} was only logged", order.id);
    }
    audit(&actor(&admin), "messaged_customer", &format!("order:{order_id}"), None);

    Ok(Json(RelayResponse {
        sent,
        message: if sent {
            "Message sent".to_string()
        } else {
            "WhatsApp is not configured, the message was logged".to_string()
        },
    }))
}
