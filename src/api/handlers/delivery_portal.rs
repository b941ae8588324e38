use axum::extract::State;
use serde_json::json;
use tracing::warn;

use crate::api::{extractors::{AgentAuth, Json, Path}, state::AppState};
use crate::db::models::{
    ChangePasswordParams, DeliveryLoginResponse, DeliveryOrderView, DeliveryProfile, DeliveryUser,
    LoginParams, MessageResponse, Order, PaymentUpdateParams, StatusUpdateParams,
};
use crate::errors::ApiError;
use crate::logging::{audit, AUDIT_TARGET};
use crate::services::auth::{hash_password, verify_password, Role};
use crate::validation::validate_password;
use crate::Result;

fn actor(agent: &AgentAuth) -> String {
    format!("delivery_agent:{}", agent.agent_id)
}

/// Handler for delivery agent sign-in
///
/// # Endpoint: POST /delivery/login
///
/// # Returns
/// * `Json<DeliveryLoginResponse>` - Bearer token and the agent's public details
pub(crate) async fn delivery_login(
    State(state): State<AppState>,
    Json(params): Json<LoginParams>,
) -> Result<Json<DeliveryLoginResponse>> {
    let username = params.username.trim();
    let agent = state
        .db
        .find_delivery_agent_by_username(username)
        .await?
        .filter(|agent| verify_password(&params.password, &agent.password_hash));

    let Some(agent) = agent else {
        warn!(target: AUDIT_TARGET, user = username, "Failed delivery login");
        return Err(ApiError::Unauthorized(
            "Invalid username or password".to_string(),
        ));
    };

    let token = state.tokens.issue(agent.id, Role::Delivery)?;
    audit(&format!("delivery_agent:{}", agent.id), "login", &agent.username, None);
    Ok(Json(DeliveryLoginResponse {
        token,
        user: DeliveryUser::from(&agent),
    }))
}

/// # Endpoint: GET /delivery/profile
pub(crate) async fn delivery_profile(
    State(state): State<AppState>,
    agent: AgentAuth,
) -> Result<Json<DeliveryProfile>> {
    Ok(Json(state.db.delivery_profile(agent.agent_id).await?))
}

/// # Endpoint: PUT /delivery/change-password
pub(crate) async fn change_password(
    State(state): State<AppState>,
    agent: AgentAuth,
    Json(params): Json<ChangePasswordParams>,
) -> Result<Json<MessageResponse>> {
    validate_password(&params.new_password).map_err(ApiError::Validation)?;

    let current = state.db.get_delivery_agent(agent.agent_id).await?;
    if !verify_password(&params.current_password, &current.password_hash) {
        return Err(ApiError::Validation(
            "Current password is incorrect".to_string(),
        ));
    }

    state
        .db
        .set_delivery_agent_password(agent.agent_id, &hash_password(&params.new_password))
        .await?;
    audit(&actor(&agent), "changed_password", &current.username, None);
    Ok(Json(MessageResponse::success("Password updated")))
}

/// The order the agent is carrying, `null` when free
///
/// # Endpoint: GET /delivery/current-order
pub(crate) async fn current_order(
    State(state): State<AppState>,
    agent: AgentAuth,
) -> Result<Json<Option<DeliveryOrderView>>> {
    Ok(Json(state.db.current_order_for_agent(agent.agent_id).await?))
}

/// # Endpoint: PUT /delivery/orders/:id/payment
pub(crate) async fn update_payment_status(
    State(state): State<AppState>,
    agent: AgentAuth,
    Path(order_id): Path<i32>,
    Json(params): Json<PaymentUpdateParams>,
) -> Result<Json<Order>> {
    let order = state
        .db
        .update_payment(order_id, agent.agent_id, params.payment_status)
        .await?;
    audit(
        &actor(&agent),
        "updated_payment",
        &format!("order:{order_id}"),
        Some(&json!({ "payment_status": order.payment_status })),
    );
    Ok(Json(order))
}

/// Dispatch or delivery of the agent's order
///
/// # Endpoint: PUT /delivery/orders/:id/status
pub(crate) async fn update_order_status(
    State(state): State<AppState>,
    agent: AgentAuth,
    Path(order_id): Path<i32>,
    Json(params): Json<StatusUpdateParams>,
) -> Result<Json<Order>> {
    let order = state
        .db
        .advance_delivery(order_id, agent.agent_id, params.status)
        .await?;
    audit(
        &actor(&agent),
        "updated_status",
        &format!("order:{order_id}"),
        Some(&json!({ "status": order.status })),
    );
    Ok(Json(order))
}
