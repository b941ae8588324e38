use axum::extract::State;

use crate::api::{extractors::{AdminAuth, Json, Path}, state::AppState};
use crate::db::models::{
    DeliveryAgent, DeliveryAgentChanges, DeliveryAgentParams, DeliveryAgentView,
    MessageResponse, NewDeliveryAgent,
};
use crate::errors::ApiError;
use crate::logging::audit;
use crate::services::auth::hash_password;
use crate::validation::{validate_password, validate_phone, validate_required};
use crate::Result;

/// Checked agent fields; the password is `None` when it should stay as is
struct AgentFields {
    username: String,
    name: String,
    phone: String,
    password: Option<String>,
}

fn validate_agent(params: DeliveryAgentParams) -> std::result::Result<AgentFields, String> {
    let password = params.password.filter(|p| !p.is_empty());
    if let Some(password) = &password {
        validate_password(password)?;
    }
    Ok(AgentFields {
        username: validate_required("Username", &params.username)?,
        name: validate_required("Name", &params.name)?,
        phone: validate_phone(&params.phone)?,
        password,
    })
}

/// # Endpoint: GET /admin/delivery-boys
pub(crate) async fn list_delivery_agents(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<Vec<DeliveryAgentView>>> {
    Ok(Json(state.db.list_delivery_agents().await?))
}

/// Agents without a current order
///
/// # Endpoint: GET /admin/delivery-boys/available
pub(crate) async fn available_delivery_agents(
    State(state): State<AppState>,
    _admin: AdminAuth,
) -> Result<Json<Vec<DeliveryAgent>>> {
    Ok(Json(state.db.available_delivery_agents().await?))
}

/// # Endpoint: POST /admin/delivery-boys
pub(crate) async fn create_delivery_agent(
    State(state): State<AppState>,
    admin: AdminAuth,
    Json(params): Json<DeliveryAgentParams>,
) -> Result<Json<DeliveryAgent>> {
    let fields = validate_agent(params).map_err(ApiError::Validation)?;
    let password = fields
        .password
        .ok_or_else(|| ApiError::Validation("Password is required".to_string()))?;

    let agent = state
        .db
        .create_delivery_agent(NewDeliveryAgent {
            username: fields.username,
            password_hash: hash_password(&password),
            name: fields.name,
            phone: fields.phone,
        })
        .await?;
    audit(
        &format!("admin:{}", admin.admin_id),
        "created_delivery_agent",
        &format!("delivery_agent:{}", agent.id),
        None,
    );
    Ok(Json(agent))
}

/// # Endpoint: PUT /admin/delivery-boys/:id
pub(crate) async fn update_delivery_agent(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(agent_id): Path<i32>,
    Json(params): Json<DeliveryAgentParams>,
) -> Result<Json<DeliveryAgent>> {
    let fields = validate_agent(params).map_err(ApiError::Validation)?;
    let agent = state
        .db
        .update_delivery_agent(
            agent_id,
            DeliveryAgentChanges {
                username: Some(fields.username),
                password_hash: fields.password.as_deref().map(hash_password),
                name: Some(fields.name),
                phone: Some(fields.phone),
            },
        )
        .await?;
    audit(
        &format!("admin:{}", admin.admin_id),
        "updated_delivery_agent",
        &format!("delivery_agent:{agent_id}"),
        None,
    );
    Ok(Json(agent))
}

/// # Endpoint: DELETE /admin/delivery-boys/:id
///
/// Refused while the agent is carrying an order.
pub(crate) async fn delete_delivery_agent(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(agent_id): Path<i32>,
) -> Result<Json<MessageResponse>> {
    state.db.delete_delivery_agent(agent_id).await?;
    audit(
        &format!("admin:{}", admin.admin_id),
        "deleted_delivery_agent",
        &format!("delivery_agent:{agent_id}"),
        None,
    );
    Ok(Json(MessageResponse::success("Delivery agent deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(password: Option<&str>) -> DeliveryAgentParams {
        DeliveryAgentParams {
            username: "ravi".into(),
            password: password.map(Into::into),
            name: "Ravi K".into(),
            phone: "+91 98765 43210".into(),
        }
    }

    #[test]
    fn test_empty_password_keeps_current_one() {
        let fields = validate_agent(params(Some(""))).unwrap();
        assert!(fields.password.is_none());
        assert!(validate_agent(params(None)).unwrap().password.is_none());
    }

    #[test]
    fn test_short_password_is_rejected() {
        assert!(validate_agent(params(Some("abc"))).is_err());
        assert_eq!(
            validate_agent(params(Some("longenough")))
                .unwrap()
                .password
                .as_deref(),
            Some("longenough")
        );
    }
}
