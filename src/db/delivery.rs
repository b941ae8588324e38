use diesel::{
    ExpressionMethods, JoinOnDsl, NullableExpressionMethods, OptionalExtension, QueryDsl,
};
use diesel_async::RunQueryDsl;
use tracing::info;

use super::DbClient;
use crate::db::models::{
    DeliveryAgent, DeliveryAgentChanges, DeliveryAgentView, DeliveryProfile, NewDeliveryAgent,
    OrderStatus,
};
use crate::errors::ApiError;
use crate::Result;

type AgentRow = (
    i32,
    String,
    String,
    String,
    Option<i32>,
    Option<OrderStatus>,
    Option<String>,
    Option<String>,
);

fn into_view(row: AgentRow) -> DeliveryAgentView {
    let (id, username, name, phone, current_order_id, order_status, customer_name, address) = row;
    DeliveryAgentView {
        id,
        username,
        name,
        phone,
        current_order_id,
        order_status,
        customer_name,
        delivery_address: address,
    }
}

/// DbClient helper functions for delivery staff
impl DbClient {
    /// All agents, each with a summary of the order they are carrying
    pub async fn list_delivery_agents(&self) -> Result<Vec<DeliveryAgentView>> {
        use crate::schema::{delivery_agents, orders};

        let conn = &mut self.get_db_conn().await?;
        let rows = delivery_agents::table
            .left_join(orders::table.on(orders::id.nullable().eq(delivery_agents::current_order_id)))
            .order_by(delivery_agents::name)
            .select((
                delivery_agents::id,
                delivery_agents::username,
                delivery_agents::name,
                delivery_agents::phone,
                delivery_agents::current_order_id,
                orders::status.nullable(),
                orders::user_name.nullable(),
                orders::user_address.nullable(),
            ))
            .load::<AgentRow>(conn)
            .await?;

        Ok(rows.into_iter().map(into_view).collect())
    }

    /// Agents with no current order, the only ones an order can go to
    pub async fn available_delivery_agents(&self) -> Result<Vec<DeliveryAgent>> {
        use crate::schema::delivery_agents::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        delivery_agents
            .filter(current_order_id.is_null())
            .order_by(name)
            .load::<DeliveryAgent>(conn)
            .await
            .map_err(Into::into)
    }

    pub async fn get_delivery_agent(&self, agent_id: i32) -> Result<DeliveryAgent> {
        use crate::schema::delivery_agents::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        delivery_agents
            .find(agent_id)
            .first::<DeliveryAgent>(conn)
            .await
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Delivery agent".to_string()))
    }

    pub async fn find_delivery_agent_by_username(
        &self,
        login: &str,
    ) -> Result<Option<DeliveryAgent>> {
        use crate::schema::delivery_agents::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        delivery_agents
            .filter(username.eq(login))
            .first::<DeliveryAgent>(conn)
            .await
            .optional()
            .map_err(Into::into)
    }

    pub async fn create_delivery_agent(&self, agent: NewDeliveryAgent) -> Result<DeliveryAgent> {
        use crate::schema::delivery_agents::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        let created = diesel::insert_into(delivery_agents)
            .values(&agent)
            .get_result::<DeliveryAgent>(conn)
            .await?;
        info!("Created delivery agent {} ({})", created.id, created.username);
        Ok(created)
    }

    pub async fn update_delivery_agent(
        &self,
        agent_id: i32,
        changes: DeliveryAgentChanges,
    ) -> Result<DeliveryAgent> {
        use crate::schema::delivery_agents::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        diesel::update(delivery_agents.find(agent_id))
            .set(&changes)
            .get_result::<DeliveryAgent>(conn)
            .await
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Delivery agent".to_string()))
    }

    pub async fn set_delivery_agent_password(&self, agent_id: i32, hash: &str) -> Result<()> {
        use crate::schema::delivery_agents::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        let updated = diesel::update(delivery_agents.find(agent_id))
            .set(password_hash.eq(hash))
            .execute(conn)
            .await?;
        if updated == 0 {
            return Err(ApiError::NotFound("Delivery agent".to_string()));
        }
        Ok(())
    }

    /// Refused while the agent carries an order so the assignment link is
    /// never left dangling
    pub async fn delete_delivery_agent(&self, agent_id: i32) -> Result<()> {
        use crate::schema::delivery_agents::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        let deleted = diesel::delete(
            delivery_agents
                .filter(id.eq(agent_id))
                .filter(current_order_id.is_null()),
        )
        .execute(conn)
        .await?;

        if deleted == 0 {
            // Either the agent does not exist or it is busy
            let agent = self.get_delivery_agent(agent_id).await?;
            return Err(ApiError::Conflict(format!(
                "Delivery agent {} still has order {} assigned",
                agent.id,
                agent.current_order_id.unwrap_or_default()
            )));
        }
        info!("Deleted delivery agent {}", agent_id);
        Ok(())
    }

    pub async fn delivery_profile(&self, agent_id: i32) -> Result<DeliveryProfile> {
        use crate::schema::{feedbacks, orders};

        let agent = self.get_delivery_agent(agent_id).await?;
        let conn = &mut self.get_db_conn().await?;

        let total_deliveries = orders::table
            .filter(orders::delivery_agent_id.eq(agent_id))
            .filter(orders::status.eq(OrderStatus::Delivered))
            .count()
            .get_result::<i64>(conn)
            .await?;

        let (rating_sum, rating_count) = feedbacks::table
            .filter(feedbacks::delivery_agent_id.eq(agent_id))
            .select((
                diesel::dsl::sum(feedbacks::rating),
                diesel::dsl::count(feedbacks::id),
            ))
            .first::<(Option<i64>, i64)>(conn)
            .await?;

        Ok(DeliveryProfile {
            id: agent.id,
            username: agent.username,
            name: agent.name,
            phone: agent.phone,
            total_deliveries,
            avg_rating: average_rating(rating_sum.unwrap_or(0), rating_count),
        })
    }
}

/// Mean rating rounded to one decimal, zero when there is no feedback
pub fn average_rating(sum: i64, count: i64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let mean = sum as f64 / count as f64;
    (mean * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(0, 0), 0.0);
        assert_eq!(average_rating(14, 3), 4.7);
        assert_eq!(average_rating(10, 2), 5.0);
    }
}
