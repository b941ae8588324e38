use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use tracing::info;

use super::DbClient;
use crate::db::models::{Feedback, FeedbackParams, FeedbackView, NewFeedback, Order, OrderStatus};
use crate::errors::ApiError;
use crate::Result;

/// Customers rate the agent who delivered their order, once per order
pub fn check_feedback_allowed(order: &Order, agent_id: i32) -> Result<()> {
    if order.status != OrderStatus::Delivered {
        return Err(ApiError::Conflict(
            "Feedback can only be left for delivered orders".to_string(),
        ));
    }
    if order.delivery_agent_id != Some(agent_id) {
        return Err(ApiError::Validation(
            "This delivery agent did not deliver the order".to_string(),
        ));
    }
    Ok(())
}

impl DbClient {
    pub async fn create_feedback(&self, params: FeedbackParams) -> Result<Feedback> {
        use crate::schema::feedbacks;

        let order = self.get_order(params.order_id).await?;
        check_feedback_allowed(&order, params.delivery_agent_id)?;

        let conn = &mut self.get_db_conn().await?;
        let new_feedback = NewFeedback {
            order_id: order.id,
            delivery_agent_id: params.delivery_agent_id,
            rating: params.rating,
            comment: params.comment.unwrap_or_default().trim().to_string(),
        };

        // feedbacks.order_id is unique; a second submission loses the race here
        let created = diesel::insert_into(feedbacks::table)
            .values(&new_feedback)
            .on_conflict(feedbacks::order_id)
            .do_nothing()
            .get_result::<Feedback>(conn)
            .await
            .optional()?
            .ok_or_else(|| {
                ApiError::Conflict("Feedback was already submitted for this order".to_string())
            })?;

        info!(
            "Feedback {} recorded for order {} ({} stars)",
            created.id, created.order_id, created.rating
        );
        Ok(created)
    }

    pub async fn list_feedbacks(&self) -> Result<Vec<FeedbackView>> {
        use crate::schema::{delivery_agents, feedbacks};

        let conn = &mut self.get_db_conn().await?;
        let rows = feedbacks::table
            .inner_join(delivery_agents::table)
            .order_by(feedbacks::created_at.desc())
            .select((
                feedbacks::id,
                feedbacks::order_id,
                feedbacks::delivery_agent_id,
                delivery_agents::name,
                feedbacks::rating,
                feedbacks::comment,
                feedbacks::created_at,
            ))
            .load::<(i32, i32, i32, String, i32, String, chrono::NaiveDateTime)>(conn)
            .await?;

        Ok(rows
            .into_iter()
            .map(
                |(id, order_id, agent_id, agent_name, rating, comment, created_at)| FeedbackView {
                    id,
                    order_id,
                    delivery_boy_id: agent_id,
                    delivery_boy_name: agent_name,
                    rating,
                    comment,
                    created_at,
                },
            )
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{PaymentStatus, VerificationStatus};
    use chrono::Utc;

    fn order(status: OrderStatus, agent: Option<i32>) -> Order {
        let now = Utc::now().naive_utc();
        Order {
            id: 1,
            user_id: 1,
            user_name: "Kiran".into(),
            user_address: "12 Lake Road".into(),
            phone_number: "9000000000".into(),
            medicine_id: 1,
            quantity: 1,
            total_price: 40.0,
            status,
            payment_status: PaymentStatus::Paid,
            verification_status: VerificationStatus::Verified,
            prescription_photo: None,
            delivery_agent_id: agent,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_feedback_requires_delivered_order_by_that_agent() {
        assert!(check_feedback_allowed(&order(OrderStatus::Delivered, Some(3)), 3).is_ok());
        assert!(matches!(
            check_feedback_allowed(&order(OrderStatus::Dispatched, Some(3)), 3),
            Err(ApiError::Conflict(_))
        ));
        assert!(matches!(
            check_feedback_allowed(&order(OrderStatus::Delivered, Some(3)), 4),
            Err(ApiError::Validation(_))
        ));
    }
}
