use chrono::Utc;
use diesel::{
    BoolExpressionMethods, ExpressionMethods, JoinOnDsl, NullableExpressionMethods,
    OptionalExtension, PgTextExpressionMethods, QueryDsl, SelectableHelper,
};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::{error, info};

use super::users::{like_pattern, upsert_user};
use super::DbClient;
use crate::db::models::{
    Category, DashboardStats, DeliveryAgent, DeliveryOrderView, Medicine, ModifyOrderParams,
    NewOrder, Order, OrderChanges, OrderDetails, OrderListQuery, OrderStatus, PaymentStatus,
    PlaceOrder, RecentOrder, VerificationStatus,
};
use crate::errors::ApiError;
use crate::services::order_flow::OrderState;
use crate::Result;

pub const RECENT_ORDERS: i64 = 5;

/// An order with its medicine name and price and the assigned agent's name
type DetailRow = (Order, String, f64, Option<String>);

fn into_details((order, medicine_name, medicine_price, agent_name): DetailRow) -> OrderDetails {
    let state = OrderState::from(&order);
    OrderDetails {
        prescription_verified: order.verification_status == VerificationStatus::Verified,
        allowed_transitions: state.allowed_next(),
        order,
        medicine_name,
        medicine_price,
        delivery_agent_name: agent_name,
    }
}

async fn lock_order(conn: &mut AsyncPgConnection, order_id: i32) -> Result<Order> {
    use crate::schema::orders;

    orders::table
        .find(order_id)
        .for_update()
        .first::<Order>(conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Order".to_string()))
}

async fn lock_medicine(conn: &mut AsyncPgConnection, medicine_id: i32) -> Result<Medicine> {
    use crate::schema::medicines;

    medicines::table
        .find(medicine_id)
        .for_update()
        .first::<Medicine>(conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Medicine".to_string()))
}

/// Locks the order's current medicine and the one it moves to, lowest id
/// first, and returns them as `(current, next)`
async fn lock_medicine_pair(
    conn: &mut AsyncPgConnection,
    current_id: i32,
    next_id: i32,
) -> Result<(Medicine, Medicine)> {
    let first = lock_medicine(conn, current_id.min(next_id)).await?;
    let second = lock_medicine(conn, current_id.max(next_id)).await?;
    if first.id == current_id {
        Ok((first, second))
    } else {
        Ok((second, first))
    }
}

/// Adds `delta` units to a medicine's stock (negative to reserve)
async fn adjust_stock(conn: &mut AsyncPgConnection, medicine_id: i32, delta: i32) -> Result<()> {
    use crate::schema::medicines;

    diesel::update(medicines::table.find(medicine_id))
        .set(medicines::stock.eq(medicines::stock + delta))
        .execute(conn)
        .await?;
    Ok(())
}

async fn ensure_prescription(
    conn: &mut AsyncPgConnection,
    medicine: &Medicine,
    prescription: Option<&str>,
) -> Result<()> {
    use crate::schema::categories;

    let category = categories::table
        .find(medicine.category_id)
        .first::<Category>(conn)
        .await?;
    if category.requires_prescription && prescription.is_none() {
        return Err(ApiError::Validation(format!(
            "{} requires a prescription",
            medicine.name
        )));
    }
    Ok(())
}

fn ensure_in_stock(medicine: &Medicine, available: i32, quantity: i32) -> Result<()> {
    if available < quantity {
        return Err(ApiError::Conflict(format!(
            "Only {} unit(s) of {} left in stock",
            available.max(0),
            medicine.name
        )));
    }
    Ok(())
}

/// Releases the agent from this order if it is the one they carry
async fn release_agent(conn: &mut AsyncPgConnection, agent_id: i32, order_id: i32) -> Result<()> {
    use crate::schema::delivery_agents;

    diesel::update(
        delivery_agents::table
            .filter(delivery_agents::id.eq(agent_id))
            .filter(delivery_agents::current_order_id.eq(order_id)),
    )
    .set(delivery_agents::current_order_id.eq(None::<i32>))
    .execute(conn)
    .await?;
    Ok(())
}

fn ensure_assigned_to(order: &Order, agent_id: i32) -> Result<()> {
    if order.delivery_agent_id != Some(agent_id) {
        return Err(ApiError::Forbidden(
            "This order is not assigned to you".to_string(),
        ));
    }
    Ok(())
}

/// DbClient helper functions for medicine orders. Every write that touches
/// the status triad, stock or an agent assignment runs in one transaction
/// with the order row locked.
impl DbClient {
    pub async fn place_order(&self, params: PlaceOrder) -> Result<Order> {
        use crate::schema::orders;

        let mut pooled = self.get_db_conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let order = conn
            .transaction::<_, ApiError, _>(|conn| {
                async move {
                    let medicine = lock_medicine(conn, params.medicine_id).await?;
                    ensure_prescription(conn, &medicine, params.prescription_photo.as_deref())
                        .await?;
                    ensure_in_stock(&medicine, medicine.stock, params.quantity)?;
                    adjust_stock(conn, medicine.id, -params.quantity).await?;

                    let user = upsert_user(conn, &params.user_name, &params.phone_number).await?;

                    let new_order = NewOrder {
                        user_id: user.id,
                        user_name: params.user_name,
                        user_address: params.user_address,
                        phone_number: params.phone_number,
                        medicine_id: medicine.id,
                        quantity: params.quantity,
                        total_price: medicine.price * f64::from(params.quantity),
                        status: OrderStatus::Pending,
                        payment_status: PaymentStatus::Pending,
                        verification_status: VerificationStatus::Pending,
                        prescription_photo: params.prescription_photo,
                    };
                    diesel::insert_into(orders::table)
                        .values(&new_order)
                        .get_result::<Order>(conn)
                        .await
                        .map_err(ApiError::from)
                }
                .scope_boxed()
            })
            .await?;

        info!("Order {} placed for medicine {}", order.id, order.medicine_id);
        Ok(order)
    }

    pub async fn get_order(&self, order_id: i32) -> Result<Order> {
        use crate::schema::orders::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        orders
            .find(order_id)
            .first::<Order>(conn)
            .await
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Order".to_string()))
    }

    pub async fn get_order_details(&self, order_id: i32) -> Result<OrderDetails> {
        use crate::schema::{delivery_agents, medicines, orders};

        let conn = &mut self.get_db_conn().await?;
        let row = orders::table
            .inner_join(medicines::table)
            .left_join(
                delivery_agents::table
                    .on(delivery_agents::id.nullable().eq(orders::delivery_agent_id)),
            )
            .filter(orders::id.eq(order_id))
            .select((
                Order::as_select(),
                medicines::name,
                medicines::price,
                delivery_agents::name.nullable(),
            ))
            .first::<DetailRow>(conn)
            .await
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Order".to_string()))?;

        Ok(into_details(row))
    }

    /// Orders newest first, optionally filtered by customer, status and a
    /// search term matched against customer name, phone and medicine name
    pub async fn list_orders(&self, filter: &OrderListQuery) -> Result<Vec<OrderDetails>> {
        use crate::schema::{delivery_agents, medicines, orders};

        let conn = &mut self.get_db_conn().await?;
        let mut query = orders::table
            .inner_join(medicines::table)
            .left_join(
                delivery_agents::table
                    .on(delivery_agents::id.nullable().eq(orders::delivery_agent_id)),
            )
            .select((
                Order::as_select(),
                medicines::name,
                medicines::price,
                delivery_agents::name.nullable(),
            ))
            .order_by(orders::created_at.desc())
            .into_boxed();

        if let Some(user) = filter.user_id {
            query = query.filter(orders::user_id.eq(user));
        }
        if let Some(status) = filter.status {
            query = query.filter(orders::status.eq(status));
        }
        if let Some(term) = filter.search.as_deref().filter(|t| !t.trim().is_empty()) {
            let pattern = like_pattern(term);
            query = query.filter(
                orders::user_name
                    .ilike(pattern.clone())
                    .or(orders::phone_number.ilike(pattern.clone()))
                    .or(medicines::name.ilike(pattern)),
            );
        }

        let rows = query.load::<DetailRow>(conn).await.map_err(|e| {
            error!("Failed to fetch orders: {}", e);
            ApiError::from(e)
        })?;
        Ok(rows.into_iter().map(into_details).collect())
    }

    /// Customer change to a pending order. Stock is returned for the old
    /// line and reserved for the new one. A new name or phone re-links the
    /// order to the matching customer.
    pub async fn modify_order(&self, order_id: i32, params: ModifyOrderParams) -> Result<Order> {
        use crate::schema::orders;

        let mut pooled = self.get_db_conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        conn.transaction::<_, ApiError, _>(|conn| {
            async move {
                let order = lock_order(conn, order_id).await?;
                OrderState::from(&order).check_modifiable()?;

                let medicine_id = params.medicine_id.unwrap_or(order.medicine_id);
                let quantity = params.quantity.unwrap_or(order.quantity);
                let mut changes = OrderChanges {
                    user_name: params.user_name,
                    user_address: params.user_address,
                    phone_number: params.phone_number,
                    updated_at: Some(Utc::now().naive_utc()),
                    ..Default::default()
                };

                let name = changes.user_name.as_deref().unwrap_or(&order.user_name);
                let phone = changes.phone_number.as_deref().unwrap_or(&order.phone_number);
                if name != order.user_name || phone != order.phone_number {
                    let user = upsert_user(conn, name, phone).await?;
                    changes.user_id = Some(user.id);
                }

                if medicine_id == order.medicine_id && quantity != order.quantity {
                    let medicine = lock_medicine(conn, medicine_id).await?;
                    ensure_in_stock(&medicine, medicine.stock + order.quantity, quantity)?;
                    adjust_stock(conn, medicine_id, order.quantity - quantity).await?;

                    changes.quantity = Some(quantity);
                    changes.total_price = Some(medicine.price * f64::from(quantity));
                } else if medicine_id != order.medicine_id {
                    let (_, medicine) =
                        lock_medicine_pair(conn, order.medicine_id, medicine_id).await?;
                    ensure_prescription(conn, &medicine, order.prescription_photo.as_deref())
                        .await?;
                    ensure_in_stock(&medicine, medicine.stock, quantity)?;
                    adjust_stock(conn, order.medicine_id, order.quantity).await?;
                    adjust_stock(conn, medicine_id, -quantity).await?;

                    changes.medicine_id = Some(medicine_id);
                    changes.quantity = Some(quantity);
                    changes.total_price = Some(medicine.price * f64::from(quantity));
                }

                diesel::update(orders::table.find(order_id))
                    .set(&changes)
                    .get_result::<Order>(conn)
                    .await
                    .map_err(ApiError::from)
            }
            .scope_boxed()
        })
        .await
    }

    /// Cancels a pending or verified order, returning its stock and freeing
    /// the agent it was assigned to
    pub async fn cancel_order(&self, order_id: i32) -> Result<Order> {
        use crate::schema::orders;

        let mut pooled = self.get_db_conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        conn.transaction::<_, ApiError, _>(|conn| {
            async move {
                let order = lock_order(conn, order_id).await?;
                OrderState::from(&order).check_cancellable()?;

                lock_medicine(conn, order.medicine_id).await?;
                adjust_stock(conn, order.medicine_id, order.quantity).await?;
                if let Some(agent_id) = order.delivery_agent_id {
                    release_agent(conn, agent_id, order.id).await?;
                }

                diesel::update(orders::table.find(order_id))
                    .set((
                        orders::status.eq(OrderStatus::Cancelled),
                        orders::delivery_agent_id.eq(None::<i32>),
                        orders::updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .get_result::<Order>(conn)
                    .await
                    .map_err(ApiError::from)
            }
            .scope_boxed()
        })
        .await
    }

    pub async fn set_order_verification(
        &self,
        order_id: i32,
        verification: VerificationStatus,
    ) -> Result<Order> {
        use crate::schema::orders;

        let mut pooled = self.get_db_conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        conn.transaction::<_, ApiError, _>(|conn| {
            async move {
                let order = lock_order(conn, order_id).await?;
                let next_status = OrderState::from(&order).apply_verification(verification)?;

                diesel::update(orders::table.find(order_id))
                    .set((
                        orders::verification_status.eq(verification),
                        orders::status.eq(next_status),
                        orders::updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .get_result::<Order>(conn)
                    .await
                    .map_err(ApiError::from)
            }
            .scope_boxed()
        })
        .await
    }

    /// Links a verified order and a free agent. The agent is claimed with a
    /// conditional update so two concurrent assignments cannot both win.
    pub async fn assign_order(&self, order_id: i32, agent_id: i32) -> Result<Order> {
        use crate::schema::{delivery_agents, orders};

        let mut pooled = self.get_db_conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        conn.transaction::<_, ApiError, _>(|conn| {
            async move {
                let order = lock_order(conn, order_id).await?;
                let agent = delivery_agents::table
                    .find(agent_id)
                    .for_update()
                    .first::<DeliveryAgent>(conn)
                    .await
                    .optional()?
                    .ok_or_else(|| ApiError::NotFound("Delivery agent".to_string()))?;

                OrderState::from(&order).check_assignable(agent.id, agent.current_order_id)?;

                let claimed = diesel::update(
                    delivery_agents::table
                        .filter(delivery_agents::id.eq(agent.id))
                        .filter(delivery_agents::current_order_id.is_null()),
                )
                .set(delivery_agents::current_order_id.eq(order.id))
                .execute(conn)
                .await?;
                if claimed == 0 {
                    return Err(ApiError::Conflict(format!(
                        "Delivery agent {} is already handling an order",
                        agent.id
                    )));
                }

                diesel::update(orders::table.find(order.id))
                    .set((
                        orders::delivery_agent_id.eq(agent.id),
                        orders::updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .get_result::<Order>(conn)
                    .await
                    .map_err(ApiError::from)
            }
            .scope_boxed()
        })
        .await
    }

    /// Payment recorded by the agent carrying the order
    pub async fn update_payment(
        &self,
        order_id: i32,
        agent_id: i32,
        payment: PaymentStatus,
    ) -> Result<Order> {
        use crate::schema::orders;

        let mut pooled = self.get_db_conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        conn.transaction::<_, ApiError, _>(|conn| {
            async move {
                let order = lock_order(conn, order_id).await?;
                ensure_assigned_to(&order, agent_id)?;
                OrderState::from(&order).check_payment_change(payment)?;

                diesel::update(orders::table.find(order_id))
                    .set((
                        orders::payment_status.eq(payment),
                        orders::updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .get_result::<Order>(conn)
                    .await
                    .map_err(ApiError::from)
            }
            .scope_boxed()
        })
        .await
    }

    /// Dispatch or delivery reported by the agent carrying the order.
    /// Delivery frees the agent for the next assignment.
    pub async fn advance_delivery(
        &self,
        order_id: i32,
        agent_id: i32,
        next: OrderStatus,
    ) -> Result<Order> {
        use crate::schema::orders;

        let mut pooled = self.get_db_conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        conn.transaction::<_, ApiError, _>(|conn| {
            async move {
                let order = lock_order(conn, order_id).await?;
                ensure_assigned_to(&order, agent_id)?;
                OrderState::from(&order).check_delivery_transition(next)?;

                if next == OrderStatus::Delivered {
                    release_agent(conn, agent_id, order.id).await?;
                }

                diesel::update(orders::table.find(order_id))
                    .set((
                        orders::status.eq(next),
                        orders::updated_at.eq(Utc::now().naive_utc()),
                    ))
                    .get_result::<Order>(conn)
                    .await
                    .map_err(ApiError::from)
            }
            .scope_boxed()
        })
        .await
    }

    /// The order the agent is carrying right now, if any
    pub async fn current_order_for_agent(&self, agent_id: i32) -> Result<Option<DeliveryOrderView>> {
        use crate::schema::{delivery_agents, medicines, orders};

        let conn = &mut self.get_db_conn().await?;
        let current = delivery_agents::table
            .find(agent_id)
            .select(delivery_agents::current_order_id)
            .first::<Option<i32>>(conn)
            .await
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Delivery agent".to_string()))?;

        let Some(order_id) = current else {
            return Ok(None);
        };

        let row = orders::table
            .inner_join(medicines::table)
            .filter(orders::id.eq(order_id))
            .select((Order::as_select(), medicines::name))
            .first::<(Order, String)>(conn)
            .await
            .optional()?;

        Ok(row.map(|(order, medicine_name)| DeliveryOrderView {
            id: order.id,
            user_name: order.user_name,
            user_address: order.user_address,
            phone_number: order.phone_number,
            medicine_name,
            quantity: order.quantity,
            total_price: order.total_price,
            status: order.status,
            payment_status: order.payment_status,
            created_at: order.created_at,
        }))
    }

    pub async fn dashboard_stats(&self) -> Result<DashboardStats> {
        use crate::schema::{medicines, orders};

        let conn = &mut self.get_db_conn().await?;

        let total_orders = orders::table.count().get_result::<i64>(conn).await?;
        let total_revenue = orders::table
            .filter(orders::status.eq(OrderStatus::Delivered))
            .select(diesel::dsl::sum(orders::total_price))
            .first::<Option<f64>>(conn)
            .await?
            .unwrap_or(0.0);

        let recent_orders = orders::table
            .inner_join(medicines::table)
            .order_by(orders::created_at.desc())
            .limit(RECENT_ORDERS)
            .select((
                orders::id,
                orders::user_name,
                orders::created_at,
                medicines::name,
                orders::total_price,
                orders::status,
            ))
            .load::<(i32, String, chrono::NaiveDateTime, String, f64, OrderStatus)>(conn)
            .await?
            .into_iter()
            .map(
                |(id, user_name, created_at, medicine_name, total_price, status)| RecentOrder {
                    id,
                    user_name,
                    created_at,
                    medicine_name,
                    total_price,
                    status,
                },
            )
            .collect();

        Ok(DashboardStats {
            total_orders,
            total_revenue,
            recent_orders,
        })
    }
}
