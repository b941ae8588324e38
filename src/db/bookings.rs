use chrono::NaiveDate;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use tracing::info;

use super::rooms::{count_overlapping, lock_room_type};
use super::users::upsert_user;
use super::DbClient;
use crate::db::models::{
    Booking, BookingListQuery, BookingPatch, BookingStatus, CheckinStatus, NewBooking, PaidStatus,
    PlaceBooking, VerificationStatus,
};
use crate::errors::ApiError;
use crate::services::availability::{self, StayRange};
use crate::services::booking_flow;
use crate::Result;

async fn lock_booking(conn: &mut AsyncPgConnection, booking_id: i32) -> Result<Booking> {
    use crate::schema::bookings;

    bookings::table
        .find(booking_id)
        .for_update()
        .first::<Booking>(conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound("Booking".to_string()))
}

fn no_rooms_left(room_type: &str) -> ApiError {
    ApiError::Conflict(format!(
        "No {room_type} rooms are available for the selected dates"
    ))
}

/// DbClient helper functions for room bookings. Creating a booking and
/// moving one to new dates both hold the room type lock while counting.
impl DbClient {
    pub async fn create_booking(&self, request: PlaceBooking) -> Result<Booking> {
        use crate::schema::bookings;

        let mut pooled = self.get_db_conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        let booking = conn
            .transaction::<_, ApiError, _>(|conn| {
                async move {
                    let room = lock_room_type(conn, &request.room_type).await?;
                    let range = StayRange {
                        check_in: request.check_in_date,
                        check_out: request.check_out_date,
                    };
                    let overlapping = count_overlapping(conn, &room.type_name, &range, None).await?;
                    let quote = availability::quote(&room, &range, overlapping);
                    if !quote.available {
                        return Err(no_rooms_left(&room.type_name));
                    }

                    let user = upsert_user(conn, &request.guest_name, &request.guest_phone).await?;
                    let new_booking = NewBooking {
                        user_id: Some(user.id),
                        guest_name: request.guest_name,
                        guest_phone: request.guest_phone,
                        room_type: room.type_name,
                        check_in_date: range.check_in,
                        check_in_time: request.check_in_time,
                        check_out_date: range.check_out,
                        check_out_time: request.check_out_time,
                        guest_count: request.guest_count,
                        total_price: quote.estimated_total_price,
                        status: BookingStatus::Pending,
                        paid_status: PaidStatus::Unpaid,
                        verification_status: VerificationStatus::Pending,
                        checkin_status: CheckinStatus::NotCheckedIn,
                        notes: request.notes,
                    };
                    diesel::insert_into(bookings::table)
                        .values(&new_booking)
                        .get_result::<Booking>(conn)
                        .await
                        .map_err(ApiError::from)
                }
                .scope_boxed()
            })
            .await?;

        info!(
            "Booking {} created for {} ({} to {})",
            booking.id, booking.room_type, booking.check_in_date, booking.check_out_date
        );
        Ok(booking)
    }

    pub async fn get_booking(&self, booking_id: i32) -> Result<Booking> {
        use crate::schema::bookings::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        bookings
            .find(booking_id)
            .first::<Booking>(conn)
            .await
            .optional()?
            .ok_or_else(|| ApiError::NotFound("Booking".to_string()))
    }

    pub async fn list_bookings(&self, filter: &BookingListQuery) -> Result<Vec<Booking>> {
        use crate::schema::bookings::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        let mut query = bookings.order_by(check_in_date.desc()).into_boxed();
        if let Some(user) = filter.user_id {
            query = query.filter(user_id.eq(user));
        }
        query.load::<Booking>(conn).await.map_err(Into::into)
    }

    /// Applies an admin patch after checking it against the stored booking.
    /// New dates or a new room type are re-checked for availability with
    /// this booking left out of the count, and the price is recomputed.
    pub async fn update_booking(
        &self,
        booking_id: i32,
        patch: BookingPatch,
        today: NaiveDate,
    ) -> Result<Booking> {
        use crate::schema::bookings;

        let mut pooled = self.get_db_conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        conn.transaction::<_, ApiError, _>(|conn| {
            async move {
                let booking = lock_booking(conn, booking_id).await?;
                let mut plan = booking_flow::plan_update(&booking, &patch, today)?;

                if let Some(requote) = &plan.requote {
                    let room = lock_room_type(conn, &requote.room_type).await?;
                    let overlapping =
                        count_overlapping(conn, &room.type_name, &requote.range, Some(booking.id))
                            .await?;
                    let quote = availability::quote(&room, &requote.range, overlapping);
                    if !quote.available {
                        return Err(no_rooms_left(&room.type_name));
                    }
                    plan.changes.total_price = Some(quote.estimated_total_price);
                }

                if plan.changes.is_empty() {
                    return Ok(booking);
                }

                diesel::update(bookings::table.find(booking_id))
                    .set(&plan.changes)
                    .get_result::<Booking>(conn)
                    .await
                    .map_err(ApiError::from)
            }
            .scope_boxed()
        })
        .await
    }

    pub async fn cancel_booking(&self, booking_id: i32) -> Result<Booking> {
        use crate::schema::bookings;

        let mut pooled = self.get_db_conn().await?;
        let conn: &mut AsyncPgConnection = &mut pooled;

        conn.transaction::<_, ApiError, _>(|conn| {
            async move {
                let booking = lock_booking(conn, booking_id).await?;
                booking_flow::check_cancellable(&booking)?;

                diesel::update(bookings::table.find(booking_id))
                    .set(bookings::status.eq(BookingStatus::Cancelled))
                    .get_result::<Booking>(conn)
                    .await
                    .map_err(ApiError::from)
            }
            .scope_boxed()
        })
        .await
    }

    /// Flags the reminder as sent. Returns false when another sender got
    /// there first.
    pub async fn mark_checkout_reminder_sent(&self, booking_id: i32) -> Result<bool> {
        use crate::schema::bookings::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        let updated = diesel::update(
            bookings
                .filter(id.eq(booking_id))
                .filter(checkout_reminder_sent.eq(false)),
        )
        .set(checkout_reminder_sent.eq(true))
        .execute(conn)
        .await?;
        Ok(updated > 0)
    }

    /// Gives back a claimed reminder whose message never reached the relay
    pub async fn release_checkout_reminder(&self, booking_id: i32) -> Result<bool> {
        use crate::schema::bookings::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        let updated = diesel::update(
            bookings
                .filter(id.eq(booking_id))
                .filter(checkout_reminder_sent.eq(true)),
        )
        .set(checkout_reminder_sent.eq(false))
        .execute(conn)
        .await?;
        Ok(updated > 0)
    }

    /// Bookings checking out today that still owe a checkout reminder
    pub async fn due_checkout_reminders(&self, today: NaiveDate) -> Result<Vec<Booking>> {
        use crate::schema::bookings::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        bookings
            .filter(check_out_date.eq(today))
            .filter(checkout_reminder_sent.eq(false))
            .filter(status.ne(BookingStatus::Cancelled))
            .filter(status.ne(BookingStatus::Completed))
            .filter(checkin_status.ne(CheckinStatus::CheckedOut))
            .load::<Booking>(conn)
            .await
            .map_err(Into::into)
    }
}
