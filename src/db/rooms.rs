use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, QueryResult};
use diesel_async::{AsyncPgConnection, RunQueryDsl};

use super::DbClient;
use crate::db::models::{AvailabilityResponse, BookingStatus, RoomType};
use crate::errors::ApiError;
use crate::services::availability::{self, StayRange};
use crate::Result;

/// Locks the room type row so bookings of one type are counted and
/// inserted one at a time
pub(crate) async fn lock_room_type(conn: &mut AsyncPgConnection, name: &str) -> Result<RoomType> {
    use crate::schema::room_types;

    room_types::table
        .filter(room_types::type_name.eq(name))
        .for_update()
        .first::<RoomType>(conn)
        .await
        .optional()?
        .ok_or_else(|| ApiError::NotFound(format!("Room type '{name}'")))
}

/// Live bookings of the room type whose stay intersects `range`. Stays are
/// half-open, so a checkout and a check-in on the same day do not collide.
pub(crate) async fn count_overlapping(
    conn: &mut AsyncPgConnection,
    room_type: &str,
    range: &StayRange,
    exclude_booking: Option<i32>,
) -> QueryResult<i64> {
    use crate::schema::bookings;

    let mut query = bookings::table
        .into_boxed()
        .filter(bookings::room_type.eq(room_type.to_string()))
        .filter(bookings::status.ne(BookingStatus::Cancelled))
        .filter(bookings::status.ne(BookingStatus::Completed))
        .filter(bookings::check_in_date.lt(range.check_out))
        .filter(bookings::check_out_date.gt(range.check_in));

    if let Some(booking_id) = exclude_booking {
        query = query.filter(bookings::id.ne(booking_id));
    }

    query.count().get_result::<i64>(conn).await
}

impl DbClient {
    pub async fn list_room_types(&self) -> Result<Vec<RoomType>> {
        use crate::schema::room_types::dsl::*;

        let conn = &mut self.get_db_conn().await?;
        room_types
            .order_by(price)
            .load::<RoomType>(conn)
            .await
            .map_err(Into::into)
    }

    pub async fn check_availability(
        &self,
        room_type: &str,
        range: &StayRange,
    ) -> Result<AvailabilityResponse> {
        use crate::schema::room_types;

        let conn = &mut self.get_db_conn().await?;
        let room = room_types::table
            .filter(room_types::type_name.eq(room_type))
            .first::<RoomType>(conn)
            .await
            .optional()?
            .ok_or_else(|| ApiError::NotFound(format!("Room type '{room_type}'")))?;

        let overlapping = count_overlapping(conn, room_type, range, None).await?;
        Ok(availability::quote(&room, range, overlapping))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::PlaceBooking;
    use chrono::NaiveDate;

    fn stay(room_type: &str, check_in: &str, check_out: &str) -> PlaceBooking {
        PlaceBooking {
            guest_name: "Test Guest".to_string(),
            guest_phone: "9000000002".to_string(),
            room_type: room_type.to_string(),
            check_in_date: NaiveDate::parse_from_str(check_in, "%Y-%m-%d").unwrap(),
            check_in_time: "14:00".to_string(),
            check_out_date: NaiveDate::parse_from_str(check_out, "%Y-%m-%d").unwrap(),
            check_out_time: "11:00".to_string(),
            guest_count: 1,
            notes: None,
        }
    }

    #[tokio::test]
    #[ignore = "needs TEST_DATABASE_URL with migrations applied"]
    async fn test_single_room_accepts_back_to_back_stays_only() {
        use crate::schema::room_types;

        dotenv::dotenv().ok();
        let db_url = std::env::var("TEST_DATABASE_URL").unwrap();
        let client = DbClient::new(&db_url, "redis://127.0.0.1:1").unwrap();

        let name = format!("Suite-{}", uuid::Uuid::new_v4());
        {
            let conn = &mut client.get_db_conn().await.unwrap();
            diesel::insert_into(room_types::table)
                .values((
                    room_types::type_name.eq(name.as_str()),
                    room_types::price.eq(1000.0),
                    room_types::total_rooms.eq(1),
                ))
                .execute(conn)
                .await
                .unwrap();
        }

        let first = client
            .create_booking(stay(&name, "2031-01-10", "2031-01-13"))
            .await
            .unwrap();
        assert_eq!(first.total_price, 3000.0);

        client
            .create_booking(stay(&name, "2031-01-13", "2031-01-15"))
            .await
            .unwrap();

        assert!(matches!(
            client
                .create_booking(stay(&name, "2031-01-12", "2031-01-14"))
                .await,
            Err(ApiError::Conflict(_))
        ));

        let range = StayRange {
            check_in: NaiveDate::parse_from_str("2031-01-09", "%Y-%m-%d").unwrap(),
            check_out: NaiveDate::parse_from_str("2031-01-10", "%Y-%m-%d").unwrap(),
        };
        let quote = client.check_availability(&name, &range).await.unwrap();
        assert!(quote.available);
        assert_eq!(quote.remaining_rooms, 1);
    }
}
