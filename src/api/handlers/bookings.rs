use axum::extract::State;
use serde_json::json;

use super::today;
use crate::api::{extractors::{AdminAuth, Json, Path, Query}, state::AppState};
use crate::db::models::{
    AvailabilityParams, AvailabilityResponse, Booking, BookingCreatedResponse, BookingListQuery,
    BookingPatch, BookingUpdatedResponse, NewBookingParams, PlaceBooking, RelayResponse,
};
use crate::errors::ApiError;
use crate::logging::audit;
use crate::services::availability::StayRange;
use crate::services::{background_jobs, booking_flow, whatsapp};
use crate::validation::{validate_phone, validate_required, validate_time};
use crate::Result;

fn relay_response(sent: bool, what: &str) -> RelayResponse {
    RelayResponse {
        sent,
        message: if sent {
            format!("{what} sent")
        } else {
            format!("WhatsApp is not configured, the {} was logged", what.to_lowercase())
        },
    }
}

fn validate_booking(params: NewBookingParams, today: chrono::NaiveDate) -> Result<PlaceBooking> {
    let v = |r: std::result::Result<String, String>| r.map_err(ApiError::Validation);

    let range = StayRange::parse(&params.check_in_date, &params.check_out_date, today)?;
    if params.guest_count < 1 {
        return Err(ApiError::Validation(
            "At least one guest is required".to_string(),
        ));
    }

    Ok(PlaceBooking {
        guest_name: v(validate_required("Guest name", &params.guest_name))?,
        guest_phone: v(validate_phone(&params.guest_phone))?,
        room_type: v(validate_required("Room type", &params.room_type))?,
        check_in_date: range.check_in,
        check_in_time: v(validate_time("check-in time", &params.check_in_time))?,
        check_out_date: range.check_out,
        check_out_time: v(validate_time("check-out time", &params.check_out_time))?,
        guest_count: params.guest_count,
        notes: params
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty()),
    })
}

/// Handler for checking whether a room type is free for a stay
///
/// # Endpoint: POST /api/rooms/availability
///
/// # Returns
/// * `Json<AvailabilityResponse>` - Remaining rooms and the price of the stay
pub(crate) async fn check_availability(
    State(state): State<AppState>,
    Json(params): Json<AvailabilityParams>,
) -> Result<Json<AvailabilityResponse>> {
    let range = StayRange::parse(&params.check_in_date, &params.check_out_date, today())?;
    for (field, value) in [
        ("check-in time", &params.check_in_time),
        ("check-out time", &params.check_out_time),
    ] {
        if let Some(time) = value {
            validate_time(field, time).map_err(ApiError::Validation)?;
        }
    }

    let room_type = validate_required("Room type", &params.room_type).map_err(ApiError::Validation)?;
    Ok(Json(state.db.check_availability(&room_type, &range).await?))
}

/// Handler for booking a room
///
/// # Endpoint: POST /api/bookings
pub(crate) async fn create_booking(
    State(state): State<AppState>,
    Json(params): Json<NewBookingParams>,
) -> Result<Json<BookingCreatedResponse>> {
    let request = validate_booking(params, today())?;
    let booking = state.db.create_booking(request).await?;

    audit(
        &format!("guest:{}", booking.guest_phone),
        "created_booking",
        &format!("booking:{}", booking.id),
        Some(&json!({
            "room_type": booking.room_type,
            "check_in_date": booking.check_in_date,
            "check_out_date": booking.check_out_date,
        })),
    );
    Ok(Json(BookingCreatedResponse {
        id: booking.id,
        total_price: booking.total_price,
        message: "Booking received and awaiting confirmation".to_string(),
    }))
}

/// # Endpoint: GET /api/bookings/:id
pub(crate) async fn get_booking(
    State(state): State<AppState>,
    Path(booking_id): Path<i32>,
) -> Result<Json<Booking>> {
    Ok(Json(state.db.get_booking(booking_id).await?))
}

/// # Endpoint: GET /api/admin/bookings?userId=
pub(crate) async fn list_bookings(
    State(state): State<AppState>,
    _admin: AdminAuth,
    Query(filter): Query<BookingListQuery>,
) -> Result<Json<Vec<Booking>>> {
    Ok(Json(state.db.list_bookings(&filter).await?))
}

/// Handler for the admin booking desk
///
/// # Endpoint: PATCH /api/admin/bookings/:id/update
///
/// Covers verification, payment, room assignment, check-in, checkout and
/// moving the stay. Checkout requires the guest to be checked in and paid.
pub(crate) async fn update_booking(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(booking_id): Path<i32>,
    Json(patch): Json<BookingPatch>,
) -> Result<Json<BookingUpdatedResponse>> {
    let detail = serde_json::to_value(&patch)?;
    let booking = state.db.update_booking(booking_id, patch, today()).await?;
    audit(
        &format!("admin:{}", admin.admin_id),
        "updated_booking",
        &format!("booking:{booking_id}"),
        Some(&detail),
    );
    Ok(Json(BookingUpdatedResponse::new(booking)))
}

/// Cancels the booking; the row is kept
///
/// # Endpoint: DELETE /api/admin/bookings/:id
pub(crate) async fn cancel_booking(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(booking_id): Path<i32>,
) -> Result<Json<Booking>> {
    let booking = state.db.cancel_booking(booking_id).await?;
    audit(
        &format!("admin:{}", admin.admin_id),
        "cancelled_booking",
        &format!("booking:{booking_id}"),
        None,
    );
    Ok(Json(booking))
}

/// # Endpoint: POST /api/admin/bookings/:id/notify
pub(crate) async fn send_checkin_reminder(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(booking_id): Path<i32>,
) -> Result<Json<RelayResponse>> {
    let booking = state.db.get_booking(booking_id).await?;
    booking_flow::check_checkin_reminder(&booking, today())?;

    let sent = state
        .whatsapp
        .send_text(&booking.guest_phone, &whatsapp::checkin_reminder(&booking))
        .await?;
    audit(
        &format!("admin:{}", admin.admin_id),
        "sent_checkin_reminder",
        &format!("booking:{booking_id}"),
        None,
    );
    Ok(Json(relay_response(sent, "Check-in reminder")))
}

/// Sends the checkout reminder now instead of waiting for the sweep. A
/// booking gets at most one checkout reminder.
///
/// # Endpoint: POST /api/admin/bookings/:id/checkout-notify
pub(crate) async fn send_checkout_reminder(
    State(state): State<AppState>,
    admin: AdminAuth,
    Path(booking_id): Path<i32>,
) -> Result<Json<RelayResponse>> {
    let booking = state.db.get_booking(booking_id).await?;
    let sent =
        background_jobs::send_checkout_reminder(&state.db, &state.whatsapp, &booking, today())
            .await?;
    audit(
        &format!("admin:{}", admin.admin_id),
        "sent_checkout_reminder",
        &format!("booking:{booking_id}"),
        None,
    );
    Ok(Json(relay_response(sent, "Checkout reminder")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn params() -> NewBookingParams {
        NewBookingParams {
            guest_name: "Meera".into(),
            guest_phone: "9876543210".into(),
            room_type: "Deluxe".into(),
            check_in_date: "2030-03-01".into(),
            check_in_time: "14:00".into(),
            check_out_date: "2030-03-04".into(),
            check_out_time: "11:00".into(),
            guest_count: 2,
            notes: Some("  ".into()),
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_booking_request_is_validated() {
        let booking = validate_booking(params(), day("2030-02-01")).unwrap();
        assert_eq!(booking.check_in_date, day("2030-03-01"));
        assert_eq!(booking.check_out_date, day("2030-03-04"));
        assert!(booking.notes.is_none());
    }

    #[test]
    fn test_booking_dates_must_be_ordered() {
        let reversed = NewBookingParams {
            check_out_date: "2030-02-20".into(),
            ..params()
        };
        assert!(matches!(
            validate_booking(reversed, day("2030-02-01")),
            Err(ApiError::Validation(_))
        ));

        let past = validate_booking(params(), day("2030-03-02"));
        assert!(matches!(past, Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_booking_needs_a_guest() {
        let empty = NewBookingParams {
            guest_count: 0,
            ..params()
        };
        assert!(validate_booking(empty, day("2030-02-01")).is_err());
    }

    #[test]
    fn test_relay_message_reflects_delivery() {
        assert_eq!(relay_response(true, "Check-in reminder").message, "Check-in reminder sent");
        assert!(!relay_response(false, "Checkout reminder").sent);
    }
}
