//! Rules for room bookings.
//!
//! The admin screen sends partial updates that may touch several status
//! fields at once (a checkout sends `checkin_status` and `status`
//! together). [`plan_update`] checks the whole patch against the stored
//! booking and produces the column changes to write, plus the stay that has
//! to be re-quoted when dates or the room type moved.

use chrono::NaiveDate;

use super::availability::StayRange;
use crate::db::models::{
    Booking, BookingChanges, BookingPatch, BookingStatus, CheckinStatus, PaidStatus,
    VerificationStatus,
};
use crate::errors::{ApiError, TransitionError};
use crate::validation::{parse_date, validate_required, validate_time};
use crate::Result;

const ENTITY: &str = "booking";

/// A stay whose availability and price must be recomputed before the
/// update is written
#[derive(Debug, Clone, PartialEq)]
pub struct Requote {
    pub room_type: String,
    pub range: StayRange,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingPlan {
    pub changes: BookingChanges,
    pub requote: Option<Requote>,
}

pub fn is_terminal(status: BookingStatus) -> bool {
    matches!(status, BookingStatus::Completed | BookingStatus::Cancelled)
}

fn terminal(status: BookingStatus) -> ApiError {
    TransitionError::Terminal {
        entity: ENTITY,
        status: status.to_string(),
    }
    .into()
}

fn not_allowed(from: impl ToString, to: impl ToString) -> ApiError {
    TransitionError::NotAllowed {
        entity: ENTITY,
        from: from.to_string(),
        to: to.to_string(),
    }
    .into()
}

fn rejected(message: &str) -> ApiError {
    TransitionError::Rejected(message.to_string()).into()
}

fn changes_more_than_notes(patch: &BookingPatch) -> bool {
    touches_stay(patch)
        || patch.room_number.is_some()
        || patch.check_out_time.is_some()
        || patch.status.is_some()
        || patch.paid_status.is_some()
        || patch.verification_status.is_some()
        || patch.checkin_status.is_some()
}

fn touches_stay(patch: &BookingPatch) -> bool {
    patch.room_type.is_some()
        || patch.check_in_date.is_some()
        || patch.check_out_date.is_some()
        || patch.check_in_time.is_some()
        || patch.guest_count.is_some()
}

/// Drops the fields that repeat the stored values. The edit form always
/// submits every stay field pre-filled, so only real differences count.
fn without_unchanged(booking: &Booking, patch: &BookingPatch) -> BookingPatch {
    let same_text = |value: &Option<String>, stored: &str| {
        value.as_deref().is_some_and(|v| v.trim() == stored)
    };
    let same_date = |value: &Option<String>, stored: NaiveDate| {
        value.as_deref().and_then(|v| parse_date("date", v).ok()) == Some(stored)
    };
    let same_time = |value: &Option<String>, stored: &str| {
        value
            .as_deref()
            .and_then(|v| validate_time("time", v).ok())
            .is_some_and(|v| v == stored)
    };

    let mut patch = patch.clone();
    if same_text(&patch.room_type, &booking.room_type) {
        patch.room_type = None;
    }
    if booking
        .room_number
        .as_deref()
        .is_some_and(|stored| same_text(&patch.room_number, stored))
    {
        patch.room_number = None;
    }
    if same_date(&patch.check_in_date, booking.check_in_date) {
        patch.check_in_date = None;
    }
    if same_date(&patch.check_out_date, booking.check_out_date) {
        patch.check_out_date = None;
    }
    if same_time(&patch.check_in_time, &booking.check_in_time) {
        patch.check_in_time = None;
    }
    if same_time(&patch.check_out_time, &booking.check_out_time) {
        patch.check_out_time = None;
    }
    if patch.guest_count == Some(booking.guest_count) {
        patch.guest_count = None;
    }
    patch.status = patch.status.filter(|s| *s != booking.status);
    patch.paid_status = patch.paid_status.filter(|p| *p != booking.paid_status);
    patch.verification_status = patch
        .verification_status
        .filter(|v| *v != booking.verification_status);
    patch.checkin_status = patch.checkin_status.filter(|c| *c != booking.checkin_status);
    patch
}

/// Checks a partial update against the stored booking
pub fn plan_update(booking: &Booking, patch: &BookingPatch, today: NaiveDate) -> Result<BookingPlan> {
    let patch = &without_unchanged(booking, patch);
    let mut changes = BookingChanges {
        notes: patch.notes.clone(),
        ..Default::default()
    };

    if is_terminal(booking.status) && changes_more_than_notes(patch) {
        return Err(terminal(booking.status));
    }

    // Review outcome
    let verification = patch.verification_status.unwrap_or(booking.verification_status);
    if let Some(next) = patch.verification_status.filter(|v| *v != booking.verification_status) {
        if booking.checkin_status != CheckinStatus::NotCheckedIn
            && next != VerificationStatus::Verified
        {
            return Err(rejected(
                "Verification cannot be withdrawn after the guest has checked in",
            ));
        }
        changes.verification_status = Some(next);
    }

    // Payment
    let paid = patch.paid_status.unwrap_or(booking.paid_status);
    if patch.paid_status.is_some_and(|p| p != booking.paid_status) {
        changes.paid_status = patch.paid_status;
    }

    // Check-in and checkout
    let mut next_status = booking.status;
    let mut checkin = booking.checkin_status;
    if let Some(next) = patch.checkin_status.filter(|c| *c != booking.checkin_status) {
        match (booking.checkin_status, next) {
            (CheckinStatus::NotCheckedIn, CheckinStatus::CheckedIn) => {
                if verification != VerificationStatus::Verified {
                    return Err(TransitionError::NotVerified("guest").into());
                }
                if next_status == BookingStatus::Pending {
                    next_status = BookingStatus::Confirmed;
                }
            }
            (CheckinStatus::CheckedIn, CheckinStatus::CheckedOut) => {
                if paid != PaidStatus::Paid {
                    return Err(TransitionError::CheckoutBlocked.into());
                }
                next_status = BookingStatus::Completed;
            }
            (CheckinStatus::NotCheckedIn, CheckinStatus::CheckedOut) => {
                return Err(TransitionError::CheckoutBlocked.into());
            }
            (from, to) => return Err(not_allowed(from, to)),
        }
        checkin = next;
        changes.checkin_status = Some(next);
    }

    // Lifecycle status sent explicitly
    if let Some(requested) = patch.status.filter(|s| *s != booking.status) {
        match requested {
            BookingStatus::Cancelled => {
                check_cancellable(booking)?;
                next_status = BookingStatus::Cancelled;
            }
            BookingStatus::Completed if checkin == CheckinStatus::CheckedOut => {}
            BookingStatus::Completed => {
                return Err(rejected("A booking is completed by checking the guest out"));
            }
            BookingStatus::Confirmed if booking.status == BookingStatus::Pending => {
                if next_status == BookingStatus::Pending {
                    next_status = BookingStatus::Confirmed;
                }
            }
            other => return Err(not_allowed(booking.status, other)),
        }
    }

    // A positive review confirms a booking still waiting on it
    if changes.verification_status == Some(VerificationStatus::Verified)
        && next_status == BookingStatus::Pending
    {
        next_status = BookingStatus::Confirmed;
    }
    if next_status != booking.status {
        changes.status = Some(next_status);
    }

    // Room number
    if let Some(room) = &patch.room_number {
        let room = validate_required("Room number", room).map_err(ApiError::Validation)?;
        if verification != VerificationStatus::Verified {
            return Err(TransitionError::NotVerified("guest").into());
        }
        if Some(&room) != booking.room_number.as_ref() {
            changes.room_number = Some(room);
        }
    }

    if let Some(time) = &patch.check_out_time {
        changes.check_out_time =
            Some(validate_time("check-out time", time).map_err(ApiError::Validation)?);
    }

    let requote = if touches_stay(patch) {
        plan_stay_change(booking, patch, today, &mut changes)?
    } else {
        None
    };

    if changes.is_empty() && requote.is_none() {
        return Err(ApiError::Validation("Nothing to update".to_string()));
    }

    Ok(BookingPlan { changes, requote })
}

fn plan_stay_change(
    booking: &Booking,
    patch: &BookingPatch,
    today: NaiveDate,
    changes: &mut BookingChanges,
) -> Result<Option<Requote>> {
    if booking.checkin_status != CheckinStatus::NotCheckedIn
        || changes.checkin_status.is_some()
        || changes.status == Some(BookingStatus::Cancelled)
    {
        return Err(rejected(
            "The stay can only be changed before the guest checks in",
        ));
    }

    if let Some(time) = &patch.check_in_time {
        changes.check_in_time =
            Some(validate_time("check-in time", time).map_err(ApiError::Validation)?);
    }
    if let Some(count) = patch.guest_count {
        if count < 1 {
            return Err(ApiError::Validation(
                "Guest count must be at least 1".to_string(),
            ));
        }
        changes.guest_count = Some(count);
    }

    let room_type = match &patch.room_type {
        Some(room) => validate_required("Room type", room).map_err(ApiError::Validation)?,
        None => booking.room_type.clone(),
    };
    let check_in = match &patch.check_in_date {
        Some(date) => parse_date("check-in date", date).map_err(ApiError::Validation)?,
        None => booking.check_in_date,
    };
    let check_out = match &patch.check_out_date {
        Some(date) => parse_date("check-out date", date).map_err(ApiError::Validation)?,
        None => booking.check_out_date,
    };

    let moved = room_type != booking.room_type
        || check_in != booking.check_in_date
        || check_out != booking.check_out_date;
    if !moved {
        return Ok(None);
    }

    // An unchanged check-in date may already lie in the past
    let floor = if check_in != booking.check_in_date {
        today
    } else {
        today.min(check_in)
    };
    let range = StayRange::new(check_in, check_out, floor)?;

    if room_type != booking.room_type {
        changes.room_type = Some(room_type.clone());
    }
    if check_in != booking.check_in_date {
        changes.check_in_date = Some(check_in);
    }
    if check_out != booking.check_out_date {
        changes.check_out_date = Some(check_out);
    }

    Ok(Some(Requote { room_type, range }))
}

/// Any booking that is neither finished nor occupied may be cancelled
pub fn check_cancellable(booking: &Booking) -> Result<()> {
    if is_terminal(booking.status) {
        return Err(terminal(booking.status));
    }
    if booking.checkin_status == CheckinStatus::CheckedIn {
        return Err(rejected("A booking cannot be cancelled while the guest is checked in"));
    }
    Ok(())
}

/// Checkout reminders go out on the checkout day, once
pub fn check_checkout_reminder(booking: &Booking, today: NaiveDate) -> Result<()> {
    if is_terminal(booking.status) || booking.checkin_status == CheckinStatus::CheckedOut {
        return Err(terminal(booking.status));
    }
    if booking.check_out_date != today {
        return Err(rejected("Checkout reminders are only sent on the checkout day"));
    }
    if booking.checkout_reminder_sent {
        return Err(ApiError::Conflict(
            "Checkout reminder was already sent for this booking".to_string(),
        ));
    }
    Ok(())
}

/// Check-in reminders are sent on the day before or the day of arrival
pub fn check_checkin_reminder(booking: &Booking, today: NaiveDate) -> Result<()> {
    if is_terminal(booking.status) {
        return Err(terminal(booking.status));
    }
    if booking.checkin_status != CheckinStatus::NotCheckedIn {
        return Err(rejected("The guest has already checked in"));
    }
    let days_ahead = (booking.check_in_date - today).num_days();
    if !(0..=1).contains(&days_ahead) {
        return Err(rejected(
            "Check-in reminders are only sent within a day of arrival",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn booking() -> Booking {
        Booking {
            id: 7,
            user_id: None,
            guest_name: "Farah".into(),
            guest_phone: "9811122233".into(),
            room_type: "Deluxe".into(),
            room_number: None,
            check_in_date: date("2025-05-10"),
            check_in_time: "14:00".into(),
            check_out_date: date("2025-05-12"),
            check_out_time: "11:00".into(),
            guest_count: 2,
            total_price: 5000.0,
            status: BookingStatus::Pending,
            paid_status: PaidStatus::Unpaid,
            verification_status: VerificationStatus::Pending,
            checkin_status: CheckinStatus::NotCheckedIn,
            notes: None,
            checkout_reminder_sent: false,
            created_at: Utc::now().naive_utc(),
        }
    }

    fn today() -> NaiveDate {
        date("2025-05-01")
    }

    #[test]
    fn test_checkout_requires_checkin_and_payment() {
        let mut b = booking();
        b.verification_status = VerificationStatus::Verified;
        b.checkin_status = CheckinStatus::CheckedIn;
        b.status = BookingStatus::Confirmed;
        b.paid_status = PaidStatus::PartiallyPaid;

        let checkout = BookingPatch {
            checkin_status: Some(CheckinStatus::CheckedOut),
            status: Some(BookingStatus::Completed),
            ..Default::default()
        };
        let err = plan_update(&b, &checkout, today()).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Transition(TransitionError::CheckoutBlocked)
        ));

        b.paid_status = PaidStatus::Paid;
        let plan = plan_update(&b, &checkout, today()).unwrap();
        assert_eq!(plan.changes.checkin_status, Some(CheckinStatus::CheckedOut));
        assert_eq!(plan.changes.status, Some(BookingStatus::Completed));
        assert!(plan.requote.is_none());
    }

    #[test]
    fn test_checkout_with_payment_in_same_patch() {
        let mut b = booking();
        b.verification_status = VerificationStatus::Verified;
        b.checkin_status = CheckinStatus::CheckedIn;
        b.status = BookingStatus::Confirmed;

        let patch = BookingPatch {
            paid_status: Some(PaidStatus::Paid),
            checkin_status: Some(CheckinStatus::CheckedOut),
            ..Default::default()
        };
        let plan = plan_update(&b, &patch, today()).unwrap();
        assert_eq!(plan.changes.paid_status, Some(PaidStatus::Paid));
        assert_eq!(plan.changes.status, Some(BookingStatus::Completed));
    }

    #[test]
    fn test_checkout_without_checkin_is_blocked() {
        let mut b = booking();
        b.paid_status = PaidStatus::Paid;
        let patch = BookingPatch {
            checkin_status: Some(CheckinStatus::CheckedOut),
            ..Default::default()
        };
        assert!(matches!(
            plan_update(&b, &patch, today()),
            Err(ApiError::Transition(TransitionError::CheckoutBlocked))
        ));
    }

    #[test]
    fn test_checkin_requires_verification_and_confirms() {
        let b = booking();
        let checkin = BookingPatch {
            checkin_status: Some(CheckinStatus::CheckedIn),
            ..Default::default()
        };
        assert!(matches!(
            plan_update(&b, &checkin, today()),
            Err(ApiError::Transition(TransitionError::NotVerified(_)))
        ));

        let verified_checkin = BookingPatch {
            verification_status: Some(VerificationStatus::Verified),
            ..checkin
        };
        let plan = plan_update(&b, &verified_checkin, today()).unwrap();
        assert_eq!(plan.changes.checkin_status, Some(CheckinStatus::CheckedIn));
        assert_eq!(plan.changes.status, Some(BookingStatus::Confirmed));
    }

    #[test]
    fn test_verification_confirms_pending_booking() {
        let patch = BookingPatch {
            verification_status: Some(VerificationStatus::Verified),
            ..Default::default()
        };
        let plan = plan_update(&booking(), &patch, today()).unwrap();
        assert_eq!(plan.changes.status, Some(BookingStatus::Confirmed));

        let rejected_doc = BookingPatch {
            verification_status: Some(VerificationStatus::NotVerified),
            ..Default::default()
        };
        let plan = plan_update(&booking(), &rejected_doc, today()).unwrap();
        assert_eq!(plan.changes.status, None);
    }

    #[test]
    fn test_room_number_requires_verification() {
        let patch = BookingPatch {
            room_number: Some("204".into()),
            ..Default::default()
        };
        assert!(plan_update(&booking(), &patch, today()).is_err());

        let mut b = booking();
        b.verification_status = VerificationStatus::Verified;
        let plan = plan_update(&b, &patch, today()).unwrap();
        assert_eq!(plan.changes.room_number, Some("204".to_string()));
    }

    #[test]
    fn test_date_change_requests_requote() {
        let patch = BookingPatch {
            check_out_date: Some("2025-05-14".into()),
            ..Default::default()
        };
        let plan = plan_update(&booking(), &patch, today()).unwrap();
        let requote = plan.requote.unwrap();
        assert_eq!(requote.room_type, "Deluxe");
        assert_eq!(requote.range.nights(), 4);
        assert_eq!(plan.changes.check_out_date, Some(date("2025-05-14")));
    }

    #[test]
    fn test_invalid_date_changes() {
        let backwards = BookingPatch {
            check_out_date: Some("2025-05-09".into()),
            ..Default::default()
        };
        assert!(matches!(
            plan_update(&booking(), &backwards, today()),
            Err(ApiError::Validation(_))
        ));

        let past = BookingPatch {
            check_in_date: Some("2025-04-20".into()),
            ..Default::default()
        };
        assert!(plan_update(&booking(), &past, today()).is_err());

        let mut checked_in = booking();
        checked_in.verification_status = VerificationStatus::Verified;
        checked_in.checkin_status = CheckinStatus::CheckedIn;
        let later = BookingPatch {
            check_out_date: Some("2025-05-13".into()),
            ..Default::default()
        };
        assert!(matches!(
            plan_update(&checked_in, &later, today()),
            Err(ApiError::Transition(TransitionError::Rejected(_)))
        ));
    }

    fn resubmitted_form(b: &Booking, notes: &str) -> BookingPatch {
        BookingPatch {
            room_type: Some(b.room_type.clone()),
            check_in_date: Some(b.check_in_date.to_string()),
            check_in_time: Some(b.check_in_time.clone()),
            check_out_date: Some(b.check_out_date.to_string()),
            check_out_time: Some(b.check_out_time.clone()),
            guest_count: Some(b.guest_count),
            notes: Some(notes.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_checked_in_guest_notes_with_full_form() {
        let mut b = booking();
        b.verification_status = VerificationStatus::Verified;
        b.checkin_status = CheckinStatus::CheckedIn;
        b.status = BookingStatus::Confirmed;

        let patch = resubmitted_form(&b, "late checkout requested");
        let plan = plan_update(&b, &patch, date("2025-05-11")).unwrap();
        assert!(plan.requote.is_none());
        assert_eq!(
            plan.changes,
            BookingChanges {
                notes: Some("late checkout requested".into()),
                ..Default::default()
            }
        );

        let more_guests = BookingPatch {
            guest_count: Some(3),
            ..patch
        };
        assert!(matches!(
            plan_update(&b, &more_guests, date("2025-05-11")),
            Err(ApiError::Transition(TransitionError::Rejected(_)))
        ));
    }

    #[test]
    fn test_completed_booking_takes_notes_with_full_form() {
        let mut b = booking();
        b.status = BookingStatus::Completed;
        b.checkin_status = CheckinStatus::CheckedOut;
        b.paid_status = PaidStatus::Paid;

        let patch = BookingPatch {
            status: Some(BookingStatus::Completed),
            ..resubmitted_form(&b, "left a review")
        };
        let plan = plan_update(&b, &patch, date("2025-05-20")).unwrap();
        assert_eq!(plan.changes.notes.as_deref(), Some("left a review"));
        assert_eq!(plan.changes.status, None);
    }

    #[test]
    fn test_terminal_booking_only_takes_notes() {
        let mut b = booking();
        b.status = BookingStatus::Cancelled;

        let notes = BookingPatch {
            notes: Some("refund issued".into()),
            ..Default::default()
        };
        assert!(plan_update(&b, &notes, today()).is_ok());

        let pay = BookingPatch {
            paid_status: Some(PaidStatus::Paid),
            ..Default::default()
        };
        assert!(matches!(
            plan_update(&b, &pay, today()),
            Err(ApiError::Transition(TransitionError::Terminal { .. }))
        ));
    }

    #[test]
    fn test_empty_patch_is_rejected() {
        assert!(matches!(
            plan_update(&booking(), &BookingPatch::default(), today()),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn test_cancel_rules() {
        assert!(check_cancellable(&booking()).is_ok());

        let mut occupied = booking();
        occupied.checkin_status = CheckinStatus::CheckedIn;
        assert!(check_cancellable(&occupied).is_err());

        let mut done = booking();
        done.status = BookingStatus::Completed;
        assert!(check_cancellable(&done).is_err());
    }

    #[test]
    fn test_reminder_windows() {
        let b = booking();
        assert!(check_checkin_reminder(&b, date("2025-05-09")).is_ok());
        assert!(check_checkin_reminder(&b, date("2025-05-10")).is_ok());
        assert!(check_checkin_reminder(&b, date("2025-05-07")).is_err());

        assert!(check_checkout_reminder(&b, date("2025-05-12")).is_ok());
        assert!(check_checkout_reminder(&b, date("2025-05-11")).is_err());

        let mut sent = booking();
        sent.checkout_reminder_sent = true;
        assert!(matches!(
            check_checkout_reminder(&sent, date("2025-05-12")),
            Err(ApiError::Conflict(_))
        ));
    }
}
