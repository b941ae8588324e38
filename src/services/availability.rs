use chrono::NaiveDate;

use crate::db::models::{AvailabilityResponse, RoomType};
use crate::errors::ApiError;
use crate::validation::parse_date;
use crate::Result;

/// A requested stay, check-in date inclusive and check-out date exclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StayRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

impl StayRange {
    pub fn new(check_in: NaiveDate, check_out: NaiveDate, today: NaiveDate) -> Result<Self> {
        if check_in < today {
            return Err(ApiError::Validation(
                "Check-in date cannot be in the past".to_string(),
            ));
        }
        if check_out <= check_in {
            return Err(ApiError::Validation(
                "Check-out date must be after the check-in date".to_string(),
            ));
        }
        Ok(Self {
            check_in,
            check_out,
        })
    }

    /// Parses `YYYY-MM-DD` dates as sent by the booking forms
    pub fn parse(check_in: &str, check_out: &str, today: NaiveDate) -> Result<Self> {
        Self::new(
            parse_date("check-in date", check_in).map_err(ApiError::Validation)?,
            parse_date("check-out date", check_out).map_err(ApiError::Validation)?,
            today,
        )
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days().max(1)
    }

}

pub fn stay_price(room: &RoomType, range: &StayRange) -> f64 {
    room.price * range.nights() as f64
}

/// Quote for a stay given how many bookings of the room type overlap it
pub fn quote(room: &RoomType, range: &StayRange, overlapping: i64) -> AvailabilityResponse {
    let remaining_rooms = (i64::from(room.total_rooms) - overlapping).max(0);
    AvailabilityResponse {
        available: remaining_rooms > 0,
        remaining_rooms,
        room_price_per_day: room.price,
        estimated_total_price: stay_price(room, range),
        number_of_days: range.nights(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn deluxe() -> RoomType {
        RoomType {
            id: 1,
            type_name: "Deluxe".into(),
            price: 2500.0,
            total_rooms: 3,
        }
    }

    #[test]
    fn test_range_validation() {
        let today = date("2025-03-10");
        assert!(StayRange::parse("2025-03-10", "2025-03-12", today).is_ok());
        assert!(StayRange::parse("2025-03-09", "2025-03-12", today).is_err());
        assert!(StayRange::parse("2025-03-12", "2025-03-12", today).is_err());
        assert!(StayRange::parse("2025-03-12", "2025-03-11", today).is_err());
        assert!(StayRange::parse("12/03/2025", "2025-03-14", today).is_err());
    }

    #[test]
    fn test_nights_and_price() {
        let today = date("2025-03-01");
        let range = StayRange::parse("2025-03-10", "2025-03-13", today).unwrap();
        assert_eq!(range.nights(), 3);
        assert_eq!(stay_price(&deluxe(), &range), 7500.0);
    }

    #[test]
    fn test_quote_counts_remaining_rooms() {
        let today = date("2025-03-01");
        let range = StayRange::parse("2025-03-10", "2025-03-12", today).unwrap();

        let open = quote(&deluxe(), &range, 1);
        assert_eq!(
            open,
            AvailabilityResponse {
                available: true,
                remaining_rooms: 2,
                room_price_per_day: 2500.0,
                estimated_total_price: 5000.0,
                number_of_days: 2,
            }
        );

        let full = quote(&deluxe(), &range, 3);
        assert!(!full.available);
        assert_eq!(full.remaining_rooms, 0);

        let overbooked = quote(&deluxe(), &range, 5);
        assert_eq!(overbooked.remaining_rooms, 0);
    }

    #[test]
    fn test_quote_serializes_camel_case() {
        let today = date("2025-03-01");
        let range = StayRange::parse("2025-03-10", "2025-03-11", today).unwrap();
        let json = serde_json::to_value(quote(&deluxe(), &range, 0)).unwrap();
        assert_eq!(json["remainingRooms"], 3);
        assert_eq!(json["roomPricePerDay"], 2500.0);
        assert_eq!(json["numberOfDays"], 1);
    }
}
