use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{Booking, DeliveryAgent, Medicine, Order, OrderStatus, PaymentStatus};

/// General API response status
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Operation completed successfully
    Success,
    /// Operation encountered an error
    Error,
}

/// Standard error response structure
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Status will always be Error for this type
    pub status: Status,
    /// Detailed error message explaining what went wrong
    pub error: String,
}

/// Acknowledgement for mutations that have nothing else to return
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub status: Status,
    pub message: String,
}

impl MessageResponse {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: Status::Success,
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Agent fields returned to the delivery portal on login
#[derive(Debug, Serialize, Deserialize)]
pub struct DeliveryUser {
    pub id: i32,
    pub username: String,
    pub name: String,
    pub phone: String,
}

impl From<&DeliveryAgent> for DeliveryUser {
    fn from(agent: &DeliveryAgent) -> Self {
        Self {
            id: agent.id,
            username: agent.username.clone(),
            name: agent.name.clone(),
            phone: agent.phone.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeliveryLoginResponse {
    pub token: String,
    pub user: DeliveryUser,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaceOrderResponse {
    #[serde(rename = "orderId")]
    pub order_id: i32,
    /// Link the customer can use to change the order while it is pending
    pub modify_link: Option<String>,
}

/// Reply to a customer's order modification; the modify page checks `success`
#[derive(Debug, Serialize)]
pub struct ModifyOrderResponse {
    pub success: bool,
    pub order: Order,
}

impl ModifyOrderResponse {
    pub fn new(order: Order) -> Self {
        Self {
            success: true,
            order,
        }
    }
}

/// An order joined with its medicine and, when assigned, its agent
#[derive(Debug, Serialize)]
pub struct OrderDetails {
    #[serde(flatten)]
    pub order: Order,
    pub medicine_name: String,
    pub medicine_price: f64,
    pub prescription_verified: bool,
    pub delivery_agent_name: Option<String>,
    /// Lifecycle states the order may move to next
    pub allowed_transitions: Vec<OrderStatus>,
}

/// Entry of the dashboard's recent order list
#[derive(Debug, Serialize)]
pub struct RecentOrder {
    pub id: i32,
    pub user_name: String,
    pub created_at: NaiveDateTime,
    pub medicine_name: String,
    pub total_price: f64,
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_orders: i64,
    /// Sum of delivered (and therefore paid) orders
    pub total_revenue: f64,
    pub recent_orders: Vec<RecentOrder>,
}

#[derive(Debug, Serialize)]
pub struct MedicineWithCategory {
    #[serde(flatten)]
    pub medicine: Medicine,
    pub category_name: String,
    pub requires_prescription: bool,
}

/// Delivery agent as listed on the admin screen, with the order it carries
#[derive(Debug, Serialize)]
pub struct DeliveryAgentView {
    pub id: i32,
    pub username: String,
    pub name: String,
    pub phone: String,
    pub current_order_id: Option<i32>,
    pub order_status: Option<OrderStatus>,
    pub customer_name: Option<String>,
    pub delivery_address: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeliveryProfile {
    pub id: i32,
    pub username: String,
    pub name: String,
    pub phone: String,
    pub total_deliveries: i64,
    pub avg_rating: f64,
}

/// The order a delivery agent is currently carrying
#[derive(Debug, Serialize)]
pub struct DeliveryOrderView {
    pub id: i32,
    pub user_name: String,
    pub user_address: String,
    pub phone_number: String,
    pub medicine_name: String,
    pub quantity: i32,
    pub total_price: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct FeedbackView {
    pub id: i32,
    pub order_id: i32,
    pub delivery_boy_id: i32,
    pub delivery_boy_name: String,
    pub rating: i32,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityResponse {
    pub available: bool,
    pub remaining_rooms: i64,
    pub room_price_per_day: f64,
    pub estimated_total_price: f64,
    pub number_of_days: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BookingCreatedResponse {
    pub id: i32,
    pub total_price: f64,
    pub message: String,
}

pub const BOOKING_UPDATED: &str = "Booking updated successfully";

/// The booking edit screen matches on the exact `message` text
#[derive(Debug, Serialize)]
pub struct BookingUpdatedResponse {
    pub message: String,
    pub booking: Booking,
}

impl BookingUpdatedResponse {
    pub fn new(booking: Booking) -> Self {
        Self {
            message: BOOKING_UPDATED.to_string(),
            booking,
        }
    }
}

/// Result of relaying a WhatsApp message
#[derive(Debug, Serialize, Deserialize)]
pub struct RelayResponse {
    /// False when the relay is not configured and the message was only logged
    pub sent: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IssuedLinkResponse {
    pub token: String,
    pub url: String,
    pub expires_in_seconds: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{
        BookingStatus, CheckinStatus, PaidStatus, VerificationStatus,
    };
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_modify_order_response_carries_success_flag() {
        let now = Utc::now().naive_utc();
        let order = Order {
            id: 12,
            user_id: 4,
            user_name: "Kiran".into(),
            user_address: "12 Lake Road".into(),
            phone_number: "9000000000".into(),
            medicine_id: 2,
            quantity: 3,
            total_price: 120.0,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            verification_status: VerificationStatus::Pending,
            prescription_photo: None,
            delivery_agent_id: None,
            created_at: now,
            updated_at: now,
        };

        let body = serde_json::to_value(ModifyOrderResponse::new(order)).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["order"]["id"], 12);
        assert_eq!(body["order"]["quantity"], 3);
    }

    #[test]
    fn test_booking_updated_response_message() {
        let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let booking = Booking {
            id: 7,
            user_id: None,
            guest_name: "Farah".into(),
            guest_phone: "9811122233".into(),
            room_type: "Deluxe".into(),
            room_number: Some("204".into()),
            check_in_date: date("2025-05-10"),
            check_in_time: "14:00".into(),
            check_out_date: date("2025-05-12"),
            check_out_time: "11:00".into(),
            guest_count: 2,
            total_price: 5000.0,
            status: BookingStatus::Confirmed,
            paid_status: PaidStatus::Unpaid,
            verification_status: VerificationStatus::Verified,
            checkin_status: CheckinStatus::NotCheckedIn,
            notes: Some("late arrival".into()),
            checkout_reminder_sent: false,
            created_at: Utc::now().naive_utc(),
        };

        let body = serde_json::to_value(BookingUpdatedResponse::new(booking)).unwrap();
        assert_eq!(body["message"], "Booking updated successfully");
        assert_eq!(body["booking"]["id"], 7);
        assert_eq!(body["booking"]["room_number"], "204");
    }
}
