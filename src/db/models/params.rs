use chrono::NaiveDate;
use serde::{de, Deserialize, Deserializer, Serialize};

use super::{
    BookingStatus, CheckinStatus, OrderStatus, PaidStatus, PaymentStatus, VerificationStatus,
};

/// Accepts an integer id sent either as a JSON number or as a numeric string
fn int_or_string<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Int(value) => Ok(value),
        Raw::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("expected a numeric id, got '{text}'"))),
    }
}

/// Credentials for the admin and delivery login endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct LoginParams {
    pub username: String,
    pub password: String,
}

/// A prescription file received with an order
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: Option<String>,
    pub bytes: Vec<u8>,
}

/// Fields of the multipart order form
#[derive(Debug, Clone, Default)]
pub struct PlaceOrderForm {
    pub user_name: String,
    pub user_address: String,
    pub phone_number: String,
    pub medicine_id: Option<i32>,
    pub quantity: Option<i32>,
    pub prescription: Option<UploadedFile>,
}

/// Validated order placement handed to the database layer
#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub user_name: String,
    pub user_address: String,
    pub phone_number: String,
    pub medicine_id: i32,
    pub quantity: i32,
    pub prescription_photo: Option<String>,
}

/// Customer modification of a pending order
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModifyOrderParams {
    pub user_name: Option<String>,
    pub user_address: Option<String>,
    pub phone_number: Option<String>,
    pub medicine_id: Option<i32>,
    pub quantity: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenQuery {
    pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrderListQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<i32>,
    pub status: Option<OrderStatus>,
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BookingListQuery {
    #[serde(rename = "userId")]
    pub user_id: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerificationParams {
    pub verification_status: VerificationStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignParams {
    #[serde(
        alias = "delivery_boy_id",
        alias = "deliveryBoyId",
        deserialize_with = "int_or_string"
    )]
    pub delivery_agent_id: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageParams {
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MedicineParams {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub stock: i32,
    pub category_id: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MedicinePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
    pub category_id: Option<i32>,
}

/// Create or update a delivery agent. An empty password on update keeps the
/// current one.
#[derive(Debug, Clone, Deserialize)]
pub struct DeliveryAgentParams {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordParams {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaymentUpdateParams {
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateParams {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeedbackParams {
    #[serde(rename = "orderId", deserialize_with = "int_or_string")]
    pub order_id: i32,
    #[serde(rename = "deliveryBoyId", deserialize_with = "int_or_string")]
    pub delivery_agent_id: i32,
    pub rating: i32,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Availability query, spelled the way the booking screens send it
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityParams {
    pub room_type: String,
    pub check_in_date: String,
    #[serde(default)]
    pub check_in_time: Option<String>,
    pub check_out_date: String,
    #[serde(default)]
    pub check_out_time: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewBookingParams {
    pub guest_name: String,
    pub guest_phone: String,
    pub room_type: String,
    pub check_in_date: String,
    pub check_in_time: String,
    pub check_out_date: String,
    pub check_out_time: String,
    pub guest_count: i32,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Validated booking request handed to the database layer
#[derive(Debug, Clone)]
pub struct PlaceBooking {
    pub guest_name: String,
    pub guest_phone: String,
    pub room_type: String,
    pub check_in_date: NaiveDate,
    pub check_in_time: String,
    pub check_out_date: NaiveDate,
    pub check_out_time: String,
    pub guest_count: i32,
    pub notes: Option<String>,
}

/// Partial booking update from the admin booking screen. Every field is
/// optional and several may be sent at once, e.g. a checkout sends
/// `checkin_status` and `status` together.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookingPatch {
    pub room_type: Option<String>,
    pub room_number: Option<String>,
    pub check_in_date: Option<String>,
    pub check_in_time: Option<String>,
    pub check_out_date: Option<String>,
    pub check_out_time: Option<String>,
    pub guest_count: Option<i32>,
    pub notes: Option<String>,
    pub status: Option<BookingStatus>,
    pub paid_status: Option<PaidStatus>,
    pub verification_status: Option<VerificationStatus>,
    pub checkin_status: Option<CheckinStatus>,
}

/// Admin request to hand a customer an order or modification link
#[derive(Debug, Clone, Deserialize)]
pub struct IssueLinkParams {
    pub name: String,
    pub phone: String,
    #[serde(default, rename = "orderId", alias = "order_id")]
    pub order_id: Option<i32>,
    /// Send the link to the customer over WhatsApp as well
    #[serde(default)]
    pub notify: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_ids_accept_strings() {
        let params: FeedbackParams = serde_json::from_str(
            r#"{"orderId":"42","deliveryBoyId":7,"rating":5,"comment":"quick"}"#,
        )
        .unwrap();
        assert_eq!(params.order_id, 42);
        assert_eq!(params.delivery_agent_id, 7);

        let err = serde_json::from_str::<FeedbackParams>(
            r#"{"orderId":"abc","deliveryBoyId":7,"rating":5}"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_assign_accepts_client_spellings() {
        let a: AssignParams = serde_json::from_str(r#"{"delivery_boy_id":"3"}"#).unwrap();
        let b: AssignParams = serde_json::from_str(r#"{"deliveryBoyId":3}"#).unwrap();
        assert_eq!(a.delivery_agent_id, 3);
        assert_eq!(b.delivery_agent_id, 3);
    }

    #[test]
    fn test_booking_patch_reads_checkout_payload() {
        let patch: BookingPatch =
            serde_json::from_str(r#"{"checkin_status":"checked_out","status":"completed"}"#)
                .unwrap();
        assert_eq!(patch.checkin_status, Some(CheckinStatus::CheckedOut));
        assert_eq!(patch.status, Some(BookingStatus::Completed));
        assert!(patch.room_type.is_none());
    }
}
