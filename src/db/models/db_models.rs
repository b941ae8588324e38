use crate::schema::{
    admins, bookings, categories, delivery_agents, feedbacks, medicines, orders, room_types, users,
};
use chrono::{NaiveDate, NaiveDateTime};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use super::{
    BookingStatus, CheckinStatus, OrderStatus, PaidStatus, PaymentStatus, VerificationStatus,
};

#[derive(Clone, Debug, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = categories, primary_key(id))]
pub struct Category {
    pub id: i32,
    pub name: String,
    pub requires_prescription: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = medicines, primary_key(id))]
pub struct Medicine {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i32,
    pub category_id: i32,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = medicines)]
pub struct NewMedicine {
    pub name: String,
    pub description: String,
    pub price: f64,
    pub stock: i32,
    pub category_id: i32,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = medicines)]
pub struct MedicineChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub stock: Option<i32>,
    pub category_id: Option<i32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users, primary_key(id))]
pub struct User {
    pub id: i32,
    pub name: String,
    pub phone: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub phone: &'a str,
}

#[derive(Clone, Debug, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = orders, primary_key(id))]
pub struct Order {
    pub id: i32,
    pub user_id: i32,
    pub user_name: String,
    pub user_address: String,
    pub phone_number: String,
    pub medicine_id: i32,
    pub quantity: i32,
    pub total_price: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub verification_status: VerificationStatus,
    pub prescription_photo: Option<String>,
    pub delivery_agent_id: Option<i32>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = orders)]
pub struct NewOrder {
    pub user_id: i32,
    pub user_name: String,
    pub user_address: String,
    pub phone_number: String,
    pub medicine_id: i32,
    pub quantity: i32,
    pub total_price: f64,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub verification_status: VerificationStatus,
    pub prescription_photo: Option<String>,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = orders)]
pub struct OrderChanges {
    pub user_id: Option<i32>,
    pub user_name: Option<String>,
    pub user_address: Option<String>,
    pub phone_number: Option<String>,
    pub medicine_id: Option<i32>,
    pub quantity: Option<i32>,
    pub total_price: Option<f64>,
    pub prescription_photo: Option<String>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Clone, Debug, Serialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = delivery_agents, primary_key(id))]
pub struct DeliveryAgent {
    pub id: i32,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub phone: String,
    pub current_order_id: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = delivery_agents)]
pub struct NewDeliveryAgent {
    pub username: String,
    pub password_hash: String,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = delivery_agents)]
pub struct DeliveryAgentChanges {
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = feedbacks, primary_key(id))]
pub struct Feedback {
    pub id: i32,
    pub order_id: i32,
    pub delivery_agent_id: i32,
    pub rating: i32,
    pub comment: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = feedbacks)]
pub struct NewFeedback {
    pub order_id: i32,
    pub delivery_agent_id: i32,
    pub rating: i32,
    pub comment: String,
}

#[derive(Clone, Debug, Queryable, Selectable, Identifiable)]
#[diesel(table_name = admins, primary_key(id))]
pub struct Admin {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = admins)]
pub struct NewAdmin<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
}

#[derive(Clone, Debug, Serialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = room_types, primary_key(id))]
pub struct RoomType {
    #[serde(skip_serializing)]
    pub id: i32,
    #[serde(rename = "type")]
    pub type_name: String,
    pub price: f64,
    #[serde(skip_serializing)]
    pub total_rooms: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize, Queryable, Selectable, Identifiable)]
#[diesel(table_name = bookings, primary_key(id))]
pub struct Booking {
    pub id: i32,
    pub user_id: Option<i32>,
    pub guest_name: String,
    pub guest_phone: String,
    pub room_type: String,
    pub room_number: Option<String>,
    pub check_in_date: NaiveDate,
    pub check_in_time: String,
    pub check_out_date: NaiveDate,
    pub check_out_time: String,
    pub guest_count: i32,
    pub total_price: f64,
    pub status: BookingStatus,
    pub paid_status: PaidStatus,
    pub verification_status: VerificationStatus,
    pub checkin_status: CheckinStatus,
    pub notes: Option<String>,
    pub checkout_reminder_sent: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = bookings)]
pub struct NewBooking {
    pub user_id: Option<i32>,
    pub guest_name: String,
    pub guest_phone: String,
    pub room_type: String,
    pub check_in_date: NaiveDate,
    pub check_in_time: String,
    pub check_out_date: NaiveDate,
    pub check_out_time: String,
    pub guest_count: i32,
    pub total_price: f64,
    pub status: BookingStatus,
    pub paid_status: PaidStatus,
    pub verification_status: VerificationStatus,
    pub checkin_status: CheckinStatus,
    pub notes: Option<String>,
}

/// Column updates for a booking; `None` leaves a column untouched
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = bookings)]
pub struct BookingChanges {
    pub room_type: Option<String>,
    pub room_number: Option<String>,
    pub check_in_date: Option<NaiveDate>,
    pub check_in_time: Option<String>,
    pub check_out_date: Option<NaiveDate>,
    pub check_out_time: Option<String>,
    pub guest_count: Option<i32>,
    pub total_price: Option<f64>,
    pub status: Option<BookingStatus>,
    pub paid_status: Option<PaidStatus>,
    pub verification_status: Option<VerificationStatus>,
    pub checkin_status: Option<CheckinStatus>,
    pub notes: Option<String>,
}

impl BookingChanges {
    pub fn is_empty(&self) -> bool {
        *self == BookingChanges::default()
    }
}
