//! API request handlers for the order desk.
//! Each module corresponds to one screen or client of the service.

// Public storefront
pub mod bookings; // Room availability and bookings, plus the admin booking desk
pub mod catalog; // Medicines, categories and room types
pub mod feedback; // Customer ratings of deliveries
pub mod health;
pub mod links; // Order and modification links
pub mod orders; // Order placement and customer modification

// Staff
pub mod admin; // Admin login, dashboard and customers
pub mod admin_orders; // Order review, assignment and messaging
pub mod delivery_agents; // Delivery agent management
pub mod delivery_portal; // Endpoints used by the delivery agents themselves
pub mod medicines; // Medicine catalog management

pub(crate) use admin::{admin_login, dashboard_stats, list_users};
pub(crate) use admin_orders::{
    assign_order, cancel_order, list_orders, message_customer, set_order_verification,
};
pub(crate) use bookings::{
    cancel_booking, check_availability, create_booking, get_booking, list_bookings,
    send_checkin_reminder, send_checkout_reminder, update_booking,
};
pub(crate) use catalog::{list_categories, list_medicines, list_room_types};
pub(crate) use delivery_agents::{
    available_delivery_agents, create_delivery_agent, delete_delivery_agent,
    list_delivery_agents, update_delivery_agent,
};
pub(crate) use delivery_portal::{
    change_password, current_order, delivery_login, delivery_profile, update_order_status,
    update_payment_status,
};
pub(crate) use feedback::{list_feedbacks, submit_feedback};
pub(crate) use health::health_check;
pub(crate) use links::{issue_link, validate_token};
pub(crate) use medicines::{
    admin_list_medicines, create_medicine, delete_medicine, update_medicine,
};
pub(crate) use orders::{get_order, modify_order, place_order};

use chrono::{NaiveDate, Utc};

/// Calendar day used for stay and reminder rules
pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}
