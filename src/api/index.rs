use axum::Json;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// Static JSON response for the index endpoint
static INDEX_JSON: OnceLock<Value> = OnceLock::new();

fn endpoint(path: &str, method: &str, auth: &str, description: &str, params: Value) -> Value {
    json!({
        "path": path,
        "method": method,
        "auth": auth,
        "description": description,
        "params": params
    })
}

fn param(kind: &str, required: bool, description: &str) -> Value {
    json!({
        "type": kind,
        "required": required,
        "description": description
    })
}

/// Handler for the index endpoint that provides API documentation
///
/// # Endpoint: GET /
///
/// # Returns
/// * `Json<Value>` - JSON response containing API endpoint documentation
pub fn index() -> Json<Value> {
    let value = INDEX_JSON.get_or_init(|| {
        let endpoints = vec![
            endpoint(
                "/",
                "GET",
                "public",
                "API endpoint documentation",
                json!({}),
            ),
            endpoint(
                "/health",
                "GET",
                "public",
                "Database, Redis and background job status",
                json!({}),
            ),
            endpoint(
                "/medicines",
                "GET",
                "public",
                "Medicines with their category and prescription requirement",
                json!({}),
            ),
            endpoint(
                "/categories",
                "GET",
                "public",
                "Medicine categories",
                json!({}),
            ),
            endpoint(
                "/validate-token",
                "GET",
                "public",
                "Resolve an order or modification link",
                json!({
                    "token": param("string", true, "Link token")
                }),
            ),
            endpoint(
                "/order",
                "POST",
                "public",
                "Place an order (multipart/form-data)",
                json!({
                    "user_name": param("string", true, "Customer name"),
                    "user_address": param("string", true, "Delivery address"),
                    "phone_number": param("string", true, "Customer phone, 10 to 15 digits"),
                    "medicine_id": param("integer", true, "Ordered medicine"),
                    "quantity": param("integer", true, "Between 1 and 100"),
                    "prescription": param("file", false, "Required for prescription-only categories")
                }),
            ),
            endpoint(
                "/order/:id",
                "GET",
                "public",
                "Order with medicine, agent and allowed next states",
                json!({}),
            ),
            endpoint(
                "/order/:id",
                "PATCH",
                "public",
                "Change a pending order through its modification link",
                json!({
                    "token": param("string", true, "Modification link token (query)"),
                    "user_name": param("string", false, "Customer name"),
                    "user_address": param("string", false, "Delivery address"),
                    "phone_number": param("string", false, "Customer phone"),
                    "medicine_id": param("integer", false, "Replacement medicine"),
                    "quantity": param("integer", false, "New quantity")
                }),
            ),
            endpoint(
                "/api/feedback",
                "POST",
                "public",
                "Rate the delivery of a delivered order",
                json!({
                    "orderId": param("integer", true, "Delivered order"),
                    "deliveryBoyId": param("integer", true, "Agent who delivered it"),
                    "rating": param("integer", true, "1 to 5"),
                    "comment": param("string", false, "Free text")
                }),
            ),
            endpoint(
                "/api/room-types",
                "GET",
                "public",
                "Room types with nightly price",
                json!({}),
            ),
            endpoint(
                "/api/rooms/availability",
                "POST",
                "public",
                "Remaining rooms and price for a stay",
                json!({
                    "roomType": param("string", true, "Room type name"),
                    "checkInDate": param("string", true, "YYYY-MM-DD"),
                    "checkOutDate": param("string", true, "YYYY-MM-DD, after check-in"),
                    "checkInTime": param("string", false, "HH:MM"),
                    "checkOutTime": param("string", false, "HH:MM")
                }),
            ),
            endpoint(
                "/api/bookings",
                "POST",
                "public",
                "Book a room",
                json!({
                    "guest_name": param("string", true, "Guest name"),
                    "guest_phone": param("string", true, "Guest phone"),
                    "room_type": param("string", true, "Room type name"),
                    "check_in_date": param("string", true, "YYYY-MM-DD"),
                    "check_in_time": param("string", true, "HH:MM"),
                    "check_out_date": param("string", true, "YYYY-MM-DD"),
                    "check_out_time": param("string", true, "HH:MM"),
                    "guest_count": param("integer", true, "At least 1"),
                    "notes": param("string", false, "Requests for the front desk")
                }),
            ),
            endpoint(
                "/api/bookings/:id",
                "GET",
                "public",
                "Booking details",
                json!({}),
            ),
            endpoint(
                "/uploads/*",
                "GET",
                "public",
                "Uploaded prescription files",
                json!({}),
            ),
            endpoint(
                "/admin/login",
                "POST",
                "public",
                "Admin sign-in, returns a bearer token",
                json!({
                    "username": param("string", true, "Admin username"),
                    "password": param("string", true, "Admin password")
                }),
            ),
            endpoint(
                "/admin/stats",
                "GET",
                "admin",
                "Order count, delivered revenue and the five latest orders",
                json!({}),
            ),
            endpoint(
                "/admin/orders",
                "GET",
                "admin",
                "Orders with optional filters",
                json!({
                    "userId": param("integer", false, "Customer id"),
                    "status": param("string", false, "Order status"),
                    "search": param("string", false, "Matches customer name, phone or medicine")
                }),
            ),
            endpoint(
                "/admin/orders/:id",
                "DELETE",
                "admin",
                "Cancel an order, restoring stock",
                json!({}),
            ),
            endpoint(
                "/admin/orders/:id/verification",
                "PUT",
                "admin",
                "Set the verification outcome",
                json!({
                    "verification_status": param("string", true, "pending, verified or rejected")
                }),
            ),
            endpoint(
                "/admin/orders/:id/assign",
                "POST",
                "admin",
                "Assign a verified order to a free agent",
                json!({
                    "delivery_agent_id": param("integer", true, "Agent id, also accepted as delivery_boy_id")
                }),
            ),
            endpoint(
                "/admin/orders/:id/message",
                "POST",
                "admin",
                "Send the customer a WhatsApp message",
                json!({
                    "message": param("string", true, "Text to send")
                }),
            ),
            endpoint(
                "/admin/medicines",
                "GET",
                "admin",
                "Medicine catalog",
                json!({}),
            ),
            endpoint(
                "/admin/medicines",
                "POST",
                "admin",
                "Add a medicine",
                json!({
                    "name": param("string", true, "Medicine name"),
                    "description": param("string", false, "Description"),
                    "price": param("number", true, "Unit price"),
                    "stock": param("integer", true, "Units in stock"),
                    "category_id": param("integer", true, "Category")
                }),
            ),
            endpoint(
                "/admin/medicines/:id",
                "PATCH",
                "admin",
                "Change medicine fields",
                json!({}),
            ),
            endpoint(
                "/admin/medicines/:id",
                "DELETE",
                "admin",
                "Remove a medicine without orders",
                json!({}),
            ),
            endpoint(
                "/admin/users",
                "GET",
                "admin",
                "Customers",
                json!({
                    "search": param("string", false, "Matches name or phone")
                }),
            ),
            endpoint(
                "/admin/delivery-boys",
                "GET",
                "admin",
                "Delivery agents with their current order",
                json!({}),
            ),
            endpoint(
                "/admin/delivery-boys",
                "POST",
                "admin",
                "Add a delivery agent",
                json!({
                    "username": param("string", true, "Login name"),
                    "password": param("string", true, "At least 6 characters"),
                    "name": param("string", true, "Display name"),
                    "phone": param("string", true, "Phone")
                }),
            ),
            endpoint(
                "/admin/delivery-boys/available",
                "GET",
                "admin",
                "Agents without a current order",
                json!({}),
            ),
            endpoint(
                "/admin/delivery-boys/:id",
                "PUT",
                "admin",
                "Update an agent, an empty password keeps the current one",
                json!({}),
            ),
            endpoint(
                "/admin/delivery-boys/:id",
                "DELETE",
                "admin",
                "Remove an agent without a current order",
                json!({}),
            ),
            endpoint(
                "/admin/feedbacks",
                "GET",
                "admin",
                "Delivery ratings",
                json!({}),
            ),
            endpoint(
                "/admin/links",
                "POST",
                "admin",
                "Issue an order or modification link",
                json!({
                    "name": param("string", true, "Customer name"),
                    "phone": param("string", true, "Customer phone"),
                    "orderId": param("integer", false, "Order the link may modify"),
                    "notify": param("boolean", false, "Also send the link over WhatsApp")
                }),
            ),
            endpoint(
                "/api/admin/bookings",
                "GET",
                "admin",
                "Bookings",
                json!({
                    "userId": param("integer", false, "Customer id")
                }),
            ),
            endpoint(
                "/api/admin/bookings/:id/update",
                "PATCH",
                "admin",
                "Verify, take payment, check in or out, or move a booking",
                json!({}),
            ),
            endpoint(
                "/api/admin/bookings/:id",
                "DELETE",
                "admin",
                "Cancel a booking",
                json!({}),
            ),
            endpoint(
                "/api/admin/bookings/:id/notify",
                "POST",
                "admin",
                "Send the check-in reminder",
                json!({}),
            ),
            endpoint(
                "/api/admin/bookings/:id/checkout-notify",
                "POST",
                "admin",
                "Send the checkout reminder",
                json!({}),
            ),
            endpoint(
                "/delivery/login",
                "POST",
                "public",
                "Delivery agent sign-in",
                json!({
                    "username": param("string", true, "Agent username"),
                    "password": param("string", true, "Agent password")
                }),
            ),
            endpoint(
                "/delivery/profile",
                "GET",
                "delivery",
                "Agent profile with delivery count and average rating",
                json!({}),
            ),
            endpoint(
                "/delivery/change-password",
                "PUT",
                "delivery",
                "Change the agent password",
                json!({
                    "currentPassword": param("string", true, "Current password"),
                    "newPassword": param("string", true, "At least 6 characters")
                }),
            ),
            endpoint(
                "/delivery/current-order",
                "GET",
                "delivery",
                "The order the agent is carrying",
                json!({}),
            ),
            endpoint(
                "/delivery/orders/:id/payment",
                "PUT",
                "delivery",
                "Record payment for the agent's order",
                json!({
                    "payment_status": param("string", true, "pending or paid")
                }),
            ),
            endpoint(
                "/delivery/orders/:id/status",
                "PUT",
                "delivery",
                "Mark the agent's order dispatched or delivered",
                json!({
                    "status": param("string", true, "dispatched or delivered")
                }),
            ),
        ];
        json!({ "endpoints": endpoints })
    });

    Json(value.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_lists_every_endpoint_once() {
        let Json(value) = index();
        let endpoints = value["endpoints"].as_array().unwrap();
        let mut seen = std::collections::HashSet::new();
        for endpoint in endpoints {
            let key = format!("{} {}", endpoint["method"], endpoint["path"]);
            assert!(seen.insert(key.clone()), "duplicate entry {key}");
        }
        assert!(seen.contains("\"POST\" \"/order\""));
    }
}
