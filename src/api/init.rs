use axum::{
    error_handling::HandleErrorLayer,
    http::{Method, StatusCode},
    routing::{delete, get, patch, post, put},
    BoxError, Router,
};
use std::time::Duration;
use tower::{buffer::BufferLayer, limit::RateLimitLayer, ServiceBuilder};
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use super::handlers::orders::UPLOADS_ROUTE;
use super::{handlers::*, index::index, state::AppState};

pub fn initialize_router(state: AppState) -> Router {
    let error_handler = || {
        ServiceBuilder::new().layer(HandleErrorLayer::new(|err: BoxError| async move {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Unhandled error: {}", err),
            )
        }))
    };

    let global_rate_limit = |req_per_sec: u64| {
        ServiceBuilder::new()
            .layer(error_handler())
            .layer(BufferLayer::new(1024))
            .layer(RateLimitLayer::new(req_per_sec, Duration::from_secs(1)))
    };

    let rate_limit_per_ip = |timeout: u64, limit: u32| {
        let config = Box::new(
            GovernorConfigBuilder::default()
                .per_second(timeout)
                .burst_size(limit)
                .use_headers()
                .key_extractor(SmartIpKeyExtractor)
                .finish()
                .unwrap(),
        );

        ServiceBuilder::new()
            .layer(error_handler())
            .layer(GovernorLayer {
                config: Box::leak(config),
            })
    };

    let cors = || {
        CorsLayer::new()
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
            ])
            .allow_headers(Any)
            .allow_origin(Any)
    };

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().include_headers(true))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        // Sign-in and public writes (per-IP limits)
        .route("/admin/login", post(admin_login))
        .route("/delivery/login", post(delivery_login))
        .route("/order", post(place_order))
        .route("/api/bookings", post(create_booking))
        .route("/api/feedback", post(submit_feedback))
        .layer(global_rate_limit(50).layer(rate_limit_per_ip(2, 10)))
        // Storefront
        .route("/medicines", get(list_medicines))
        .route("/categories", get(list_categories))
        .route("/validate-token", get(validate_token))
        .route("/order/:id", get(get_order).patch(modify_order))
        .route("/api/room-types", get(list_room_types))
        .route("/api/rooms/availability", post(check_availability))
        .route("/api/bookings/:id", get(get_booking))
        // Admin
        .route("/admin/stats", get(dashboard_stats))
        .route("/admin/users", get(list_users))
        .route("/admin/orders", get(list_orders))
        .route("/admin/orders/:id", delete(cancel_order))
        .route("/admin/orders/:id/verification", put(set_order_verification))
        .route("/admin/orders/:id/assign", post(assign_order))
        .route("/admin/orders/:id/message", post(message_customer))
        .route("/admin/medicines", get(admin_list_medicines).post(create_medicine))
        .route(
            "/admin/medicines/:id",
            patch(update_medicine).delete(delete_medicine),
        )
        .route(
            "/admin/delivery-boys",
            get(list_delivery_agents).post(create_delivery_agent),
        )
        .route(
            "/admin/delivery-boys/available",
            get(available_delivery_agents),
        )
        .route(
            "/admin/delivery-boys/:id",
            put(update_delivery_agent).delete(delete_delivery_agent),
        )
        .route("/admin/feedbacks", get(list_feedbacks))
        .route("/admin/links", post(issue_link))
        .route("/api/admin/bookings", get(list_bookings))
        .route("/api/admin/bookings/:id", delete(cancel_booking))
        .route("/api/admin/bookings/:id/update", patch(update_booking))
        .route("/api/admin/bookings/:id/notify", post(send_checkin_reminder))
        .route(
            "/api/admin/bookings/:id/checkout-notify",
            post(send_checkout_reminder),
        )
        // Delivery portal
        .route("/delivery/profile", get(delivery_profile))
        .route("/delivery/change-password", put(change_password))
        .route("/delivery/current-order", get(current_order))
        .route("/delivery/orders/:id/payment", put(update_payment_status))
        .route("/delivery/orders/:id/status", put(update_order_status))
        .layer(global_rate_limit(10000).layer(rate_limit_per_ip(1, 100)))
        .nest_service(UPLOADS_ROUTE, uploads)
        // Base route
        .route("/", get(|| async { index() }))
        .route("/health", get(health_check))
        // Apply common middleware
        .layer(cors())
        .layer(CompressionLayer::new().zstd(true))
        .layer(trace_layer)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::Role;
    use axum::{
        body::Body,
        http::{header, Request},
    };
    use serde_json::Value;
    use tower::ServiceExt;

    fn request(method: Method, uri: &str) -> axum::http::request::Builder {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-forwarded-for", "127.0.0.1")
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_index_is_served() {
        let app = initialize_router(AppState::for_tests());
        let (status, body) = send(
            app,
            request(Method::GET, "/").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["endpoints"].as_array().is_some_and(|e| !e.is_empty()));
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        let app = initialize_router(AppState::for_tests());
        let (status, body) = send(
            app,
            request(Method::GET, "/admin/stats").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_delivery_token_cannot_reach_admin_routes() {
        let state = AppState::for_tests();
        let token = state.tokens.issue(7, Role::Delivery).unwrap();
        let app = initialize_router(state);

        let (status, body) = send(
            app,
            request(Method::GET, "/admin/orders")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_garbage_token_is_unauthorized() {
        let app = initialize_router(AppState::for_tests());
        let (status, _) = send(
            app,
            request(Method::GET, "/delivery/profile")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_availability_rejects_bad_dates() {
        let app = initialize_router(AppState::for_tests());
        let payload = r#"{"roomType":"Deluxe","checkInDate":"tomorrow","checkOutDate":"2030-01-02"}"#;
        let (status, body) = send(
            app,
            request(Method::POST, "/api/rooms/availability")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }

    #[tokio::test]
    async fn test_malformed_link_is_unauthorized() {
        let app = initialize_router(AppState::for_tests());
        let (status, _) = send(
            app.clone(),
            request(Method::GET, "/validate-token?token=short")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(
            app,
            request(Method::PATCH, "/order/1?token=short")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_malformed_requests_get_json_errors() {
        let state = AppState::for_tests();
        let token = state.tokens.issue(3, Role::Delivery).unwrap();
        let app = initialize_router(state);

        let (status, body) = send(
            app.clone(),
            request(Method::PUT, "/delivery/orders/1/status")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"status":"shipped"}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));

        let (status, body) = send(
            app.clone(),
            request(Method::PUT, "/delivery/orders/abc/status")
                .header(header::AUTHORIZATION, format!("Bearer {token}"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"status":"delivered"}"#))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");

        let (status, body) = send(
            app,
            request(Method::PATCH, "/order/1")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
    }
}
