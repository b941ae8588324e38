pub mod auth;
pub mod availability;
pub mod background_jobs;
pub mod booking_flow;
pub mod links;
pub mod order_flow;
pub mod whatsapp;
