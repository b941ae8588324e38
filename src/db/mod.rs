pub mod admins;
pub mod bookings;
pub mod connection;
pub mod delivery;
pub mod feedback;
pub mod medicines;
pub mod models;
pub mod orders;
pub mod redis;
pub mod rooms;
pub mod users;

pub use connection::DbClient;
