//! HTTP surface: router, middleware, extractors and handlers.

pub mod extractors;
pub mod handlers;
mod index;
mod init;
pub mod state;

pub use init::initialize_router;
pub use state::AppState;
