//! Database models and types module.
//! This module contains all the database-related structs, enums, and type definitions.

mod db_models; // Core database rows and changesets
mod params; // Request payloads
mod responses; // API response models
mod status; // Status enums stored as text

// Re-export all models for easier access
pub use db_models::*;
pub use params::*;
pub use responses::*;
pub use status::*;
