//! API request and response data models.
//!
//! These are distinct from database models so the API contract and storage
//! representation can evolve independently. All models carry `utoipa`
//! annotations for the generated OpenAPI document.

pub mod auth;
pub mod links;
