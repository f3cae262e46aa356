//! REST API server — routes, quota enforcement, DTOs, and OpenAPI documentation.

pub mod dto;
pub mod error;
pub mod openapi;
pub mod quota_layer;
pub mod routes;
pub mod settings;
pub mod state;
