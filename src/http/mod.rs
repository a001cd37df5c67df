//! HTTP layer.
//!
//! The axum router and handlers that receive webhook deliveries, serve the
//! landing page, and expose health and metrics endpoints.

pub mod handler;

pub use handler::create_router;
