//! Web layer for imgdrop.
//!
//! Exposes the upload pipeline over HTTP: `POST /upload`, read-only serving
//! of stored files under `/uploads/`, the optional static front-end, a
//! health check and Swagger UI.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::create_router;
pub use server::WebServer;
