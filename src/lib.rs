//! imgdrop - anonymous image upload service
//!
//! Accepts a single image per multipart request, validates its declared type
//! and size, stores it under a random name and serves it back read-only.

pub mod config;
pub mod error;
pub mod logging;
pub mod upload;
pub mod web;

pub use config::Config;
pub use error::{ImgdropError, Result};
pub use upload::{
    IncomingFile, StorageRoot, StoredFile, UploadError, UploadErrorKind, UploadPipeline,
    ValidationPolicy,
};
pub use web::WebServer;
