//! Data Transfer Objects for the web layer.

pub mod response;

pub use response::*;
