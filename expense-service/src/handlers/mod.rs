pub mod access;
pub mod admin;
pub mod branches;
pub mod expense;
pub mod health;
pub mod user;

use serde::Serialize;

/// Error envelope returned by validation rejections.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
