//! Request/response types shared by handlers

mod error;
mod json;
mod pagination;

pub use error::{ApiError, ApiErrorDetail, ApiErrorResponse, ApiErrorType};
pub use json::{Json, ValidJson};
pub use pagination::PageQuery;
