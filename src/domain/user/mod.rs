//! User domain
//!
//! Account entity, validation rules and the repository trait.

mod entity;
mod repository;
mod validation;

pub use entity::{NewUser, User, UserId};
pub use repository::UserRepository;
pub use validation::{validate_email, validate_password, validate_username, UserValidationError};
