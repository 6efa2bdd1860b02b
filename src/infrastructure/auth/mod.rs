//! Authentication infrastructure - bearer tokens and password hashing

mod jwt;
mod password;

pub use jwt::{JwtClaims, JwtConfig, JwtGenerator, JwtService};
pub use password::{Argon2Hasher, PasswordHasher};
