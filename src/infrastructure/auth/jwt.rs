//! Bearer token issue and validation (HS256)

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::domain::principal::Principal;
use crate::domain::user::{User, UserId};
use crate::domain::DomainError;

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (numeric user id)
    pub sub: String,
    pub username: String,
    pub is_staff: bool,
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
}

impl JwtClaims {
    pub fn new(user: &User, issuer: &str, expiration_secs: u64) -> Self {
        let now = Utc::now();
        let exp = now + Duration::seconds(expiration_secs as i64);

        Self {
            sub: user.id().to_string(),
            username: user.username().to_string(),
            is_staff: user.is_staff(),
            iss: issuer.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// The authenticated caller these claims describe
    pub fn principal(&self) -> Result<Principal, DomainError> {
        let user_id: UserId = self
            .sub
            .parse()
            .map_err(|_| DomainError::authentication("Token subject is not a user id"))?;

        Ok(Principal::new(user_id, self.is_staff))
    }
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub expiration_secs: u64,
}

impl JwtConfig {
    pub fn new(secret: impl Into<String>, issuer: impl Into<String>, expiration_secs: u64) -> Self {
        Self {
            secret: secret.into(),
            issuer: issuer.into(),
            expiration_secs,
        }
    }
}

/// Trait for JWT operations
pub trait JwtGenerator: Send + Sync + Debug {
    fn generate(&self, user: &User) -> Result<String, DomainError>;

    fn validate(&self, token: &str) -> Result<JwtClaims, DomainError>;

    fn expiration_secs(&self) -> u64;
}

#[derive(Clone)]
pub struct JwtService {
    config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.config.issuer)
            .field("expiration_secs", &self.config.expiration_secs)
            .field("secret", &"[hidden]")
            .finish()
    }
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }
}

impl JwtGenerator for JwtService {
    fn generate(&self, user: &User) -> Result<String, DomainError> {
        let claims = JwtClaims::new(user, &self.config.issuer, self.config.expiration_secs);

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| DomainError::internal(format!("Failed to generate JWT: {}", e)))
    }

    fn validate(&self, token: &str) -> Result<JwtClaims, DomainError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.config.issuer]);

        let token_data = decode::<JwtClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| DomainError::authentication(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    fn expiration_secs(&self) -> u64 {
        self.config.expiration_secs
    }
}
