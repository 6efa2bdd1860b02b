//! Bearer JWT authentication

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::principal::Principal;
use crate::domain::DomainError;
use crate::infrastructure::auth::JwtGenerator;

/// Extractor that requires a valid JWT for a user that still exists
///
/// Staff status is read from the account, not the token, so a demoted
/// account loses its privileges before the token expires.
#[derive(Debug, Clone, Copy)]
pub struct RequireUser(pub Principal);

impl FromRequestParts<AppState> for RequireUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_jwt_token(&parts.headers)?;

        debug!("Validating JWT token");

        let claims = state
            .jwt
            .validate(&token)
            .map_err(|e| ApiError::unauthorized(format!("Invalid token: {}", e)))?;
        let principal = claims.principal()?;

        let user = match state.services.users.get(principal.user_id()).await {
            Ok(user) => user,
            Err(DomainError::NotFound { .. }) => {
                return Err(ApiError::unauthorized("User not found"));
            }
            Err(e) => return Err(e.into()),
        };

        Ok(RequireUser(Principal::new(user.id, user.is_staff)))
    }
}

pub fn extract_jwt_token(headers: &HeaderMap) -> Result<String, ApiError> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| ApiError::bad_request("Invalid Authorization header encoding"))?;

        if let Some(token) = auth_str.strip_prefix("Bearer ") {
            return Ok(token.trim().to_string());
        }
    }

    Err(ApiError::unauthorized(
        "Authentication required. Provide JWT token via 'Authorization: Bearer <token>' header",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_extract_bearer_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            "Bearer eyJhbGciOiJIUzI1NiJ9.test".parse().unwrap(),
        );

        assert_eq!(extract_jwt_token(&headers).unwrap(), "eyJhbGciOiJIUzI1NiJ9.test");
    }

    #[test]
    fn test_missing_token() {
        let err = extract_jwt_token(&HeaderMap::new()).unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_invalid_auth_scheme() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Basic dXNlcjpwYXNz".parse().unwrap());

        assert!(extract_jwt_token(&headers).is_err());
    }

    #[test]
    fn test_trimmed_token() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            "Bearer   token-with-spaces   ".parse().unwrap(),
        );

        assert_eq!(extract_jwt_token(&headers).unwrap(), "token-with-spaces");
    }
}
