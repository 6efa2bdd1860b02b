//! Token endpoint

use axum::extract::State;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, ValidJson};
use crate::infrastructure::auth::JwtGenerator;

#[derive(Debug, Deserialize, Validate)]
pub struct TokenRequest {
    #[validate(length(min = 1, message = "Username is required"))]
    pub username: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: String,
    pub expires_in: u64,
}

/// POST /api/token
///
/// Exchanges credentials for a bearer JWT.
pub async fn obtain_token(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .services
        .users
        .authenticate(&request.username, &request.password)
        .await?;

    let token = state.jwt.generate(&user)?;
    info!(user_id = %user.id(), "Issued access token");

    Ok(Json(TokenResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: state.jwt.expiration_secs(),
    }))
}
