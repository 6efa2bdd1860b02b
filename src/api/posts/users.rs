use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, PageQuery, ValidJson};
use crate::domain::ids::UserId;
use crate::domain::pagination::PageEnvelope;
use crate::infrastructure::services::{CreateUserRequest, UpdateUserRequest, UserView};

use super::parse_id;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserBody {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email(message = "Email address is not valid"))]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[serde(default)]
    pub is_staff: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserBody {
    #[validate(length(min = 1, max = 150))]
    pub username: Option<String>,
    #[validate(email(message = "Email address is not valid"))]
    pub email: Option<String>,
    #[validate(length(min = 8, max = 128))]
    pub password: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    RequireUser(_viewer): RequireUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageEnvelope<UserView>>, ApiError> {
    let page = state.page(query)?;
    Ok(Json(state.services.users.list(page).await?))
}

pub async fn create_user(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    ValidJson(body): ValidJson<CreateUserBody>,
) -> Result<(StatusCode, Json<UserView>), ApiError> {
    let user = state
        .services
        .users
        .create(
            &actor,
            CreateUserRequest {
                username: body.username,
                email: body.email,
                password: body.password,
                is_staff: body.is_staff,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_user(
    State(state): State<AppState>,
    RequireUser(_viewer): RequireUser,
    Path(id): Path<String>,
) -> Result<Json<UserView>, ApiError> {
    let id: UserId = parse_id(&id)?;
    Ok(Json(state.services.users.get(id).await?))
}

pub async fn update_user(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<String>,
    ValidJson(body): ValidJson<UpdateUserBody>,
) -> Result<Json<UserView>, ApiError> {
    let id: UserId = parse_id(&id)?;
    let user = state
        .services
        .users
        .update(
            &actor,
            id,
            UpdateUserRequest {
                username: body.username,
                email: body.email,
                password: body.password,
            },
        )
        .await?;

    Ok(Json(user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: UserId = parse_id(&id)?;
    state.services.users.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
