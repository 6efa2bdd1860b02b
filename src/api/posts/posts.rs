use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use validator::Validate;

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, PageQuery, ValidJson};
use crate::domain::engagement::LikeToggle;
use crate::domain::ids::{PostId, UserId};
use crate::domain::pagination::PageEnvelope;
use crate::domain::post::Visibility;
use crate::infrastructure::services::{CreatePostRequest, PostView, UpdatePostRequest};

use super::parse_id;

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostBody {
    #[validate(length(min = 1, max = 255))]
    pub title: String,
    #[serde(default)]
    pub content: String,
    pub post_type: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub visibility: Option<Visibility>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePostBody {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub content: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub visibility: Option<Visibility>,
}

pub async fn list_posts(
    State(state): State<AppState>,
    RequireUser(viewer): RequireUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageEnvelope<PostView>>, ApiError> {
    let page = state.page(query)?;
    Ok(Json(state.services.posts.list(&viewer, page).await?))
}

pub async fn feed(
    State(state): State<AppState>,
    RequireUser(viewer): RequireUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageEnvelope<PostView>>, ApiError> {
    let page = state.page(query)?;
    Ok(Json(state.services.posts.feed(&viewer, page).await?))
}

pub async fn user_posts(
    State(state): State<AppState>,
    RequireUser(viewer): RequireUser,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageEnvelope<PostView>>, ApiError> {
    let owner: UserId = parse_id(&id)?;
    let page = state.page(query)?;
    Ok(Json(
        state.services.posts.user_posts(&viewer, owner, page).await?,
    ))
}

pub async fn create_post(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    ValidJson(body): ValidJson<CreatePostBody>,
) -> Result<(StatusCode, Json<PostView>), ApiError> {
    let post = state
        .services
        .posts
        .create(
            &actor,
            CreatePostRequest {
                title: body.title,
                content: body.content,
                post_type: body.post_type,
                metadata: body.metadata,
                visibility: body.visibility,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    State(state): State<AppState>,
    RequireUser(viewer): RequireUser,
    Path(id): Path<String>,
) -> Result<Json<PostView>, ApiError> {
    let id: PostId = parse_id(&id)?;
    Ok(Json(state.services.posts.get(&viewer, id).await?))
}

pub async fn update_post(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<String>,
    ValidJson(body): ValidJson<UpdatePostBody>,
) -> Result<Json<PostView>, ApiError> {
    let id: PostId = parse_id(&id)?;
    let post = state
        .services
        .posts
        .update(
            &actor,
            id,
            UpdatePostRequest {
                title: body.title,
                content: body.content,
                metadata: body.metadata,
                visibility: body.visibility,
            },
        )
        .await?;

    Ok(Json(post))
}

pub async fn delete_post(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: PostId = parse_id(&id)?;
    state.services.posts.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_post(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<String>,
) -> Result<Json<LikeToggle>, ApiError> {
    let id: PostId = parse_id(&id)?;
    Ok(Json(state.services.likes.toggle_post(&actor, id).await?))
}
