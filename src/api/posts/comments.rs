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
use crate::domain::ids::{CommentId, PostId, UserId};
use crate::domain::pagination::PageEnvelope;
use crate::infrastructure::services::CommentView;

use super::parse_id;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentBody {
    pub post: PostId,
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentBody {
    #[validate(length(min = 1, max = 2000))]
    pub text: String,
}

type CommentPage = Json<PageEnvelope<CommentView>>;

pub async fn list_comments(
    State(state): State<AppState>,
    RequireUser(_viewer): RequireUser,
    Query(query): Query<PageQuery>,
) -> Result<CommentPage, ApiError> {
    let page = state.page(query)?;
    Ok(Json(state.services.comments.list(page).await?))
}

pub async fn create_comment(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    ValidJson(body): ValidJson<CreateCommentBody>,
) -> Result<(StatusCode, Json<CommentView>), ApiError> {
    let comment = state
        .services
        .comments
        .create(&actor, body.post, body.text)
        .await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
    State(state): State<AppState>,
    RequireUser(viewer): RequireUser,
    Path(id): Path<String>,
) -> Result<Json<CommentView>, ApiError> {
    let id: CommentId = parse_id(&id)?;
    Ok(Json(state.services.comments.get(&viewer, id).await?))
}

pub async fn update_comment(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<String>,
    ValidJson(body): ValidJson<UpdateCommentBody>,
) -> Result<Json<CommentView>, ApiError> {
    let id: CommentId = parse_id(&id)?;
    Ok(Json(
        state.services.comments.update(&actor, id, body.text).await?,
    ))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id: CommentId = parse_id(&id)?;
    state.services.comments.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_comment(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<String>,
) -> Result<Json<LikeToggle>, ApiError> {
    let id: CommentId = parse_id(&id)?;
    Ok(Json(state.services.likes.toggle_comment(&actor, id).await?))
}

pub async fn post_comments(
    State(state): State<AppState>,
    RequireUser(viewer): RequireUser,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<CommentPage, ApiError> {
    let post: PostId = parse_id(&id)?;
    let page = state.page(query)?;
    Ok(Json(
        state
            .services
            .comments
            .post_comments(&viewer, post, None, page)
            .await?,
    ))
}

pub async fn post_comment(
    State(state): State<AppState>,
    RequireUser(viewer): RequireUser,
    Path((id, comment_id)): Path<(String, String)>,
) -> Result<Json<CommentView>, ApiError> {
    let post: PostId = parse_id(&id)?;
    let comment: CommentId = parse_id(&comment_id)?;
    Ok(Json(
        state
            .services
            .comments
            .get_on_post(&viewer, post, comment)
            .await?,
    ))
}

pub async fn post_comments_by_user(
    State(state): State<AppState>,
    RequireUser(viewer): RequireUser,
    Path((id, user_id)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Result<CommentPage, ApiError> {
    let post: PostId = parse_id(&id)?;
    let author: UserId = parse_id(&user_id)?;
    let page = state.page(query)?;
    Ok(Json(
        state
            .services
            .comments
            .post_comments(&viewer, post, Some(author), page)
            .await?,
    ))
}

pub async fn user_comments(
    State(state): State<AppState>,
    RequireUser(_viewer): RequireUser,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<CommentPage, ApiError> {
    let user: UserId = parse_id(&id)?;
    let page = state.page(query)?;
    Ok(Json(
        state.services.comments.user_comments(user, page).await?,
    ))
}
