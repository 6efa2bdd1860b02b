use axum::extract::{Path, Query, State};

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, PageQuery};
use crate::domain::engagement::FollowToggle;
use crate::domain::ids::UserId;
use crate::domain::pagination::PageEnvelope;
use crate::infrastructure::services::FollowStatsView;

use super::parse_id;

/// Follow the user, or unfollow if already following
pub async fn toggle_follow(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<String>,
) -> Result<Json<FollowToggle>, ApiError> {
    let followee: UserId = parse_id(&id)?;
    Ok(Json(state.services.follows.toggle(&actor, followee).await?))
}

pub async fn follower_stats(
    State(state): State<AppState>,
    RequireUser(_viewer): RequireUser,
    Path(id): Path<String>,
) -> Result<Json<FollowStatsView>, ApiError> {
    let user: UserId = parse_id(&id)?;
    Ok(Json(state.services.follows.stats(user).await?))
}

pub async fn all_followers(
    State(state): State<AppState>,
    RequireUser(_viewer): RequireUser,
    Query(query): Query<PageQuery>,
) -> Result<Json<PageEnvelope<FollowStatsView>>, ApiError> {
    let page = state.page(query)?;
    Ok(Json(state.services.follows.all(page).await?))
}
