use axum::extract::{Path, State};
use serde::Deserialize;
use validator::Validate;

use crate::api::middleware::RequireUser;
use crate::api::state::AppState;
use crate::api::types::{ApiError, Json, ValidJson};
use crate::domain::ids::UserId;
use crate::infrastructure::services::ProfilePhotoView;

use super::parse_id;

/// `null` clears the photo
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePhotoBody {
    #[validate(url(message = "Profile photo must be a valid URL"))]
    pub profile_photo: Option<String>,
}

pub async fn get_photo(
    State(state): State<AppState>,
    RequireUser(_viewer): RequireUser,
    Path(id): Path<String>,
) -> Result<Json<ProfilePhotoView>, ApiError> {
    let user: UserId = parse_id(&id)?;
    Ok(Json(state.services.photos.get(user).await?))
}

pub async fn update_photo(
    State(state): State<AppState>,
    RequireUser(actor): RequireUser,
    Path(id): Path<String>,
    ValidJson(body): ValidJson<UpdatePhotoBody>,
) -> Result<Json<ProfilePhotoView>, ApiError> {
    let user: UserId = parse_id(&id)?;
    Ok(Json(
        state
            .services
            .photos
            .update(&actor, user, body.profile_photo)
            .await?,
    ))
}
