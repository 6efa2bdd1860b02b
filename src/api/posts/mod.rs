//! Social endpoints, mounted under `/posts`
//!
//! Every route needs a bearer token. Path ids arrive as strings and are
//! parsed here so a malformed id is a 400 rather than a routing miss.

mod comments;
mod follows;
mod photos;
mod posts;
mod users;

use std::str::FromStr;

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;
use crate::api::types::ApiError;
use crate::domain::DomainError;

pub fn create_posts_router() -> Router<AppState> {
    Router::new()
        .route("/", get(posts::list_posts).post(posts::create_post))
        .route("/feed", get(posts::feed))
        .route(
            "/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/{id}/like", post(posts::like_post))
        .route("/{id}/comments", get(comments::post_comments))
        .route("/{id}/comment/{comment_id}", get(comments::post_comment))
        .route(
            "/{id}/users/{user_id}/comments",
            get(comments::post_comments_by_user),
        )
        .route(
            "/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/comments/{id}",
            get(comments::get_comment)
                .put(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route("/comments/{id}/like", post(comments::like_comment))
        .route("/users", get(users::list_users))
        .route("/users/create", post(users::create_user))
        .route("/users/followers", get(follows::all_followers))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route("/users/{id}/posts", get(posts::user_posts))
        .route("/users/{id}/comments", get(comments::user_comments))
        .route("/users/{id}/follow", post(follows::toggle_follow))
        .route("/users/{id}/followers", get(follows::follower_stats))
        .route(
            "/users/{id}/photo",
            get(photos::get_photo).put(photos::update_photo),
        )
}

fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: FromStr<Err = DomainError>,
{
    Ok(raw.parse::<T>()?)
}
