//! Connectly API
//!
//! A small social network backend:
//! - Users, posts, comments, likes, follows and profile photos
//! - Cached reads through a read-through cache (in-memory or Redis)
//! - Per-mutation invalidation fan-out keeping every cached view fresh

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use rand::{distributions::Alphanumeric, Rng};
use tracing::{info, warn};

use api::state::AppState;
use infrastructure::auth::{Argon2Hasher, JwtConfig, JwtService};
use infrastructure::cache::{CacheConfig, CacheFactory};
use infrastructure::services::{CreateUserRequest, Repositories, SocialServices};

/// Wire the cache store, repositories and services described by `config`
///
/// An unreachable Redis falls back to the in-memory store; reads keep
/// working either way.
pub async fn create_app_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let cache_config = CacheConfig::from_settings(&config.cache)?;
    let store = CacheFactory::new().create_or_fallback(&cache_config).await?;

    let services = SocialServices::new(
        Repositories::in_memory(),
        store.clone(),
        config.cache.ttl(),
        Arc::new(Argon2Hasher::new()),
    );

    let secret = if config.auth.jwt_secret.is_empty() {
        warn!("No JWT secret configured; generated a random one, tokens will not survive a restart");
        random_string(48)
    } else {
        config.auth.jwt_secret.clone()
    };
    let jwt = Arc::new(JwtService::new(JwtConfig::new(
        secret,
        config.auth.jwt_issuer.clone(),
        config.auth.jwt_expiration_secs,
    )));

    Ok(AppState::new(
        services,
        jwt,
        store,
        config.pagination.default_page_size,
    ))
}

/// Create the configured staff account if it does not exist yet
pub async fn bootstrap_admin(state: &AppState, config: &AppConfig) -> anyhow::Result<()> {
    let auth = &config.auth;
    let users = &state.services.users;

    if users.find_by_username(&auth.admin_username).await?.is_some() {
        return Ok(());
    }

    let password = match &auth.admin_password {
        Some(password) => password.clone(),
        None => {
            let generated = random_string(20);
            warn!(
                username = %auth.admin_username,
                password = %generated,
                "Generated bootstrap admin password; set APP__AUTH__ADMIN_PASSWORD to choose one"
            );
            generated
        }
    };

    let admin = users
        .register(CreateUserRequest {
            username: auth.admin_username.clone(),
            email: auth.admin_email.clone(),
            password,
            is_staff: true,
        })
        .await?;

    info!(user_id = %admin.id(), username = %admin.username(), "Bootstrap admin created");
    Ok(())
}

fn random_string(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}
