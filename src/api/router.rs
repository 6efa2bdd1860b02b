use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::infrastructure::observability::{create_metrics_router, PrometheusMetrics};

use super::auth;
use super::health;
use super::middleware::{logging_middleware, security_headers_middleware};
use super::posts;
use super::state::AppState;

/// Full application router; `/metrics` is mounted only when metrics are on
pub fn create_router(state: AppState, metrics: Option<PrometheusMetrics>) -> Router {
    let mut router = Router::new()
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        .route("/live", get(health::live_check))
        .route("/api/token", post(auth::obtain_token))
        .nest("/posts", posts::create_posts_router())
        .with_state(state)
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    if let Some(metrics) = metrics {
        router = router.merge(create_metrics_router(metrics));
    }

    router
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::domain::cache::Cache;
    use crate::domain::user::User;
    use crate::infrastructure::auth::{Argon2Hasher, JwtConfig, JwtGenerator, JwtService};
    use crate::infrastructure::cache::InMemoryCache;
    use crate::infrastructure::services::{CreateUserRequest, Repositories, SocialServices};

    struct TestApp {
        state: AppState,
    }

    impl TestApp {
        fn new() -> Self {
            let store: Arc<dyn Cache> = Arc::new(InMemoryCache::new());
            let services = SocialServices::new(
                Repositories::in_memory(),
                store.clone(),
                Duration::from_secs(60),
                Arc::new(Argon2Hasher::new()),
            );
            let jwt = Arc::new(JwtService::new(JwtConfig::new(
                "router-test-secret",
                "connectly",
                3600,
            )));

            Self {
                state: AppState::new(services, jwt, store, 10),
            }
        }

        async fn user(&self, username: &str, is_staff: bool) -> (User, String) {
            let user = self
                .state
                .services
                .users
                .register(CreateUserRequest {
                    username: username.to_string(),
                    email: format!("{}@example.com", username),
                    password: "correct-horse".to_string(),
                    is_staff,
                })
                .await
                .unwrap();
            let token = self.state.jwt.generate(&user).unwrap();
            (user, token)
        }

        async fn send(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }

            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = create_router(self.state.clone(), None)
                .oneshot(request)
                .await
                .unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

            (status, value)
        }
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new();
        let (status, body) = app.send(Method::GET, "/health", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_request_id_is_echoed() {
        let app = TestApp::new();
        let response = create_router(app.state.clone(), None)
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-request-id", "req-7")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "req-7");
        assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    }

    #[tokio::test]
    async fn test_ready_reports_cache_store() {
        let app = TestApp::new();
        let (status, body) = app.send(Method::GET, "/ready", None, None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["checks"][0]["name"], "cache_store");
    }

    #[tokio::test]
    async fn test_token_exchange() {
        let app = TestApp::new();
        app.user("alice", false).await;

        let (status, body) = app
            .send(
                Method::POST,
                "/api/token",
                None,
                Some(json!({"username": "alice", "password": "correct-horse"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token_type"], "Bearer");
        assert_eq!(body["expires_in"], 3600);

        let token = body["token"].as_str().unwrap().to_string();
        let (status, _) = app.send(Method::GET, "/posts", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let app = TestApp::new();
        app.user("alice", false).await;

        let (status, body) = app
            .send(
                Method::POST,
                "/api/token",
                None,
                Some(json!({"username": "alice", "password": "wrong-password"})),
            )
            .await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"]["type"], "authentication_error");
    }

    #[tokio::test]
    async fn test_requires_token() {
        let app = TestApp::new();
        let (status, _) = app.send(Method::GET, "/posts", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .send(Method::GET, "/posts", Some("not-a-jwt"), None)
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_token_of_deleted_user_is_rejected() {
        let app = TestApp::new();
        let (alice, token) = app.user("alice", false).await;

        let (status, _) = app
            .send(
                Method::DELETE,
                &format!("/posts/users/{}", alice.id()),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.send(Method::GET, "/posts", Some(&token), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_post_lifecycle() {
        let app = TestApp::new();
        let (_, token) = app.user("alice", false).await;

        let (status, created) = app
            .send(
                Method::POST,
                "/posts",
                Some(&token),
                Some(json!({"title": "Hello", "content": "First post"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_u64().unwrap();

        let (status, page) = app.send(Method::GET, "/posts", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(page["count"], 1);
        assert_eq!(page["results"][0]["title"], "Hello");

        let (status, updated) = app
            .send(
                Method::PUT,
                &format!("/posts/{}", id),
                Some(&token),
                Some(json!({"title": "Hello again"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["title"], "Hello again");

        let (_, page) = app.send(Method::GET, "/posts", Some(&token), None).await;
        assert_eq!(page["results"][0]["title"], "Hello again");

        let (status, _) = app
            .send(Method::DELETE, &format!("/posts/{}", id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = app
            .send(Method::GET, &format!("/posts/{}", id), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found_error");
    }

    #[tokio::test]
    async fn test_comments_and_likes() {
        let app = TestApp::new();
        let (_, alice) = app.user("alice", false).await;
        let (bob_user, bob) = app.user("bob", false).await;

        let (_, post) = app
            .send(
                Method::POST,
                "/posts",
                Some(&alice),
                Some(json!({"title": "Hello", "content": "Body"})),
            )
            .await;
        let post_id = post["id"].as_u64().unwrap();

        let (status, comment) = app
            .send(
                Method::POST,
                "/posts/comments",
                Some(&bob),
                Some(json!({"post": post_id, "text": "Nice one"})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let comment_id = comment["id"].as_u64().unwrap();

        let (_, detail) = app
            .send(Method::GET, &format!("/posts/{}", post_id), Some(&alice), None)
            .await;
        assert_eq!(detail["comment_count"], 1);

        let (status, liked) = app
            .send(
                Method::POST,
                &format!("/posts/{}/like", post_id),
                Some(&bob),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(liked["liked"], true);

        let (_, detail) = app
            .send(Method::GET, &format!("/posts/{}", post_id), Some(&alice), None)
            .await;
        assert_eq!(detail["like_count"], 1);

        let (status, on_post) = app
            .send(
                Method::GET,
                &format!("/posts/{}/comment/{}", post_id, comment_id),
                Some(&alice),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(on_post["text"], "Nice one");

        let (status, by_user) = app
            .send(
                Method::GET,
                &format!("/posts/{}/users/{}/comments", post_id, bob_user.id()),
                Some(&alice),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(by_user["count"], 1);

        let (status, _) = app
            .send(
                Method::PUT,
                &format!("/posts/comments/{}", comment_id),
                Some(&alice),
                Some(json!({"text": "Hijacked"})),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_follow_and_feed() {
        let app = TestApp::new();
        let (alice_user, alice) = app.user("alice", false).await;
        let (_, bob) = app.user("bob", false).await;

        app.send(
            Method::POST,
            "/posts",
            Some(&alice),
            Some(json!({"title": "From alice", "content": ""})),
        )
        .await;

        let (_, feed) = app.send(Method::GET, "/posts/feed", Some(&bob), None).await;
        assert_eq!(feed["count"], 0);

        let (status, toggled) = app
            .send(
                Method::POST,
                &format!("/posts/users/{}/follow", alice_user.id()),
                Some(&bob),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(toggled["following"], true);

        let (_, feed) = app.send(Method::GET, "/posts/feed", Some(&bob), None).await;
        assert_eq!(feed["count"], 1);

        let (_, stats) = app
            .send(
                Method::GET,
                &format!("/posts/users/{}/followers", alice_user.id()),
                Some(&bob),
                None,
            )
            .await;
        assert_eq!(stats["followers_count"], 1);
    }

    #[tokio::test]
    async fn test_invalid_ids_and_pages() {
        let app = TestApp::new();
        let (_, token) = app.user("alice", false).await;

        let (status, body) = app
            .send(Method::GET, "/posts/abc", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request_error");

        let (status, _) = app
            .send(Method::GET, "/posts?page=0", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send(Method::GET, "/posts?page=5", Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_staff_only_user_creation() {
        let app = TestApp::new();
        let (_, member) = app.user("member", false).await;
        let (_, admin) = app.user("admin", true).await;
        let body = json!({
            "username": "carol",
            "email": "carol@example.com",
            "password": "long-enough-pw"
        });

        let (status, _) = app
            .send(Method::POST, "/posts/users/create", Some(&member), Some(body.clone()))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, created) = app
            .send(Method::POST, "/posts/users/create", Some(&admin), Some(body))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["username"], "carol");

        let (_, users) = app.send(Method::GET, "/posts/users", Some(&admin), None).await;
        assert_eq!(users["count"], 3);
    }

    #[tokio::test]
    async fn test_profile_photo() {
        let app = TestApp::new();
        let (alice_user, alice) = app.user("alice", false).await;
        let uri = format!("/posts/users/{}/photo", alice_user.id());

        let (status, body) = app
            .send(
                Method::PUT,
                &uri,
                Some(&alice),
                Some(json!({"profile_photo": "not a url"})),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["type"], "invalid_request_error");

        let (status, _) = app
            .send(
                Method::PUT,
                &uri,
                Some(&alice),
                Some(json!({"profile_photo": "https://cdn.example.com/a.png"})),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (_, photo) = app.send(Method::GET, &uri, Some(&alice), None).await;
        assert_eq!(photo["profile_photo"], "https://cdn.example.com/a.png");
    }
}
