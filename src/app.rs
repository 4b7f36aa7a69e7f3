use std::net::SocketAddr;

use axum::{routing::get, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, config::AppConfig, response::ApiResponse, state::AppState, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth::router())
                .merge(users::router())
                .route("/health", get(health)),
        )
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!(
                        "http_request",
                        %method,
                        uri = %uri,
                        status = tracing::field::Empty
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>,
                     _latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, "response");
                        } else {
                            tracing::info!(%status, "response");
                        }
                    },
                ),
        )
}

async fn health() -> ApiResponse<Value> {
    ApiResponse::ok("Server is running", json!({ "status": "ok" }))
}

pub async fn serve(app: Router, config: &AppConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::{
        auth::{claims::CallerContext, jwt::JwtKeys},
        students::repo::InMemoryStudentRegistry,
        users::{
            dto::CreateUserInput,
            memory::InMemoryUserRepository,
            model::{PublicUser, Role},
        },
    };

    struct TestApp {
        state: AppState,
        router: Router,
    }

    fn test_app() -> TestApp {
        let state = AppState::from_parts(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryStudentRegistry::default()),
            Arc::new(AppConfig::for_tests()),
        );
        TestApp {
            router: build_app(state.clone()),
            state,
        }
    }

    impl TestApp {
        async fn seed(&self, email: &str, role: Role) -> PublicUser {
            self.state
                .users
                .create_user(CreateUserInput {
                    password: Some("secret1".into()),
                    ..CreateUserInput::new("Seeded", email, role)
                })
                .await
                .unwrap()
                .user
        }

        fn bearer(&self, user: &PublicUser) -> String {
            let keys = JwtKeys::from_config(&self.state.config.jwt).unwrap();
            let token = keys
                .sign(&CallerContext {
                    id: user.id,
                    role: user.role,
                    email: user.email.clone(),
                })
                .unwrap();
            format!("Bearer {token}")
        }

        async fn call(
            &self,
            method: Method,
            uri: &str,
            auth: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut req = Request::builder().method(method).uri(uri);
            if let Some(auth) = auth {
                req = req.header(header::AUTHORIZATION, auth);
            }
            let req = match body {
                Some(b) => req
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(b.to_string()))
                    .unwrap(),
                None => req.body(Body::empty()).unwrap(),
            };
            let res = self.router.clone().oneshot(req).await.unwrap();
            let status = res.status();
            let bytes = res.into_body().collect().await.unwrap().to_bytes();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }
    }

    #[tokio::test]
    async fn health_is_public() {
        let app = test_app();
        let (status, body) = app.call(Method::GET, "/api/v1/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn admin_route_forbidden_for_non_admin_and_unauthorized_without_header() {
        let app = test_app();
        let student = app.seed("s@x.com", Role::Student).await;
        let payload = json!({ "name": "N", "email": "n@x.com", "role": "lecturer" });

        let (status, body) = app
            .call(
                Method::POST,
                "/api/v1/users",
                Some(&app.bearer(&student)),
                Some(payload.clone()),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);

        let (status, body) = app
            .call(Method::POST, "/api/v1/users", None, Some(payload))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Unauthorized");
    }

    #[tokio::test]
    async fn login_returns_token_and_sanitized_user() {
        let app = test_app();
        app.seed("lect@x.com", Role::Lecturer).await;

        let (status, body) = app
            .call(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "email": "LECT@x.com", "password": "secret1", "role": "lecturer" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(body["data"]["user"]["email"], "lect@x.com");
        assert!(body["data"]["user"].get("passwordHash").is_none());

        let (status, body) = app
            .call(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "email": "lect@x.com", "password": "wrong-one", "role": "lecturer" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid credentials");
    }

    #[tokio::test]
    async fn create_user_reports_validation_issues() {
        let app = test_app();
        let admin = app.seed("admin@x.com", Role::Admin).await;
        let (status, body) = app
            .call(
                Method::POST,
                "/api/v1/users",
                Some(&app.bearer(&admin)),
                Some(json!({ "name": "", "email": "bad", "role": "student" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation error");
        let paths: Vec<_> = body["errors"]
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["path"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(paths, vec!["email", "name"]);
    }

    #[tokio::test]
    async fn admin_creates_user_with_generated_password() {
        let app = test_app();
        let admin = app.seed("admin@x.com", Role::Admin).await;
        let (status, body) = app
            .call(
                Method::POST,
                "/api/v1/users",
                Some(&app.bearer(&admin)),
                Some(json!({ "name": "New", "email": "New@X.com", "role": "student" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "User created successfully");
        assert_eq!(body["data"]["user"]["email"], "new@x.com");
        let password = body["data"]["password"].as_str().unwrap().to_string();

        let (status, _) = app
            .call(
                Method::POST,
                "/api/v1/auth/login",
                None,
                Some(json!({ "email": "new@x.com", "password": password, "role": "student" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app
            .call(
                Method::POST,
                "/api/v1/users",
                Some(&app.bearer(&admin)),
                Some(json!({ "name": "Dup", "email": "NEW@x.com", "role": "lecturer" })),
            )
            .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn list_carries_total_in_meta() {
        let app = test_app();
        let me = app.seed("alice@x.com", Role::Student).await;
        app.seed("bob@x.com", Role::Lecturer).await;

        let (status, body) = app
            .call(
                Method::GET,
                "/api/v1/users?role=lecturer",
                Some(&app.bearer(&me)),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["meta"]["total"], 1);
        assert_eq!(body["data"][0]["email"], "bob@x.com");

        let (status, _) = app
            .call(
                Method::GET,
                "/api/v1/users?role=dean",
                Some(&app.bearer(&me)),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_id_is_rejected() {
        let app = test_app();
        let me = app.seed("a@x.com", Role::Student).await;
        let (status, body) = app
            .call(
                Method::GET,
                "/api/v1/users/not-a-uuid",
                Some(&app.bearer(&me)),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid identifier");
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_hides_the_user() {
        let app = test_app();
        let admin = app.seed("admin@x.com", Role::Admin).await;
        let target = app.seed("t@x.com", Role::Student).await;
        let uri = format!("/api/v1/users/{}", target.id);

        for _ in 0..2 {
            let (status, _) = app
                .call(Method::DELETE, &uri, Some(&app.bearer(&admin)), None)
                .await;
            assert_eq!(status, StatusCode::NO_CONTENT);
        }

        let (status, body) = app
            .call(Method::GET, &uri, Some(&app.bearer(&admin)), None)
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "User not found");
    }

    #[tokio::test]
    async fn password_change_is_self_or_admin() {
        let app = test_app();
        let me = app.seed("me@x.com", Role::Student).await;
        let other = app.seed("other@x.com", Role::Student).await;
        let body = json!({ "password": "changed1" });

        let (status, _) = app
            .call(
                Method::POST,
                &format!("/api/v1/users/{}/password", me.id),
                Some(&app.bearer(&me)),
                Some(body.clone()),
            )
            .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = app
            .call(
                Method::POST,
                &format!("/api/v1/users/{}/password", other.id),
                Some(&app.bearer(&me)),
                Some(body.clone()),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = app
            .call(
                Method::POST,
                &format!("/api/v1/users/{}/password", Uuid::new_v4()),
                Some(&app.bearer(&me)),
                Some(json!({ "password": "x" })),
            )
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn missing_secret_is_a_server_error() {
        let mut config = AppConfig::for_tests();
        config.jwt.secret = None;
        let state = AppState::from_parts(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(InMemoryStudentRegistry::default()),
            Arc::new(config),
        );
        let res = build_app(state)
            .oneshot(
                Request::builder()
                    .uri("/api/v1/users")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
