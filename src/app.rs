use crate::auth::jwt::JwtKeys;
use crate::config::AppConfig;
use crate::state::AppState;
use crate::{auth, items};
use axum::{extract::FromRef, routing::get, Router};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn build_app(state: AppState) -> Router {
    let keys = JwtKeys::from_ref(&state);
    Router::new()
        .route("/", get(|| async { "API is running..." }))
        .merge(auth::router())
        .merge(items::router(keys))
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
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        let latency_ms = latency.as_millis() as u64;
                        if status.is_server_error() {
                            tracing::error!(%status, latency_ms, "response");
                        } else {
                            tracing::info!(%status, latency_ms, "response");
                        }
                    },
                ),
        )
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
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, token);
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => req.body(Body::empty()),
        }
        .unwrap();

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn login_token(app: &Router) -> String {
        send(
            app,
            Method::POST,
            "/auth/register",
            None,
            Some(json!({"username": "bob", "email": "bob@x.com", "password": "hunter22"})),
        )
        .await;
        let (status, body) = send(
            app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"username": "bob", "password": "hunter22"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn root_reports_status() {
        let app = build_app(AppState::fake());
        let res = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"API is running...");
    }

    #[tokio::test]
    async fn register_login_and_list_flow() {
        let app = build_app(AppState::fake());
        let alice = json!({"username": "alice", "email": "a@x.com", "password": "secret1"});

        let (status, body) =
            send(&app, Method::POST, "/auth/register", None, Some(alice.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["user"]["email"], "a@x.com");
        assert!(body["user"].get("password_hash").is_none());
        assert!(body["user"].get("password").is_none());

        let (status, body) = send(&app, Method::POST, "/auth/register", None, Some(alice)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("already exists"));

        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "a@x.com", "password": "wrong"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.get("token").is_none());

        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "a@x.com", "password": "secret1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let token = body["token"].as_str().unwrap().to_string();

        let (status, body) = send(&app, Method::GET, "/items", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"items": []}));
    }

    #[tokio::test]
    async fn login_unknown_user_is_bad_request() {
        let app = build_app(AppState::fake());
        let (status, body) = send(
            &app,
            Method::POST,
            "/auth/login",
            None,
            Some(json!({"email": "ghost@x.com", "password": "whatever"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "User not found");
    }

    #[tokio::test]
    async fn malformed_json_is_bad_request() {
        let app = build_app(AppState::fake());
        let req = Request::builder()
            .method(Method::POST)
            .uri("/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn item_routes_require_a_token() {
        let app = build_app(AppState::fake());

        let (status, body) = send(&app, Method::GET, "/items", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Access denied. No token provided.");

        let (status, body) = send(&app, Method::GET, "/items", Some("garbage"), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Invalid token.");

        let token = login_token(&app).await;
        let bearer = format!("Bearer {token}");
        let (status, _) = send(&app, Method::GET, "/items", Some(&bearer), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(
            &app,
            Method::POST,
            "/items",
            None,
            Some(json!({"name": "Lamp", "description": "Desk lamp", "price": 19.9})),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn expired_token_is_forbidden() {
        let state = AppState::fake();
        let stale = state
            .keys
            .sign_at(
                uuid::Uuid::new_v4(),
                time::OffsetDateTime::now_utc() - time::Duration::hours(2),
            )
            .unwrap();
        let app = build_app(state);
        let (status, _) = send(&app, Method::GET, "/items", Some(&stale), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn unknown_item_is_not_found() {
        let app = build_app(AppState::fake());
        let token = login_token(&app).await;

        let uri = format!("/items/{}", uuid::Uuid::new_v4());
        let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Item not found");

        let (status, _) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({"name": "x", "description": "y", "price": 1})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::GET, "/items/not-a-uuid", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn item_crud_flow() {
        let app = build_app(AppState::fake());
        let token = login_token(&app).await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/items",
            Some(&token),
            Some(json!({"name": "Lamp", "description": "Desk lamp", "price": 19.9})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Item created successfully!");
        let id = body["item"]["id"].as_str().unwrap().to_string();

        let uri = format!("/items/{id}");
        let (status, body) = send(&app, Method::GET, &uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item"]["name"], "Lamp");

        let (status, body) = send(
            &app,
            Method::PUT,
            &uri,
            Some(&token),
            Some(json!({"name": "Lamp", "description": "Floor lamp", "price": 49.5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item"]["description"], "Floor lamp");
        assert_eq!(body["item"]["price"], 49.5);

        let (status, body) = send(&app, Method::GET, "/items", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["items"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn create_item_with_missing_fields_is_bad_request() {
        let app = build_app(AppState::fake());
        let token = login_token(&app).await;
        let (status, body) = send(
            &app,
            Method::POST,
            "/items",
            Some(&token),
            Some(json!({"name": "Lamp"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields: description, price");
    }

    async fn create_named(app: &Router, token: &str, name: &str) {
        let (status, _) = send(
            app,
            Method::POST,
            "/items",
            Some(token),
            Some(json!({"name": name, "description": "d", "price": 1.5})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn list_items_pages_with_limit_and_offset() {
        let app = build_app(AppState::fake());
        let token = login_token(&app).await;
        for name in ["first", "second", "third"] {
            create_named(&app, &token, name).await;
        }

        let (status, body) =
            send(&app, Method::GET, "/items?limit=1&offset=1", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["name"], "second");

        let (_, body) = send(&app, Method::GET, "/items?offset=2", Some(&token), None).await;
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["name"], "third");
    }

    #[tokio::test]
    async fn unparsable_query_is_json_bad_request() {
        let app = build_app(AppState::fake());
        let token = login_token(&app).await;

        let req = Request::builder()
            .uri("/items?limit=abc")
            .header(header::AUTHORIZATION, token.as_str())
            .body(Body::empty())
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            res.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert!(body["error"].as_str().unwrap().contains("query string"));
    }

    #[tokio::test]
    async fn negative_pagination_is_bad_request() {
        let app = build_app(AppState::fake());
        let token = login_token(&app).await;
        create_named(&app, &token, "only").await;

        for uri in ["/items?limit=-1", "/items?offset=-5", "/items?limit=-1&offset=-5"] {
            let (status, body) = send(&app, Method::GET, uri, Some(&token), None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
            assert_eq!(body["error"], "limit and offset must not be negative");
        }
    }
}
