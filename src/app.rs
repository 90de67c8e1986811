use std::net::SocketAddr;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth, documents, state::AppState, users};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(|| async { "ok" }))
        .merge(auth::router())
        .merge(users::router())
        .merge(documents::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    tracing::info_span!("http_request", %method, uri = %uri)
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

async fn root() -> Json<Value> {
    Json(json!({ "message": "Welcome to JSON Haven API" }))
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8000".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::JwtKeys;
    use axum::{
        body::Body,
        extract::FromRef,
        http::{header, Request, StatusCode},
    };
    use time::Duration as TimeDuration;
    use tower::ServiceExt;

    fn app() -> (Router, AppState) {
        let state = AppState::fake();
        (build_app(state.clone()), state)
    }

    async fn response_parts(
        app: Router,
        request: Request<Body>,
    ) -> (StatusCode, Option<String>, Vec<u8>) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let www = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec();
        (status, www, body)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn bearer_request(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn root_and_health_are_open() {
        let (app, _) = app();
        let (status, _, body) = response_parts(app.clone(), get_request("/")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, br#"{"message":"Welcome to JSON Haven API"}"#.to_vec());

        let (status, _, _) = response_parts(app, get_request("/health")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_route_rejects_missing_token() {
        let (app, _) = app();
        let (status, www, body) = response_parts(app, get_request("/documents")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(www.as_deref(), Some("Bearer"));
        assert_eq!(body, br#"{"detail":"Could not validate credentials"}"#.to_vec());
    }

    #[tokio::test]
    async fn protected_route_rejects_garbage_token() {
        let (app, _) = app();
        let (status, www, _) =
            response_parts(app, bearer_request("/documents", "not-a-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(www.as_deref(), Some("Bearer"));
    }

    #[tokio::test]
    async fn truncated_token_gets_same_opaque_401() {
        let (app, state) = app();
        let token = JwtKeys::from_ref(&state).sign("a@x.com").unwrap();
        let truncated = &token[..token.len() - 1];

        let (status, www, body) =
            response_parts(app.clone(), bearer_request("/documents", truncated)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(www.as_deref(), Some("Bearer"));

        // Same bytes as any other token failure: nothing leaks which check failed.
        let (_, _, missing_body) = response_parts(app, get_request("/documents")).await;
        assert_eq!(body, missing_body);
    }

    #[tokio::test]
    async fn expired_token_gets_same_opaque_401() {
        let (app, state) = app();
        let token = JwtKeys::from_ref(&state)
            .sign_with_ttl("a@x.com", TimeDuration::seconds(-60))
            .unwrap();

        let (status, www, body) =
            response_parts(app, bearer_request("/documents", &token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(www.as_deref(), Some("Bearer"));
        assert_eq!(body, br#"{"detail":"Could not validate credentials"}"#.to_vec());
    }

    #[tokio::test]
    async fn writes_are_gated_before_any_side_effect() {
        // The fake state's pool never connects; a 401 here proves the gate
        // short-circuited before the handler touched persistence.
        let (app, _) = app();
        let request = Request::builder()
            .method("PUT")
            .uri("/documents/5f8f8c44-9d5b-4b0a-8a1a-3e1f2d3c4b5a")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"content":"x"}"#))
            .unwrap();
        let (status, www, _) = response_parts(app, request).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(www.as_deref(), Some("Bearer"));
    }

    #[tokio::test]
    async fn register_validates_before_touching_the_store() {
        let (app, _) = app();

        let bad_email = Request::builder()
            .method("POST")
            .uri("/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"email":"nope","username":"a","password":"secret123"}"#,
            ))
            .unwrap();
        let (status, _, body) = response_parts(app.clone(), bad_email).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, br#"{"detail":"Invalid email"}"#.to_vec());

        let short_password = Request::builder()
            .method("POST")
            .uri("/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"email":"a@x.com","username":"a","password":"short"}"#,
            ))
            .unwrap();
        let (status, _, body) = response_parts(app, short_password).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, br#"{"detail":"Password too short"}"#.to_vec());
    }
}
