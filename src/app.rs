use std::net::SocketAddr;

use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{accounts, fridge, nutrition, recipes, state::AppState};

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(
            "/api/v1",
            Router::new()
                .merge(accounts::router())
                .merge(recipes::router())
                .merge(fridge::router())
                .merge(nutrition::router())
                .route("/health", get(|| async { "ok" })),
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
                     latency: std::time::Duration,
                     span: &tracing::Span| {
                        let status = res.status();
                        span.record("status", tracing::field::display(status));
                        if status.is_server_error() {
                            tracing::error!(%status, ?latency, "response");
                        } else {
                            tracing::info!(%status, ?latency, "response");
                        }
                    },
                ),
        )
}

pub async fn serve(app: Router) -> anyhow::Result<()> {
    let addr: SocketAddr = format!(
        "{}:{}",
        std::env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".into()),
        std::env::var("APP_PORT").unwrap_or_else(|_| "8080".into())
    )
    .parse()?;

    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use axum::{
        body::{to_bytes, Body},
        http::{Method, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::{
        accounts::provider::MockAuthProvider,
        error::RemoteError,
        remote::{memory::MemoryRemote, Filter, Query, RemoteStore, Table},
    };

    /// Remote that accepts every call and never answers.
    struct StalledRemote;

    #[async_trait::async_trait]
    impl RemoteStore for StalledRemote {
        async fn select(&self, _: Table, _: Query) -> Result<Vec<Value>, RemoteError> {
            futures::future::pending().await
        }

        async fn insert(&self, _: Table, _: Value) -> Result<Value, RemoteError> {
            futures::future::pending().await
        }

        async fn update(&self, _: Table, _: Value, _: Vec<Filter>) -> Result<u64, RemoteError> {
            futures::future::pending().await
        }

        async fn delete(&self, _: Table, _: Vec<Filter>) -> Result<u64, RemoteError> {
            futures::future::pending().await
        }
    }

    async fn app_with(remote: Arc<dyn RemoteStore>) -> Router {
        let mut auth = MockAuthProvider::new();
        auth.expect_current_identity().returning(|| None);
        build_app(AppState::fake(remote, Arc::new(auth)).await)
    }

    async fn app() -> Router {
        app_with(Arc::new(MemoryRemote::new())).await
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    #[tokio::test]
    async fn health_and_session() {
        let app = app().await;
        assert_eq!(call(&app, Method::GET, "/api/v1/health", None).await.0, StatusCode::OK);

        let (status, body) = call(&app, Method::GET, "/api/v1/session", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["logged_in"], json!(false));
        assert_eq!(body["start_route"], json!("auth_screen"));

        let (status, _) = call(&app, Method::GET, "/api/v1/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authored_recipe_is_matched_by_fridge_contents() {
        let app = app().await;
        let draft = json!({
            "title": "Milk porridge",
            "ingredients": [{"name": "milk", "grams": "200"}, {"name": "oats", "grams": "50"}],
            "instructions": ["Boil", "Stir"]
        });
        let (status, created) = call(&app, Method::POST, "/api/v1/recipes", Some(draft)).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_str().unwrap().to_string();

        let (status, _) =
            call(&app, Method::POST, "/api/v1/fridge", Some(json!({"name": "Oats"}))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, matches) = call(&app, Method::GET, "/api/v1/fridge/matches", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(matches["recipes"][0]["id"], json!(id));

        let uri = format!("/api/v1/recipes/{id}/favorite");
        let (status, _) = call(&app, Method::PUT, &uri, Some(json!({"is_favorite": true}))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (_, favorites) = call(&app, Method::GET, "/api/v1/recipes/favorites", None).await;
        assert_eq!(favorites.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn fridge_matches_answer_from_cache_while_remote_hangs() {
        let app = app_with(Arc::new(StalledRemote)).await;
        let (status, _) =
            call(&app, Method::POST, "/api/v1/fridge", Some(json!({"name": "milk"}))).await;
        assert_eq!(status, StatusCode::CREATED);

        let response = tokio::time::timeout(
            Duration::from_secs(3),
            call(&app, Method::GET, "/api/v1/fridge/matches", None),
        )
        .await;
        let (status, matches) = response.expect("matches must not wait for the remote");
        assert_eq!(status, StatusCode::OK);
        assert_eq!(matches["ingredients"], json!(["milk"]));
        assert_eq!(matches["recipes"], json!([]));
    }

    #[tokio::test]
    async fn invalid_input_maps_to_client_errors() {
        let app = app().await;
        let (status, _) = call(&app, Method::GET, "/api/v1/fridge/matches", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            call(&app, Method::POST, "/api/v1/recipes", Some(json!({"title": " "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(&app, Method::GET, "/api/v1/recipes/missing", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn nutrition_labels() {
        let app = app().await;
        let body = json!({"ingredients": [{"name": "Milk", "grams": "200"}]});
        let (status, facts) =
            call(&app, Method::POST, "/api/v1/nutrition/calculate", Some(body)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(facts["calories"], json!("60"));
        assert_eq!(facts["proteins"], json!("3.2"));
        assert_eq!(facts["weight"], json!(200.0));
    }
}
