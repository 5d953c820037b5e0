use std::sync::Arc;

use axum::{
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json},
    routing::get,
    Extension, Router,
};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config;
use crate::database::{Resource, ResourceRepository};
use crate::handlers;
use crate::middleware::jwt_auth_middleware;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn ResourceRepository>,
}

impl AppState {
    pub fn new(repository: Arc<dyn ResourceRepository>) -> Self {
        Self { repository }
    }
}

pub fn app(state: AppState) -> Router {
    let mut router = Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        // Protected API
        .merge(api_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config::config().security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }
    router
}

fn api_routes() -> Router<AppState> {
    let mut router = Router::new();

    for resource in Resource::ALL {
        router = router
            .route(
                &format!("/api/{}", resource.name()),
                get(handlers::resource_list).layer(Extension(resource)),
            )
            .route(
                &format!("/api/{}/:id", resource.name()),
                get(handlers::record_get).layer(Extension(resource)),
            );
    }

    for resource in [Resource::Locations, Resource::Products, Resource::Categories] {
        router = router.route(
            &format!("/api/feedbacks/{}-name", resource.singular()),
            get(handlers::name_feedback).layer(Extension(resource)),
        );
    }

    router.route_layer(middleware::from_fn(jwt_auth_middleware))
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");
    let resources: Vec<&str> = Resource::ALL.iter().map(|r| r.name()).collect();

    Json(json!({
        "name": "Inventory Manager API",
        "version": version,
        "page_size": config::config().query.page_size,
        "endpoints": {
            "list": "/api/:resource?page=<n>&order=<json> (protected)",
            "record": "/api/:resource/:id (protected)",
            "feedback": "/api/feedbacks/{location,product,category}-name?name=<v> (protected)",
            "health": "/health (public)",
        },
        "resources": resources,
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    match state.repository.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "timestamp": now,
                "database": "ok"
            })),
        ),
        Err(e) => {
            tracing::error!("Health check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "degraded",
                    "timestamp": now,
                    "database_error": e.to_string()
                })),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{generate_jwt, Claims};
    use crate::database::MemoryRepository;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use tower::ServiceExt;

    fn demo_app() -> Router {
        app(AppState::new(Arc::new(MemoryRepository::demo())))
    }

    fn token(user_id: i64) -> String {
        generate_jwt(&Claims::new(user_id, "tester")).unwrap()
    }

    async fn get_json(uri: &str, user_id: Option<i64>) -> (StatusCode, Value) {
        let mut request = Request::builder().uri(uri);
        if let Some(id) = user_id {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token(id)));
        }
        let response = demo_app()
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn encode(order: &str) -> String {
        url::form_urlencoded::byte_serialize(order.as_bytes()).collect()
    }

    #[tokio::test]
    async fn lists_third_page_of_products() {
        let uri = format!("/api/products?page=2&order={}", encode(r#"[{"name":"asc"}]"#));
        let (status, body) = get_json(&uri, Some(1)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pages"], 3);
        let names: Vec<&str> = body["products"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Sugar", "Tea", "Yogurt"]);
    }

    #[tokio::test]
    async fn page_past_the_end_is_empty_not_an_error() {
        let (status, body) = get_json("/api/products?page=9", Some(1)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["products"], json!([]));
        assert_eq!(body["pages"], 3);
    }

    #[tokio::test]
    async fn bad_order_fails_the_request() {
        for order in [
            r#"[{"name":"up"}]"#,
            r#"[{"name":"asc","id":"desc"}]"#,
            r#"{"name":"asc"}"#,
            r#"[{"price":"asc"}]"#,
            r#"[{"a":{"b":{"c":{"d":{"e":"asc"}}}}}]"#,
            "not json",
        ] {
            let uri = format!("/api/stocks?order={}", encode(order));
            let (status, body) = get_json(&uri, Some(1)).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "order {}", order);
            assert_eq!(body["code"], "BAD_REQUEST");
        }
    }

    #[tokio::test]
    async fn bad_page_fails_the_request() {
        let (status, _) = get_json("/api/books?page=-1", Some(1)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn listing_requires_a_token() {
        let (status, body) = get_json("/api/locations", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], true);
    }

    #[tokio::test]
    async fn record_view_checks_ownership() {
        let (status, body) = get_json("/api/categories/1", Some(1)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["category"], json!({"name": "Novels", "defaultLocationId": 4}));

        let (status, _) = get_json("/api/categories/100", Some(1)).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = get_json("/api/categories/999", Some(1)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn name_feedback_messages() {
        let cases = [
            ("/api/feedbacks/location-name?name=Fridge", "Name already used!"),
            ("/api/feedbacks/location-name?name=Attic", "Valid Name"),
            ("/api/feedbacks/product-name?name=ab", "Name too short!"),
            ("/api/feedbacks/category-name?name=Poetry", "Valid Name"),
        ];
        for (uri, expected) in cases {
            let (status, body) = get_json(uri, Some(1)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["feedback"], expected, "{}", uri);
        }

        let (status, _) = get_json("/api/feedbacks/location-name", Some(1)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_is_public() {
        let (status, body) = get_json("/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
