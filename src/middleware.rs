use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::AppConfig;

/// Reject browser requests from origins outside the allow-list before any
/// route handler runs. Requests without an `Origin` header (same-origin
/// navigation, curl, Stripe's webhook delivery) pass through.
pub async fn origin_guard(
    State(config): State<Arc<AppConfig>>,
    request: Request,
    next: Next,
) -> Response {
    if let Some(origin) = request.headers().get(header::ORIGIN) {
        let allowed = origin
            .to_str()
            .map(|o| config.allowed_origins.iter().any(|a| a == o))
            .unwrap_or(false);
        if !allowed {
            tracing::warn!(origin = ?origin, "blocked cross-origin request");
            return (
                StatusCode::FORBIDDEN,
                Json(serde_json::json!({ "error": "Origin not allowed" })),
            )
                .into_response();
        }
    }
    next.run(request).await
}

/// CORS headers for the allow-listed origins: GET/POST with JSON bodies,
/// credentials permitted.
pub fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true)
}
