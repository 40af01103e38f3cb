use std::sync::Arc;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::rate_limit::{self, FixedWindowLimiter};
use crate::{checkout, middleware, webhook, AppState};

/// Assemble the API router: three routes wrapped in trace, CORS, origin
/// allow-listing, and per-address rate limiting.
pub fn app(state: AppState) -> Router {
    let limiter = Arc::new(FixedWindowLimiter::new(&state.config.rate_limit));

    Router::new()
        .route("/", get(root))
        .route(
            "/create-checkout-session",
            post(checkout::create_checkout_session),
        )
        .route("/webhook", post(webhook::stripe_webhook))
        .layer(axum_middleware::from_fn_with_state(
            limiter,
            rate_limit::rate_limit_middleware,
        ))
        .layer(axum_middleware::from_fn_with_state(
            state.config.clone(),
            middleware::origin_guard,
        ))
        .layer(middleware::cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> &'static str {
    "Buy Me a Coffee API is live"
}
