use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

/// Request-terminal errors surfaced to callers.
///
/// Messages here are the full public detail; anything worth more context is
/// logged at the call site before the error is returned.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Donation amount missing, non-numeric, non-finite, or not positive.
    #[error("Invalid amount")]
    InvalidAmount,

    /// Stripe rejected the session request or was unreachable.
    #[error("Checkout session error")]
    CheckoutSession,

    /// Webhook signature missing, malformed, stale, or mismatched.
    #[error("Webhook verification failed")]
    WebhookSignature,

    /// Webhook body passed verification but is not a parseable event.
    #[error("Invalid payload")]
    InvalidPayload,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidAmount => StatusCode::BAD_REQUEST,
            ApiError::CheckoutSession => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::WebhookSignature => StatusCode::BAD_REQUEST,
            ApiError::InvalidPayload => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}
