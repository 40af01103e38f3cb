//! Checkout session creation: validate the donated amount, then ask Stripe
//! for a hosted checkout session and relay its redirect URL.

use axum::{extract::State, response::Json};
use serde_json::Value;
use stripe::{
    CheckoutSession, CheckoutSessionMode, CreateCheckoutSession, CreateCheckoutSessionLineItems,
    CreateCheckoutSessionLineItemsPriceData, CreateCheckoutSessionLineItemsPriceDataProductData,
    CreateCheckoutSessionPaymentMethodTypes, Currency,
};

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, serde::Serialize)]
pub struct CheckoutResponse {
    /// Stripe-hosted checkout page for this donation.
    pub url: String,
}

/// POST /create-checkout-session
///
/// Body: `{"amount": <major currency units>}`. Validation runs before the
/// Stripe client is touched; invalid amounts never produce an external call.
pub async fn create_checkout_session(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let unit_amount = donation_unit_amount(body.get("amount"))?;
    let config = &state.config;

    let session = CheckoutSession::create(
        &state.stripe_client,
        CreateCheckoutSession {
            payment_method_types: Some(vec![CreateCheckoutSessionPaymentMethodTypes::Card]),
            mode: Some(CheckoutSessionMode::Payment),
            line_items: Some(vec![CreateCheckoutSessionLineItems {
                price_data: Some(CreateCheckoutSessionLineItemsPriceData {
                    currency: Currency::USD,
                    product_data: Some(CreateCheckoutSessionLineItemsPriceDataProductData {
                        name: config.product_name.clone(),
                        ..Default::default()
                    }),
                    unit_amount: Some(unit_amount),
                    ..Default::default()
                }),
                quantity: Some(1),
                ..Default::default()
            }]),
            success_url: Some(&config.success_url),
            cancel_url: Some(&config.cancel_url),
            ..Default::default()
        },
    )
    .await
    .map_err(|err| {
        tracing::error!(error = %err, "stripe checkout session creation failed");
        ApiError::CheckoutSession
    })?;

    let url = session.url.ok_or_else(|| {
        tracing::error!(session_id = %session.id, "checkout session has no redirect url");
        ApiError::CheckoutSession
    })?;

    tracing::debug!(session_id = %session.id, unit_amount, "created checkout session");
    Ok(Json(CheckoutResponse { url }))
}

/// Convert a user-supplied amount in major units to integer minor units.
///
/// The amount must be a JSON number, finite, and strictly positive.
fn donation_unit_amount(amount: Option<&Value>) -> Result<i64, ApiError> {
    let amount = amount
        .and_then(Value::as_f64)
        .ok_or(ApiError::InvalidAmount)?;
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ApiError::InvalidAmount);
    }
    Ok((amount * 100.0).round() as i64)
}
