//! Stripe webhook endpoint: verify the signature over the raw body, then
//! dispatch on the event type. Completed checkout sessions are logged; a
//! real deployment would hang a receipt or ledger update off [`dispatch`].

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::Json,
};
use serde::Deserialize;

use crate::error::ApiError;
use crate::signature;
use crate::AppState;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";

/// Acknowledgment body; Stripe stops retrying once it sees a 2xx.
#[derive(Debug, serde::Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Webhook event envelope. The inner object stays untyped until the event
/// type is known.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub created: i64,
    pub data: EventData,
    #[serde(default)]
    pub livemode: bool,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// Checkout session fields worth logging from a completed event. Everything
/// is defaulted so an unexpected object shape degrades instead of erroring.
#[derive(Debug, Default, Deserialize)]
pub struct CompletedSession {
    #[serde(default)]
    pub id: String,
    pub amount_total: Option<i64>,
}

/// What the verifier did with a (validly signed) event.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    CheckoutCompleted(CompletedSessionSummary),
    Ignored { event_type: String },
}

#[derive(Debug, PartialEq, Eq)]
pub struct CompletedSessionSummary {
    pub session_id: String,
    pub amount_total: Option<i64>,
}

/// POST /webhook
///
/// Takes the body as raw bytes: the signature is computed over the exact
/// bytes Stripe sent, so nothing may parse or re-encode it first.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let sig = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("webhook request without Stripe-Signature header");
            ApiError::WebhookSignature
        })?;

    signature::verify(&body, sig, &state.config.webhook_secret).map_err(|err| {
        tracing::warn!(error = %err, "webhook signature verification failed");
        ApiError::WebhookSignature
    })?;

    let event: WebhookEvent = serde_json::from_slice(&body).map_err(|err| {
        tracing::warn!(error = %err, "webhook payload is not a valid event");
        ApiError::InvalidPayload
    })?;

    match dispatch(&event) {
        Dispatch::CheckoutCompleted(session) => {
            tracing::info!(
                event_id = %event.id,
                session_id = %session.session_id,
                amount_total = ?session.amount_total,
                livemode = event.livemode,
                "donation checkout completed"
            );
        }
        Dispatch::Ignored { event_type } => {
            tracing::debug!(
                event_id = %event.id,
                event_type = %event_type,
                created = event.created,
                "ignoring webhook event"
            );
        }
    }

    Ok(Json(WebhookAck { received: true }))
}

/// Route a verified event. Only completed checkout sessions carry a side
/// effect; every other type is acknowledged and dropped.
pub fn dispatch(event: &WebhookEvent) -> Dispatch {
    if event.event_type != CHECKOUT_SESSION_COMPLETED {
        return Dispatch::Ignored {
            event_type: event.event_type.clone(),
        };
    }

    let session: CompletedSession =
        serde_json::from_value(event.data.object.clone()).unwrap_or_default();
    Dispatch::CheckoutCompleted(CompletedSessionSummary {
        session_id: session.id,
        amount_total: session.amount_total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, object: serde_json::Value) -> WebhookEvent {
        serde_json::from_value(json!({
            "id": "evt_test_123",
            "type": event_type,
            "created": 1704067200,
            "data": { "object": object },
            "livemode": false
        }))
        .unwrap()
    }

    #[test]
    fn completed_checkout_dispatches_once_with_session_details() {
        let event = event(
            CHECKOUT_SESSION_COMPLETED,
            json!({
                "id": "cs_test_abc",
                "amount_total": 500,
                "payment_status": "paid"
            }),
        );

        assert_eq!(
            dispatch(&event),
            Dispatch::CheckoutCompleted(CompletedSessionSummary {
                session_id: "cs_test_abc".to_string(),
                amount_total: Some(500),
            })
        );
    }

    #[test]
    fn other_event_types_are_ignored() {
        let event = event("payment_intent.succeeded", json!({ "id": "pi_test" }));
        assert_eq!(
            dispatch(&event),
            Dispatch::Ignored {
                event_type: "payment_intent.succeeded".to_string()
            }
        );
    }

    #[test]
    fn unknown_future_types_are_ignored() {
        let event = event("some.future.event", json!({}));
        assert!(matches!(dispatch(&event), Dispatch::Ignored { .. }));
    }

    #[test]
    fn completed_checkout_with_odd_object_shape_still_dispatches() {
        let event = event(CHECKOUT_SESSION_COMPLETED, json!("not an object"));
        assert_eq!(
            dispatch(&event),
            Dispatch::CheckoutCompleted(CompletedSessionSummary {
                session_id: String::new(),
                amount_total: None,
            })
        );
    }

    #[test]
    fn envelope_parses_real_stripe_shape() {
        let payload = r#"{
            "id": "evt_1234567890",
            "object": "event",
            "type": "checkout.session.completed",
            "created": 1704067200,
            "data": {
                "object": {
                    "id": "cs_test_abc123",
                    "object": "checkout.session",
                    "amount_total": 500,
                    "payment_status": "paid",
                    "status": "complete",
                    "mode": "payment"
                }
            },
            "livemode": false,
            "pending_webhooks": 1
        }"#;

        let event: WebhookEvent = serde_json::from_str(payload).unwrap();
        assert_eq!(event.id, "evt_1234567890");
        assert_eq!(event.event_type, CHECKOUT_SESSION_COMPLETED);
        assert_eq!(event.created, 1704067200);
    }
}
