//! HTTP intake for Pay2 payment notifications.
//!
//! The response bodies are part of the gateway contract: `400` and `401`
//! carry a fixed `error` string, every accepted delivery gets
//! `{"status":"success"}` so the gateway stops retrying.

use crate::error::{FloodgateError, Result};
use async_trait::async_trait;
use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
};
use serde_json::json;
use std::sync::Arc;

use super::config::Pay2Config;
use super::idempotency::{Claim, IdempotencyStore, in_flight_error};
use super::notification::{Pay2Notification, PaymentStatus, cross_check};
use super::verification::Pay2Verifier;

/// Header carrying the signed and encrypted notification
pub const SIGNATURE_HEADER: &str = "Pay2-House-Signature";

/// Route the gateway posts notifications to
pub const WEBHOOK_PATH: &str = "/webhooks/pay2";

/// Trait for acting on verified payment notifications
///
/// Only `on_paid` is required; the other statuses are logged by default.
///
/// # Example
///
/// ```rust,ignore
/// use floodgate::webhooks::{Pay2Notification, PaymentEventHandler};
///
/// struct Billing {
///     db: DatabaseConnection,
/// }
///
/// #[async_trait]
/// impl PaymentEventHandler for Billing {
///     async fn on_paid(&self, notification: &Pay2Notification) -> Result<()> {
///         // Mark the invoice as paid and credit the user
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait PaymentEventHandler: Send + Sync {
    /// The payment went through
    async fn on_paid(&self, notification: &Pay2Notification) -> Result<()>;

    /// The payer or the gateway cancelled the payment
    async fn on_cancelled(&self, notification: &Pay2Notification) -> Result<()> {
        tracing::info!(
            invoice_number = notification.invoice_number.as_deref(),
            "Pay2 payment cancelled"
        );
        Ok(())
    }

    /// The gateway reported a payment error
    async fn on_failed(&self, notification: &Pay2Notification) -> Result<()> {
        tracing::error!(
            invoice_number = notification.invoice_number.as_deref(),
            "Pay2 payment failed"
        );
        Ok(())
    }

    /// A status this crate does not know about
    async fn on_unknown(&self, notification: &Pay2Notification) -> Result<()> {
        tracing::info!(
            invoice_number = notification.invoice_number.as_deref(),
            status = notification.status.as_ref().map(PaymentStatus::as_str),
            "Unknown Pay2 payment status"
        );
        Ok(())
    }
}

/// How incoming signatures are checked
#[derive(Clone)]
enum Verification {
    Required(Arc<Pay2Verifier>),
    /// Sandbox: the header must be present but is not checked
    Skipped,
}

/// Shared state for the Pay2 webhook route
#[derive(Clone)]
pub struct Pay2WebhookState {
    verification: Verification,
    idempotency: Arc<dyn IdempotencyStore>,
    handler: Arc<dyn PaymentEventHandler>,
}

impl Pay2WebhookState {
    /// Verify every delivery with `verifier`
    pub fn new(
        verifier: Pay2Verifier,
        idempotency: Arc<dyn IdempotencyStore>,
        handler: Arc<dyn PaymentEventHandler>,
    ) -> Self {
        Self {
            verification: Verification::Required(Arc::new(verifier)),
            idempotency,
            handler,
        }
    }

    /// Trust the request body without checking the signature
    pub fn test_mode(
        idempotency: Arc<dyn IdempotencyStore>,
        handler: Arc<dyn PaymentEventHandler>,
    ) -> Self {
        Self {
            verification: Verification::Skipped,
            idempotency,
            handler,
        }
    }

    /// Build state from configuration
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` when test mode is off and no live API key is set.
    pub fn from_config(
        config: &Pay2Config,
        idempotency: Arc<dyn IdempotencyStore>,
        handler: Arc<dyn PaymentEventHandler>,
    ) -> Result<Self> {
        if config.test_mode {
            return Ok(Self::test_mode(idempotency, handler));
        }

        let secret = config.active_secret().ok_or_else(|| {
            FloodgateError::bad_request("Pay2 API key is required when test mode is off")
        })?;
        Ok(Self::new(Pay2Verifier::new(secret.clone()), idempotency, handler))
    }

    pub fn is_test_mode(&self) -> bool {
        matches!(self.verification, Verification::Skipped)
    }
}

/// Router exposing `POST /webhooks/pay2`
pub fn pay2_routes(state: Pay2WebhookState) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, post(receive_pay2_webhook))
        .with_state(state)
}

/// Handle one Pay2 delivery
pub async fn receive_pay2_webhook(
    State(state): State<Pay2WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(signature) = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.trim().is_empty())
    else {
        tracing::warn!("Pay2 webhook without signature header");
        return error_response(StatusCode::BAD_REQUEST, "Missing signature");
    };

    let notification = parse_body(&body);

    match &state.verification {
        Verification::Required(verifier) => {
            if !is_authentic(verifier, signature, &notification) {
                return error_response(StatusCode::UNAUTHORIZED, "Invalid signature");
            }
        }
        Verification::Skipped => {
            tracing::warn!("Pay2 test mode: accepting webhook without signature verification");
        }
    }

    match process(&state, &notification).await {
        Ok(()) => {
            tracing::info!(
                invoice_number = notification.invoice_number.as_deref().unwrap_or("unknown"),
                status = notification.status.as_ref().map_or("unknown", PaymentStatus::as_str),
                "Pay2 webhook processed"
            );
            (StatusCode::OK, Json(json!({"status": "success"}))).into_response()
        }
        Err(e) => e.into_response(),
    }
}

/// The body is read leniently: anything unparseable counts as empty, which
/// either fails the cross-check or is acknowledged as incomplete
fn parse_body(body: &[u8]) -> Pay2Notification {
    serde_json::from_slice(body).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Pay2 webhook body is not a JSON notification");
        Pay2Notification::default()
    })
}

/// Verify the envelope and check that the body says what the gateway signed
///
/// Verification failures are logged by the verifier itself.
fn is_authentic(verifier: &Pay2Verifier, signature: &str, body: &Pay2Notification) -> bool {
    let signed = match verifier.verify_notification(signature) {
        Ok(signed) => signed,
        Err(_) => return false,
    };

    match cross_check(&signed, body) {
        Ok(()) => true,
        Err(mismatch) => {
            tracing::warn!(
                error = %mismatch,
                invoice_number = signed.invoice_number.as_deref(),
                "Pay2 webhook body differs from the signed notification"
            );
            false
        }
    }
}

async fn process(state: &Pay2WebhookState, notification: &Pay2Notification) -> Result<()> {
    let Some(key) = notification.idempotency_key() else {
        tracing::warn!(
            has_invoice_number = notification.invoice_number.is_some(),
            has_status = notification.status.is_some(),
            "Incomplete Pay2 webhook, acknowledging without processing"
        );
        return Ok(());
    };

    match state.idempotency.try_claim(&key).await? {
        Claim::Claimed => {}
        Claim::Processed => {
            tracing::debug!(key = %key, "Skipping already processed Pay2 notification");
            return Ok(());
        }
        Claim::InFlight => {
            // Not acknowledged: if the owner fails, the gateway must retry
            tracing::info!(key = %key, "Pay2 notification is being processed by another request");
            return Err(in_flight_error());
        }
    }

    tracing::info!(
        invoice_number = notification.invoice_number.as_deref(),
        external_number = notification.external_number.as_deref(),
        status = notification.status.as_ref().map(PaymentStatus::as_str),
        "Processing Pay2 payment"
    );

    let handler = &state.handler;
    let outcome = match notification.status {
        Some(PaymentStatus::Paid) => handler.on_paid(notification).await,
        Some(PaymentStatus::Cancelled) => handler.on_cancelled(notification).await,
        Some(PaymentStatus::Error) => handler.on_failed(notification).await,
        _ => handler.on_unknown(notification).await,
    };

    if let Err(e) = outcome {
        tracing::error!(key = %key, error = %e, "Pay2 payment handler failed");
        if let Err(release_error) = state.idempotency.release(&key).await {
            tracing::warn!(key = %key, error = %release_error, "Failed to release Pay2 claim");
        }
        return Err(e);
    }

    state.idempotency.mark_processed(key).await
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({"error": message}))).into_response()
}
