//! Pay2 webhook handling.
//!
//! Provides envelope verification and decryption, notification parsing,
//! idempotency checking, and an axum route for incoming deliveries.

pub mod config;
pub mod envelope;
pub mod handler;
pub mod idempotency;
pub mod notification;
pub mod verification;

pub use config::Pay2Config;
pub use envelope::Envelope;
pub use handler::{
    PaymentEventHandler, Pay2WebhookState, SIGNATURE_HEADER, WEBHOOK_PATH, pay2_routes,
    receive_pay2_webhook,
};
pub use idempotency::{Claim, CounterIdempotencyStore, IdempotencyStore, MemoryIdempotencyStore};
pub use notification::{Pay2Notification, PayloadMismatch, PaymentStatus, cross_check};
pub use verification::{Pay2Verifier, VerificationFailure};
