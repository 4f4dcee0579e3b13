//! Outbound message delivery.

pub mod sms;

use async_trait::async_trait;

use crate::error::DeliveryError;

/// A channel that can deliver a text message to a phone number.
///
/// The hosting process may run without any configured channel; callers must
/// degrade to a local diagnostic path rather than fail.
#[async_trait]
pub trait DeliveryChannel: Send + Sync {
    /// Send `body` to `phone`.
    async fn send_text(&self, phone: &str, body: &str) -> Result<(), DeliveryError>;
}

pub use sms::SmsChannel;
