//! OTP issuance and verification state machine.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::code::generate_code;
use crate::channels::DeliveryChannel;
use crate::error::{DatabaseError, OtpError};
use crate::store::Database;

/// How long an issued code stays valid.
const CODE_TTL_MINUTES: i64 = 10;

/// Orchestrates code issuance and verification against the store and the
/// delivery channel. Both dependencies are explicit; `channel` is `None`
/// when SMS credentials are not configured.
pub struct PhoneVerifier {
    db: Arc<dyn Database>,
    channel: Option<Arc<dyn DeliveryChannel>>,
}

impl PhoneVerifier {
    pub fn new(db: Arc<dyn Database>, channel: Option<Arc<dyn DeliveryChannel>>) -> Self {
        Self { db, channel }
    }

    /// Issue a fresh code for `phone`: upsert the buyer, persist the code,
    /// then notify. Persist-then-notify: a delivery failure after the insert
    /// is logged and the already-persisted code stays valid, so the call
    /// still succeeds. Multiple outstanding codes per phone are allowed.
    pub async fn issue_code(&self, phone: &str) -> Result<(), DatabaseError> {
        let code = generate_code();
        let expires_at = Utc::now() + Duration::minutes(CODE_TTL_MINUTES);

        self.db.upsert_buyer(phone).await?;
        self.db.insert_otp(phone, &code, expires_at).await?;

        match &self.channel {
            Some(channel) => {
                let body = format!(
                    "Your verification code is {code}. It expires in {CODE_TTL_MINUTES} minutes."
                );
                if let Err(e) = channel.send_text(phone, &body).await {
                    warn!(phone = %phone, error = %e, "OTP delivery failed; code remains valid");
                }
            }
            None => {
                // Local diagnostic path — the code must never be silently lost.
                info!(phone = %phone, code = %code, "SMS channel not configured, OTP logged only");
            }
        }

        Ok(())
    }

    /// Verify a presented code: exact string match against the most recently
    /// issued unused, unexpired code for `phone`. On success exactly one
    /// stored code transitions to used, the buyer is upserted with its
    /// verified flag set, and the buyer id is returned.
    pub async fn verify_code(&self, phone: &str, code: &str) -> Result<Uuid, OtpError> {
        let consumed = self.db.consume_otp(phone, code, Utc::now()).await?;
        if !consumed {
            return Err(OtpError::InvalidOrExpired);
        }

        let buyer = self.db.mark_phone_verified(phone).await?;
        info!(phone = %phone, buyer_id = %buyer.id, "Phone verified");
        Ok(buyer.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use regex::Regex;
    use std::sync::Mutex;

    use crate::error::DeliveryError;
    use crate::store::LibSqlBackend;

    /// Records every outbound text instead of sending it.
    struct RecordingChannel {
        sent: Mutex<Vec<(String, String)>>,
    }

    impl RecordingChannel {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
            }
        }

        fn last_code(&self) -> String {
            let sent = self.sent.lock().unwrap();
            let (_, body) = sent.last().expect("no message sent");
            Regex::new(r"\d{6}")
                .unwrap()
                .find(body)
                .expect("no code in message body")
                .as_str()
                .to_string()
        }
    }

    #[async_trait]
    impl DeliveryChannel for RecordingChannel {
        async fn send_text(&self, phone: &str, body: &str) -> Result<(), DeliveryError> {
            self.sent
                .lock()
                .unwrap()
                .push((phone.to_string(), body.to_string()));
            Ok(())
        }
    }

    /// A channel that always fails, for the persist-then-notify guarantee.
    struct FailingChannel;

    #[async_trait]
    impl DeliveryChannel for FailingChannel {
        async fn send_text(&self, phone: &str, _body: &str) -> Result<(), DeliveryError> {
            Err(DeliveryError::SendFailed {
                phone: phone.to_string(),
                reason: "unreachable".into(),
            })
        }
    }

    async fn setup() -> (Arc<LibSqlBackend>, Arc<RecordingChannel>, PhoneVerifier) {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let channel = Arc::new(RecordingChannel::new());
        let verifier = PhoneVerifier::new(db.clone(), Some(channel.clone()));
        (db, channel, verifier)
    }

    #[tokio::test]
    async fn issue_then_verify_marks_buyer_verified() {
        let (db, channel, verifier) = setup().await;

        verifier.issue_code("+13185551234").await.unwrap();
        let code = channel.last_code();

        let buyer_id = verifier.verify_code("+13185551234", &code).await.unwrap();

        let buyer = db.get_buyer_by_phone("+13185551234").await.unwrap().unwrap();
        assert_eq!(buyer.id, buyer_id);
        assert!(buyer.phone_verified);
    }

    #[tokio::test]
    async fn wrong_code_fails_without_state_change() {
        let (db, _channel, verifier) = setup().await;

        verifier.issue_code("+13185551234").await.unwrap();
        let err = verifier.verify_code("+13185551234", "000000").await.unwrap_err();
        assert!(matches!(err, OtpError::InvalidOrExpired));

        let buyer = db.get_buyer_by_phone("+13185551234").await.unwrap().unwrap();
        assert!(!buyer.phone_verified);
    }

    #[tokio::test]
    async fn code_is_single_use() {
        let (_db, channel, verifier) = setup().await;

        verifier.issue_code("+13185551234").await.unwrap();
        let code = channel.last_code();

        verifier.verify_code("+13185551234", &code).await.unwrap();
        let second = verifier.verify_code("+13185551234", &code).await;
        assert!(matches!(second, Err(OtpError::InvalidOrExpired)));
    }

    #[tokio::test]
    async fn each_outstanding_code_verifies_independently() {
        let (_db, channel, verifier) = setup().await;

        verifier.issue_code("+13185551234").await.unwrap();
        let first = channel.last_code();
        verifier.issue_code("+13185551234").await.unwrap();
        let second = channel.last_code();

        verifier.verify_code("+13185551234", &second).await.unwrap();
        if first != second {
            verifier.verify_code("+13185551234", &first).await.unwrap();
        }
    }

    #[tokio::test]
    async fn delivery_failure_does_not_fail_issuance() {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let verifier = PhoneVerifier::new(db.clone(), Some(Arc::new(FailingChannel)));

        // Issuance persists before notifying; the notify error is swallowed.
        verifier.issue_code("+13185551234").await.unwrap();
        assert!(db.get_buyer_by_phone("+13185551234").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unconfigured_channel_still_issues() {
        let db = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let verifier = PhoneVerifier::new(db.clone(), None);
        verifier.issue_code("+13185551234").await.unwrap();
        assert!(db.get_buyer_by_phone("+13185551234").await.unwrap().is_some());
    }
}
