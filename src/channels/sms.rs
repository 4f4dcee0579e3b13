//! SMS delivery via the Twilio Messages REST API.

use async_trait::async_trait;
use secrecy::ExposeSecret;

use crate::channels::DeliveryChannel;
use crate::config::SmsConfig;
use crate::error::DeliveryError;

/// SMS channel backed by Twilio's `Messages.json` endpoint.
pub struct SmsChannel {
    config: SmsConfig,
    client: reqwest::Client,
}

impl SmsChannel {
    pub fn new(config: SmsConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base, self.config.account_sid
        )
    }
}

#[async_trait]
impl DeliveryChannel for SmsChannel {
    async fn send_text(&self, phone: &str, body: &str) -> Result<(), DeliveryError> {
        let resp = self
            .client
            .post(self.api_url())
            .basic_auth(
                &self.config.account_sid,
                Some(self.config.auth_token.expose_secret()),
            )
            .form(&[
                ("To", phone),
                ("From", self.config.from_number.as_str()),
                ("Body", body),
            ])
            .send()
            .await
            .map_err(|e| DeliveryError::SendFailed {
                phone: phone.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(DeliveryError::Api { status, body });
        }

        Ok(())
    }
}
