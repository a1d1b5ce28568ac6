//! Operator alert delivery via webhooks.
//!
//! The treasury monitor and the reconciler raise alerts (low gas balance,
//! stuck messages) that land on an operator-configured webhook URL. When a
//! signing secret is configured the JSON payload is HMAC-SHA256 signed and
//! the signature travels in the `X-Signature` header.

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

/// One operator-facing alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorAlert {
    pub kind: String,
    pub chain: String,
    pub severity: AlertSeverity,
    pub message: String,
    pub timestamp: String,
}

impl OperatorAlert {
    pub fn new(
        kind: impl Into<String>,
        chain: impl Into<String>,
        severity: AlertSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            chain: chain.into(),
            severity,
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AlertNotificationError {
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Webhook error: {0}")]
    WebhookError(String),
    #[error("Signing error: {0}")]
    SigningError(String),
}

#[derive(Debug, Clone)]
pub struct WebhookAlertService {
    client: Client,
    webhook_url: String,
    secret_key: Option<String>,
}

impl WebhookAlertService {
    pub fn new(webhook_url: String, secret_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            webhook_url,
            secret_key,
        }
    }

    fn sign_payload(
        &self,
        payload: &str,
        secret_key: &str,
    ) -> Result<String, AlertNotificationError> {
        let mut mac = HmacSha256::new_from_slice(secret_key.as_bytes())
            .map_err(|e| AlertNotificationError::SigningError(e.to_string()))?;
        mac.update(payload.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    pub async fn send_alert(&self, alert: OperatorAlert) -> Result<(), AlertNotificationError> {
        let payload = serde_json::to_string(&alert)?;

        let mut request = self.client.post(&self.webhook_url).json(&alert);
        if let Some(key) = self.secret_key.as_ref() {
            let signature = self.sign_payload(&payload, key)?;
            request = request.header("X-Signature", signature);
        }
        let response = request.send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            let error_message: String = response.text().await?;
            Err(AlertNotificationError::WebhookError(error_message))
        }
    }
}
