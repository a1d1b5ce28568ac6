//! HTTP client for the protocol hub.
//!
//! Three calls matter to the relayer: pushing classified domain events,
//! requesting verification of a contract call observed on the connected
//! chain, and flagging messages that will never execute. Transport-level
//! failures and 5xx/429 responses map to `ProtocolClientError::Retriable`
//! so the job layer can re-enqueue the batch.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
#[cfg(test)]
use mockall::automock;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::models::{PostEventsResponse, ProtocolClientError, ProtocolEvent, VerificationOutcome};

const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProtocolClientTrait: Send + Sync {
    /// Pushes a batch of domain events for one chain. The hub answers per
    /// event; a transport failure fails the whole batch.
    async fn post_events(
        &self,
        chain: &str,
        events: Vec<ProtocolEvent>,
    ) -> Result<PostEventsResponse, ProtocolClientError>;

    /// Asks the hub to verify a contract call emitted on `source_chain`.
    async fn verify_message(
        &self,
        source_chain: &str,
        message_id: &str,
    ) -> Result<VerificationOutcome, ProtocolClientError>;

    /// Reports a message that will never be executed locally.
    async fn notify_cannot_execute(
        &self,
        chain: &str,
        event: ProtocolEvent,
    ) -> Result<(), ProtocolClientError>;
}

#[derive(Serialize)]
struct PostEventsRequest {
    events: Vec<ProtocolEvent>,
}

#[derive(Serialize)]
struct VerifyRequest<'a> {
    message_id: &'a str,
}

#[derive(Deserialize)]
struct VerifyResponse {
    status: VerificationOutcome,
}

pub struct HttpProtocolClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpProtocolClient {
    pub fn new(base_url: String, api_key: String) -> Result<Self, ProtocolClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS))
            .build()
            .map_err(|e| ProtocolClientError::RequestError(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, ProtocolClientError> {
        let response = self
            .client
            .post(self.url(path))
            .header("x-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_error_status(status, body))
    }
}

/// Maps a non-2xx hub response to an error. Rate limits and server-side
/// failures are retriable; everything else is a hard rejection.
fn classify_error_status(status: StatusCode, body: String) -> ProtocolClientError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        ProtocolClientError::Retriable(format!("{}: {}", status.as_u16(), body))
    } else {
        ProtocolClientError::UnexpectedResponse {
            status: status.as_u16(),
            body,
        }
    }
}

#[async_trait]
impl ProtocolClientTrait for HttpProtocolClient {
    async fn post_events(
        &self,
        chain: &str,
        events: Vec<ProtocolEvent>,
    ) -> Result<PostEventsResponse, ProtocolClientError> {
        debug!("Posting {} events for chain {}", events.len(), chain);
        let response = self
            .post(
                &format!("/chains/{}/events", chain),
                &PostEventsRequest { events },
            )
            .await?;
        let parsed: PostEventsResponse = response
            .json()
            .await
            .map_err(|e| ProtocolClientError::DecodeError(e.to_string()))?;
        let rejected = parsed.results.iter().filter(|r| !r.accepted).count();
        if rejected > 0 {
            warn!("Hub rejected {} of {} events", rejected, parsed.results.len());
        }
        Ok(parsed)
    }

    async fn verify_message(
        &self,
        source_chain: &str,
        message_id: &str,
    ) -> Result<VerificationOutcome, ProtocolClientError> {
        let response = self
            .post(
                &format!("/chains/{}/verifications", source_chain),
                &VerifyRequest { message_id },
            )
            .await?;
        let parsed: VerifyResponse = response
            .json()
            .await
            .map_err(|e| ProtocolClientError::DecodeError(e.to_string()))?;
        Ok(parsed.status)
    }

    async fn notify_cannot_execute(
        &self,
        chain: &str,
        event: ProtocolEvent,
    ) -> Result<(), ProtocolClientError> {
        self.post(
            &format!("/chains/{}/events", chain),
            &PostEventsRequest {
                events: vec![event],
            },
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_errors_are_retriable() {
        let err = classify_error_status(StatusCode::INTERNAL_SERVER_ERROR, "boom".to_string());
        assert!(matches!(err, ProtocolClientError::Retriable(_)));

        let err = classify_error_status(StatusCode::TOO_MANY_REQUESTS, String::new());
        assert!(matches!(err, ProtocolClientError::Retriable(_)));
    }

    #[test]
    fn test_client_errors_are_hard_rejections() {
        let err = classify_error_status(StatusCode::BAD_REQUEST, "invalid event".to_string());
        match err {
            ProtocolClientError::UnexpectedResponse { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "invalid event");
            }
            other => panic!("Expected UnexpectedResponse, got {:?}", other),
        }
    }

    #[test]
    fn test_event_wire_format_uses_type_tag() {
        let event = ProtocolEvent::SignersRotated {
            event_id: "chain_0xabc-1".to_string(),
            epoch: 7,
            signers_hash: "0x11".to_string(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SIGNERS_ROTATED");
        assert_eq!(json["epoch"], 7);
    }

    #[test]
    fn test_base_url_trailing_slash_normalized() {
        let client =
            HttpProtocolClient::new("http://hub.example/api/".to_string(), "key".to_string())
                .unwrap();
        assert_eq!(client.url("/chains/x/events"), "http://hub.example/api/chains/x/events");
    }
}
