// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the WhatsApp gateway API.
//!
//! Timeouts are fixed per call kind: short for text sends, longer for media
//! uploads. Transient failures (429/5xx, transport errors) retry with
//! bounded exponential backoff; a timed-out call is a failure, not retried
//! beyond that policy.

use std::time::Duration;

use async_trait::async_trait;
use leadloop_config::model::WhatsappConfig;
use leadloop_core::{LeadloopError, MessageGateway, MessageId};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};

/// Total attempts per request (initial try plus retries).
const MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between attempts.
const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// The gateway's send receipt; the message key id identifies the delivery.
#[derive(Debug, Deserialize)]
struct SendReceipt {
    #[serde(default)]
    key: Option<ReceiptKey>,
}

#[derive(Debug, Deserialize)]
struct ReceiptKey {
    #[serde(default)]
    id: Option<String>,
}

/// Response shape of the media base64 retrieval endpoint.
#[derive(Debug, Deserialize)]
struct MediaResponse {
    #[serde(default)]
    base64: Option<String>,
    #[serde(default)]
    data: Option<String>,
}

/// HTTP client for gateway communication.
#[derive(Debug, Clone)]
pub struct WhatsAppClient {
    client: reqwest::Client,
    base_url: String,
    send_delay_ms: u64,
    text_timeout: Duration,
    media_timeout: Duration,
    fetch_timeout: Duration,
}

impl WhatsAppClient {
    /// Creates a new gateway client from configuration.
    ///
    /// Requires `whatsapp.base_url` and `whatsapp.api_key` to be set.
    pub fn new(config: &WhatsappConfig) -> Result<Self, LeadloopError> {
        let base_url = config
            .base_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| LeadloopError::Config("whatsapp.base_url is required".into()))?
            .trim_end_matches('/')
            .to_string();
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LeadloopError::Config("whatsapp.api_key is required".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(api_key).map_err(|e| {
                LeadloopError::Config(format!("invalid gateway api key header value: {e}"))
            })?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| LeadloopError::Gateway {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url,
            send_delay_ms: config.send_delay_ms,
            text_timeout: Duration::from_secs(config.text_timeout_secs),
            media_timeout: Duration::from_secs(config.media_timeout_secs),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    async fn post_with_retry(
        &self,
        url: &str,
        body: &serde_json::Value,
        timeout: Duration,
        what: &str,
    ) -> Result<serde_json::Value, LeadloopError> {
        let mut last_error = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = BACKOFF_BASE * 2u32.pow(attempt - 1);
                warn!(attempt, ?delay, what, "retrying gateway request");
                tokio::time::sleep(delay).await;
            }

            let result = self
                .client
                .post(url)
                .timeout(timeout)
                .json(body)
                .send()
                .await;

            match result {
                Ok(response) => {
                    let status = response.status();
                    debug!(%status, attempt, what, "gateway response received");
                    if status.is_success() {
                        return response.json().await.map_err(|e| LeadloopError::Gateway {
                            message: format!("{what}: failed to parse response: {e}"),
                            source: Some(Box::new(e)),
                        });
                    }
                    let retriable =
                        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                    let body_text = response.text().await.unwrap_or_default();
                    let error = LeadloopError::Gateway {
                        message: format!("{what}: API returned {status}: {body_text}"),
                        source: None,
                    };
                    if retriable && attempt + 1 < MAX_ATTEMPTS {
                        last_error = Some(error);
                        continue;
                    }
                    return Err(error);
                }
                Err(e) => {
                    let error = LeadloopError::Gateway {
                        message: format!("{what}: request failed: {e}"),
                        source: Some(Box::new(e)),
                    };
                    if attempt + 1 < MAX_ATTEMPTS {
                        last_error = Some(error);
                        continue;
                    }
                    return Err(error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LeadloopError::Gateway {
            message: format!("{what}: request failed after retries"),
            source: None,
        }))
    }
}

/// The gateway expects destination numbers without the leading `+`.
fn wire_number(number: &str) -> &str {
    number.trim_start_matches('+')
}

fn receipt_id(value: serde_json::Value, what: &str) -> MessageId {
    let id = serde_json::from_value::<SendReceipt>(value)
        .ok()
        .and_then(|r| r.key)
        .and_then(|k| k.id);
    match id {
        Some(id) => MessageId(id),
        None => {
            // Delivery succeeded even when the receipt shape is unexpected.
            debug!(what, "gateway receipt carried no message key id");
            MessageId(String::new())
        }
    }
}

#[async_trait]
impl MessageGateway for WhatsAppClient {
    async fn send_text(
        &self,
        number: &str,
        text: &str,
        instance: &str,
    ) -> Result<MessageId, LeadloopError> {
        let url = format!("{}/message/sendText/{instance}", self.base_url);
        let body = serde_json::json!({
            "number": wire_number(number),
            "text": text,
            "delay": self.send_delay_ms,
        });

        debug!(number = wire_number(number), instance, "sending text");
        let value = self
            .post_with_retry(&url, &body, self.text_timeout, "send_text")
            .await?;
        Ok(receipt_id(value, "send_text"))
    }

    async fn send_media(
        &self,
        number: &str,
        instance: &str,
        file_base64: &str,
        filename: &str,
        caption: &str,
    ) -> Result<MessageId, LeadloopError> {
        let url = format!("{}/message/sendMedia/{instance}", self.base_url);
        let body = serde_json::json!({
            "number": wire_number(number),
            "mediatype": "document",
            "mimetype": "application/pdf",
            "caption": caption,
            "media": file_base64,
            "fileName": filename,
            "delay": self.send_delay_ms,
        });

        debug!(number = wire_number(number), instance, filename, "sending media");
        let value = self
            .post_with_retry(&url, &body, self.media_timeout, "send_media")
            .await?;
        Ok(receipt_id(value, "send_media"))
    }

    async fn fetch_media_base64(
        &self,
        instance: &str,
        message_id: &str,
        remote_jid: &str,
        from_me: bool,
    ) -> Result<String, LeadloopError> {
        let url = format!("{}/chat/getBase64FromMessage/{instance}", self.base_url);
        let body = serde_json::json!({
            "message": {
                "key": {
                    "id": message_id,
                    "fromMe": from_me,
                    "remoteJid": remote_jid,
                }
            },
            "convertToMp4": false,
        });

        debug!(message_id, instance, "fetching media base64");
        let value = self
            .post_with_retry(&url, &body, self.fetch_timeout, "fetch_media_base64")
            .await?;

        // The gateway answers `{ "base64": ... }`, older versions `{ "data": ... }`,
        // and some deployments a bare string.
        if let Ok(media) = serde_json::from_value::<MediaResponse>(value.clone()) {
            if let Some(b64) = media.base64.or(media.data) {
                return Ok(b64);
            }
        }
        if let serde_json::Value::String(b64) = value {
            return Ok(b64);
        }
        Err(LeadloopError::Gateway {
            message: "fetch_media_base64: response carried no base64 payload".into(),
            source: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: String) -> WhatsAppClient {
        let config = WhatsappConfig {
            base_url: Some("http://unused".into()),
            api_key: Some("secret".into()),
            send_delay_ms: 1200,
            text_timeout_secs: 5,
            media_timeout_secs: 5,
            fetch_timeout_secs: 5,
        };
        WhatsAppClient::new(&config).unwrap().with_base_url(base_url)
    }

    #[test]
    fn new_requires_base_url_and_key() {
        assert!(WhatsAppClient::new(&WhatsappConfig::default()).is_err());
    }

    #[tokio::test]
    async fn send_text_strips_plus_and_carries_delay() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/inst-1"))
            .and(header("apikey", "secret"))
            .and(body_partial_json(serde_json::json!({
                "number": "5532991749187",
                "text": "Bom dia",
                "delay": 1200,
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "key": {"id": "MSG-1"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let id = client
            .send_text("+5532991749187", "Bom dia", "inst-1")
            .await
            .unwrap();
        assert_eq!(id.0, "MSG-1");
    }

    #[tokio::test]
    async fn send_media_builds_document_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendMedia/inst-1"))
            .and(body_partial_json(serde_json::json!({
                "mediatype": "document",
                "mimetype": "application/pdf",
                "fileName": "Apresentacao.pdf",
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "key": {"id": "MSG-2"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let id = client
            .send_media("+5532991749187", "inst-1", "QkFTRTY0", "Apresentacao.pdf", "caption")
            .await
            .unwrap();
        assert_eq!(id.0, "MSG-2");
    }

    #[tokio::test]
    async fn send_failure_after_retries_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/inst-1"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let err = client
            .send_text("+5532991749187", "Bom dia", "inst-1")
            .await
            .unwrap_err();
        assert!(matches!(err, LeadloopError::Gateway { .. }));
    }

    #[tokio::test]
    async fn fetch_media_accepts_both_response_shapes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/getBase64FromMessage/inst-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "base64": "AUDIODATA"
            })))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let b64 = client
            .fetch_media_base64("inst-1", "MSG-3", "5532991749187@s.whatsapp.net", false)
            .await
            .unwrap();
        assert_eq!(b64, "AUDIODATA");
    }
}
