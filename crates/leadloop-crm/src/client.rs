// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the CRM API.
//!
//! Handles request construction, bearer authentication, and transient
//! error retry. Lookup misses (404) surface as `NotFound` so flows can
//! short-circuit without treating them as remote failures.

use std::time::Duration;

use async_trait::async_trait;
use leadloop_config::model::CrmConfig;
use leadloop_core::types::{CrmContact, CrmLead};
use leadloop_core::{CrmClient, LeadloopError};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use tracing::{debug, warn};

/// Total attempts per request (initial try plus retries).
const MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between attempts.
const BACKOFF_BASE: Duration = Duration::from_millis(500);

/// HTTP client for CRM communication.
#[derive(Debug, Clone)]
pub struct CrmHttpClient {
    client: reqwest::Client,
    base_url: String,
}

impl CrmHttpClient {
    /// Creates a new CRM client from configuration.
    ///
    /// Requires `crm.subdomain` and `crm.api_token` to be set.
    pub fn new(config: &CrmConfig) -> Result<Self, LeadloopError> {
        let subdomain = config
            .subdomain
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| LeadloopError::Config("crm.subdomain is required".into()))?;
        let token = config
            .api_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LeadloopError::Config("crm.api_token is required".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {token}")).map_err(|e| {
                LeadloopError::Config(format!("invalid CRM token header value: {e}"))
            })?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LeadloopError::Crm {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: format!("https://{subdomain}.kommo.com/api/v4"),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// Execute a request, retrying transient failures with exponential
    /// backoff. The builder must be cloneable (no streaming bodies).
    async fn execute_with_retry(
        &self,
        request: reqwest::RequestBuilder,
        what: &str,
    ) -> Result<reqwest::Response, LeadloopError> {
        let mut last_error = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = BACKOFF_BASE * 2u32.pow(attempt - 1);
                warn!(attempt, ?delay, what, "retrying CRM request");
                tokio::time::sleep(delay).await;
            }

            let req = request.try_clone().ok_or_else(|| LeadloopError::Internal(
                "CRM request body is not cloneable".into(),
            ))?;

            match req.send().await {
                Ok(response) => {
                    let status = response.status();
                    debug!(%status, attempt, what, "CRM response received");
                    if is_transient(status) && attempt + 1 < MAX_ATTEMPTS {
                        let body = response.text().await.unwrap_or_default();
                        last_error = Some(LeadloopError::Crm {
                            message: format!("{what}: API returned {status}: {body}"),
                            source: None,
                        });
                        continue;
                    }
                    return Ok(response);
                }
                Err(e) => {
                    if attempt + 1 < MAX_ATTEMPTS {
                        last_error = Some(LeadloopError::Crm {
                            message: format!("{what}: request failed: {e}"),
                            source: Some(Box::new(e)),
                        });
                        continue;
                    }
                    return Err(LeadloopError::Crm {
                        message: format!("{what}: request failed: {e}"),
                        source: Some(Box::new(e)),
                    });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LeadloopError::Crm {
            message: format!("{what}: request failed after retries"),
            source: None,
        }))
    }

    /// Check a response for success, mapping 404 to `NotFound` and any
    /// other failure to a `Crm` error carrying the body.
    async fn check(
        response: reqwest::Response,
        what: &'static str,
        key: i64,
    ) -> Result<reqwest::Response, LeadloopError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::NOT_FOUND {
            return Err(LeadloopError::not_found(what, key));
        }
        let body = response.text().await.unwrap_or_default();
        Err(LeadloopError::Crm {
            message: format!("{what} {key}: API returned {status}: {body}"),
            source: None,
        })
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl CrmClient for CrmHttpClient {
    async fn get_lead(&self, lead_id: i64) -> Result<CrmLead, LeadloopError> {
        let url = format!("{}/leads/{lead_id}?with=contacts", self.base_url);
        let response = self
            .execute_with_retry(self.client.get(&url), "get_lead")
            .await?;
        let response = Self::check(response, "lead", lead_id).await?;
        response.json().await.map_err(|e| LeadloopError::Crm {
            message: format!("failed to parse lead {lead_id}: {e}"),
            source: Some(Box::new(e)),
        })
    }

    async fn get_contact(&self, contact_id: i64) -> Result<CrmContact, LeadloopError> {
        let url = format!("{}/contacts/{contact_id}", self.base_url);
        let response = self
            .execute_with_retry(self.client.get(&url), "get_contact")
            .await?;
        let response = Self::check(response, "contact", contact_id).await?;
        response.json().await.map_err(|e| LeadloopError::Crm {
            message: format!("failed to parse contact {contact_id}: {e}"),
            source: Some(Box::new(e)),
        })
    }

    async fn update_lead_stage(&self, lead_id: i64, stage_id: i64) -> Result<(), LeadloopError> {
        let url = format!("{}/leads/{lead_id}", self.base_url);
        let body = serde_json::json!({ "status_id": stage_id });
        let response = self
            .execute_with_retry(self.client.patch(&url).json(&body), "update_lead_stage")
            .await?;
        Self::check(response, "lead", lead_id).await?;
        debug!(lead_id, stage_id, "lead stage updated");
        Ok(())
    }

    async fn create_note(&self, lead_id: i64, text: &str) -> Result<(), LeadloopError> {
        let url = format!("{}/leads/{lead_id}/notes", self.base_url);
        // The CRM expects a batch of notes, even for a single one.
        let body = serde_json::json!([{
            "note_type": "common",
            "params": { "text": text }
        }]);
        let response = self
            .execute_with_retry(self.client.post(&url).json(&body), "create_note")
            .await?;
        Self::check(response, "lead", lead_id).await?;
        debug!(lead_id, "note created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: String) -> CrmHttpClient {
        let config = CrmConfig {
            subdomain: Some("test".into()),
            api_token: Some("token".into()),
            human_stage_id: 1,
            request_timeout_secs: 5,
        };
        CrmHttpClient::new(&config).unwrap().with_base_url(base_url)
    }

    #[test]
    fn new_requires_credentials() {
        let config = CrmConfig::default();
        assert!(CrmHttpClient::new(&config).is_err());
    }

    #[tokio::test]
    async fn get_lead_parses_embedded_contacts() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/leads/21500005"))
            .and(query_param("with", "contacts"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": 21500005,
                "responsible_user_id": 11,
                "custom_fields_values": [
                    {"field_name": "uf", "values": [{"value": "MG"}]}
                ],
                "_embedded": {"contacts": [{"id": 24803037, "is_main": true}]}
            })))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let lead = client.get_lead(21500005).await.unwrap();
        assert_eq!(lead.responsible_user_id, Some(11));
        assert_eq!(lead.custom_field("uf").as_deref(), Some("MG"));
        assert_eq!(lead.main_contact_id(), Some(24803037));
    }

    #[tokio::test]
    async fn missing_lead_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/leads/999"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let err = client.get_lead(999).await.unwrap_err();
        assert!(matches!(err, LeadloopError::NotFound { .. }));
    }

    #[tokio::test]
    async fn transient_error_is_retried() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/leads/1"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(2)
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/leads/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": 1})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        client.update_lead_stage(1, 96744300).await.unwrap();
    }

    #[tokio::test]
    async fn note_payload_is_a_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/leads/1/notes"))
            .and(body_json(serde_json::json!([{
                "note_type": "common",
                "params": {"text": "IDENTIFICATION CONFIRMED"}
            }])))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        client.create_note(1, "IDENTIFICATION CONFIRMED").await.unwrap();
    }

    #[tokio::test]
    async fn client_error_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/contacts/5"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad request"))
            .expect(1)
            .mount(&server)
            .await;

        let client = test_client(server.uri());
        let err = client.get_contact(5).await.unwrap_err();
        assert!(matches!(err, LeadloopError::Crm { .. }));
    }
}
