// SPDX-FileCopyrightText: 2026 Leadloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the OpenAI-compatible classifier API.
//!
//! Provides chat completions at temperature zero and multipart audio
//! transcription. Transient errors (429, 5xx) retry with bounded
//! exponential backoff.

use std::time::Duration;

use base64::Engine as _;
use leadloop_config::model::ClassifierConfig;
use leadloop_core::LeadloopError;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Total attempts per request (initial try plus retries).
const MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between attempts.
const BACKOFF_BASE: Duration = Duration::from_millis(500);

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatTurn<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatTurn<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatAnswer,
}

#[derive(Debug, Deserialize)]
struct ChatAnswer {
    content: Option<String>,
}

/// Low-level client for chat completions and audio transcription.
#[derive(Debug, Clone)]
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    transcription_model: String,
}

impl ChatCompletionsClient {
    /// Creates a new classifier API client.
    ///
    /// Requires `classifier.api_key` to be set.
    pub fn new(config: &ClassifierConfig) -> Result<Self, LeadloopError> {
        let api_key = config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LeadloopError::Config("classifier.api_key is required".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {api_key}")).map_err(|e| {
                LeadloopError::Config(format!("invalid classifier key header value: {e}"))
            })?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LeadloopError::Classifier {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            transcription_model: config.transcription_model.clone(),
        })
    }

    /// Overrides the base URL (for testing with wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    /// One system + user exchange at temperature zero; returns the
    /// assistant's text.
    pub async fn chat(&self, system: &str, user: &str) -> Result<String, LeadloopError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatTurn {
                    role: "system",
                    content: system,
                },
                ChatTurn {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
        };

        let mut last_error = None;
        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let delay = BACKOFF_BASE * 2u32.pow(attempt - 1);
                warn!(attempt, ?delay, "retrying classifier request");
                tokio::time::sleep(delay).await;
            }

            let result = self.client.post(&url).json(&request).send().await;
            match result {
                Ok(response) => {
                    let status = response.status();
                    debug!(%status, attempt, "classifier response received");
                    if status.is_success() {
                        let parsed: ChatResponse =
                            response.json().await.map_err(|e| LeadloopError::Classifier {
                                message: format!("failed to parse chat response: {e}"),
                                source: Some(Box::new(e)),
                            })?;
                        return parsed
                            .choices
                            .into_iter()
                            .next()
                            .and_then(|c| c.message.content)
                            .ok_or_else(|| LeadloopError::Classifier {
                                message: "chat response carried no content".into(),
                                source: None,
                            });
                    }
                    let retriable =
                        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                    let body = response.text().await.unwrap_or_default();
                    let error = LeadloopError::Classifier {
                        message: format!("API returned {status}: {body}"),
                        source: None,
                    };
                    if retriable && attempt + 1 < MAX_ATTEMPTS {
                        last_error = Some(error);
                        continue;
                    }
                    return Err(error);
                }
                Err(e) => {
                    let error = LeadloopError::Classifier {
                        message: format!("request failed: {e}"),
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

        Err(last_error.unwrap_or_else(|| LeadloopError::Classifier {
            message: "request failed after retries".into(),
            source: None,
        }))
    }

    /// Transcribe a base64-encoded audio payload via the transcription
    /// endpoint. Returns the plain transcript text, trimmed.
    pub async fn transcribe(&self, audio_base64: &str) -> Result<String, LeadloopError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(audio_base64)
            .map_err(|e| LeadloopError::Classifier {
                message: format!("audio payload is not valid base64: {e}"),
                source: Some(Box::new(e)),
            })?;

        let url = format!("{}/audio/transcriptions", self.base_url);
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name("audio.ogg")
            .mime_str("audio/ogg")
            .map_err(|e| LeadloopError::Classifier {
                message: format!("failed to build audio part: {e}"),
                source: Some(Box::new(e)),
            })?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.transcription_model.clone())
            .text("response_format", "text");

        // Multipart bodies are not cloneable, so transcription gets a
        // single attempt; the caller drops the message on failure.
        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| LeadloopError::Classifier {
                message: format!("transcription request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LeadloopError::Classifier {
                message: format!("transcription API returned {status}: {body}"),
                source: None,
            });
        }

        let text = response.text().await.map_err(|e| LeadloopError::Classifier {
            message: format!("failed to read transcription: {e}"),
            source: Some(Box::new(e)),
        })?;
        debug!(chars = text.len(), "audio transcribed");
        Ok(text.trim().to_string())
    }
}
