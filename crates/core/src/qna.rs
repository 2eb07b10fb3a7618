use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Path of the answer/speech endpoint, relative to the service base URL.
pub const SYNTHESIZE_SPEECH_PATH: &str = "/synthesize-speech";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Serialize)]
pub struct SpeechRequest<'a> {
    pub context: &'a str,
    pub question: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct SpeechResponse {
    #[serde(default)]
    pub answer: String,
    pub audio_base64: String,
}

/// A spoken answer to one audience question.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    pub audio: Vec<u8>,
}

/// Every way a question can fail to be answered. The presentation treats
/// all of them the same: the question is dropped.
#[derive(Debug, thiserror::Error)]
pub enum QnaError {
    #[error("request to answer service failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("answer service returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("answer audio is not valid base64: {0}")]
    Decode(#[from] base64::DecodeError),
}

impl SpeechResponse {
    pub fn into_answer(self) -> Result<Answer, QnaError> {
        let audio = STANDARD.decode(self.audio_base64.trim())?;
        Ok(Answer {
            text: self.answer,
            audio,
        })
    }
}

// The presentation depends on this trait, not on the HTTP client, so tests
// can pin answers (or failures) without a running speech service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait QnaClient: Send + Sync {
    async fn ask(&self, context: &str, question: &str) -> Result<Answer, QnaError>;
}

/// HTTP client for the `POST /synthesize-speech` endpoint.
pub struct SpeechClient {
    client: Client,
    endpoint: String,
}

impl SpeechClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, QnaError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}{}",
                base_url.trim_end_matches('/'),
                SYNTHESIZE_SPEECH_PATH
            ),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl QnaClient for SpeechClient {
    async fn ask(&self, context: &str, question: &str) -> Result<Answer, QnaError> {
        tracing::debug!("Asking answer service at {}: {:?}", self.endpoint, question);

        let resp = self
            .client
            .post(&self.endpoint)
            .json(&SpeechRequest { context, question })
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(QnaError::Status(resp.status()));
        }

        let body = resp.json::<SpeechResponse>().await?;
        body.into_answer()
    }
}
