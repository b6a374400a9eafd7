//! Deepgram pre-recorded transcription client

use super::{TranscribeError, TranscriptionOptions, TranscriptionProvider, TranscriptionResult};
use crate::config::{DEEPGRAM_API_URL, DEEPGRAM_HTTP_TIMEOUT_SECS};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Client for Deepgram's `/v1/listen` pre-recorded endpoint
pub struct DeepgramClient {
    api_key: String,
    http_client: HttpClient,
}

impl DeepgramClient {
    /// Creates a client with the standard request timeout.
    ///
    /// The timeout prevents infinite hangs when the API is slow on long
    /// recordings.
    #[must_use]
    pub fn new(api_key: String) -> Self {
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(DEEPGRAM_HTTP_TIMEOUT_SECS))
            .build()
            .unwrap_or_else(|_| HttpClient::new());

        Self {
            api_key,
            http_client,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: Option<ListenResults>,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
    detected_language: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    transcript: String,
    confidence: f64,
}

/// Validates the response structure and extracts the first alternative
/// of the first channel.
fn into_result(response: ListenResponse) -> Result<TranscriptionResult, TranscribeError> {
    let results = response
        .results
        .ok_or_else(|| TranscribeError::MalformedResponse("missing results".to_string()))?;

    let channel = results
        .channels
        .into_iter()
        .next()
        .ok_or_else(|| TranscribeError::MalformedResponse("no channels".to_string()))?;

    let detected_language = channel.detected_language;
    let alternative = channel
        .alternatives
        .into_iter()
        .next()
        .ok_or_else(|| TranscribeError::MalformedResponse("no alternatives".to_string()))?;

    Ok(TranscriptionResult {
        transcript: alternative.transcript,
        confidence: alternative.confidence,
        detected_language,
    })
}

#[async_trait::async_trait]
impl TranscriptionProvider for DeepgramClient {
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        options: &TranscriptionOptions,
    ) -> Result<TranscriptionResult, TranscribeError> {
        debug!(
            size = audio.len(),
            mime = %options.mime_type,
            model = %options.model,
            "Sending media to Deepgram for transcription"
        );

        let response = self
            .http_client
            .post(DEEPGRAM_API_URL)
            .query(&options.query_params())
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", &options.mime_type)
            .body(audio)
            .send()
            .await
            .map_err(|e| TranscribeError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            // Truncate very long error bodies
            let truncated = if error_text.len() > 500 {
                format!("{}... (truncated)", &error_text[..500])
            } else {
                error_text
            };
            return Err(TranscribeError::Api(format!(
                "API error: {status} - {truncated}"
            )));
        }

        let parsed: ListenResponse = response
            .json()
            .await
            .map_err(|e| TranscribeError::MalformedResponse(e.to_string()))?;

        let result = into_result(parsed)?;
        info!(
            confidence = result.confidence,
            language = ?result.detected_language,
            "Transcription received"
        );
        Ok(result)
    }
}
