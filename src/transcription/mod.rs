//! Transcription provider abstraction, options and result types.
//!
//! The concrete Deepgram client lives in [`deepgram`]; the content-addressed
//! memoization layer lives in [`cache`].

pub mod cache;
pub mod deepgram;

use crate::config::TRANSCRIPTION_MODEL;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from the transcription provider
#[derive(Debug, Error)]
pub enum TranscribeError {
    /// Connectivity failure talking to the provider
    #[error("network error: {0}")]
    Network(String),
    /// Non-success status or provider-reported failure
    #[error("API error: {0}")]
    Api(String),
    /// The provider answered 200 but the body lacks the expected structure
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

/// Language handling requested from the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum LanguageMode {
    /// Let the provider detect the spoken language
    Auto,
    /// Transcribe assuming a fixed language code
    Fixed(String),
    /// Code-switching transcription across multiple languages
    Multi,
}

/// Fully determines transcription behavior for a given audio payload.
///
/// Serialized (canonically, via `serde_json`) into the cache key: two
/// requests with identical audio and identical options share a result,
/// any differing field yields a fresh upstream call.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptionOptions {
    /// Mime type of the payload as resolved from the update
    pub mime_type: String,
    /// Apply provider-side punctuation and formatting
    pub smart_format: bool,
    /// Ask the provider to segment output into paragraphs
    pub paragraphs: bool,
    /// Provider model identifier
    pub model: String,
    /// Language handling mode
    pub language: LanguageMode,
}

impl TranscriptionOptions {
    /// The fixed transcription policy used for every inbound file:
    /// smart formatting, paragraph segmentation, the best available
    /// model and multi-language detection.
    #[must_use]
    pub fn standard(mime_type: &str) -> Self {
        Self {
            mime_type: mime_type.to_string(),
            smart_format: true,
            paragraphs: true,
            model: TRANSCRIPTION_MODEL.to_string(),
            language: LanguageMode::Multi,
        }
    }

    /// Query parameters for Deepgram's `/v1/listen` endpoint
    #[must_use]
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("model", self.model.clone()),
            ("smart_format", self.smart_format.to_string()),
            ("paragraphs", self.paragraphs.to_string()),
        ];
        match &self.language {
            LanguageMode::Auto => params.push(("detect_language", "true".to_string())),
            LanguageMode::Fixed(code) => params.push(("language", code.clone())),
            LanguageMode::Multi => {
                params.push(("language", "multi".to_string()));
                params.push(("detect_language", "true".to_string()));
            }
        }
        params
    }
}

/// One transcription outcome. Immutable once produced; cache hits hand out
/// the same instance behind an `Arc`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionResult {
    /// The transcribed text
    pub transcript: String,
    /// Provider confidence in [0, 1]
    pub confidence: f64,
    /// BCP-47 language code the provider detected, if any
    pub detected_language: Option<String>,
}

/// A remote speech-to-text provider
#[async_trait::async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Transcribes a whole audio (or audio-bearing container) payload.
    ///
    /// # Errors
    ///
    /// Returns a [`TranscribeError`] on network failure, provider error or
    /// a structurally invalid response.
    async fn transcribe(
        &self,
        audio: Vec<u8>,
        options: &TranscriptionOptions,
    ) -> Result<TranscriptionResult, TranscribeError>;
}

/// Audio demuxed out of a video container
#[derive(Debug)]
pub struct ExtractedAudio {
    /// The audio-only payload
    pub bytes: Vec<u8>,
    /// Mime type of the extracted payload
    pub mime_type: String,
}

/// Optional capability: demux a video container down to its audio track
/// before transcription. When no extractor is configured the container is
/// handed to the provider unchanged (Deepgram demuxes server-side).
#[async_trait::async_trait]
pub trait AudioExtractor: Send + Sync {
    /// Demuxes the container to an audio-only payload.
    ///
    /// # Errors
    ///
    /// Returns an error when the container has no audio track or cannot
    /// be parsed.
    async fn demux(&self, container: Vec<u8>) -> anyhow::Result<ExtractedAudio>;
}
