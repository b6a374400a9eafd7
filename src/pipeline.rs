//! Per-request transcription pipeline.
//!
//! Orchestrates resolve → size gate → download → (optional extraction) →
//! cache lookup / transcription → formatted reply. Every failure is caught
//! here, logged with full detail, and turned into a short generic chat
//! message; the webhook response to Telegram stays a success acknowledgment
//! regardless.

use crate::media::{self, InboundMessage, MediaError, MediaReference};
use crate::messaging;
use crate::transcription::{TranscribeError, TranscriptionOptions};
use crate::utils;
use crate::webhook::AppState;
use std::sync::Arc;
use teloxide::net::Download;
use teloxide::prelude::*;
use teloxide::types::{ChatId, FileId};
use thiserror::Error;
use tracing::{error, info, warn};

/// Hint sent for text messages and unrecognized update content
const SEND_MEDIA_HINT: &str = "Please send a voice message or video to transcribe.";

/// Everything that can go wrong between a resolved update and a sent reply
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The update carried no usable media or the file is too large
    #[error(transparent)]
    Media(#[from] MediaError),
    /// Fetching the file from the Bot API failed
    #[error("download failed: {0}")]
    Download(String),
    /// The configured audio extractor rejected the container
    #[error("audio extraction failed: {0}")]
    Extract(String),
    /// The transcription provider failed or answered malformed data
    #[error(transparent)]
    Transcribe(#[from] TranscribeError),
}

impl PipelineError {
    /// Short, non-technical message shown to the user. Upstream detail is
    /// never leaked here; it goes to the server log only.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Media(MediaError::Unsupported) => SEND_MEDIA_HINT.to_string(),
            Self::Media(MediaError::TooLarge { limit, .. }) => format!(
                "Sorry, the file exceeds the {} MB limit. Please send a smaller file.",
                limit / (1024 * 1024)
            ),
            Self::Download(_) | Self::Extract(_) => {
                "Sorry, there was an error processing your message. Please try again.".to_string()
            }
            Self::Transcribe(_) => {
                "Sorry, transcription failed. Please try again later.".to_string()
            }
        }
    }
}

/// Entry point for one authenticated webhook update.
///
/// Never returns an error: pipeline failures end as a chat notice so the
/// webhook acknowledgment is unaffected.
pub async fn handle_update(state: &AppState, message: InboundMessage) {
    let chat_id = ChatId(message.chat.id);

    if !message.has_media() {
        if let Err(e) = state.bot.send_message(chat_id, SEND_MEDIA_HINT).await {
            error!(error = %e, chat_id = chat_id.0, "Failed to send media hint");
        }
        return;
    }

    if let Err(err) = process_media(state, chat_id, &message).await {
        error!(error = %err, chat_id = chat_id.0, "Media pipeline failed");
        if let Err(send_err) = state.bot.send_message(chat_id, err.user_message()).await {
            error!(error = %send_err, chat_id = chat_id.0, "Failed to deliver error notice");
        }
    }
}

/// Runs the media pipeline for one message.
async fn process_media(
    state: &AppState,
    chat_id: ChatId,
    message: &InboundMessage,
) -> Result<(), PipelineError> {
    let media = media::resolve(message)?;
    // Reject oversized files before any network call is spent on them
    media::check_size(&media)?;

    info!(
        file_id = %media.file_id,
        size = media.declared_size,
        mime = %media.mime_type,
        "Processing media message"
    );

    // Progress notice is cosmetic; a failure here must not kill the request
    let notice = format!("Transcribing your {}...", media.kind.noun());
    if let Err(e) = state.bot.send_message(chat_id, notice).await {
        warn!(error = %e, chat_id = chat_id.0, "Failed to send progress notice");
    }

    let mut audio = download_media(&state.bot, &media).await?;
    let mut mime_type = media.mime_type.clone();

    if media.kind.is_video() {
        if let Some(extractor) = &state.extractor {
            let extracted = extractor
                .demux(audio)
                .await
                .map_err(|e| PipelineError::Extract(e.to_string()))?;
            audio = extracted.bytes;
            mime_type = extracted.mime_type;
        }
        // Without an extractor the container goes to the provider as-is;
        // Deepgram demuxes audio out of video server-side.
    }

    let options = TranscriptionOptions::standard(&mime_type);
    let provider = Arc::clone(&state.provider);
    let result = state
        .cache
        .get_or_compute(&audio, &options, || {
            let audio = audio.clone();
            let options = options.clone();
            async move { provider.transcribe(audio, &options).await }
        })
        .await?;

    // If the reply itself cannot be sent there is no channel left to
    // notify the user on, so log and end the request normally.
    let reply = messaging::build_transcription_reply(&result);
    if let Err(e) = messaging::send_long_message(&state.bot, chat_id, &reply).await {
        error!(error = %e, chat_id = chat_id.0, "Failed to send transcription reply");
        return Ok(());
    }

    info!(chat_id = chat_id.0, "Transcription sent to user");
    Ok(())
}

/// Fetches the raw bytes behind a media reference via the Bot API, with
/// bounded retry on transient failures.
async fn download_media(bot: &Bot, media: &MediaReference) -> Result<Vec<u8>, PipelineError> {
    let buffer = utils::retry_telegram_operation(|| async {
        let file = bot.get_file(FileId(media.file_id.clone())).await?;
        let mut buf = Vec::new();
        bot.download_file(&file.path, &mut buf).await?;
        Ok(buf)
    })
    .await
    .map_err(|e| PipelineError::Download(e.to_string()))?;

    info!(size = buffer.len(), "File downloaded");
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MAX_FILE_SIZE;

    #[test]
    fn test_user_message_unsupported() {
        let err = PipelineError::Media(MediaError::Unsupported);
        assert_eq!(err.user_message(), SEND_MEDIA_HINT);
    }

    #[test]
    fn test_user_message_names_size_limit() {
        let err = PipelineError::Media(MediaError::TooLarge {
            size: MAX_FILE_SIZE + 1,
            limit: MAX_FILE_SIZE,
        });
        assert!(err.user_message().contains("20 MB"));
    }

    #[test]
    fn test_user_message_never_leaks_upstream_detail() {
        let err = PipelineError::Transcribe(TranscribeError::Api(
            "API error: 403 - key rejected for project 12345".to_string(),
        ));
        let message = err.user_message();

        assert!(!message.contains("12345"));
        assert!(!message.contains("403"));
        assert!(message.contains("Sorry"));
    }

    #[test]
    fn test_user_message_download_is_generic() {
        let err = PipelineError::Download("connection reset by peer".to_string());
        assert!(!err.user_message().contains("connection reset"));
    }
}
