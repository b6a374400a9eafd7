//! Outbound messaging for the transcription bot.
//!
//! Builds the user-facing reply from a transcription result and sends it,
//! splitting across multiple Telegram messages when it exceeds the message
//! size limit.

use crate::config::LOW_CONFIDENCE_THRESHOLD;
use crate::transcription::TranscriptionResult;
use crate::utils;
use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, ParseMode};

/// Maximum message length for Telegram with safety margin.
/// Telegram's official limit is 4096, but we use 4000 to leave room for
/// the formatting markup around the transcript.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

/// Human-readable name for a detected language code
#[must_use]
pub fn language_name(code: Option<&str>) -> &str {
    match code {
        Some("en-US") => "English",
        Some("ru-RU") => "Russian",
        Some(other) => other,
        None => "unknown",
    }
}

/// Builds the reply for a transcription result: detected-language label,
/// confidence percentage, the transcript grouped into paragraphs, and a
/// low-confidence advisory when the provider was unsure.
#[must_use]
pub fn build_transcription_reply(result: &TranscriptionResult) -> String {
    let mut reply = format!(
        "*Detected language:* {}\n\n*Confidence:* {:.2}%\n\n*Transcription:*\n\n{}",
        language_name(result.detected_language.as_deref()),
        result.confidence * 100.0,
        utils::group_into_paragraphs(&result.transcript),
    );

    if result.confidence < LOW_CONFIDENCE_THRESHOLD {
        reply.push_str(
            "\n\n_Note: transcription confidence is low, the result may be inaccurate._",
        );
    }

    reply
}

/// Sends a long message by splitting it into multiple parts.
///
/// Parts are cut at paragraph boundaries where possible (see
/// [`utils::split_long_message`]) and sent sequentially in original order
/// so the chat reads top to bottom. Whitespace induced by the cut points
/// is trimmed from each outbound message.
///
/// # Errors
///
/// Returns an error if any message fails to send.
pub async fn send_long_message(bot: &Bot, chat_id: ChatId, text: &str) -> Result<()> {
    let parts = utils::split_long_message(text, TELEGRAM_MESSAGE_LIMIT);

    for part in parts {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            continue;
        }
        bot.send_message(chat_id, trimmed)
            .parse_mode(ParseMode::Markdown)
            .await?;
    }

    Ok(())
}
