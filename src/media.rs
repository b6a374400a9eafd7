//! Inbound update model and media resolution
//!
//! Deserializes the webhook body Telegram posts to us and resolves the
//! message's media field into a downloadable [`MediaReference`]. The size
//! gate lives here too: oversized files are rejected before any network
//! call is made on their behalf.

use crate::config::MAX_FILE_SIZE;
use serde::Deserialize;
use thiserror::Error;

/// Errors produced while resolving inbound media
#[derive(Debug, Error)]
pub enum MediaError {
    /// The message carries neither a recognized media field nor text
    #[error("unsupported media type")]
    Unsupported,
    /// The declared file size exceeds the download ceiling
    #[error("file too large: {size} bytes (limit {limit})")]
    TooLarge {
        /// Declared size of the offending file in bytes
        size: u64,
        /// The configured ceiling in bytes
        limit: u64,
    },
}

/// One webhook update as Telegram posts it: `{"update_id": .., "message": ..}`
#[derive(Debug, Deserialize)]
pub struct WebhookUpdate {
    /// The message payload, absent for update kinds we do not handle
    pub message: Option<InboundMessage>,
}

/// The subset of a Telegram message this bot acts on
#[derive(Debug, Deserialize)]
pub struct InboundMessage {
    /// Chat the message arrived in (and where replies go)
    pub chat: Chat,
    /// Plain text content, if any
    pub text: Option<String>,
    /// Voice note payload
    pub voice: Option<MediaPayload>,
    /// Audio file payload
    pub audio: Option<MediaPayload>,
    /// Video file payload
    pub video: Option<MediaPayload>,
    /// Round video note payload
    pub video_note: Option<MediaPayload>,
}

impl InboundMessage {
    /// Whether any transcribable media field is populated
    #[must_use]
    pub const fn has_media(&self) -> bool {
        self.voice.is_some()
            || self.audio.is_some()
            || self.video.is_some()
            || self.video_note.is_some()
    }
}

/// Chat identification
#[derive(Debug, Deserialize)]
pub struct Chat {
    /// Unique chat identifier
    pub id: i64,
}

/// File metadata common to all Telegram media kinds
#[derive(Debug, Deserialize)]
pub struct MediaPayload {
    /// Identifier used with `getFile` to locate the file
    pub file_id: String,
    /// Size declared by Telegram, absent for some forwarded media
    pub file_size: Option<u64>,
    /// Mime type declared by Telegram, absent for video notes
    pub mime_type: Option<String>,
}

/// The kind of media a message carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Voice note recorded in the Telegram client
    Voice,
    /// Uploaded audio file
    Audio,
    /// Uploaded video file
    Video,
    /// Round video note recorded in the Telegram client
    VideoNote,
}

impl MediaKind {
    /// Whether this kind wraps audio in a video container
    #[must_use]
    pub const fn is_video(self) -> bool {
        matches!(self, Self::Video | Self::VideoNote)
    }

    /// Short noun for user-facing progress messages
    #[must_use]
    pub const fn noun(self) -> &'static str {
        match self {
            Self::Voice | Self::Audio => "audio",
            Self::Video | Self::VideoNote => "video",
        }
    }
}

/// Resolved identity and metadata of a remote file, prior to download
#[derive(Debug, Clone)]
pub struct MediaReference {
    /// Telegram file identifier
    pub file_id: String,
    /// Size in bytes as declared by Telegram (0 when undeclared)
    pub declared_size: u64,
    /// What kind of media the file is
    pub kind: MediaKind,
    /// Mime type forwarded to the transcription provider
    pub mime_type: String,
}

/// Resolves a message's populated media field into a [`MediaReference`].
///
/// Fields are inspected in fixed priority order: voice, audio, video,
/// video note. Telegram's declared mime type wins when present; otherwise
/// each kind falls back to its conventional container type.
///
/// # Errors
///
/// Returns [`MediaError::Unsupported`] when no recognized media field is
/// populated.
pub fn resolve(message: &InboundMessage) -> Result<MediaReference, MediaError> {
    let (payload, kind, default_mime) = if let Some(voice) = &message.voice {
        (voice, MediaKind::Voice, "audio/ogg")
    } else if let Some(audio) = &message.audio {
        (audio, MediaKind::Audio, "audio/mpeg")
    } else if let Some(video) = &message.video {
        (video, MediaKind::Video, "video/mp4")
    } else if let Some(video_note) = &message.video_note {
        (video_note, MediaKind::VideoNote, "video/mp4")
    } else {
        return Err(MediaError::Unsupported);
    };

    Ok(MediaReference {
        file_id: payload.file_id.clone(),
        declared_size: payload.file_size.unwrap_or(0),
        kind,
        mime_type: payload
            .mime_type
            .clone()
            .unwrap_or_else(|| default_mime.to_string()),
    })
}

/// Enforces the maximum-size policy on a resolved reference.
///
/// Must be called strictly before any download to avoid wasting bandwidth
/// on files the Bot API would refuse to serve anyway.
///
/// # Errors
///
/// Returns [`MediaError::TooLarge`] when the declared size exceeds
/// [`MAX_FILE_SIZE`].
pub const fn check_size(media: &MediaReference) -> Result<(), MediaError> {
    if media.declared_size > MAX_FILE_SIZE {
        return Err(MediaError::TooLarge {
            size: media.declared_size,
            limit: MAX_FILE_SIZE,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(file_id: &str, size: u64) -> MediaPayload {
        MediaPayload {
            file_id: file_id.to_string(),
            file_size: Some(size),
            mime_type: None,
        }
    }

    fn empty_message() -> InboundMessage {
        InboundMessage {
            chat: Chat { id: 42 },
            text: None,
            voice: None,
            audio: None,
            video: None,
            video_note: None,
        }
    }

    #[test]
    fn test_resolve_voice_defaults_to_ogg() -> Result<(), MediaError> {
        let mut msg = empty_message();
        msg.voice = Some(payload("abc", 1000));

        let media = resolve(&msg)?;
        assert_eq!(media.file_id, "abc");
        assert_eq!(media.declared_size, 1000);
        assert_eq!(media.kind, MediaKind::Voice);
        assert_eq!(media.mime_type, "audio/ogg");
        Ok(())
    }

    #[test]
    fn test_resolve_priority_voice_over_video() -> Result<(), MediaError> {
        let mut msg = empty_message();
        msg.voice = Some(payload("v1", 100));
        msg.video = Some(payload("v2", 200));

        let media = resolve(&msg)?;
        assert_eq!(media.file_id, "v1");
        assert_eq!(media.kind, MediaKind::Voice);
        Ok(())
    }

    #[test]
    fn test_resolve_audio_reads_own_field() -> Result<(), MediaError> {
        let mut msg = empty_message();
        msg.audio = Some(MediaPayload {
            file_id: "song".to_string(),
            file_size: Some(5000),
            mime_type: Some("audio/flac".to_string()),
        });

        let media = resolve(&msg)?;
        assert_eq!(media.file_id, "song");
        assert_eq!(media.kind, MediaKind::Audio);
        // Declared mime wins over the audio/mpeg fallback
        assert_eq!(media.mime_type, "audio/flac");
        Ok(())
    }

    #[test]
    fn test_resolve_video_note() -> Result<(), MediaError> {
        let mut msg = empty_message();
        msg.video_note = Some(payload("round", 3000));

        let media = resolve(&msg)?;
        assert_eq!(media.kind, MediaKind::VideoNote);
        assert_eq!(media.mime_type, "video/mp4");
        assert!(media.kind.is_video());
        Ok(())
    }

    #[test]
    fn test_resolve_unsupported() {
        let msg = empty_message();
        assert!(matches!(resolve(&msg), Err(MediaError::Unsupported)));
    }

    #[test]
    fn test_size_gate_rejects_over_limit() {
        let media = MediaReference {
            file_id: "big".to_string(),
            declared_size: MAX_FILE_SIZE + 1,
            kind: MediaKind::Voice,
            mime_type: "audio/ogg".to_string(),
        };

        assert!(matches!(
            check_size(&media),
            Err(MediaError::TooLarge { size, limit })
                if size == MAX_FILE_SIZE + 1 && limit == MAX_FILE_SIZE
        ));
    }

    #[test]
    fn test_size_gate_accepts_at_limit() {
        let media = MediaReference {
            file_id: "ok".to_string(),
            declared_size: MAX_FILE_SIZE,
            kind: MediaKind::Voice,
            mime_type: "audio/ogg".to_string(),
        };

        assert!(check_size(&media).is_ok());
    }

    #[test]
    fn test_undeclared_size_passes_gate() -> Result<(), MediaError> {
        let mut msg = empty_message();
        msg.voice = Some(MediaPayload {
            file_id: "fwd".to_string(),
            file_size: None,
            mime_type: None,
        });

        let media = resolve(&msg)?;
        assert_eq!(media.declared_size, 0);
        assert!(check_size(&media).is_ok());
        Ok(())
    }

    #[test]
    fn test_deserialize_webhook_body() -> Result<(), serde_json::Error> {
        let body = r#"{
            "update_id": 10000,
            "message": {
                "chat": {"id": 1111, "type": "private"},
                "voice": {"file_id": "abc", "file_size": 1000, "duration": 3}
            }
        }"#;

        let update: WebhookUpdate = serde_json::from_str(body)?;
        let message = update.message.expect("message present");
        assert_eq!(message.chat.id, 1111);
        assert!(message.has_media());
        assert!(message.voice.is_some());
        Ok(())
    }
}
