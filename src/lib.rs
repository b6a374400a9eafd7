#![deny(missing_docs)]
//! Scribe Bot - Telegram voice transcription relay
//!
//! A webhook-driven Telegram bot that downloads voice, audio and video
//! messages, transcribes them through Deepgram, and replies with the
//! formatted transcript. Results are memoized in a content-addressed,
//! TTL-bound cache so identical media is transcribed only once.

/// Configuration management
pub mod config;
/// Inbound update model and media resolution
pub mod media;
/// Outbound message formatting and chunked sending
pub mod messaging;
/// Per-request transcription pipeline
pub mod pipeline;
/// Transcription provider, options and cache
pub mod transcription;
pub mod utils;
/// Webhook HTTP server and authentication
pub mod webhook;
