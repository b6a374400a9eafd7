//! Text processing utilities for transcript formatting and message splitting.
//!
//! Regex patterns use the `lazy-regex` crate: patterns are validated at
//! compile time and initialized lazily on first use.

// Allow non_std_lazy_statics because the lazy_regex! macro uses once_cell
// internally
#![allow(clippy::non_std_lazy_statics)]

use anyhow::Result;
use lazy_regex::lazy_regex;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;
use unicode_segmentation::UnicodeSegmentation;

/// Match one sentence: text up to and including `.`, `!` or `?`
static RE_SENTENCE: lazy_regex::Lazy<regex::Regex> = lazy_regex!(r"[^.!?]+[.!?]+");

/// Sentences grouped into one paragraph of transcript output
pub const SENTENCES_PER_PARAGRAPH: usize = 3;

/// Groups transcript text into paragraphs of up to
/// [`SENTENCES_PER_PARAGRAPH`] sentences, joined by blank lines.
///
/// A sentence is any run of text ending in `.`, `!` or `?`. Text without
/// any sentence terminator is returned as a single paragraph.
///
/// # Examples
///
/// ```
/// use scribe_bot::utils::group_into_paragraphs;
///
/// let text = "One. Two! Three? Four.";
/// assert_eq!(group_into_paragraphs(text), "One. Two! Three?\n\nFour.");
/// ```
#[must_use]
pub fn group_into_paragraphs(text: &str) -> String {
    let sentences: Vec<&str> = RE_SENTENCE.find_iter(text).map(|m| m.as_str()).collect();
    if sentences.is_empty() {
        return text.trim().to_string();
    }

    sentences
        .chunks(SENTENCES_PER_PARAGRAPH)
        .map(|chunk| {
            chunk
                .iter()
                .map(|s| s.trim())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Largest prefix of `s` not exceeding `max` bytes that ends on a grapheme
/// boundary. Falls back to the first grapheme so a caller always makes
/// progress even when one cluster alone exceeds the budget.
fn floor_boundary(s: &str, max: usize) -> usize {
    let mut end = 0;
    for (start, grapheme) in s.grapheme_indices(true) {
        let next = start + grapheme.len();
        if next > max {
            break;
        }
        end = next;
    }
    if end == 0 {
        return s.graphemes(true).next().map_or(s.len(), str::len);
    }
    end
}

/// Splits a message into parts no longer than `max_length` bytes.
///
/// Each cut prefers the last paragraph boundary (`\n\n`) before the budget
/// edge, then the last whitespace, then a hard grapheme-safe cut. The parts
/// are contiguous slices of the input: concatenating them reproduces the
/// original string exactly. Cut-point whitespace is left at the head of the
/// following part and trimmed only at send time.
///
/// # Examples
///
/// ```
/// use scribe_bot::utils::split_long_message;
///
/// let parts = split_long_message("first\n\nsecond", 10);
/// assert_eq!(parts, vec!["first", "\n\nsecond"]);
/// ```
#[must_use]
pub fn split_long_message(message: &str, max_length: usize) -> Vec<String> {
    if message.is_empty() {
        return Vec::new();
    }

    let mut parts = Vec::new();
    let mut rest = message;

    while rest.len() > max_length {
        let boundary = floor_boundary(rest, max_length);
        let window = &rest[..boundary];

        let cut = match window.rfind("\n\n") {
            Some(i) if i > 0 => i,
            _ => match window.rfind(char::is_whitespace) {
                Some(i) if i > 0 => i,
                _ => boundary,
            },
        };

        parts.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }

    parts.push(rest.to_string());
    parts
}

/// Retry a Telegram API operation with exponential backoff.
///
/// Used for Bot API file operations (`get_file` + `download_file`) that may
/// fail on transient network errors. Backoff starts at
/// `TELEGRAM_API_INITIAL_BACKOFF_MS` with jitter and gives up after
/// `TELEGRAM_API_MAX_RETRIES` attempts.
///
/// # Errors
///
/// Returns the last error once all attempts are exhausted.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
    };

    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter)
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} attempts: {}",
            TELEGRAM_API_MAX_RETRIES, e
        );
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_into_paragraphs_three_per_group() {
        let text = "One. Two. Three. Four. Five.";
        assert_eq!(
            group_into_paragraphs(text),
            "One. Two. Three.\n\nFour. Five."
        );
    }

    #[test]
    fn test_group_into_paragraphs_mixed_terminators() {
        let text = "Really? Yes! Great. Bye.";
        assert_eq!(group_into_paragraphs(text), "Really? Yes! Great.\n\nBye.");
    }

    #[test]
    fn test_group_without_terminator_is_single_paragraph() {
        let text = "no punctuation at all";
        assert_eq!(group_into_paragraphs(text), "no punctuation at all");
    }

    #[test]
    fn test_group_empty() {
        assert_eq!(group_into_paragraphs(""), "");
    }

    #[test]
    fn test_split_short_message_untouched() {
        let parts = split_long_message("short", 4000);
        assert_eq!(parts, vec!["short"]);
    }

    #[test]
    fn test_split_prefers_paragraph_boundary() {
        let message = "first paragraph\n\nsecond paragraph";
        let parts = split_long_message(message, 20);

        assert_eq!(parts[0], "first paragraph");
        assert!(parts[1].starts_with("\n\n"));
    }

    #[test]
    fn test_split_falls_back_to_whitespace() {
        let message = "words without any paragraph breaks here";
        let parts = split_long_message(message, 16);

        for part in &parts {
            assert!(part.len() <= 16);
        }
        assert!(parts[0].ends_with("without") || parts[0].ends_with("words"));
    }

    #[test]
    fn test_split_hard_cut_without_whitespace() {
        let message = "a".repeat(9000);
        let parts = split_long_message(&message, 4000);

        assert_eq!(parts.len(), 3);
        for part in &parts {
            assert!(part.len() <= 4000);
        }
    }

    #[test]
    fn test_split_round_trip_exact() {
        let message = "One paragraph.\n\nAnother paragraph with more words in it. \
                       And a third sentence that stretches things out somewhat."
            .repeat(40);
        let parts = split_long_message(&message, 200);

        for part in &parts {
            assert!(part.len() <= 200, "part of {} bytes", part.len());
        }
        assert_eq!(parts.concat(), message);
    }

    #[test]
    fn test_split_unicode_safe() {
        let message = "🔥".repeat(2000); // 4 bytes each
        let parts = split_long_message(&message, 4000);

        assert!(parts.len() >= 2);
        for part in &parts {
            assert!(part.len() <= 4000);
            assert!(part.chars().all(|c| c == '🔥'));
        }
        assert_eq!(parts.concat(), message);
    }

    #[test]
    fn test_split_empty() {
        assert!(split_long_message("", 4000).is_empty());
    }

    #[tokio::test]
    async fn test_retry_returns_first_success() -> Result<()> {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let attempts = AtomicUsize::new(0);
        let value = retry_telegram_operation(|| async {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                anyhow::bail!("transient failure");
            }
            Ok(7)
        })
        .await?;

        assert_eq!(value, 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        Ok(())
    }
}
