use dotenvy::dotenv;
use regex::Regex;
use scribe_bot::config::{Settings, CACHE_MAX_CAPACITY, CACHE_SWEEP_INTERVAL_SECS, CACHE_TTL_SECS};
use scribe_bot::transcription::cache::TranscriptionCache;
use scribe_bot::transcription::deepgram::DeepgramClient;
use scribe_bot::transcription::TranscriptionProvider;
use scribe_bot::webhook::auth::WebhookAuthenticator;
use scribe_bot::webhook::{self, AppState};
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tracing::{debug, error, info};
use tracing_subscriber::{prelude::*, EnvFilter};
use url::Url;

/// Regex patterns for redacting sensitive data.
///
/// Bot API file URLs embed the bot token, so download errors would leak it
/// into the log without this.
struct RedactionPatterns {
    token_url: Regex,
    token_bare: Regex,
    token_prefixed: Regex,
    deepgram_key: Regex,
}

impl RedactionPatterns {
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token_url: Regex::new(r"(https?://[^/]+/(?:bot|file/bot))([0-9]+:[A-Za-z0-9_-]+)")?,
            token_bare: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token_prefixed: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            deepgram_key: Regex::new(r"(Token )[0-9a-fA-F]{30,}")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token_url
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token_bare
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token_prefixed
            .replace_all(&output, "$1[MASKED]")
            .to_string();
        output = self
            .deepgram_key
            .replace_all(&output, "$1[MASKED]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // Report the original length to satisfy the Write contract even
        // when the redacted string length differs.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: (self.make_inner)(),
            patterns: self.patterns.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting Scribe Bot...");

    let settings = init_settings();

    let bot = Bot::new(settings.telegram_token.clone());
    let authenticator = Arc::new(WebhookAuthenticator::new(&settings.telegram_token));
    let provider: Arc<dyn TranscriptionProvider> =
        Arc::new(DeepgramClient::new(settings.deepgram_api_key.clone()));
    info!("Deepgram client initialized.");

    let cache = Arc::new(TranscriptionCache::new(CACHE_TTL_SECS, CACHE_MAX_CAPACITY));
    spawn_cache_sweep(Arc::clone(&cache));

    register_webhook(&bot, &settings, &authenticator).await;

    let state = AppState {
        bot,
        authenticator,
        provider,
        cache,
        extractor: None,
    };

    webhook::run(state, &settings.host, settings.port).await?;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter {
        make_inner: io::stderr,
        patterns,
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Settings {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

/// Registers the webhook with Telegram, carrying the secret token the
/// authenticator expects on every callback. Skipped when no public URL is
/// configured (the webhook is then assumed to be registered out of band).
async fn register_webhook(bot: &Bot, settings: &Settings, authenticator: &WebhookAuthenticator) {
    let Some(raw_url) = &settings.webhook_url else {
        info!("WEBHOOK_URL not set; skipping webhook registration");
        return;
    };

    let url = match Url::parse(raw_url) {
        Ok(url) => url,
        Err(e) => {
            error!("Invalid WEBHOOK_URL {raw_url}: {e}");
            std::process::exit(1);
        }
    };

    match bot
        .set_webhook(url)
        .secret_token(authenticator.secret_token().to_string())
        .await
    {
        Ok(_) => info!("Webhook registered at {raw_url}"),
        Err(e) => {
            error!("Failed to register webhook: {}", e);
            std::process::exit(1);
        }
    }
}

/// Periodic cache maintenance so expired entries are reclaimed even when
/// the bot sits idle between messages.
fn spawn_cache_sweep(cache: Arc<TranscriptionCache>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(CACHE_SWEEP_INTERVAL_SECS));
        interval.tick().await; // the first tick completes immediately
        loop {
            interval.tick().await;
            cache.run_maintenance().await;
            let status = cache.status().await;
            debug!(
                size = status.size,
                hits = status.hits,
                "Cache sweep complete"
            );
        }
    });
}
