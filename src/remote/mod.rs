//! Remote services the pipeline delegates to: screenshot rendering, image
//! download, object storage and email delivery.
//!
//! Each service sits behind a small trait so the orchestrator can be driven
//! by in-memory fakes in tests. The HTTP implementations share one blocking
//! `reqwest` client carrying the configured timeout and user agent.

pub mod blob;
pub mod fetch;
pub mod microlink;
pub mod resend;

pub use blob::BlobStore;
pub use fetch::HttpImageFetcher;
pub use microlink::MicrolinkClient;
pub use resend::ResendNotifier;

use crate::{ArtifactUrl, CaptureConfig, Error, ImageLocation, NormalizedUrl, Result};
use reqwest::blocking::Client;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Content type every artifact is stored with
pub const PNG_CONTENT_TYPE: &str = "image/png";

/// Asks a screenshot service to render `url` and reports where the image is.
pub trait ScreenshotService: Send + Sync {
    fn request_screenshot(&self, url: &NormalizedUrl) -> Result<ImageLocation>;
}

/// Downloads the rendered image.
pub trait ImageFetcher: Send + Sync {
    fn download_image(&self, location: &ImageLocation) -> Result<Vec<u8>>;
}

/// Uploads bytes with public read access and returns their public URL.
pub trait ArtifactStore: Send + Sync {
    fn store_artifact(&self, bytes: &[u8], content_type: &str) -> Result<ArtifactUrl>;
}

/// Tells the submitter where their screenshot ended up.
pub trait Notifier: Send + Sync {
    fn notify(&self, email: &str, url: &NormalizedUrl, artifact: &ArtifactUrl) -> Result<()>;
}

/// Build the blocking client shared by all HTTP-backed services.
pub fn http_client(config: &CaptureConfig) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))
}

static KEY_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Storage key for a new artifact: `<namespace>/<unix-millis>-<suffix>.png`.
///
/// The suffix hashes the timestamp, a process-wide counter and the image, so
/// two uploads within the same millisecond still land on different keys.
pub fn storage_key(namespace: &str, bytes: &[u8]) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    let seq = KEY_COUNTER.fetch_add(1, Ordering::Relaxed);
    key_for(namespace, millis, seq, bytes)
}

fn key_for(namespace: &str, millis: u128, seq: u64, bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(millis.to_le_bytes());
    hasher.update(seq.to_le_bytes());
    hasher.update(bytes);
    let digest = hasher.finalize();
    format!(
        "{}/{}-{}.png",
        namespace.trim_matches('/'),
        millis,
        hex::encode(&digest[..4])
    )
}

/// Shorten a response body for log/error output.
pub(crate) fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    let trimmed = body.trim();
    match trimmed.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}
