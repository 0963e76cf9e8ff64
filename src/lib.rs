//! Shotvault
//!
//! Captures a screenshot of a URL through a screenshot service, stores the
//! image in public object storage and optionally emails a link to the
//! submitter. The last-used email/URL pair is handed back to the caller to be
//! remembered as a long-lived preference.
//!
//! # Pipeline
//!
//! `validate → request screenshot → download image → store artifact →
//! persist preferences → (notify)`. Every step is a single attempt; the first
//! failure ends the run with a [`CaptureResult`] carrying a localized message.
//! A failed notification is reported separately and never fails the capture.
//!
//! # Example
//!
//! ```no_run
//! use shotvault::{CaptureConfig, StorageConfig, SubmissionInput};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CaptureConfig {
//!     storage: StorageConfig {
//!         token: "vercel_blob_rw_...".to_string(),
//!         ..Default::default()
//!     },
//!     ..Default::default()
//! };
//!
//! let orchestrator = shotvault::new_orchestrator(&config)?;
//! let submission = orchestrator.submit(&SubmissionInput::new("a@b.com", "example.com"));
//! println!("{:?}", submission.result.artifact_url);
//! # Ok(())
//! # }
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod error;
pub use error::{Error, ErrorKind, RemoteStage, Result, ValidationError};

pub mod validate;

// Clients for the screenshot, storage and email services
pub mod remote;

pub mod orchestrator;
pub use orchestrator::{Orchestrator, Stage, Submission};

pub mod prefs;
pub use prefs::{PreferenceStore, Preferences};

// HTTP front end (form page + JSON API)
pub mod web;

// Async-friendly wrapper for tokio callers
pub mod async_api;
pub use async_api::AsyncOrchestrator;

/// Configuration for a capture pipeline
///
/// The defaults point at the public service endpoints and use a 30 second
/// timeout for every remote call. Storage needs a token before it can be
/// used; notification is disabled unless `notify` is set.
///
/// # Examples
///
/// ```
/// let cfg = shotvault::CaptureConfig::default();
/// assert_eq!(cfg.timeout_ms, 30_000);
/// assert!(cfg.notify.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// User agent sent with every outbound request
    pub user_agent: String,
    /// Timeout applied to each remote call in milliseconds
    pub timeout_ms: u64,
    /// Screenshot service settings
    pub screenshot: ScreenshotConfig,
    /// Object store settings
    pub storage: StorageConfig,
    /// Email service settings; `None` skips notification entirely
    pub notify: Option<NotifyConfig>,
    /// Values used to prefill the form when nothing has been remembered yet
    pub defaults: Preferences,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("shotvault/{}", env!("CARGO_PKG_VERSION")),
            timeout_ms: 30_000,
            screenshot: ScreenshotConfig::default(),
            storage: StorageConfig::default(),
            notify: None,
            defaults: Preferences {
                email: String::new(),
                url: "https://example.com/".to_string(),
            },
        }
    }
}

/// Screenshot service (Microlink) settings
#[derive(Debug, Clone)]
pub struct ScreenshotConfig {
    pub base_url: String,
    /// Pro plan key, sent as `x-api-key`
    pub api_key: Option<String>,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.microlink.io".to_string(),
            api_key: None,
        }
    }
}

/// Object store (blob API) settings
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub base_url: String,
    /// Read/write token sent as a bearer credential
    pub token: String,
    /// Key prefix every artifact is stored under
    pub namespace: String,
    /// Value of the `x-api-version` header
    pub api_version: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            base_url: "https://blob.vercel-storage.com".to_string(),
            token: String::new(),
            namespace: "screenshots".to_string(),
            api_version: "7".to_string(),
        }
    }
}

/// Email service (Resend) settings
#[derive(Debug, Clone)]
pub struct NotifyConfig {
    pub base_url: String,
    pub api_key: String,
    /// Fixed sender, e.g. `Screenshots <onboarding@resend.dev>`
    pub from: String,
}

impl NotifyConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: "https://api.resend.com".to_string(),
            api_key: api_key.into(),
            from: "Screenshots <onboarding@resend.dev>".to_string(),
        }
    }
}

/// Raw form submission, not yet validated
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SubmissionInput {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub url: String,
}

impl SubmissionInput {
    pub fn new(email: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            url: url.into(),
        }
    }
}

/// A canonical absolute URL produced by [`validate::normalize_url`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedUrl(String);

impl NormalizedUrl {
    pub(crate) fn from_parsed(url: url::Url) -> Self {
        NormalizedUrl(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where the screenshot service put the generated image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageLocation(String);

impl ImageLocation {
    pub fn new(url: impl Into<String>) -> Self {
        ImageLocation(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Public URL of a stored artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactUrl(String);

impl ArtifactUrl {
    pub fn new(url: impl Into<String>) -> Self {
        ArtifactUrl(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ArtifactUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one submission as reported to the submitter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResult {
    pub ok: bool,
    /// Localized message from the error catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_email: Option<String>,
}

impl CaptureResult {
    pub fn success(artifact: &ArtifactUrl, used_url: &NormalizedUrl, used_email: &str) -> Self {
        Self {
            ok: true,
            error: None,
            error_kind: None,
            artifact_url: Some(artifact.as_str().to_string()),
            used_url: Some(used_url.as_str().to_string()),
            used_email: Some(used_email.to_string()),
        }
    }

    pub fn failure(kind: ErrorKind) -> Self {
        Self {
            ok: false,
            error: Some(kind.message().to_string()),
            error_kind: Some(kind),
            artifact_url: None,
            used_url: None,
            used_email: None,
        }
    }
}

/// Secondary, best-effort result of the notification step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum NotificationOutcome {
    /// No notifier configured, or the capture did not succeed
    Skipped,
    Sent,
    Failed { reason: String },
}

/// Build an orchestrator wired to the real HTTP services described by `config`.
///
/// The notification step is only wired up when `config.notify` is present.
pub fn new_orchestrator(config: &CaptureConfig) -> Result<Orchestrator> {
    if config.storage.token.trim().is_empty() {
        return Err(Error::ConfigError("storage token is required".into()));
    }

    let client = remote::http_client(config)?;
    let screenshots = remote::microlink::MicrolinkClient::new(client.clone(), &config.screenshot);
    let fetcher = remote::fetch::HttpImageFetcher::new(client.clone());
    let store = remote::blob::BlobStore::new(client.clone(), &config.storage);

    let mut orchestrator = Orchestrator::new(
        Box::new(screenshots),
        Box::new(fetcher),
        Box::new(store),
    );
    if let Some(notify) = &config.notify {
        orchestrator = orchestrator
            .with_notifier(Box::new(remote::resend::ResendNotifier::new(client, notify)));
    }
    Ok(orchestrator)
}
