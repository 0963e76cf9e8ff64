//! Error types for the capture pipeline

use serde::Serialize;
use thiserror::Error;

/// Result type alias for capture operations
pub type Result<T> = std::result::Result<T, Error>;

/// Input rejected before any remote call is made
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid email address")]
    InvalidEmail,

    #[error("invalid URL")]
    InvalidUrl,
}

/// Pipeline stage that produced a remote failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteStage {
    Screenshot,
    Download,
    Storage,
    Notification,
}

/// Errors that can occur while capturing and storing a screenshot
#[derive(Error, Debug)]
pub enum Error {
    /// Bad email or URL
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The screenshot service failed or returned no image location
    #[error("Screenshot generation failed: {0}")]
    ScreenshotGenerationFailed(String),

    /// The generated image could not be downloaded
    #[error("Screenshot download failed: {0}")]
    ScreenshotDownloadFailed(String),

    /// The object store rejected or failed the upload
    #[error("Storage failed: {0}")]
    StorageFailed(String),

    /// The email service failed to send the notification
    #[error("Notification failed: {0}")]
    NotificationFailed(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Anything not anticipated (including panics from collaborators)
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// The remote stage this error was produced by, if any.
    pub fn stage(&self) -> Option<RemoteStage> {
        match self {
            Error::ScreenshotGenerationFailed(_) => Some(RemoteStage::Screenshot),
            Error::ScreenshotDownloadFailed(_) => Some(RemoteStage::Download),
            Error::StorageFailed(_) => Some(RemoteStage::Storage),
            Error::NotificationFailed(_) => Some(RemoteStage::Notification),
            _ => None,
        }
    }

    /// Map onto the user-facing catalog entry.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(ValidationError::InvalidEmail) => ErrorKind::InvalidEmail,
            Error::Validation(ValidationError::InvalidUrl) => ErrorKind::InvalidUrl,
            Error::ScreenshotGenerationFailed(_) => ErrorKind::ScreenshotGenerationFailed,
            Error::ScreenshotDownloadFailed(_) => ErrorKind::ScreenshotDownloadFailed,
            Error::StorageFailed(_) => ErrorKind::StorageFailed,
            Error::NotificationFailed(_) | Error::ConfigError(_) | Error::Other(_) => {
                ErrorKind::UnexpectedError
            }
        }
    }
}

/// Fixed catalog of failures reported to the person submitting the form.
///
/// The serialized name is the stable machine-readable key; [`ErrorKind::message`]
/// is the localized (German) text shown in the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    InvalidEmail,
    InvalidUrl,
    ScreenshotGenerationFailed,
    ScreenshotDownloadFailed,
    StorageFailed,
    UnexpectedError,
}

impl ErrorKind {
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::InvalidEmail => "Bitte eine gültige E-Mail-Adresse eingeben.",
            ErrorKind::InvalidUrl => "Bitte eine gültige URL eingeben.",
            ErrorKind::ScreenshotGenerationFailed => "Screenshot konnte nicht erzeugt werden.",
            ErrorKind::ScreenshotDownloadFailed => "Screenshot-Download fehlgeschlagen.",
            ErrorKind::StorageFailed => "Screenshot konnte nicht gespeichert werden.",
            ErrorKind::UnexpectedError => "Unerwarteter Fehler.",
        }
    }

    /// Validation failures are the submitter's fault; everything else is ours
    /// or a remote service's.
    pub fn is_validation(self) -> bool {
        matches!(self, ErrorKind::InvalidEmail | ErrorKind::InvalidUrl)
    }
}
