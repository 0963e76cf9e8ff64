//! The capture pipeline.
//!
//! A submission walks a linear state machine:
//!
//! ```text
//! Idle → Validating → RequestingScreenshot → Downloading → Storing
//!      → PersistingPrefs → (Notifying) → Done | Failed
//! ```
//!
//! The first failing step ends the run. Notification runs only after the
//! capture has been stored and its outcome is reported on a separate channel,
//! so a failed email never turns a stored screenshot into an error.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crate::remote::{ArtifactStore, ImageFetcher, Notifier, ScreenshotService, PNG_CONTENT_TYPE};
use crate::{
    validate, CaptureResult, Error, ErrorKind, NotificationOutcome, Preferences, Result,
    SubmissionInput,
};
use log::{debug, info, warn};

type OnStageHandler = Arc<dyn Fn(Stage) + Send + Sync>;

/// Pipeline state, reported to the stage observer on entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Validating,
    RequestingScreenshot,
    Downloading,
    Storing,
    PersistingPrefs,
    Notifying,
    Done,
    Failed(ErrorKind),
}

/// Everything a single run produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    /// Primary outcome shown to the submitter
    pub result: CaptureResult,
    /// Best-effort notification outcome; never affects `result`
    pub notification: NotificationOutcome,
    /// Values the caller should remember (1-year cookies); set on success only
    pub preferences: Option<Preferences>,
}

impl Submission {
    fn failed(kind: ErrorKind) -> Self {
        Self {
            result: CaptureResult::failure(kind),
            notification: NotificationOutcome::Skipped,
            preferences: None,
        }
    }
}

/// Sequences validation and the remote services for one submission at a time.
///
/// Holds no mutable state, so one instance can be shared between threads.
pub struct Orchestrator {
    screenshots: Box<dyn ScreenshotService>,
    fetcher: Box<dyn ImageFetcher>,
    store: Box<dyn ArtifactStore>,
    notifier: Option<Box<dyn Notifier>>,
    on_stage: Option<OnStageHandler>,
}

impl Orchestrator {
    pub fn new(
        screenshots: Box<dyn ScreenshotService>,
        fetcher: Box<dyn ImageFetcher>,
        store: Box<dyn ArtifactStore>,
    ) -> Self {
        Self {
            screenshots,
            fetcher,
            store,
            notifier: None,
            on_stage: None,
        }
    }

    /// Enable the notification step.
    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Register a callback invoked every time the pipeline enters a stage.
    pub fn on_stage<F>(&mut self, cb: F)
    where
        F: Fn(Stage) + Send + Sync + 'static,
    {
        self.on_stage = Some(Arc::new(cb));
    }

    /// Remove previously registered stage callback if any
    pub fn clear_on_stage(&mut self) {
        self.on_stage = None;
    }

    pub fn notifies(&self) -> bool {
        self.notifier.is_some()
    }

    /// Run one submission to completion. Never panics and never returns an
    /// error: every failure is folded into the returned [`Submission`].
    pub fn submit(&self, input: &SubmissionInput) -> Submission {
        self.enter(Stage::Idle);

        let email = input.email.trim();
        let raw_url = input.url.trim();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.capture(email, raw_url)));
        let submission = match outcome {
            Ok(Ok(submission)) => submission,
            Ok(Err(err)) => {
                let kind = err.kind();
                if kind.is_validation() {
                    debug!("rejected submission: {}", err);
                } else if let Some(stage) = err.stage() {
                    warn!("{:?} stage failed for {:?}: {}", stage, raw_url, err);
                } else {
                    warn!("capture of {:?} failed: {}", raw_url, err);
                }
                self.enter(Stage::Failed(kind));
                return Submission::failed(kind);
            }
            Err(_) => {
                warn!("capture of {:?} panicked", raw_url);
                self.enter(Stage::Failed(ErrorKind::UnexpectedError));
                return Submission::failed(ErrorKind::UnexpectedError);
            }
        };

        self.enter(Stage::Done);
        info!(
            "captured {} for {} (notification: {:?})",
            submission.result.used_url.as_deref().unwrap_or_default(),
            email,
            submission.notification
        );
        submission
    }

    fn capture(&self, email: &str, raw_url: &str) -> Result<Submission> {
        self.enter(Stage::Validating);
        let url = validate::validate(email, raw_url)?;

        self.enter(Stage::RequestingScreenshot);
        let location = self.screenshots.request_screenshot(&url)?;

        self.enter(Stage::Downloading);
        let bytes = self.fetcher.download_image(&location)?;

        self.enter(Stage::Storing);
        let artifact = self.store.store_artifact(&bytes, PNG_CONTENT_TYPE)?;

        self.enter(Stage::PersistingPrefs);
        let preferences = Preferences {
            email: email.to_string(),
            url: url.as_str().to_string(),
        };

        let notification = match &self.notifier {
            None => NotificationOutcome::Skipped,
            Some(notifier) => {
                self.enter(Stage::Notifying);
                // A panicking notifier is still only a failed notification
                let sent = panic::catch_unwind(AssertUnwindSafe(|| {
                    notifier.notify(email, &url, &artifact)
                }))
                .unwrap_or_else(|_| Err(Error::NotificationFailed("notifier panicked".into())));
                match sent {
                    Ok(()) => NotificationOutcome::Sent,
                    Err(err) => {
                        warn!("notification to {} failed: {}", email, err);
                        NotificationOutcome::Failed {
                            reason: err.to_string(),
                        }
                    }
                }
            }
        };

        Ok(Submission {
            result: CaptureResult::success(&artifact, &url, email),
            notification,
            preferences: Some(preferences),
        })
    }

    fn enter(&self, stage: Stage) {
        debug!("stage {:?}", stage);
        if let Some(cb) = &self.on_stage {
            cb(stage);
        }
    }
}
