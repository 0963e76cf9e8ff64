use crate::{Error, Orchestrator, Result, Submission, SubmissionInput};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Submit(SubmissionInput, oneshot::Sender<Submission>),
    Close(oneshot::Sender<()>),
}

/// An async-friendly orchestrator backed by a dedicated worker thread.
///
/// The worker thread owns the blocking HTTP clients and runs submissions one
/// after another, so async callers never block a runtime thread. Clones share
/// the same worker.
#[derive(Clone)]
pub struct AsyncOrchestrator {
    cmd_tx: Sender<Command>,
}

impl AsyncOrchestrator {
    /// Spawn the worker thread that will run `orchestrator`.
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();

        thread::spawn(move || {
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Submit(input, resp) => {
                        let _ = resp.send(orchestrator.submit(&input));
                    }
                    Command::Close(resp) => {
                        let _ = resp.send(());
                        break;
                    }
                }
            }
        });

        Self { cmd_tx }
    }

    /// Run one submission on the worker and wait for its outcome.
    pub async fn submit(&self, input: SubmissionInput) -> Result<Submission> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Submit(input, tx))
            .map_err(|e| Error::Other(format!("Failed to send submit command: {}", e)))?;
        rx.await
            .map_err(|e| Error::Other(format!("Worker dropped submission: {}", e)))
    }

    /// Stop the worker once queued submissions have run.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Close(tx))
            .map_err(|e| Error::Other(format!("Failed to send close command: {}", e)))?;
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))
    }
}
