use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;
use tokio::sync::mpsc;
use tokio::task::{self, JoinHandle};
use tokio_util::sync::CancellationToken;

use super::state::ScanState;
use super::{FileScanner, ScanOptions};
use crate::file_cleaner::errors::{CleanerError, Result};
use crate::file_cleaner::types::{ScanProgress, ScannedItem};

/// Events buffered between the walker and the consumer before the walker waits.
const SCAN_EVENT_BUFFER: usize = 256;

/// Streamed output of a background scan, in visitation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanEvent {
    Item(ScannedItem),
    Progress(ScanProgress),
}

/// A scan running on the blocking pool. Drain [`ScanTask::next_event`]
/// until it yields `None`, then [`ScanTask::join`] for the outcome.
///
/// Dropping the task cancels the scan.
#[derive(Debug)]
pub struct ScanTask {
    events: mpsc::Receiver<ScanEvent>,
    state: Arc<Mutex<ScanState>>,
    token: CancellationToken,
    handle: JoinHandle<Result<()>>,
}

impl FileScanner {
    /// Start a scan in the background. Must be called from within a Tokio runtime.
    ///
    /// The walker blocks once [`SCAN_EVENT_BUFFER`] events are waiting, and
    /// stops with `ScanCancelled` if the receiving side goes away.
    pub fn spawn(root: PathBuf, options: ScanOptions, token: CancellationToken) -> ScanTask {
        let (tx, rx) = mpsc::channel(SCAN_EVENT_BUFFER);
        let state = Arc::new(Mutex::new(ScanState::NotStarted));
        let worker_state = Arc::clone(&state);
        let worker_token = token.clone();

        let handle = task::spawn_blocking(move || {
            lock_state(&worker_state).advance(ScanState::Scanning);
            let send = |event: ScanEvent| {
                if tx.blocking_send(event).is_err() {
                    debug!(target: "scanner", "Scan consumer went away; stopping walk");
                    worker_token.cancel();
                }
            };
            let outcome = FileScanner::new().scan(
                &root,
                &options,
                &worker_token,
                |progress| send(ScanEvent::Progress(progress)),
                |item| send(ScanEvent::Item(item)),
            );
            lock_state(&worker_state).advance(ScanState::from_outcome(&outcome));
            outcome
        });

        ScanTask {
            events: rx,
            state,
            token,
            handle,
        }
    }
}

impl ScanTask {
    pub async fn next_event(&mut self) -> Option<ScanEvent> {
        self.events.recv().await
    }

    pub fn state(&self) -> ScanState {
        lock_state(&self.state).clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Wait for the walker to finish. Events not yet received are drained
    /// and discarded so a walker parked on a full channel can complete.
    pub async fn join(mut self) -> Result<()> {
        while self.events.recv().await.is_some() {}

        match (&mut self.handle).await {
            Ok(outcome) => outcome,
            Err(join_err) => {
                debug!(target: "scanner", "Scan worker did not complete: {}", join_err);
                let message = join_err.to_string();
                lock_state(&self.state).advance(ScanState::Failed(message.clone()));
                Err(CleanerError::Io(io::Error::new(io::ErrorKind::Other, message)))
            }
        }
    }
}

impl Drop for ScanTask {
    fn drop(&mut self) {
        if !self.handle.is_finished() {
            self.token.cancel();
        }
    }
}

fn lock_state(state: &Mutex<ScanState>) -> MutexGuard<'_, ScanState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
