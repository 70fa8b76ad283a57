//! Background detection thread with a synchronous fallback.
//!
//! Requests cross the thread boundary as JSON text over an `mpsc` channel,
//! and so do replies.  The caller waits up to a deadline:
//!
//! | Outcome                                        | Result                  |
//! |------------------------------------------------|-------------------------|
//! | reply in time                                  | the worker's result     |
//! | deadline passes                                | `DetectError::Timeout`  |
//! | no thread, channel closed, or reply unreadable | run on the caller's thread |
//!
//! A timed-out job keeps running on the worker; its reply is discarded.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use pa_core::PaError;

use crate::{DetectError, DetectResult, DetectionReport, DetectionRequest, EntryDetector};

struct Job {
    request: String,
    reply:   Sender<String>,
}

/// What the worker sends back.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerReply {
    Done { report: DetectionReport },
    Failed { kind: FailureKind, message: String },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InvalidGeometry,
    Config,
    Other,
}

impl WorkerReply {
    fn from_result(result: Result<DetectionReport, PaError>) -> Self {
        match result {
            Ok(report) => Self::Done { report },
            Err(PaError::InvalidGeometry(message)) => Self::Failed { kind: FailureKind::InvalidGeometry, message },
            Err(PaError::Config(message)) => Self::Failed { kind: FailureKind::Config, message },
            Err(other) => Self::Failed { kind: FailureKind::Other, message: other.to_string() },
        }
    }

    fn into_result(self) -> DetectResult<DetectionReport> {
        match self {
            Self::Done { report } => Ok(report),
            Self::Failed { kind: FailureKind::InvalidGeometry, message } => {
                Err(PaError::InvalidGeometry(message).into())
            }
            Self::Failed { kind: FailureKind::Config, message } => Err(PaError::Config(message).into()),
            Self::Failed { kind: FailureKind::Other, message } => Err(DetectError::Worker(message)),
        }
    }
}

/// Owns one background detection thread.
///
/// Dropping the worker closes its queue and joins the thread after the job
/// in progress, if any, has finished.  Use [`detach`](Self::detach) to skip
/// the wait.
pub struct DetectionWorker {
    jobs:     Option<Sender<Job>>,
    handle:   Option<JoinHandle<()>>,
    detector: EntryDetector,
}

impl DetectionWorker {
    /// Start a worker thread running `detector`.
    ///
    /// If the thread cannot be spawned the worker still works, running each
    /// request on the caller's thread.
    pub fn spawn(detector: EntryDetector) -> Self {
        let (tx, rx) = mpsc::channel::<Job>();
        let thread_detector = detector.clone();

        let spawned = thread::Builder::new()
            .name("pa-detect-worker".into())
            .spawn(move || {
                for job in rx {
                    let reply = match serde_json::from_str::<DetectionRequest>(&job.request) {
                        Ok(request) => WorkerReply::from_result(thread_detector.detect(&request)),
                        Err(e) => WorkerReply::Failed { kind: FailureKind::Other, message: e.to_string() },
                    };
                    // A send error means the caller gave up waiting.
                    if let Ok(text) = serde_json::to_string(&reply) {
                        let _ = job.reply.send(text);
                    }
                }
                debug!("detection worker queue closed");
            });

        match spawned {
            Ok(handle) => Self { jobs: Some(tx), handle: Some(handle), detector },
            Err(e) => {
                warn!("could not start detection worker ({e}); requests will run inline");
                Self::synchronous(detector)
            }
        }
    }

    /// A worker without a thread: every request runs on the caller's thread.
    pub fn synchronous(detector: EntryDetector) -> Self {
        Self { jobs: None, handle: None, detector }
    }

    /// `true` if requests go to a background thread.
    pub fn is_threaded(&self) -> bool {
        self.jobs.is_some()
    }

    /// Run `request` on the worker, waiting at most `timeout`.
    ///
    /// A zero timeout has already expired and fails immediately.
    pub fn submit(&self, request: &DetectionRequest, timeout: Duration) -> DetectResult<DetectionReport> {
        if timeout.is_zero() {
            return Err(DetectError::Timeout(timeout));
        }
        let Some(jobs) = &self.jobs else {
            return self.run_inline(request);
        };

        let (reply_tx, reply_rx) = mpsc::channel();
        let job = Job { request: serde_json::to_string(request)?, reply: reply_tx };
        if jobs.send(job).is_err() {
            warn!("detection worker has stopped; running request inline");
            return self.run_inline(request);
        }

        match reply_rx.recv_timeout(timeout) {
            Ok(text) => match serde_json::from_str::<WorkerReply>(&text) {
                Ok(reply) => reply.into_result(),
                Err(e) => {
                    warn!("unreadable reply from detection worker ({e}); running request inline");
                    self.run_inline(request)
                }
            },
            Err(RecvTimeoutError::Timeout) => Err(DetectError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => {
                warn!("detection worker dropped the request; running it inline");
                self.run_inline(request)
            }
        }
    }

    /// Close the queue without waiting for the thread.
    ///
    /// A job still running after a timeout finishes in the background and
    /// its reply is discarded.
    pub fn detach(mut self) {
        self.jobs.take();
        if self.handle.take().is_some() {
            debug!("detection worker detached");
        }
    }

    fn run_inline(&self, request: &DetectionRequest) -> DetectResult<DetectionReport> {
        Ok(self.detector.detect(request)?)
    }
}

impl Drop for DetectionWorker {
    fn drop(&mut self) {
        self.jobs.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
