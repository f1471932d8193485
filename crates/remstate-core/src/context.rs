//! # Operation Context: Cancellation and Deadlines
//!
//! Every blocking call in remstate takes an [`OpContext`]. The context is
//! consulted before a request is issued, never after: once a conditional
//! write has gone out, its outcome is reported as-is so the lock
//! coordinator cannot leave an acquired lock unaccounted for.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

/// Why an operation was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller raised the cancellation signal.
    Signalled,
    /// The caller-supplied deadline passed.
    DeadlineExceeded,
}

impl std::fmt::Display for CancelReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Signalled => f.write_str("cancelled by caller"),
            Self::DeadlineExceeded => f.write_str("deadline exceeded"),
        }
    }
}

/// The operation was not issued because the context was cancelled.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{operation} on {path:?} not issued: {reason}")]
pub struct OperationCancelled {
    /// The operation that was about to be issued.
    pub operation: &'static str,
    /// The path or key the operation targeted.
    pub path: String,
    /// Why it was abandoned.
    pub reason: CancelReason,
}

/// A cloneable cancellation signal shared between a caller and its
/// in-flight operations.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    /// Create a new, unraised signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal. Operations not yet issued will fail.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether the signal has been raised.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-call cancellation signal and deadline.
#[derive(Debug, Clone, Default)]
pub struct OpContext {
    cancel: Option<CancelHandle>,
    deadline: Option<Instant>,
}

impl OpContext {
    /// A context that is never cancelled and has no deadline.
    pub fn background() -> Self {
        Self::default()
    }

    /// Attach a cancellation signal.
    pub fn with_cancel(mut self, handle: CancelHandle) -> Self {
        self.cancel = Some(handle);
        self
    }

    /// Attach an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach a deadline relative to now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Fail if the context has been cancelled or its deadline has passed.
    ///
    /// Call immediately before issuing `operation` against `path`.
    pub fn check(&self, operation: &'static str, path: &str) -> Result<(), OperationCancelled> {
        let reason = if self.cancel.as_ref().is_some_and(CancelHandle::is_cancelled) {
            Some(CancelReason::Signalled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(CancelReason::DeadlineExceeded)
        } else {
            None
        };
        match reason {
            Some(reason) => Err(OperationCancelled {
                operation,
                path: path.to_string(),
                reason,
            }),
            None => Ok(()),
        }
    }
}
