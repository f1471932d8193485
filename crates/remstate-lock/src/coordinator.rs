//! # Lock Coordinator
//!
//! Acquire, release, and force-unlock for state paths, on top of a
//! [`LockTable`].
//!
//! ## Cancellation
//!
//! The operation context is checked before each conditional write is
//! issued and never after. A cancelled acquire therefore either did not
//! happen or is reported as succeeded, and the caller always knows which.

use std::sync::Arc;

use remstate_core::{LockId, OpContext, OperationCancelled};
use thiserror::Error;

use crate::info::LockInfo;
use crate::table::{DeleteOutcome, InsertOutcome, LockBackendError, LockTable};

/// Error from a lock operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// Another holder owns the lock.
    #[error("state at {path:?} is locked: {holder}")]
    Held {
        /// The contended state path.
        path: String,
        /// The current holder's record.
        holder: Box<LockInfo>,
    },

    /// Release was attempted with an id that does not own the lock.
    #[error("lock id {supplied} does not own the lock on {path:?}: {holder}")]
    IdMismatch {
        /// The state path.
        path: String,
        /// The id the caller presented.
        supplied: LockId,
        /// The current holder's record, still in place.
        holder: Box<LockInfo>,
    },

    /// Release was attempted on a path with no lock.
    #[error("no lock is held on {path:?}")]
    NotHeld {
        /// The state path.
        path: String,
    },

    /// The lock table failed.
    #[error(transparent)]
    Backend(#[from] LockBackendError),

    /// The context was cancelled before the request was issued.
    #[error(transparent)]
    Cancelled(#[from] OperationCancelled),
}

/// Diagnostic view of a path's lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockState {
    /// No lock record exists.
    Unlocked,
    /// A lock record exists.
    Locked(Box<LockInfo>),
}

impl LockState {
    /// Whether a lock record exists.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::Locked(_))
    }
}

/// Serializes writers of a state path through a [`LockTable`].
#[derive(Clone)]
pub struct LockCoordinator {
    table: Arc<dyn LockTable>,
    namespace: Option<String>,
}

impl std::fmt::Debug for LockCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockCoordinator")
            .field("enabled", &self.table.is_enabled())
            .field("namespace", &self.namespace)
            .finish()
    }
}

impl LockCoordinator {
    /// Coordinate through `table`, keying records by the bare path.
    pub fn new(table: Arc<dyn LockTable>) -> Self {
        Self {
            table,
            namespace: None,
        }
    }

    /// Key lock records as `"<namespace>/<path>"`, typically the bucket.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Whether the underlying table coordinates anything.
    pub fn is_enabled(&self) -> bool {
        self.table.is_enabled()
    }

    /// The lock record key for `path`.
    pub fn record_key(&self, path: &str) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}/{path}"),
            None => path.to_string(),
        }
    }

    /// Take the lock on `path`. Returns the id that must be presented to
    /// [`release`](Self::release).
    ///
    /// # Errors
    ///
    /// [`LockError::Held`] carrying the holder's record if another caller
    /// owns the lock.
    pub fn acquire(
        &self,
        ctx: &OpContext,
        path: &str,
        mut info: LockInfo,
    ) -> Result<LockId, LockError> {
        let key = self.record_key(path);
        info.path = path.to_string();
        ctx.check("lock acquire", &key)?;

        match self.table.insert_if_absent(&key, &info)? {
            InsertOutcome::Inserted => {
                tracing::info!(path, lock_id = %info.id, operation = %info.operation, "lock acquired");
                Ok(info.id)
            }
            InsertOutcome::Exists(holder) => {
                tracing::debug!(path, holder = %holder.id, "lock contended");
                Err(LockError::Held {
                    path: path.to_string(),
                    holder: Box::new(holder),
                })
            }
        }
    }

    /// Release the lock on `path` held under `id`.
    ///
    /// # Errors
    ///
    /// [`LockError::IdMismatch`] if another id holds the lock, which stays
    /// held. [`LockError::NotHeld`] if nothing holds it.
    pub fn release(&self, ctx: &OpContext, path: &str, id: &LockId) -> Result<(), LockError> {
        let key = self.record_key(path);
        ctx.check("lock release", &key)?;

        match self.table.delete_if_matches(&key, id)? {
            DeleteOutcome::Deleted => {
                tracing::info!(path, lock_id = %id, "lock released");
                Ok(())
            }
            DeleteOutcome::Mismatch(holder) => Err(LockError::IdMismatch {
                path: path.to_string(),
                supplied: id.clone(),
                holder: Box::new(holder),
            }),
            DeleteOutcome::Absent => Err(LockError::NotHeld {
                path: path.to_string(),
            }),
        }
    }

    /// Remove any lock on `path`, regardless of holder. Succeeds when the
    /// path is already unlocked.
    pub fn force_unlock(&self, ctx: &OpContext, path: &str) -> Result<(), LockError> {
        let key = self.record_key(path);
        ctx.check("lock force-unlock", &key)?;

        let existed = self.table.delete(&key)?;
        tracing::warn!(path, existed, "lock force-unlocked");
        Ok(())
    }

    /// Report whether `path` is locked, and by whom.
    pub fn status(&self, ctx: &OpContext, path: &str) -> Result<LockState, LockError> {
        let key = self.record_key(path);
        ctx.check("lock status", &key)?;

        Ok(match self.table.get(&key)? {
            Some(info) => LockState::Locked(Box::new(info)),
            None => LockState::Unlocked,
        })
    }

    /// Run `f` while holding the lock on `path`.
    ///
    /// Release is always attempted. If `f` fails, its error wins and a
    /// release failure is only logged.
    pub fn with_lock<T, E, F>(
        &self,
        ctx: &OpContext,
        path: &str,
        info: LockInfo,
        f: F,
    ) -> Result<T, E>
    where
        F: FnOnce(&LockId) -> Result<T, E>,
        E: From<LockError>,
    {
        let id = self.acquire(ctx, path, info)?;
        let outcome = f(&id);
        // Release must go out even when the caller's context has since been
        // cancelled, or the lock would be left behind.
        let released = self.release(&OpContext::background(), path, &id);
        match (outcome, released) {
            (Ok(value), Ok(())) => Ok(value),
            (Ok(_), Err(e)) => Err(e.into()),
            (Err(e), Ok(())) => Err(e),
            (Err(e), Err(release_err)) => {
                tracing::error!(path, lock_id = %id, error = %release_err, "failed to release lock");
                Err(e)
            }
        }
    }
}
