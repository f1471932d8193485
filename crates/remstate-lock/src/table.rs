//! # Lock Table: Conditional Key-Value Store
//!
//! The coordinator's only source of mutual exclusion. Implementations must
//! make [`LockTable::insert_if_absent`] and [`LockTable::delete_if_matches`]
//! atomic with respect to every other caller of the same table, including
//! callers in other processes.
//!
//! Two implementations ship here:
//!
//! - [`MemoryLockTable`]: a `parking_lot::Mutex<HashMap>`, atomic within one
//!   process. Used by tests and embedders.
//! - [`NoLocking`]: the table used when no lock table is configured. Every
//!   insert succeeds and nothing is recorded.

use std::collections::HashMap;

use parking_lot::Mutex;
use remstate_core::LockId;
use thiserror::Error;

use crate::info::LockInfo;

/// The lock store failed or could not be reached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("lock table {operation} on {key:?} failed: {reason}")]
pub struct LockBackendError {
    /// The conditional operation that failed.
    pub operation: &'static str,
    /// The lock record key.
    pub key: String,
    /// Backend-specific detail.
    pub reason: String,
}

impl LockBackendError {
    /// Build an error for `operation` on `key`.
    pub fn new(operation: &'static str, key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            operation,
            key: key.into(),
            reason: reason.into(),
        }
    }
}

/// Result of a conditional insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The record was written.
    Inserted,
    /// A record already exists; it is returned unchanged.
    Exists(LockInfo),
}

/// Result of a conditional delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The record matched and was removed.
    Deleted,
    /// A record exists with a different id; it was left in place.
    Mismatch(LockInfo),
    /// No record exists.
    Absent,
}

/// A key-value store with conditional insert and conditional delete.
pub trait LockTable: Send + Sync {
    /// Write `info` under `key` only if no record exists.
    fn insert_if_absent(&self, key: &str, info: &LockInfo)
        -> Result<InsertOutcome, LockBackendError>;

    /// Remove the record under `key` only if its id equals `id`.
    fn delete_if_matches(&self, key: &str, id: &LockId)
        -> Result<DeleteOutcome, LockBackendError>;

    /// Remove the record under `key` unconditionally. Returns whether a
    /// record existed.
    fn delete(&self, key: &str) -> Result<bool, LockBackendError>;

    /// Read the record under `key`.
    fn get(&self, key: &str) -> Result<Option<LockInfo>, LockBackendError>;

    /// Whether this table actually coordinates anything.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// In-process lock table.
#[derive(Debug, Default)]
pub struct MemoryLockTable {
    records: Mutex<HashMap<String, LockInfo>>,
}

impl MemoryLockTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of held records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether no record is held.
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl LockTable for MemoryLockTable {
    fn insert_if_absent(
        &self,
        key: &str,
        info: &LockInfo,
    ) -> Result<InsertOutcome, LockBackendError> {
        let mut records = self.records.lock();
        if let Some(existing) = records.get(key) {
            return Ok(InsertOutcome::Exists(existing.clone()));
        }
        records.insert(key.to_string(), info.clone());
        Ok(InsertOutcome::Inserted)
    }

    fn delete_if_matches(
        &self,
        key: &str,
        id: &LockId,
    ) -> Result<DeleteOutcome, LockBackendError> {
        let mut records = self.records.lock();
        let Some(existing) = records.get(key) else {
            return Ok(DeleteOutcome::Absent);
        };
        if &existing.id != id {
            return Ok(DeleteOutcome::Mismatch(existing.clone()));
        }
        records.remove(key);
        Ok(DeleteOutcome::Deleted)
    }

    fn delete(&self, key: &str) -> Result<bool, LockBackendError> {
        Ok(self.records.lock().remove(key).is_some())
    }

    fn get(&self, key: &str) -> Result<Option<LockInfo>, LockBackendError> {
        Ok(self.records.lock().get(key).cloned())
    }
}

/// Lock table for configurations without one. Nothing is coordinated.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoLocking;

impl LockTable for NoLocking {
    fn insert_if_absent(&self, _: &str, _: &LockInfo) -> Result<InsertOutcome, LockBackendError> {
        Ok(InsertOutcome::Inserted)
    }

    fn delete_if_matches(&self, _: &str, _: &LockId) -> Result<DeleteOutcome, LockBackendError> {
        Ok(DeleteOutcome::Deleted)
    }

    fn delete(&self, _: &str) -> Result<bool, LockBackendError> {
        Ok(false)
    }

    fn get(&self, _: &str) -> Result<Option<LockInfo>, LockBackendError> {
        Ok(None)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
