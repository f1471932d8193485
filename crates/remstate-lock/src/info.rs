//! # Lock Record
//!
//! The metadata stored alongside a held lock. It is what a contending
//! caller sees when its acquire fails, so it names who holds the lock, for
//! what operation, and since when.

use remstate_core::{LockId, Timestamp};
use serde::{Deserialize, Serialize};

/// Metadata describing one lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Unique per acquisition attempt.
    pub id: LockId,
    /// The operation the holder is performing, e.g. `"apply"`.
    pub operation: String,
    /// `user@host` or another holder description.
    pub who: String,
    /// Version of the holder's software.
    pub version: String,
    /// When the lock record was created.
    pub created: Timestamp,
    /// The state path the lock protects. Filled in on acquire.
    pub path: String,
    /// Free-form operator-supplied text.
    #[serde(default)]
    pub info: String,
}

impl LockInfo {
    /// A fresh lock record for `operation` with a newly generated id.
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            id: LockId::generate(),
            operation: operation.into(),
            who: default_who(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            created: Timestamp::now(),
            path: String::new(),
            info: String::new(),
        }
    }

    /// Replace the generated id.
    pub fn with_id(mut self, id: LockId) -> Self {
        self.id = id;
        self
    }

    /// Replace the holder description.
    pub fn with_who(mut self, who: impl Into<String>) -> Self {
        self.who = who.into();
        self
    }

    /// Attach free-form text.
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }
}

impl std::fmt::Display for LockInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ID: {}, path: {}, operation: {}, who: {}, version: {}, created: {}",
            self.id, self.path, self.operation, self.who, self.version, self.created
        )?;
        if !self.info.is_empty() {
            write!(f, ", info: {}", self.info)?;
        }
        Ok(())
    }
}

fn default_who() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    match std::env::var("HOSTNAME") {
        Ok(host) if !host.is_empty() => format!("{user}@{host}"),
        _ => user,
    }
}
