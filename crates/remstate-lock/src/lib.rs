//! # remstate-lock: Lock Coordination
//!
//! Guarantees that at most one holder at a time writes a given state path.
//! Mutual exclusion rests entirely on the conditional-write atomicity of a
//! [`LockTable`]: an acquire is an insert-if-absent, a release is a
//! delete-if-matches.
//!
//! ## Lock Lifecycle
//!
//! ```text
//! Unlocked ──acquire(info)──▶ Locked(id)
//! Locked(id) ──release(id)──▶ Unlocked
//! Locked(any) ──force_unlock──▶ Unlocked
//! ```
//!
//! Locks never expire on their own. A holder that dies leaves its lock in
//! place until an operator force-unlocks the path.
//!
//! ## Crate Policy
//!
//! - Depends only on `remstate-core` internally.
//! - No internal retry. Contention and backend faults are returned as-is.

pub mod coordinator;
pub mod info;
pub mod table;

pub use coordinator::{LockCoordinator, LockError, LockState};
pub use info::LockInfo;
pub use table::{
    DeleteOutcome, InsertOutcome, LockBackendError, LockTable, MemoryLockTable, NoLocking,
};
