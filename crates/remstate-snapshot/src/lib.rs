//! # remstate-snapshot: State Snapshot Codec
//!
//! Serializes and deserializes the state document together with its
//! lineage, serial, and payload checksum, and compares snapshot metadata to
//! detect stale or divergent writes.
//!
//! ## Modules
//!
//! - **Snapshot** (`snapshot.rs`): `StateSnapshot` and `SnapshotMeta`.
//! - **Codec** (`codec.rs`): the versioned JSON envelope written to the
//!   blob store. Decoding re-verifies the payload checksum.
//! - **Serial** (`serial.rs`): `assess_write()` classifies an incoming
//!   write against the stored metadata. The result is advisory; the caller
//!   decides whether a stale write is fatal.
//!
//! ## Crate Policy
//!
//! - Pure transforms plus identifier generation. No I/O.
//! - Depends only on `remstate-core` internally.

pub mod codec;
pub mod serial;
pub mod snapshot;

pub use codec::{decode, encode, new_lineage, DecodeError, EncodeError, FORMAT_VERSION};
pub use serial::{assess_write, WriteAssessment};
pub use snapshot::{SnapshotMeta, StateSnapshot};
