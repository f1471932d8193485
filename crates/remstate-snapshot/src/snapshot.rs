//! # State Snapshot
//!
//! A `StateSnapshot` pairs an opaque payload with the metadata that orders
//! it within a history: the lineage naming the history and the serial
//! counting changes within it. The checksum is computed at construction
//! and cannot drift from the payload.

use remstate_core::{sha256_digest, ContentDigest, Lineage};
use serde::{Deserialize, Serialize};

/// The user's document plus ordering metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSnapshot {
    lineage: Lineage,
    serial: u64,
    payload: Vec<u8>,
    checksum: ContentDigest,
}

impl StateSnapshot {
    /// Build a snapshot, computing the payload checksum.
    pub fn new(lineage: Lineage, serial: u64, payload: impl Into<Vec<u8>>) -> Self {
        let payload = payload.into();
        let checksum = sha256_digest(&payload);
        Self {
            lineage,
            serial,
            payload,
            checksum,
        }
    }

    /// The first snapshot of a fresh history: new lineage, serial 0.
    pub fn initial(payload: impl Into<Vec<u8>>) -> Self {
        Self::new(Lineage::generate(), 0, payload)
    }

    /// The next snapshot in this history, with the serial incremented.
    pub fn next(&self, payload: impl Into<Vec<u8>>) -> Self {
        Self::new(self.lineage.clone(), self.serial.saturating_add(1), payload)
    }

    /// The lineage of this snapshot's history.
    pub fn lineage(&self) -> &Lineage {
        &self.lineage
    }

    /// The serial within the lineage.
    pub fn serial(&self) -> u64 {
        self.serial
    }

    /// The opaque document bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// SHA-256 digest of the payload.
    pub fn checksum(&self) -> &ContentDigest {
        &self.checksum
    }

    /// The metadata used for staleness comparison.
    pub fn meta(&self) -> SnapshotMeta {
        SnapshotMeta {
            lineage: self.lineage.clone(),
            serial: self.serial,
            checksum: self.checksum.clone(),
        }
    }
}

/// Lineage, serial, and checksum of a snapshot, without the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    /// History identifier.
    pub lineage: Lineage,
    /// Change counter within the history.
    pub serial: u64,
    /// Payload digest.
    pub checksum: ContentDigest,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_tracks_payload() {
        let a = StateSnapshot::new(Lineage::new("l"), 1, b"a".to_vec());
        let b = StateSnapshot::new(Lineage::new("l"), 1, b"b".to_vec());
        assert_ne!(a.checksum(), b.checksum());
        assert_eq!(a.checksum(), &sha256_digest(b"a"));
    }

    #[test]
    fn initial_starts_at_zero_with_fresh_lineage() {
        let a = StateSnapshot::initial(Vec::new());
        let b = StateSnapshot::initial(Vec::new());
        assert_eq!(a.serial(), 0);
        assert_ne!(a.lineage(), b.lineage());
    }

    #[test]
    fn next_keeps_lineage_and_increments_serial() {
        let first = StateSnapshot::initial(b"v1".to_vec());
        let second = first.next(b"v2".to_vec());
        assert_eq!(second.lineage(), first.lineage());
        assert_eq!(second.serial(), 1);
        assert_eq!(second.payload(), b"v2");
    }

    #[test]
    fn meta_mirrors_snapshot() {
        let snap = StateSnapshot::new(Lineage::new("l"), 7, b"x".to_vec());
        let meta = snap.meta();
        assert_eq!(meta.serial, 7);
        assert_eq!(meta.lineage.as_str(), "l");
        assert_eq!(&meta.checksum, snap.checksum());
    }
}
