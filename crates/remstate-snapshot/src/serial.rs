//! # Serial Comparison
//!
//! Classifies an incoming write against the metadata of the snapshot that
//! is currently stored. Within one lineage the serial must move forward;
//! across lineages the two histories are unrelated and cannot be ordered.
//!
//! The classification never blocks a write by itself. The remote client
//! consults its staleness policy to decide whether a stale or foreign
//! write is rejected or only reported.

use remstate_core::Lineage;
use serde::{Deserialize, Serialize};

use crate::snapshot::SnapshotMeta;

/// How an incoming snapshot relates to the stored one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum WriteAssessment {
    /// Nothing is stored yet.
    Initial,
    /// Same lineage, strictly higher serial.
    Advances,
    /// Same lineage, same serial, same payload. A retried write.
    Identical,
    /// Same lineage and serial but a different payload.
    DivergentSameSerial,
    /// Same lineage, lower serial than what is stored.
    Stale {
        /// Serial currently stored.
        stored: u64,
        /// Serial of the incoming write.
        incoming: u64,
    },
    /// The incoming snapshot belongs to a different history.
    LineageMismatch {
        /// Lineage currently stored.
        stored: Lineage,
        /// Lineage of the incoming write.
        incoming: Lineage,
    },
}

impl WriteAssessment {
    /// Whether the write can proceed without overwriting newer or foreign
    /// state.
    pub fn is_safe(&self) -> bool {
        matches!(self, Self::Initial | Self::Advances | Self::Identical)
    }

    /// Whether the write would regress or fork the stored history.
    pub fn is_stale(&self) -> bool {
        !self.is_safe()
    }
}

/// Compare `incoming` against the `stored` snapshot metadata.
pub fn assess_write(stored: Option<&SnapshotMeta>, incoming: &SnapshotMeta) -> WriteAssessment {
    let Some(stored) = stored else {
        return WriteAssessment::Initial;
    };
    if stored.lineage != incoming.lineage {
        return WriteAssessment::LineageMismatch {
            stored: stored.lineage.clone(),
            incoming: incoming.lineage.clone(),
        };
    }
    match incoming.serial.cmp(&stored.serial) {
        std::cmp::Ordering::Greater => WriteAssessment::Advances,
        std::cmp::Ordering::Less => WriteAssessment::Stale {
            stored: stored.serial,
            incoming: incoming.serial,
        },
        std::cmp::Ordering::Equal if stored.checksum.matches(&incoming.checksum) => {
            WriteAssessment::Identical
        }
        std::cmp::Ordering::Equal => WriteAssessment::DivergentSameSerial,
    }
}
