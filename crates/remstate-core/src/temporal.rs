//! # Lock Timestamps
//!
//! `Timestamp` is the creation time stamped on every lock record. It is kept
//! in UTC at whole-second precision so that a record written by one holder
//! and read back by another prints the same way on both sides.

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

/// A UTC instant with sub-second precision dropped.
///
/// Serializes through chrono's RFC 3339 form, so lock records written by
/// other tools deserialize as long as they carry an RFC 3339 time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// The current time.
    pub fn now() -> Self {
        Self(Utc::now().trunc_subsecs(0))
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%SZ"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_prints_whole_seconds() {
        let shown = Timestamp::now().to_string();
        assert_eq!(shown.len(), "2026-01-15T12:00:00Z".len());
        assert!(shown.ends_with('Z'));
        assert!(!shown.contains('.'));
    }

    #[test]
    fn offset_record_time_reads_as_utc() {
        let ts: Timestamp = serde_json::from_str("\"2026-01-15T17:00:00+05:00\"").unwrap();
        assert_eq!(ts.to_string(), "2026-01-15T12:00:00Z");
    }

    #[test]
    fn later_instants_order_after() {
        let early: Timestamp = serde_json::from_str("\"2026-01-15T12:00:00Z\"").unwrap();
        let late: Timestamp = serde_json::from_str("\"2026-01-15T12:00:01Z\"").unwrap();
        assert!(early < late);
    }
}
