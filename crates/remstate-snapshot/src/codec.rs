//! # Snapshot Codec: Versioned JSON Envelope
//!
//! The object written to the blob store is a JSON envelope:
//!
//! ```text
//! {
//!   "format_version": 1,
//!   "lineage": "<opaque id>",
//!   "serial": 42,
//!   "checksum": "sha256:<64 hex>",
//!   "payload": "<standard base64 of the document bytes>"
//! }
//! ```
//!
//! ## Integrity Invariant
//!
//! [`decode`] recomputes the payload digest and rejects the envelope if it
//! differs from the recorded checksum. A truncated or bit-flipped object is
//! never handed to the caller as a valid snapshot.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use remstate_core::{sha256_digest, ContentDigest, Lineage};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::snapshot::StateSnapshot;

/// The envelope version written by [`encode`].
pub const FORMAT_VERSION: u32 = 1;

/// Error while decoding a stored snapshot.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The envelope is not valid JSON or lacks required metadata.
    #[error("malformed snapshot metadata: {0}")]
    Malformed(String),

    /// The envelope was written by a newer format.
    #[error("unsupported snapshot format version {found} (supported: {})", FORMAT_VERSION)]
    UnsupportedVersion {
        /// The version found in the envelope.
        found: u32,
    },

    /// The payload field is not valid base64.
    #[error("unrecoverable snapshot payload: {0}")]
    Payload(String),

    /// The payload does not hash to the recorded checksum.
    #[error("snapshot checksum mismatch: recorded {recorded}, computed {computed}")]
    ChecksumMismatch {
        /// Checksum stored in the envelope.
        recorded: ContentDigest,
        /// Checksum of the payload actually present.
        computed: ContentDigest,
    },
}

/// Error while encoding a snapshot.
#[derive(Error, Debug)]
#[error("failed to encode snapshot: {0}")]
pub struct EncodeError(#[from] serde_json::Error);

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    format_version: u32,
    lineage: String,
    serial: u64,
    checksum: String,
    payload: String,
}

#[derive(Deserialize)]
struct VersionProbe {
    format_version: u32,
}

/// Generate a lineage for a workspace's first write.
pub fn new_lineage() -> Lineage {
    Lineage::generate()
}

/// Encode a snapshot into the bytes stored in the blob store.
pub fn encode(snapshot: &StateSnapshot) -> Result<Vec<u8>, EncodeError> {
    let envelope = Envelope {
        format_version: FORMAT_VERSION,
        lineage: snapshot.lineage().as_str().to_string(),
        serial: snapshot.serial(),
        checksum: snapshot.checksum().to_string(),
        payload: STANDARD.encode(snapshot.payload()),
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Decode stored bytes into a snapshot, verifying the payload checksum.
pub fn decode(bytes: &[u8]) -> Result<StateSnapshot, DecodeError> {
    let probe: VersionProbe =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    if probe.format_version != FORMAT_VERSION {
        return Err(DecodeError::UnsupportedVersion {
            found: probe.format_version,
        });
    }

    let envelope: Envelope =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    if envelope.lineage.trim().is_empty() {
        return Err(DecodeError::Malformed("lineage must not be empty".into()));
    }
    let recorded: ContentDigest = envelope
        .checksum
        .parse()
        .map_err(|e: remstate_core::RemstateError| DecodeError::Malformed(e.to_string()))?;
    let payload = STANDARD
        .decode(envelope.payload.as_bytes())
        .map_err(|e| DecodeError::Payload(e.to_string()))?;

    let computed = sha256_digest(&payload);
    if !computed.matches(&recorded) {
        return Err(DecodeError::ChecksumMismatch { recorded, computed });
    }

    Ok(StateSnapshot::new(
        Lineage::new(envelope.lineage),
        envelope.serial,
        payload,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> StateSnapshot {
        StateSnapshot::new(Lineage::new("lineage-1"), 3, b"{\"resources\":[]}".to_vec())
    }

    #[test]
    fn encode_then_decode_preserves_fields() {
        let snap = sample();
        let decoded = decode(&encode(&snap).unwrap()).unwrap();
        assert_eq!(decoded, snap);
    }

    #[test]
    fn empty_payload_survives() {
        let snap = StateSnapshot::new(Lineage::new("l"), 0, Vec::new());
        let decoded = decode(&encode(&snap).unwrap()).unwrap();
        assert!(decoded.payload().is_empty());
    }

    #[test]
    fn envelope_shape() {
        let value: serde_json::Value = serde_json::from_slice(&encode(&sample()).unwrap()).unwrap();
        assert_eq!(value["format_version"], 1);
        assert_eq!(value["lineage"], "lineage-1");
        assert_eq!(value["serial"], 3);
        assert!(value["checksum"].as_str().unwrap().starts_with("sha256:"));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(matches!(decode(b"not json"), Err(DecodeError::Malformed(_))));
        assert!(matches!(decode(b"{}"), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn missing_lineage_is_malformed() {
        let bytes = serde_json::to_vec(&json!({
            "format_version": 1,
            "serial": 1,
            "checksum": sha256_digest(b"").to_string(),
            "payload": "",
        }))
        .unwrap();
        assert!(matches!(decode(&bytes), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn blank_lineage_is_malformed() {
        let bytes = serde_json::to_vec(&json!({
            "format_version": 1,
            "lineage": " ",
            "serial": 1,
            "checksum": sha256_digest(b"").to_string(),
            "payload": "",
        }))
        .unwrap();
        assert!(matches!(decode(&bytes), Err(DecodeError::Malformed(_))));
    }

    #[test]
    fn future_version_rejected() {
        let bytes = serde_json::to_vec(&json!({"format_version": 2, "extra": true})).unwrap();
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::UnsupportedVersion { found: 2 })
        ));
    }

    #[test]
    fn bad_base64_is_payload_error() {
        let bytes = serde_json::to_vec(&json!({
            "format_version": 1,
            "lineage": "l",
            "serial": 1,
            "checksum": sha256_digest(b"").to_string(),
            "payload": "***",
        }))
        .unwrap();
        assert!(matches!(decode(&bytes), Err(DecodeError::Payload(_))));
    }

    #[test]
    fn tampered_payload_fails_checksum() {
        let mut value: serde_json::Value =
            serde_json::from_slice(&encode(&sample()).unwrap()).unwrap();
        value["payload"] = json!(STANDARD.encode(b"tampered"));
        let bytes = serde_json::to_vec(&value).unwrap();
        assert!(matches!(
            decode(&bytes),
            Err(DecodeError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn new_lineage_is_fresh() {
        assert_ne!(new_lineage(), new_lineage());
    }
}
