//! # Remote State Client
//!
//! Reads and writes the snapshot stored at one resolved path.
//!
//! ## Write Protocol
//!
//! 1. Read the stored snapshot's metadata and classify the write with
//!    [`assess_write`].
//! 2. Apply the staleness policy: `Warn` logs and proceeds, `Reject` fails
//!    with [`ClientError::StaleWrite`].
//! 3. Write the encoded envelope with the configured encryption directive.
//! 4. Read the object back and compare its checksum to the one written.
//!    A mismatch fails with [`ClientError::PersistVerification`] and is
//!    never retried here.
//!
//! The client does not lock. Callers hold the path's lock around `put`.

use std::sync::Arc;

use parking_lot::Mutex;
use remstate_core::{
    ContentDigest, EncryptionDirective, Lineage, OpContext, OperationCancelled, StalenessPolicy,
};
use remstate_snapshot::{
    assess_write, decode, encode, DecodeError, EncodeError, SnapshotMeta, StateSnapshot,
    WriteAssessment,
};
use thiserror::Error;

use crate::store::{ObjectPaths, ObjectStore, StoreError};

/// Error from a remote client operation.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The blob store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The stored object could not be decoded.
    #[error("state at {path:?} is unreadable: {source}")]
    Decode {
        /// Object path.
        path: String,
        /// Decoder failure.
        source: DecodeError,
    },

    /// The snapshot could not be encoded.
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// The write would regress or fork the stored history and the policy
    /// is `Reject`.
    #[error("refusing stale write to {path:?}: {assessment:?}")]
    StaleWrite {
        /// Object path.
        path: String,
        /// How the write relates to what is stored.
        assessment: WriteAssessment,
    },

    /// The object read back after a write does not match what was written.
    #[error("state written to {path:?} failed verification: expected {expected}, found {}", describe_found(.found))]
    PersistVerification {
        /// Object path.
        path: String,
        /// Checksum of the snapshot that was written.
        expected: ContentDigest,
        /// Checksum read back, if anything decodable was read.
        found: Option<ContentDigest>,
    },

    /// The context was cancelled before a request was issued.
    #[error(transparent)]
    Cancelled(#[from] OperationCancelled),
}

fn describe_found(found: &Option<ContentDigest>) -> String {
    match found {
        Some(digest) => digest.to_string(),
        None => "no decodable state".to_string(),
    }
}

/// The lineage of a retrieved snapshot differs from the one this client
/// saw before. Advisory only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineageMismatch {
    /// Lineage previously observed by this client.
    pub expected: Lineage,
    /// Lineage just retrieved.
    pub found: Lineage,
}

/// A snapshot read from the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retrieved {
    /// The decoded snapshot.
    pub snapshot: StateSnapshot,
    /// Set when the lineage changed since the client's last observation.
    pub lineage_mismatch: Option<LineageMismatch>,
}

/// Outcome of a verified write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistReceipt {
    /// Object path written.
    pub path: String,
    /// Serial of the written snapshot.
    pub serial: u64,
    /// Checksum verified after the write.
    pub checksum: ContentDigest,
    /// How the write related to what was stored before it.
    pub assessment: WriteAssessment,
}

/// Client for the snapshot stored at one path.
pub struct RemoteClient {
    store: Arc<dyn ObjectStore>,
    path: String,
    encryption: EncryptionDirective,
    policy: StalenessPolicy,
    observed: Mutex<Option<Lineage>>,
}

impl std::fmt::Debug for RemoteClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClient")
            .field("path", &self.path)
            .field("encryption", &self.encryption.mode())
            .field("policy", &self.policy)
            .finish()
    }
}

impl RemoteClient {
    /// Bind a client to `path`.
    pub fn new(
        store: Arc<dyn ObjectStore>,
        path: impl Into<String>,
        encryption: EncryptionDirective,
        policy: StalenessPolicy,
    ) -> Self {
        Self {
            store,
            path: path.into(),
            encryption,
            policy,
            observed: Mutex::new(None),
        }
    }

    /// The resolved object path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The staleness policy applied by [`put`](Self::put).
    pub fn policy(&self) -> StalenessPolicy {
        self.policy
    }

    /// Fetch and decode the stored snapshot. Absence is `Ok(None)`.
    pub fn get(&self, ctx: &OpContext) -> Result<Option<Retrieved>, ClientError> {
        let Some(snapshot) = self.fetch(ctx)? else {
            tracing::debug!(path = %self.path, "no state stored");
            return Ok(None);
        };

        let mut observed = self.observed.lock();
        let lineage_mismatch = match observed.as_ref() {
            Some(expected) if expected != snapshot.lineage() => {
                tracing::warn!(
                    path = %self.path,
                    expected = %expected,
                    found = %snapshot.lineage(),
                    "stored state lineage changed"
                );
                Some(LineageMismatch {
                    expected: expected.clone(),
                    found: snapshot.lineage().clone(),
                })
            }
            _ => None,
        };
        *observed = Some(snapshot.lineage().clone());

        tracing::debug!(path = %self.path, serial = snapshot.serial(), "state retrieved");
        Ok(Some(Retrieved {
            snapshot,
            lineage_mismatch,
        }))
    }

    /// Classify a write of `snapshot` against what is currently stored.
    pub fn assess(
        &self,
        ctx: &OpContext,
        snapshot: &StateSnapshot,
    ) -> Result<WriteAssessment, ClientError> {
        let stored = self.fetch(ctx)?.map(|s| s.meta());
        Ok(assess_write(stored.as_ref(), &snapshot.meta()))
    }

    /// Write `snapshot`, then read it back and verify it.
    pub fn put(
        &self,
        ctx: &OpContext,
        snapshot: &StateSnapshot,
    ) -> Result<PersistReceipt, ClientError> {
        let stored: Option<SnapshotMeta> = match self.fetch(ctx) {
            Ok(found) => found.map(|s| s.meta()),
            Err(ClientError::Decode { source, .. }) if self.policy == StalenessPolicy::Warn => {
                tracing::warn!(path = %self.path, error = %source, "overwriting unreadable state");
                None
            }
            Err(e) => return Err(e),
        };
        let assessment = assess_write(stored.as_ref(), &snapshot.meta());
        if assessment.is_stale() {
            match self.policy {
                StalenessPolicy::Reject => {
                    return Err(ClientError::StaleWrite {
                        path: self.path.clone(),
                        assessment,
                    })
                }
                StalenessPolicy::Warn => {
                    tracing::warn!(path = %self.path, serial = snapshot.serial(), ?assessment, "writing stale state");
                }
            }
        }

        let bytes = encode(snapshot)?;
        ctx.check("put", &self.path)?;
        self.store
            .put_object(&self.path, &bytes, &self.encryption)?;

        self.verify(snapshot)?;
        *self.observed.lock() = Some(snapshot.lineage().clone());

        tracing::debug!(
            path = %self.path,
            serial = snapshot.serial(),
            encryption = self.encryption.mode(),
            "state persisted"
        );
        Ok(PersistReceipt {
            path: self.path.clone(),
            serial: snapshot.serial(),
            checksum: snapshot.checksum().clone(),
            assessment,
        })
    }

    /// Remove the stored snapshot. Absence is not an error.
    pub fn delete(&self, ctx: &OpContext) -> Result<(), ClientError> {
        ctx.check("delete", &self.path)?;
        self.store.delete_object(&self.path)?;
        *self.observed.lock() = None;
        tracing::debug!(path = %self.path, "state deleted");
        Ok(())
    }

    /// Lazily list object paths under `prefix`.
    pub fn list(&self, ctx: &OpContext, prefix: &str) -> ObjectPaths {
        ObjectPaths::new(self.store.clone(), ctx.clone(), prefix)
    }

    fn fetch(&self, ctx: &OpContext) -> Result<Option<StateSnapshot>, ClientError> {
        ctx.check("get", &self.path)?;
        let Some(bytes) = self.store.get_object(&self.path, &self.encryption)? else {
            return Ok(None);
        };
        decode(&bytes).map(Some).map_err(|source| ClientError::Decode {
            path: self.path.clone(),
            source,
        })
    }

    // The read-back is part of the write already issued, so it is not
    // subject to cancellation.
    fn verify(&self, written: &StateSnapshot) -> Result<(), ClientError> {
        let expected = written.checksum().clone();
        let found = self
            .store
            .get_object(&self.path, &self.encryption)?
            .and_then(|bytes| decode(&bytes).ok());
        match found {
            Some(read) if read.checksum().matches(&expected) && read.serial() == written.serial() => {
                Ok(())
            }
            other => Err(ClientError::PersistVerification {
                path: self.path.clone(),
                expected,
                found: other.map(|s| s.checksum().clone()),
            }),
        }
    }
}
