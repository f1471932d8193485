//! # remstate-core: Foundational Types for Remote State Storage
//!
//! This crate is the leaf of the remstate workspace. It defines the
//! primitives every other crate builds on and depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Segment-anchored key resolution.** [`keys::resolve`] and
//!    [`keys::identify`] map workspace names to object paths and back. The
//!    inverse never matches on raw substrings, so a workspace named `env-1`
//!    under the prefix `env` cannot be confused with anything else.
//!
//! 2. **Newtype identifiers.** `Lineage`, `LockId`, and `WorkspaceName` are
//!    distinct types. A lock id cannot be passed where a lineage is expected.
//!
//! 3. **Opaque encryption directive.** [`EncryptionDirective`] is a tagged
//!    union handed through to the blob store untouched.
//!
//! 4. **Explicit operation context.** Every blocking call takes an
//!    [`OpContext`] carrying a cancellation signal and an optional deadline.
//!
//! 5. **Validated configuration.** [`BackendConfig`] is raw user input;
//!    downstream crates only ever see [`ValidatedConfig`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `remstate-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod config;
pub mod context;
pub mod digest;
pub mod encryption;
pub mod error;
pub mod identity;
pub mod keys;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use config::{BackendConfig, StalenessPolicy, ValidatedConfig, DEFAULT_WORKSPACE_KEY_PREFIX};
pub use context::{CancelHandle, CancelReason, OpContext, OperationCancelled};
pub use digest::{sha256_digest, ContentDigest, DigestAlgorithm};
pub use encryption::{CustomerKey, EncryptionDirective};
pub use error::{ConfigError, RemstateError, ResolveError};
pub use identity::{Lineage, LockId, WorkspaceName, DEFAULT_WORKSPACE};
pub use keys::{identify, resolve, KeyLayout};
pub use temporal::Timestamp;
