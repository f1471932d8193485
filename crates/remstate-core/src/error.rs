//! # Error Types: Structured Error Hierarchy
//!
//! Defines the errors owned by `remstate-core`. All errors use `thiserror`
//! for derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Resolution errors are programmer or configuration mistakes and fail
//!   fast. A workspace name is never silently rewritten.
//! - Configuration errors name the offending attribute so an operator can
//!   fix the right line.
//! - Configuration errors are returned as [`ConfigError`] directly and
//!   cancellation as [`crate::OperationCancelled`]; neither passes through
//!   the umbrella.
//! - Crates further up the DAG define their own error enums (decode, lock,
//!   store, client, workspace) and wrap these with `#[from]`.

use thiserror::Error;

/// Top-level error type for `remstate-core` operations.
#[derive(Error, Debug)]
pub enum RemstateError {
    /// Workspace name or path resolution failed.
    #[error("resolution error: {0}")]
    Resolve(#[from] ResolveError),

    /// A stored digest string is malformed.
    #[error("integrity error: {0}")]
    Integrity(String),
}

/// Error while resolving workspace names and physical paths.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// Workspace names must not be empty or blank.
    #[error("workspace name must not be empty")]
    EmptyWorkspaceName,

    /// Workspace names must not contain a path separator, otherwise the
    /// derived path could alias another workspace.
    #[error("workspace name {name:?} must not contain '/'")]
    SeparatorInWorkspaceName {
        /// The rejected name.
        name: String,
    },
}

/// Error in backend configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A required attribute is missing or blank.
    #[error("{attribute}: the value cannot be empty or all whitespace")]
    Blank {
        /// The attribute name.
        attribute: &'static str,
    },

    /// Key-like attributes must not begin or end with a separator.
    #[error("{attribute}: the value must not start or end with \"/\"")]
    EdgeSlash {
        /// The attribute name.
        attribute: &'static str,
    },

    /// Two mutually exclusive attributes were both set.
    #[error("only one of {first}, {second} can be set")]
    Conflict {
        /// The first attribute name.
        first: &'static str,
        /// The second attribute name.
        second: &'static str,
    },

    /// A customer-supplied encryption key was malformed.
    #[error("invalid sse_customer_key value: {0}")]
    InvalidCustomerKey(String),

    /// The KMS key identifier is not a recognisable key id, alias, or ARN.
    #[error("invalid KMS key id: value must be a valid KMS key id, got {0:?}")]
    InvalidKmsKeyId(String),

    /// The configuration document could not be parsed.
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {reason}")]
    Read {
        /// The file that was requested.
        path: String,
        /// The I/O failure.
        reason: String,
    },
}
