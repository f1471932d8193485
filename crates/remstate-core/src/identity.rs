//! # Identity Newtypes
//!
//! Newtype wrappers for the identifiers that flow through remstate. These
//! prevent accidental identifier confusion: a `LockId` cannot be passed
//! where a `Lineage` is expected.
//!
//! Lineages and lock ids are opaque strings. Freshly generated values are
//! UUID v4, but values read back from storage are accepted verbatim since
//! other writers may have produced them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ResolveError;

/// The reserved name of the primary, unprefixed workspace.
pub const DEFAULT_WORKSPACE: &str = "default";

/// Identifier of one continuous state history.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Lineage(String);

impl Lineage {
    /// Generate a fresh lineage for a workspace written for the first time.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing lineage value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the lineage as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Lineage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockId(String);

impl LockId {
    /// Generate a new random lock identifier.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Wrap an existing lock id, e.g. one supplied by an operator.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the lock id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated workspace name.
///
/// Non-empty and free of `/`, which keeps the workspace-to-path mapping
/// injective.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WorkspaceName(String);

impl WorkspaceName {
    /// Validate and wrap a workspace name.
    pub fn new(name: impl Into<String>) -> Result<Self, ResolveError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ResolveError::EmptyWorkspaceName);
        }
        if name.contains('/') {
            return Err(ResolveError::SeparatorInWorkspaceName { name });
        }
        Ok(Self(name))
    }

    /// The reserved default workspace.
    pub fn default_workspace() -> Self {
        Self(DEFAULT_WORKSPACE.to_string())
    }

    /// Whether this is the reserved default workspace.
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_WORKSPACE
    }

    /// Access the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for WorkspaceName {
    type Error = ResolveError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for WorkspaceName {
    type Error = ResolveError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WorkspaceName> for String {
    fn from(value: WorkspaceName) -> Self {
        value.0
    }
}

impl AsRef<str> for WorkspaceName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WorkspaceName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_lineages_are_unique() {
        assert_ne!(Lineage::generate(), Lineage::generate());
    }

    #[test]
    fn generated_lineage_is_uuid() {
        let lineage = Lineage::generate();
        assert!(Uuid::parse_str(lineage.as_str()).is_ok());
    }

    #[test]
    fn lineage_serializes_as_plain_string() {
        let lineage = Lineage::new("abc");
        assert_eq!(serde_json::to_string(&lineage).unwrap(), "\"abc\"");
    }

    #[test]
    fn lock_ids_are_unique() {
        assert_ne!(LockId::generate(), LockId::generate());
    }

    #[test]
    fn workspace_name_rejects_empty() {
        assert_eq!(
            WorkspaceName::new(""),
            Err(ResolveError::EmptyWorkspaceName)
        );
        assert_eq!(
            WorkspaceName::new("   "),
            Err(ResolveError::EmptyWorkspaceName)
        );
    }

    #[test]
    fn workspace_name_rejects_separator() {
        assert!(matches!(
            WorkspaceName::new("a/b"),
            Err(ResolveError::SeparatorInWorkspaceName { .. })
        ));
    }

    #[test]
    fn workspace_name_accepts_prefix_like_names() {
        let name = WorkspaceName::new("env:").unwrap();
        assert_eq!(name.as_str(), "env:");
        assert!(!name.is_default());
    }

    #[test]
    fn default_workspace_is_default() {
        assert!(WorkspaceName::default_workspace().is_default());
        assert!(WorkspaceName::new("default").unwrap().is_default());
    }

    #[test]
    fn workspace_name_deserialization_validates() {
        let ok: WorkspaceName = serde_json::from_str("\"s1\"").unwrap();
        assert_eq!(ok.as_str(), "s1");
        assert!(serde_json::from_str::<WorkspaceName>("\"a/b\"").is_err());
    }
}
