//! # Backend Configuration
//!
//! [`BackendConfig`] is the raw, user-supplied document (YAML or JSON).
//! [`BackendConfig::validate`] turns it into a [`ValidatedConfig`], which is
//! the only configuration type the client and lock crates accept.
//!
//! ## Validation Rules
//!
//! - `bucket` and `key` are required and must not be blank.
//! - `key` and `workspace_key_prefix` must not start or end with `/`.
//! - `workspace_key_prefix` defaults to `env:`; an explicit empty string
//!   places named workspaces directly at the bucket root.
//! - At most one of `kms_key_id` and `sse_customer_key`.
//! - `sse_customer_key` is 44 characters of standard base64 (32 bytes).
//! - `kms_key_id` is a key id, multi-region key id, alias, or KMS ARN.

use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::encryption::{CustomerKey, EncryptionDirective};
use crate::error::ConfigError;
use crate::keys::KeyLayout;

/// Prefix under which named workspaces live when none is configured.
pub const DEFAULT_WORKSPACE_KEY_PREFIX: &str = "env:";

/// What to do when a write would regress the stored serial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalenessPolicy {
    /// Log a warning and write anyway.
    #[default]
    Warn,
    /// Refuse the write.
    Reject,
}

/// Raw backend configuration as written by the user.
///
/// In YAML a prefix ending in `:`, including the default `env:`, must be
/// quoted (`workspace_key_prefix: "env:"`); unquoted, the trailing colon
/// starts a mapping and the document fails to parse.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Bucket (top-level namespace) holding the state objects.
    #[serde(default)]
    pub bucket: String,
    /// Logical key of the default workspace's state object.
    #[serde(default)]
    pub key: String,
    /// Prefix for non-default workspaces. `None` means the default prefix.
    #[serde(default)]
    pub workspace_key_prefix: Option<String>,
    /// Request server-side encryption.
    #[serde(default)]
    pub encrypt: bool,
    /// KMS key used for server-side encryption.
    #[serde(default)]
    pub kms_key_id: Option<String>,
    /// Base64 customer-supplied encryption key.
    #[serde(default)]
    pub sse_customer_key: Option<String>,
    /// Table holding lock records. Locking is disabled when absent.
    #[serde(default)]
    pub lock_table: Option<String>,
    /// Policy for writes that regress the stored serial.
    #[serde(default)]
    pub staleness_policy: StalenessPolicy,
}

/// Configuration that has passed every validation rule.
#[derive(Debug, Clone)]
pub struct ValidatedConfig {
    /// Bucket holding the state objects.
    pub bucket: String,
    /// Base key and workspace prefix.
    pub layout: KeyLayout,
    /// Directive passed through to every storage call.
    pub encryption: EncryptionDirective,
    /// Lock table name, if locking is enabled.
    pub lock_table: Option<String>,
    /// Policy for serial regressions.
    pub staleness_policy: StalenessPolicy,
}

impl BackendConfig {
    /// Parse a configuration from YAML.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse a configuration from JSON.
    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(s).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a configuration file. `.json` files are parsed as JSON, anything
    /// else as YAML.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    /// Apply every validation rule and derive the encryption directive.
    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Blank { attribute: "bucket" });
        }
        if self.key.trim().is_empty() {
            return Err(ConfigError::Blank { attribute: "key" });
        }
        if has_edge_slash(&self.key) {
            return Err(ConfigError::EdgeSlash { attribute: "key" });
        }
        let prefix = self
            .workspace_key_prefix
            .unwrap_or_else(|| DEFAULT_WORKSPACE_KEY_PREFIX.to_string());
        if has_edge_slash(&prefix) {
            return Err(ConfigError::EdgeSlash {
                attribute: "workspace_key_prefix",
            });
        }
        if self.kms_key_id.is_some() && self.sse_customer_key.is_some() {
            return Err(ConfigError::Conflict {
                first: "kms_key_id",
                second: "sse_customer_key",
            });
        }

        let encryption = match (self.sse_customer_key, self.kms_key_id) {
            (Some(encoded), _) => EncryptionDirective::CustomerKey(CustomerKey::from_base64(&encoded)?),
            (None, Some(key_id)) => {
                if !is_valid_kms_key_id(&key_id) {
                    return Err(ConfigError::InvalidKmsKeyId(key_id));
                }
                EncryptionDirective::KmsKey { key_id }
            }
            (None, None) if self.encrypt => EncryptionDirective::ServerManaged,
            (None, None) => EncryptionDirective::None,
        };

        Ok(ValidatedConfig {
            bucket: self.bucket,
            layout: KeyLayout::new(self.key, prefix),
            encryption,
            lock_table: self.lock_table.filter(|t| !t.trim().is_empty()),
            staleness_policy: self.staleness_policy,
        })
    }
}

fn has_edge_slash(value: &str) -> bool {
    value.starts_with('/') || value.ends_with('/')
}

/// Accepts key ids (`1234abcd-...`), multi-region key ids (`mrk-<32 hex>`),
/// aliases (`alias/name`), and KMS key or alias ARNs.
fn is_valid_kms_key_id(value: &str) -> bool {
    if let Some(rest) = value.strip_prefix("arn:") {
        let parts: Vec<&str> = rest.splitn(5, ':').collect();
        if parts.len() != 5 || parts[1] != "kms" || parts[0].is_empty() {
            return false;
        }
        let resource = parts[4];
        return resource
            .strip_prefix("key/")
            .map(is_valid_key_id)
            .or_else(|| resource.strip_prefix("alias/").map(is_valid_alias_name))
            .unwrap_or(false);
    }
    if let Some(name) = value.strip_prefix("alias/") {
        return is_valid_alias_name(name);
    }
    is_valid_key_id(value)
}

fn is_valid_key_id(value: &str) -> bool {
    if let Some(hex) = value.strip_prefix("mrk-") {
        return hex.len() == 32 && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    Uuid::parse_str(value).is_ok()
}

fn is_valid_alias_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '_' | '-'))
}
