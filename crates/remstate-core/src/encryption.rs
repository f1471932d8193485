//! # Encryption Directive
//!
//! An opaque instruction handed to the blob store on every write (and on
//! reads, since customer-key encrypted objects cannot be fetched without the
//! key). remstate never interprets the directive beyond choosing which
//! variant a configuration produces.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::ConfigError;

/// Length of a base64-encoded 256-bit customer key.
pub const CUSTOMER_KEY_ENCODED_LEN: usize = 44;

/// A 256-bit customer-supplied encryption key.
///
/// The key bytes are wiped on drop and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CustomerKey([u8; 32]);

impl CustomerKey {
    /// Wrap raw key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Decode a key from its 44-character standard base64 form.
    pub fn from_base64(encoded: &str) -> Result<Self, ConfigError> {
        if encoded.len() != CUSTOMER_KEY_ENCODED_LEN {
            return Err(ConfigError::InvalidCustomerKey(format!(
                "sse_customer_key must be {CUSTOMER_KEY_ENCODED_LEN} characters in length"
            )));
        }
        let mut decoded = STANDARD.decode(encoded).map_err(|e| {
            ConfigError::InvalidCustomerKey(format!("sse_customer_key must be base64 encoded: {e}"))
        })?;
        if decoded.len() != 32 {
            let len = decoded.len();
            decoded.zeroize();
            return Err(ConfigError::InvalidCustomerKey(format!(
                "sse_customer_key must decode to 32 bytes, got {len}"
            )));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(bytes))
    }

    /// Access the raw key bytes for handing to the blob store.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for CustomerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("CustomerKey(<redacted>)")
    }
}

/// How the blob store should encrypt the state object at rest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EncryptionDirective {
    /// No encryption requested.
    #[default]
    None,
    /// Encryption with keys managed by the storage service.
    ServerManaged,
    /// Encryption with a key supplied on every request.
    CustomerKey(CustomerKey),
    /// Encryption with a key held in a key management service.
    KmsKey {
        /// Key id, alias, or ARN.
        key_id: String,
    },
}

impl EncryptionDirective {
    /// Short mode name for logging; never includes key material.
    pub fn mode(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::ServerManaged => "server-managed",
            Self::CustomerKey(_) => "customer-key",
            Self::KmsKey { .. } => "kms",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_KEY: &str = "4Dm1n4rphuFgawxuzY/bEfvLf6rYK0gIjfaDSLlfXNk=";

    #[test]
    fn valid_key_decodes() {
        let key = CustomerKey::from_base64(VALID_KEY).unwrap();
        assert_eq!(STANDARD.encode(key.as_bytes()), VALID_KEY);
    }

    #[test]
    fn short_key_rejected_by_length() {
        let err = CustomerKey::from_base64("test").unwrap_err();
        assert!(err.to_string().contains("44 characters"));
    }

    #[test]
    fn bad_encoding_rejected() {
        let err = CustomerKey::from_base64("====CT70aTYB2JGff7AjQtwbiLkwH4npICay1PWtmdka").unwrap_err();
        assert!(err.to_string().contains("base64"));
    }

    #[test]
    fn debug_redacts_key() {
        let key = CustomerKey::from_base64(VALID_KEY).unwrap();
        let shown = format!("{:?}", EncryptionDirective::CustomerKey(key));
        assert!(shown.contains("redacted"));
        assert!(!shown.contains(VALID_KEY));
    }

    #[test]
    fn mode_names() {
        assert_eq!(EncryptionDirective::None.mode(), "none");
        assert_eq!(EncryptionDirective::ServerManaged.mode(), "server-managed");
        assert_eq!(
            EncryptionDirective::KmsKey { key_id: "alias/x".into() }.mode(),
            "kms"
        );
    }
}
