use std::fmt;

use alloy_primitives::{Address, B256};
use alloy_signer_local::PrivateKeySigner;
use zeroize::Zeroizing;

use crate::errors::ProvisionError;

/// A secp256k1 private key in `0x`-prefixed lowercase hex, with the address
/// it controls.
///
/// The text is wiped on drop and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateKey {
    hex: Zeroizing<String>,
    address: Address,
}

impl PrivateKey {
    /// Parses and normalizes a hex key; `index` only labels errors.
    pub fn parse(raw: &str, index: usize) -> Result<Self, ProvisionError> {
        let invalid = |reason: String| ProvisionError::InvalidKey { index, reason };

        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.len() != 64 {
            return Err(invalid("expected 32 bytes of hex".to_owned()));
        }
        let bytes = Zeroizing::new(hex::decode(digits).map_err(|e| invalid(e.to_string()))?);

        // Rejects zero and scalars above the curve order.
        let signer = PrivateKeySigner::from_bytes(&B256::from_slice(&bytes))
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            hex: Zeroizing::new(format!("0x{}", digits.to_ascii_lowercase())),
            address: signer.address(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.hex
    }

    /// Ethereum address controlled by this key.
    pub fn address(&self) -> Address {
        self.address
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

/// Parses a list of keys, labelling errors by position.
pub fn parse_keys<S: AsRef<str>>(raw: &[S]) -> Result<Vec<PrivateKey>, ProvisionError> {
    raw.iter()
        .enumerate()
        .map(|(i, k)| PrivateKey::parse(k.as_ref(), i))
        .collect()
}
