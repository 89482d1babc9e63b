//! Enclave key material
//!
//! Each enclave (the party doing comparisons) owns one 32-byte secret. It is
//! either drawn from the OS CSPRNG, or derived from a 24-word BIP-39 mnemonic
//! when two enclaves deliberately share a key so their encodings compare.
//!
//! ## Key Hierarchy
//!
//! ```text
//! BIP-39 Mnemonic (24 words)            SystemRandom
//!         │                                  │
//!         ▼                                  │
//! Mnemonic::to_seed("") → [u8; 64]           │
//!         │                                  │
//!         ▼                                  ▼
//! HKDF-SHA256(salt="strmatch-enclave-v1") ─► EnclaveKey [u8; 32]
//!                                            │
//!                                            ├─► allele HMAC key   (crypto::encoder)
//!                                            └─► KeyFingerprint    (non-secret, 8 bytes)
//! ```
//!
//! Key bytes are zeroized on drop and never printed.

use bip39::Mnemonic;
use hkdf::Hkdf;
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Domain separation salt for enclave key derivation (versioned for rotation)
const ENCLAVE_SALT: &[u8] = b"strmatch-enclave-v1";

/// HKDF info string for the enclave secret
const ENCLAVE_INFO: &[u8] = b"enclave-key";

/// Prefix hashed with the key to produce its public fingerprint
const FINGERPRINT_DOMAIN: &[u8] = b"strmatch-fingerprint-v1";

/// Length of an enclave secret
pub const KEY_LEN: usize = 32;

/// Errors that can occur while creating enclave keys
#[derive(Debug, Error)]
pub enum KeyringError {
    #[error("Failed to generate random key: {0}")]
    KeyGeneration(String),

    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("No key material supplied")]
    MissingKey,
}

/// Secret key for one enclave.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EnclaveKey {
    bytes: [u8; KEY_LEN],
}

impl EnclaveKey {
    /// Draw a fresh key from the operating system CSPRNG.
    pub fn generate() -> Result<Self, KeyringError> {
        let rng = SystemRandom::new();
        let mut bytes = [0u8; KEY_LEN];

        rng.fill(&mut bytes)
            .map_err(|e| KeyringError::KeyGeneration(e.to_string()))?;

        Ok(Self { bytes })
    }

    /// Derive a key from a BIP-39 mnemonic.
    ///
    /// Two enclaves using the same mnemonic get the same key, and therefore
    /// comparable encoded profiles. Sharing the mnemonic is a deployment
    /// decision; nothing in this crate transmits it.
    pub fn from_mnemonic(mnemonic: &str) -> Result<Self, KeyringError> {
        let parsed =
            Mnemonic::parse(mnemonic).map_err(|e| KeyringError::InvalidMnemonic(e.to_string()))?;

        let mut seed = parsed.to_seed("");
        let key = Self::derive(&seed);
        seed.zeroize();
        key
    }

    /// Condense arbitrary secret bytes into an enclave key.
    ///
    /// Empty input is refused with [`KeyringError::MissingKey`].
    pub fn from_secret(secret: &[u8]) -> Result<Self, KeyringError> {
        if secret.is_empty() {
            return Err(KeyringError::MissingKey);
        }
        Self::derive(secret)
    }

    fn derive(ikm: &[u8]) -> Result<Self, KeyringError> {
        let hkdf = Hkdf::<Sha256>::new(Some(ENCLAVE_SALT), ikm);
        let mut bytes = [0u8; KEY_LEN];
        hkdf.expand(ENCLAVE_INFO, &mut bytes)
            .map_err(|e| KeyringError::DerivationFailed(format!("{:?}", e)))?;
        Ok(Self { bytes })
    }

    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Public identifier of this key. Reveals nothing about the key bytes.
    pub fn fingerprint(&self) -> KeyFingerprint {
        let mut hasher = Sha256::new();
        hasher.update(FINGERPRINT_DOMAIN);
        hasher.update(self.bytes);
        let digest = hasher.finalize();

        let mut fingerprint = [0u8; 8];
        fingerprint.copy_from_slice(&digest[..8]);
        KeyFingerprint(fingerprint)
    }
}

// Key bytes must never reach logs.
impl fmt::Debug for EnclaveKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnclaveKey")
            .field("fingerprint", &self.fingerprint())
            .finish_non_exhaustive()
    }
}

/// Short non-secret identifier of an [`EnclaveKey`].
///
/// Stamped on every encoded profile so profiles from different enclaves are
/// never silently compared.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyFingerprint([u8; 8]);

impl KeyFingerprint {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 8];
        hex::decode_to_slice(s, &mut bytes)?;
        Ok(Self(bytes))
    }
}

impl fmt::Display for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for KeyFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyFingerprint({})", self.to_hex())
    }
}

impl Serialize for KeyFingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for KeyFingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        KeyFingerprint::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Standard BIP-39 test mnemonic (DO NOT use in production)
    const TEST_MNEMONIC: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon art";

    #[test]
    fn test_generated_keys_differ() {
        let key1 = EnclaveKey::generate().unwrap();
        let key2 = EnclaveKey::generate().unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
        assert_ne!(key1.fingerprint(), key2.fingerprint());
    }

    #[test]
    fn test_mnemonic_determinism() {
        let key1 = EnclaveKey::from_mnemonic(TEST_MNEMONIC).unwrap();
        let key2 = EnclaveKey::from_mnemonic(TEST_MNEMONIC).unwrap();

        assert_eq!(key1.as_bytes(), key2.as_bytes());
        assert_eq!(key1.fingerprint(), key2.fingerprint());
    }

    #[test]
    fn test_different_mnemonics_produce_different_keys() {
        let other = "zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo zoo vote";

        let key1 = EnclaveKey::from_mnemonic(TEST_MNEMONIC).unwrap();
        let key2 = EnclaveKey::from_mnemonic(other).unwrap();

        assert_ne!(key1.as_bytes(), key2.as_bytes());
    }

    #[test]
    fn test_invalid_mnemonic() {
        let result = EnclaveKey::from_mnemonic("invalid mnemonic words");
        assert!(matches!(result, Err(KeyringError::InvalidMnemonic(_))));
    }

    #[test]
    fn test_empty_secret_is_missing_key() {
        assert!(matches!(
            EnclaveKey::from_secret(&[]),
            Err(KeyringError::MissingKey)
        ));
        assert!(EnclaveKey::from_secret(b"short secret").is_ok());
    }

    #[test]
    fn test_key_is_non_zero() {
        let key = EnclaveKey::from_mnemonic(TEST_MNEMONIC).unwrap();
        assert_ne!(key.as_bytes(), &[0u8; KEY_LEN]);
    }

    #[test]
    fn test_debug_hides_key_bytes() {
        let key = EnclaveKey::from_secret(b"test-secret").unwrap();
        let debug = format!("{:?}", key);

        assert!(debug.contains(&key.fingerprint().to_hex()));
        assert!(!debug.contains(&hex::encode(key.as_bytes())));
    }

    #[test]
    fn test_fingerprint_hex_round_trip() {
        let fingerprint = EnclaveKey::from_secret(b"fp").unwrap().fingerprint();
        let hex = fingerprint.to_hex();

        assert_eq!(hex.len(), 16);
        assert_eq!(KeyFingerprint::from_hex(&hex).unwrap(), fingerprint);
        assert!(KeyFingerprint::from_hex("zz").is_err());

        let json = serde_json::to_string(&fingerprint).unwrap();
        assert_eq!(json, format!("\"{}\"", hex));
    }
}
