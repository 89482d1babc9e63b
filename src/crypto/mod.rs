/// Cryptographic primitives for privacy-preserving profile comparison
///
/// This module implements:
/// - Enclave key material, random or mnemonic-derived (keyring)
/// - Keyed allele pseudonymization for equality-only comparison (encoder)
///
/// See: docs/PRIVACY.md for what the encoding does and does not hide
pub mod encoder;
pub mod keyring;

pub use encoder::{AlleleDigest, DigestPair, EncodeError, EncodedProfile, Encoder};
pub use keyring::{EnclaveKey, KeyFingerprint, KeyringError};
