//! Allele pseudonymization
//!
//! Every allele is replaced by `HMAC-SHA256(k, locus || 0x1F || allele)`, where
//! `k` is derived from the enclave key with HKDF. Equal alleles at the same
//! locus under the same key give equal digests, so the scorer can count shared
//! alleles without ever seeing a repeat count.
//!
//! # Security Properties
//!
//! - **Determinism**: same key, locus and allele always give the same digest
//! - **Key Isolation**: different enclave keys give unrelated digests
//! - **Dictionary Resistance**: without the key, the 1..=50 allele domain
//!   cannot be enumerated offline
//!
//! # Residual Risk
//!
//! This is equality-preserving pseudonymization, not semantically secure
//! encryption. Anyone holding many encoded profiles from one enclave can count
//! digest frequencies per locus and so learn relative allele popularity.
//! Deployments that need more must put a private set intersection or a real
//! homomorphic scheme behind this same contract. See `docs/PRIVACY.md`.

use crate::crypto::keyring::{EnclaveKey, KeyFingerprint};
use crate::profile::{AlleleRange, Locus, Profile, ProfileError, RawProfile};
use hkdf::Hkdf;
use ring::hmac;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::Sha256;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use zeroize::Zeroize;

/// Separates the locus name from the allele bytes in the HMAC message
const FIELD_SEPARATOR: u8 = 0x1f;

/// Digest width in bytes (HMAC-SHA256 output)
pub const DIGEST_LEN: usize = 32;

/// Encoder errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Encoder has no key material")]
    MissingKey,

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Keyed digest of one allele.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AlleleDigest([u8; DIGEST_LEN]);

impl AlleleDigest {
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for AlleleDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // 6 bytes is plenty to tell digests apart in test output
        write!(f, "AlleleDigest({}…)", hex::encode(&self.0[..6]))
    }
}

impl Serialize for AlleleDigest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&self.to_hex())
        } else {
            serializer.serialize_bytes(&self.0)
        }
    }
}

struct DigestVisitor;

impl DigestVisitor {
    fn from_slice<E: de::Error>(bytes: &[u8]) -> Result<AlleleDigest, E> {
        let array: [u8; DIGEST_LEN] = bytes
            .try_into()
            .map_err(|_| E::invalid_length(bytes.len(), &"32 bytes"))?;
        Ok(AlleleDigest(array))
    }
}

impl<'de> Visitor<'de> for DigestVisitor {
    type Value = AlleleDigest;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a 32-byte allele digest as bytes or hex string")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
        let bytes = hex::decode(v).map_err(E::custom)?;
        Self::from_slice(&bytes)
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Self::Value, E> {
        Self::from_slice(v)
    }

    fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut bytes = Vec::with_capacity(DIGEST_LEN);
        while let Some(byte) = seq.next_element::<u8>()? {
            bytes.push(byte);
        }
        Self::from_slice(&bytes)
    }
}

impl<'de> Deserialize<'de> for AlleleDigest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            deserializer.deserialize_str(DigestVisitor)
        } else {
            deserializer.deserialize_bytes(DigestVisitor)
        }
    }
}

/// Unordered pair of digests at one locus (sorted on construction).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[AlleleDigest; 2]", into = "[AlleleDigest; 2]")]
pub struct DigestPair([AlleleDigest; 2]);

impl DigestPair {
    pub fn new(a: AlleleDigest, b: AlleleDigest) -> Self {
        if a <= b {
            Self([a, b])
        } else {
            Self([b, a])
        }
    }

    pub fn as_slice(&self) -> &[AlleleDigest] {
        &self.0
    }
}

impl From<[AlleleDigest; 2]> for DigestPair {
    fn from(values: [AlleleDigest; 2]) -> Self {
        Self::new(values[0], values[1])
    }
}

impl From<DigestPair> for [AlleleDigest; 2] {
    fn from(pair: DigestPair) -> Self {
        pair.0
    }
}

/// Profile with every allele replaced by its keyed digest.
///
/// Carries the fingerprint of the enclave key that produced it; digests from
/// different enclaves are not comparable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedProfile {
    id: String,
    enclave: KeyFingerprint,
    #[serde(rename = "markers")]
    loci: BTreeMap<Locus, DigestPair>,
}

impl EncodedProfile {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn enclave(&self) -> KeyFingerprint {
        self.enclave
    }

    pub fn loci(&self) -> &BTreeMap<Locus, DigestPair> {
        &self.loci
    }

    pub fn len(&self) -> usize {
        self.loci.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loci.is_empty()
    }
}

/// Per-enclave encoder owning the enclave key.
///
/// The key is read-only while encoding, so one encoder can be shared across
/// worker tasks behind an `Arc` without locking.
#[derive(Debug)]
pub struct Encoder {
    key: Option<EnclaveKey>,
    range: AlleleRange,
}

impl Encoder {
    pub fn new(key: EnclaveKey, range: AlleleRange) -> Self {
        Self {
            key: Some(key),
            range,
        }
    }

    /// Encoder with a fresh random key and the default allele range.
    pub fn ephemeral() -> Result<Self, crate::crypto::KeyringError> {
        Ok(Self::new(EnclaveKey::generate()?, AlleleRange::default()))
    }

    pub fn range(&self) -> &AlleleRange {
        &self.range
    }

    /// Fingerprint of the held key, `None` once disposed.
    pub fn fingerprint(&self) -> Option<KeyFingerprint> {
        self.key.as_ref().map(EnclaveKey::fingerprint)
    }

    /// Discard the key. Later calls to `encode` fail with `MissingKey`.
    pub fn dispose(&mut self) {
        // EnclaveKey zeroizes itself on drop
        self.key = None;
    }

    /// Encode a validated profile.
    pub fn encode(&self, profile: &Profile) -> Result<EncodedProfile, EncodeError> {
        let key = self.key.as_ref().ok_or(EncodeError::MissingKey)?;
        let hmac_key = derive_allele_key(key);

        let mut loci = BTreeMap::new();
        for (&locus, pair) in profile.loci() {
            let [a, b] = <[u16; 2]>::from(*pair);
            self.range.check(profile.id(), locus, i64::from(a))?;
            self.range.check(profile.id(), locus, i64::from(b))?;

            let pair = DigestPair::new(
                digest_allele(&hmac_key, locus, a),
                digest_allele(&hmac_key, locus, b),
            );
            loci.insert(locus, pair);
        }

        Ok(EncodedProfile {
            id: profile.id().to_string(),
            enclave: key.fingerprint(),
            loci,
        })
    }

    /// Validate a raw profile against this encoder's range, then encode it.
    pub fn encode_raw(&self, raw: &RawProfile) -> Result<EncodedProfile, EncodeError> {
        if self.key.is_none() {
            return Err(EncodeError::MissingKey);
        }
        let profile = Profile::from_raw(raw, &self.range)?;
        self.encode(&profile)
    }
}

/// Derive the per-enclave HMAC key for allele digests.
fn derive_allele_key(key: &EnclaveKey) -> hmac::Key {
    let hk = Hkdf::<Sha256>::new(Some(b"strmatch-allele-v1"), key.as_bytes());
    let mut bytes = [0u8; 32];
    hk.expand(b"hmac-sha256-key", &mut bytes)
        .expect("HKDF expand should never fail with valid length");
    let hmac_key = hmac::Key::new(hmac::HMAC_SHA256, &bytes);
    bytes.zeroize();
    hmac_key
}

fn digest_allele(key: &hmac::Key, locus: Locus, allele: u16) -> AlleleDigest {
    let mut ctx = hmac::Context::with_key(key);
    ctx.update(locus.as_str().as_bytes());
    ctx.update(&[FIELD_SEPARATOR]);
    ctx.update(&allele.to_be_bytes());
    let tag = ctx.sign();

    let mut digest = [0u8; DIGEST_LEN];
    digest.copy_from_slice(tag.as_ref());
    AlleleDigest(digest)
}
