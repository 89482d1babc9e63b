//! strmatch - Privacy-Preserving STR Profile Matching
//!
//! Approximate matching of short tandem repeat (STR) DNA profiles where the
//! comparing party never handles raw allele values.
//!
//! Key principles:
//! - Alleles are replaced by keyed HMAC digests before comparison
//! - One encoder (and one key) per enclave; no global state
//! - The Tanabe score works on equality alone, so plaintext and encoded
//!   profiles score identically
//! - Equality-preserving pseudonymization, NOT homomorphic encryption
//!
//! See: docs/PRIVACY.md

pub mod crypto;
pub mod matching;
pub mod profile;
pub mod serialization;

pub use crypto::{EnclaveKey, EncodedProfile, Encoder};
pub use matching::{classify, score, BatchMatcher, MatchResult, Tier, TierThresholds};
pub use profile::{AlleleRange, Locus, Profile, RawProfile};
