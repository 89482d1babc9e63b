//! STR profile model
//!
//! A [`Profile`] maps each typed [`Locus`] to exactly two repeat counts. Shape
//! errors (unknown locus, wrong allele count, implausible repeat count) are
//! rejected here, at construction, so the encoder and scorer only ever see
//! well-formed genotypes.
//!
//! Partial profiles are allowed: scoring is defined over the loci two profiles
//! have in common.

pub mod locus;

pub use locus::{Locus, UnknownLocus};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Default lowest plausible repeat count
pub const DEFAULT_MIN_ALLELE: u16 = 1;

/// Default highest plausible repeat count
pub const DEFAULT_MAX_ALLELE: u16 = 50;

/// Profile construction errors
///
/// Every variant names the profile and locus involved. The allele value is
/// carried as an `Option` so [`ProfileError::redacted`] can strip it before an
/// error is reported outside the enclave that supplied the plaintext.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProfileError {
    #[error("profile '{profile_id}': invalid locus '{locus}'")]
    InvalidLocus { profile_id: String, locus: String },

    #[error(
        "profile '{profile_id}': allele {} at {locus} outside {min}..={max}",
        describe_value(.value)
    )]
    AlleleOutOfRange {
        profile_id: String,
        locus: Locus,
        value: Option<i64>,
        min: u16,
        max: u16,
    },

    #[error("profile '{profile_id}': locus {locus} has {count} allele(s), expected 2")]
    IncompleteLocus {
        profile_id: String,
        locus: Locus,
        count: usize,
    },

    #[error("profile '{profile_id}': locus {locus} given more than once")]
    DuplicateLocus { profile_id: String, locus: Locus },

    #[error("invalid allele range {min}..={max}")]
    InvalidAlleleRange { min: u16, max: u16 },
}

fn describe_value(value: &Option<i64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "<redacted>".to_string(),
    }
}

impl ProfileError {
    /// Drop the raw allele value, keeping profile and locus.
    pub fn redacted(self) -> Self {
        match self {
            ProfileError::AlleleOutOfRange {
                profile_id,
                locus,
                min,
                max,
                ..
            } => ProfileError::AlleleOutOfRange {
                profile_id,
                locus,
                value: None,
                min,
                max,
            },
            other => other,
        }
    }
}

/// Inclusive bounds on a plausible repeat count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAlleleRange")]
pub struct AlleleRange {
    min: u16,
    max: u16,
}

#[derive(Deserialize)]
struct RawAlleleRange {
    #[serde(default = "default_min_allele")]
    min: u16,
    #[serde(default = "default_max_allele")]
    max: u16,
}

fn default_min_allele() -> u16 {
    DEFAULT_MIN_ALLELE
}

fn default_max_allele() -> u16 {
    DEFAULT_MAX_ALLELE
}

impl TryFrom<RawAlleleRange> for AlleleRange {
    type Error = ProfileError;

    fn try_from(raw: RawAlleleRange) -> Result<Self, Self::Error> {
        AlleleRange::new(raw.min, raw.max)
    }
}

impl AlleleRange {
    pub fn new(min: u16, max: u16) -> Result<Self, ProfileError> {
        if min == 0 || min > max {
            return Err(ProfileError::InvalidAlleleRange { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn min(&self) -> u16 {
        self.min
    }

    pub fn max(&self) -> u16 {
        self.max
    }

    pub fn contains(&self, value: i64) -> bool {
        (i64::from(self.min)..=i64::from(self.max)).contains(&value)
    }

    /// Validate one allele, producing the range error for `profile_id`/`locus`.
    pub(crate) fn check(
        &self,
        profile_id: &str,
        locus: Locus,
        value: i64,
    ) -> Result<u16, ProfileError> {
        if !self.contains(value) {
            return Err(ProfileError::AlleleOutOfRange {
                profile_id: profile_id.to_string(),
                locus,
                value: Some(value),
                min: self.min,
                max: self.max,
            });
        }
        // contains() bounds the value to u16
        Ok(value as u16)
    }
}

impl Default for AlleleRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_ALLELE,
            max: DEFAULT_MAX_ALLELE,
        }
    }
}

/// Unordered diploid genotype at one locus.
///
/// Stored sorted, so `[16, 14]` and `[14, 16]` are the same pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u16; 2]", into = "[u16; 2]")]
pub struct AllelePair([u16; 2]);

impl AllelePair {
    pub fn new(a: u16, b: u16) -> Self {
        if a <= b {
            Self([a, b])
        } else {
            Self([b, a])
        }
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.0
    }

    pub fn is_homozygous(&self) -> bool {
        self.0[0] == self.0[1]
    }
}

impl From<[u16; 2]> for AllelePair {
    fn from(values: [u16; 2]) -> Self {
        Self::new(values[0], values[1])
    }
}

impl From<AllelePair> for [u16; 2] {
    fn from(pair: AllelePair) -> Self {
        pair.0
    }
}

/// Loosely-typed profile as it arrives from files or upstream services.
///
/// ```json
/// { "id": "SUSPECT_001", "markers": { "D3S1358": [14, 16] } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawProfile {
    pub id: String,
    #[serde(default)]
    pub markers: BTreeMap<String, Vec<i64>>,
}

/// Validated STR profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawProfile")]
pub struct Profile {
    id: String,
    #[serde(rename = "markers")]
    loci: BTreeMap<Locus, AllelePair>,
}

impl Profile {
    /// Build a profile from typed loci, checking every allele against `range`.
    pub fn new<I>(id: impl Into<String>, range: &AlleleRange, markers: I) -> Result<Self, ProfileError>
    where
        I: IntoIterator<Item = (Locus, [u16; 2])>,
    {
        let id = id.into();
        let mut loci = BTreeMap::new();

        for (locus, [a, b]) in markers {
            let a = range.check(&id, locus, i64::from(a))?;
            let b = range.check(&id, locus, i64::from(b))?;
            if loci.insert(locus, AllelePair::new(a, b)).is_some() {
                return Err(ProfileError::DuplicateLocus {
                    profile_id: id,
                    locus,
                });
            }
        }

        Ok(Self { id, loci })
    }

    /// Validate a raw profile.
    pub fn from_raw(raw: &RawProfile, range: &AlleleRange) -> Result<Self, ProfileError> {
        let mut loci = BTreeMap::new();

        for (name, alleles) in &raw.markers {
            let locus: Locus = name.parse().map_err(|_| ProfileError::InvalidLocus {
                profile_id: raw.id.clone(),
                locus: name.clone(),
            })?;

            let [a, b] = alleles.as_slice() else {
                return Err(ProfileError::IncompleteLocus {
                    profile_id: raw.id.clone(),
                    locus,
                    count: alleles.len(),
                });
            };

            let a = range.check(&raw.id, locus, *a)?;
            let b = range.check(&raw.id, locus, *b)?;

            if loci.insert(locus, AllelePair::new(a, b)).is_some() {
                return Err(ProfileError::DuplicateLocus {
                    profile_id: raw.id.clone(),
                    locus,
                });
            }
        }

        Ok(Self {
            id: raw.id.clone(),
            loci,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn loci(&self) -> &BTreeMap<Locus, AllelePair> {
        &self.loci
    }

    pub fn alleles(&self, locus: Locus) -> Option<&AllelePair> {
        self.loci.get(&locus)
    }

    /// Number of typed loci
    pub fn len(&self) -> usize {
        self.loci.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loci.is_empty()
    }

    /// True when all 20 core loci are typed.
    pub fn is_complete(&self) -> bool {
        self.loci.len() == Locus::COUNT
    }

    pub fn missing_loci(&self) -> Vec<Locus> {
        Locus::ALL
            .iter()
            .copied()
            .filter(|locus| !self.loci.contains_key(locus))
            .collect()
    }
}

impl TryFrom<RawProfile> for Profile {
    type Error = ProfileError;

    /// Uses the default allele range.
    fn try_from(raw: RawProfile) -> Result<Self, Self::Error> {
        Profile::from_raw(&raw, &AlleleRange::default())
    }
}

impl From<&Profile> for RawProfile {
    fn from(profile: &Profile) -> Self {
        let markers = profile
            .loci
            .iter()
            .map(|(locus, pair)| {
                let values = pair.as_slice().iter().map(|&v| i64::from(v)).collect();
                (locus.as_str().to_string(), values)
            })
            .collect();

        RawProfile {
            id: profile.id.clone(),
            markers,
        }
    }
}
