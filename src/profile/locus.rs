//! Closed set of STR loci accepted by the matcher.
//!
//! The 20 CODIS core loci. Any other name is rejected when a profile is
//! constructed, so downstream code never sees an unknown locus.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One of the 20 CODIS core STR loci.
///
/// Ordering follows declaration order and is used for every `BTreeMap` keyed
/// by locus, which keeps iteration (and serialized output) deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Locus {
    Csf1po,
    D3s1358,
    D5s818,
    D7s820,
    D8s1179,
    D13s317,
    D16s539,
    D18s51,
    D21s11,
    Fga,
    Th01,
    Tpox,
    Vwa,
    D1s1656,
    D2s441,
    D2s1338,
    D10s1248,
    D12s391,
    D19s433,
    D22s1045,
}

impl Locus {
    /// Number of loci in a complete profile
    pub const COUNT: usize = 20;

    /// Every locus, in canonical order
    pub const ALL: [Locus; Locus::COUNT] = [
        Locus::Csf1po,
        Locus::D3s1358,
        Locus::D5s818,
        Locus::D7s820,
        Locus::D8s1179,
        Locus::D13s317,
        Locus::D16s539,
        Locus::D18s51,
        Locus::D21s11,
        Locus::Fga,
        Locus::Th01,
        Locus::Tpox,
        Locus::Vwa,
        Locus::D1s1656,
        Locus::D2s441,
        Locus::D2s1338,
        Locus::D10s1248,
        Locus::D12s391,
        Locus::D19s433,
        Locus::D22s1045,
    ];

    /// Canonical locus name as used in forensic reporting (e.g. `"vWA"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            Locus::Csf1po => "CSF1PO",
            Locus::D3s1358 => "D3S1358",
            Locus::D5s818 => "D5S818",
            Locus::D7s820 => "D7S820",
            Locus::D8s1179 => "D8S1179",
            Locus::D13s317 => "D13S317",
            Locus::D16s539 => "D16S539",
            Locus::D18s51 => "D18S51",
            Locus::D21s11 => "D21S11",
            Locus::Fga => "FGA",
            Locus::Th01 => "TH01",
            Locus::Tpox => "TPOX",
            Locus::Vwa => "vWA",
            Locus::D1s1656 => "D1S1656",
            Locus::D2s441 => "D2S441",
            Locus::D2s1338 => "D2S1338",
            Locus::D10s1248 => "D10S1248",
            Locus::D12s391 => "D12S391",
            Locus::D19s433 => "D19S433",
            Locus::D22s1045 => "D22S1045",
        }
    }
}

impl fmt::Display for Locus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a name is not one of the 20 core loci.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLocus(pub String);

impl fmt::Display for UnknownLocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown locus '{}'", self.0)
    }
}

impl std::error::Error for UnknownLocus {}

impl FromStr for Locus {
    type Err = UnknownLocus;

    /// ASCII case-insensitive, so `"VWA"` and `"vWA"` are the same locus.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Locus::ALL
            .iter()
            .copied()
            .find(|locus| locus.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| UnknownLocus(s.to_string()))
    }
}

impl Serialize for Locus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Locus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
