//! Tanabe allele-overlap score
//!
//! ```text
//! score = 2 × shared alleles / total alleles compared
//! ```
//!
//! computed over the loci both profiles type. The scorer only ever tests
//! alleles for equality, so the same code runs on plaintext repeat counts and
//! on keyed digests, and gives bit-identical results for both when the digests
//! come from one enclave key.
//!
//! Two profiles with no locus in common score 0.0: there is no basis for
//! comparison, and a zero keeps such pairs out of every match tier. Callers
//! that need to tell this apart from a genuine mismatch can check
//! [`Comparison::compared_loci`].

use crate::crypto::EncodedProfile;
use crate::profile::{Locus, Profile};
use serde::Serialize;
use std::collections::BTreeMap;

/// Anything with per-locus alleles that can be compared for equality.
pub trait Genotype {
    type Allele: Eq;

    fn profile_id(&self) -> &str;

    /// Loci present in this profile, in canonical order.
    fn typed_loci(&self) -> Box<dyn Iterator<Item = Locus> + '_>;

    fn alleles_at(&self, locus: Locus) -> Option<&[Self::Allele]>;
}

impl Genotype for Profile {
    type Allele = u16;

    fn profile_id(&self) -> &str {
        self.id()
    }

    fn typed_loci(&self) -> Box<dyn Iterator<Item = Locus> + '_> {
        Box::new(self.loci().keys().copied())
    }

    fn alleles_at(&self, locus: Locus) -> Option<&[u16]> {
        self.alleles(locus).map(|pair| pair.as_slice())
    }
}

impl Genotype for EncodedProfile {
    type Allele = crate::crypto::AlleleDigest;

    fn profile_id(&self) -> &str {
        self.id()
    }

    fn typed_loci(&self) -> Box<dyn Iterator<Item = Locus> + '_> {
        Box::new(self.loci().keys().copied())
    }

    fn alleles_at(&self, locus: Locus) -> Option<&[Self::Allele]> {
        self.loci().get(&locus).map(|pair| pair.as_slice())
    }
}

/// Allele counts at one common locus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocusComparison {
    /// Size of the multiset intersection (0, 1 or 2 for diploid loci)
    pub shared: usize,
    /// Alleles contributed by both profiles at this locus
    pub total: usize,
}

impl LocusComparison {
    pub fn is_shared(&self) -> bool {
        self.shared > 0
    }
}

/// Full result of comparing two profiles.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub score: f64,
    pub shared_alleles: usize,
    pub total_alleles: usize,
    pub loci: BTreeMap<Locus, LocusComparison>,
}

impl Comparison {
    /// Number of loci both profiles type
    pub fn compared_loci(&self) -> usize {
        self.loci.len()
    }

    /// Locus → shared / not shared, for audit output.
    pub fn breakdown(&self) -> BTreeMap<Locus, bool> {
        self.loci
            .iter()
            .map(|(&locus, cmp)| (locus, cmp.is_shared()))
            .collect()
    }
}

/// Size of the multiset intersection of two allele lists.
fn shared_alleles<T: Eq>(a: &[T], b: &[T]) -> usize {
    let mut taken = vec![false; b.len()];
    let mut shared = 0;

    for allele in a {
        let hit = b
            .iter()
            .enumerate()
            .position(|(i, other)| !taken[i] && other == allele);
        if let Some(i) = hit {
            taken[i] = true;
            shared += 1;
        }
    }

    shared
}

/// Compare two profiles locus by locus.
pub fn compare<G: Genotype>(a: &G, b: &G) -> Comparison {
    let mut loci = BTreeMap::new();
    let mut shared_total = 0;
    let mut allele_total = 0;

    for locus in a.typed_loci() {
        let (Some(ours), Some(theirs)) = (a.alleles_at(locus), b.alleles_at(locus)) else {
            continue;
        };

        let shared = shared_alleles(ours, theirs);
        let total = ours.len() + theirs.len();

        shared_total += shared;
        allele_total += total;
        loci.insert(locus, LocusComparison { shared, total });
    }

    let score = if allele_total > 0 {
        (2 * shared_total) as f64 / allele_total as f64
    } else {
        0.0
    };

    Comparison {
        score,
        shared_alleles: shared_total,
        total_alleles: allele_total,
        loci,
    }
}

/// Tanabe score in `[0.0, 1.0]`.
pub fn score<G: Genotype>(a: &G, b: &G) -> f64 {
    compare(a, b).score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::AlleleRange;

    fn profile(id: &str, markers: &[(Locus, [u16; 2])]) -> Profile {
        Profile::new(id, &AlleleRange::default(), markers.iter().copied()).unwrap()
    }

    #[test]
    fn test_shared_alleles_multiset() {
        assert_eq!(shared_alleles(&[14, 16], &[14, 16]), 2);
        assert_eq!(shared_alleles(&[14, 16], &[16, 17]), 1);
        assert_eq!(shared_alleles(&[14, 16], &[10, 13]), 0);
        // Homozygous 8,8 only matches one 8 on the other side
        assert_eq!(shared_alleles(&[8, 8], &[8, 9]), 1);
        assert_eq!(shared_alleles(&[8, 8], &[8, 8]), 2);
        assert_eq!(shared_alleles::<u16>(&[], &[1, 2]), 0);
    }

    #[test]
    fn test_identical_profiles_score_one() {
        let p = profile("P", &[(Locus::D3s1358, [14, 16]), (Locus::D5s818, [11, 12])]);
        let cmp = compare(&p, &p);

        assert_eq!(cmp.score, 1.0);
        assert_eq!(cmp.shared_alleles, 4);
        assert_eq!(cmp.total_alleles, 8);
    }

    #[test]
    fn test_half_shared() {
        let a = profile("A", &[(Locus::D3s1358, [14, 16]), (Locus::D5s818, [11, 12])]);
        let b = profile("B", &[(Locus::D3s1358, [14, 16]), (Locus::D5s818, [10, 13])]);
        let cmp = compare(&a, &b);

        assert_eq!(cmp.shared_alleles, 2);
        assert_eq!(cmp.total_alleles, 8);
        assert_eq!(cmp.score, 0.5);
        assert_eq!(
            cmp.breakdown(),
            BTreeMap::from([(Locus::D3s1358, true), (Locus::D5s818, false)])
        );
    }

    #[test]
    fn test_only_common_loci_are_compared() {
        let a = profile("A", &[(Locus::D3s1358, [14, 16]), (Locus::Fga, [20, 22])]);
        let b = profile("B", &[(Locus::D3s1358, [14, 16]), (Locus::Th01, [6, 9])]);
        let cmp = compare(&a, &b);

        assert_eq!(cmp.compared_loci(), 1);
        assert_eq!(cmp.score, 1.0);
    }

    #[test]
    fn test_disjoint_loci_score_zero() {
        let a = profile("A", &[(Locus::D3s1358, [14, 16])]);
        let b = profile("B", &[(Locus::Fga, [20, 22])]);
        let cmp = compare(&a, &b);

        assert_eq!(cmp.score, 0.0);
        assert_eq!(cmp.compared_loci(), 0);
        assert_eq!(cmp.total_alleles, 0);
    }

    #[test]
    fn test_empty_profiles_score_zero() {
        let empty = profile("E", &[]);
        assert_eq!(score(&empty, &empty), 0.0);
    }

    #[test]
    fn test_symmetry_with_homozygous() {
        let a = profile("A", &[(Locus::Tpox, [8, 8]), (Locus::Vwa, [16, 18])]);
        let b = profile("B", &[(Locus::Tpox, [8, 11]), (Locus::Vwa, [18, 18])]);

        assert_eq!(score(&a, &b), score(&b, &a));
        assert_eq!(score(&a, &b), 0.5);
    }

    #[test]
    fn test_partial_match_mixed_loci() {
        // 4 loci, two full and two half matches: 6 shared of 16 alleles
        let a = profile(
            "SUSPECT_001",
            &[
                (Locus::D3s1358, [14, 16]),
                (Locus::D5s818, [11, 12]),
                (Locus::D7s820, [8, 10]),
                (Locus::Vwa, [16, 18]),
            ],
        );
        let b = profile(
            "CRIME_SCENE_001",
            &[
                (Locus::D3s1358, [14, 16]),
                (Locus::D5s818, [11, 13]),
                (Locus::D7s820, [8, 10]),
                (Locus::Vwa, [16, 19]),
            ],
        );

        assert_eq!(score(&a, &b), 0.75);
    }
}
