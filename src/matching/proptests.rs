//! Property-based tests for scoring
//!
//! Tests for:
//! - Reflexivity: a typed profile scores 1.0 against itself
//! - Symmetry: score(a, b) == score(b, a)
//! - Encoding parity: encoded scores are bit-identical to plaintext scores
//! - Disjointness: no shared allele means 0.0
//! - Monotonicity: losing an allele never raises the score

use super::scorer::{compare, score};
use crate::crypto::{EnclaveKey, Encoder};
use crate::profile::{AlleleRange, Locus, Profile};
use proptest::prelude::*;
use std::collections::BTreeMap;

fn any_locus() -> impl Strategy<Value = Locus> {
    prop::sample::select(Locus::ALL.to_vec())
}

/// Profiles typed at 1..=20 loci with alleles drawn from `alleles`.
fn profile_with(
    id: &'static str,
    alleles: std::ops::RangeInclusive<u16>,
) -> impl Strategy<Value = Profile> {
    prop::collection::btree_map(any_locus(), (alleles.clone(), alleles), 1..=Locus::COUNT)
        .prop_map(move |markers| build(id, &markers))
}

fn build(id: &str, markers: &BTreeMap<Locus, (u16, u16)>) -> Profile {
    Profile::new(
        id,
        &AlleleRange::default(),
        markers.iter().map(|(&locus, &(a, b))| (locus, [a, b])),
    )
    .unwrap()
}

fn test_encoder(seed: u64) -> Encoder {
    let key = EnclaveKey::from_secret(&seed.to_le_bytes()).unwrap();
    Encoder::new(key, AlleleRange::default())
}

proptest! {
    /// Property test: Reflexivity
    /// Any non-empty profile, partial or complete, is a perfect match for itself
    #[test]
    fn prop_self_score_is_one(p in profile_with("P", 1..=50)) {
        prop_assert_eq!(score(&p, &p), 1.0);
    }

    /// Property test: Symmetry
    #[test]
    fn prop_symmetric(a in profile_with("A", 1..=50), b in profile_with("B", 1..=50)) {
        prop_assert_eq!(score(&a, &b), score(&b, &a));
    }

    /// Property test: Bounds
    #[test]
    fn prop_score_in_unit_interval(a in profile_with("A", 1..=50), b in profile_with("B", 1..=50)) {
        let s = score(&a, &b);
        prop_assert!((0.0..=1.0).contains(&s), "score {} out of bounds", s);
    }

    /// Property test: Encoding parity
    /// score(encode(a), encode(b)) == score(a, b) exactly, breakdown included
    #[test]
    fn prop_encoding_preserves_score(
        a in profile_with("A", 5..=15),
        b in profile_with("B", 5..=15),
        seed in any::<u64>(),
    ) {
        let encoder = test_encoder(seed);
        let ea = encoder.encode(&a).unwrap();
        let eb = encoder.encode(&b).unwrap();

        let plain = compare(&a, &b);
        let encoded = compare(&ea, &eb);

        prop_assert_eq!(plain.score.to_bits(), encoded.score.to_bits());
        prop_assert_eq!(plain.shared_alleles, encoded.shared_alleles);
        prop_assert_eq!(plain.breakdown(), encoded.breakdown());
    }

    /// Property test: Disjointness
    /// Alleles drawn from non-overlapping ranges never match
    #[test]
    fn prop_no_shared_alleles_scores_zero(
        a in profile_with("A", 1..=25),
        b in profile_with("B", 26..=50),
    ) {
        prop_assert_eq!(score(&a, &b), 0.0);
    }

    /// Property test: Monotonicity
    /// Replacing one of b's alleles with a value a never carries cannot raise
    /// the score while the compared loci stay the same
    #[test]
    fn prop_losing_an_allele_never_raises_score(
        a in profile_with("A", 1..=25),
        pick in any::<prop::sample::Index>(),
        slot in 0usize..2,
        replacement in 26u16..=50,
    ) {
        let mut markers: BTreeMap<Locus, (u16, u16)> = a
            .loci()
            .iter()
            .map(|(&locus, pair)| (locus, (pair.as_slice()[0], pair.as_slice()[1])))
            .collect();
        let b = build("B", &markers);

        let locus = *pick.get(&markers.keys().copied().collect::<Vec<_>>());
        if let Some(entry) = markers.get_mut(&locus) {
            if slot == 0 { entry.0 = replacement } else { entry.1 = replacement }
        }
        let degraded = build("B2", &markers);

        prop_assert_eq!(compare(&a, &b).compared_loci(), compare(&a, &degraded).compared_loci());
        prop_assert!(score(&a, &degraded) <= score(&a, &b));
        prop_assert!(score(&a, &degraded) < 1.0);
    }
}
