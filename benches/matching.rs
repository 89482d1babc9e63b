//! Benchmarks for encoding and scoring
//!
//! - Encoding a complete 20-locus profile (40 HMACs)
//! - Tanabe scoring, plaintext vs encoded
//! - Batch matching throughput at increasing candidate counts

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::sync::Arc;
use strmatch::crypto::{EnclaveKey, Encoder};
use strmatch::matching::{score, BatchConfig, BatchMatcher, ProfileInput, TierThresholds};
use strmatch::profile::{AlleleRange, Locus, Profile};

fn complete_profile(id: &str, seed: u16) -> Profile {
    let markers = Locus::ALL.iter().enumerate().map(|(i, &locus)| {
        let i = i as u16;
        (locus, [1 + (seed + i) % 50, 1 + (seed * 7 + i * 3) % 50])
    });
    Profile::new(id, &AlleleRange::default(), markers).unwrap()
}

fn bench_encoder() -> Encoder {
    Encoder::new(
        EnclaveKey::from_secret(b"bench-enclave").unwrap(),
        AlleleRange::default(),
    )
}

fn bench_encode(c: &mut Criterion) {
    let encoder = bench_encoder();
    let profile = complete_profile("P", 3);

    c.bench_function("encode_complete_profile", |b| {
        b.iter(|| encoder.encode(black_box(&profile)).unwrap())
    });
}

fn bench_score(c: &mut Criterion) {
    let encoder = bench_encoder();
    let a = complete_profile("A", 3);
    let b = complete_profile("B", 4);
    let ea = encoder.encode(&a).unwrap();
    let eb = encoder.encode(&b).unwrap();

    let mut group = c.benchmark_group("score");
    group.bench_function("plaintext", |bench| {
        bench.iter(|| score(black_box(&a), black_box(&b)))
    });
    group.bench_function("encoded", |bench| {
        bench.iter(|| score(black_box(&ea), black_box(&eb)))
    });
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let matcher = BatchMatcher::new(
        Arc::new(bench_encoder()),
        TierThresholds::default(),
        BatchConfig::default(),
    );
    let query = complete_profile("Q", 3);

    let mut group = c.benchmark_group("match_batch");
    group.sample_size(20);

    for count in [100, 1_000] {
        let candidates: Vec<Profile> = (0..count)
            .map(|n| complete_profile(&format!("C-{}", n), n as u16))
            .collect();

        group.bench_with_input(BenchmarkId::from_parameter(count), &candidates, |b, candidates| {
            b.iter(|| {
                runtime.block_on(matcher.match_batch(
                    ProfileInput::from(query.clone()),
                    candidates.iter().cloned().map(ProfileInput::from),
                    None,
                ))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_encode, bench_score, bench_batch);
criterion_main!(benches);
