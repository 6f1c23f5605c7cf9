//! Benchmarks for hintcrack
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hintcrack::master::combinations::generate;
use hintcrack::master::registry::PasswordRegistry;
use hintcrack::messages::HintTask;
use hintcrack::worker::{sha256_hex, Cracker, Sha256Cracker};
use std::sync::Arc;

const ALPHABET: &str = "ABCDEFGHIJK";

fn benchmark_candidate_generation(c: &mut Criterion) {
    let alphabet: Vec<char> = ALPHABET.chars().collect();

    c.bench_function("generate_candidates_11_to_9", |b| {
        b.iter(|| {
            let candidates = generate(black_box(&alphabet), 9).unwrap();
            black_box(candidates);
        })
    });
}

fn benchmark_crack_hint(c: &mut Criterion) {
    let task = HintTask {
        record_id: 1,
        encrypted_hint: sha256_hex("FEDCBA"),
        candidate: Arc::from(vec!['A', 'B', 'C', 'D', 'E', 'F']),
    };

    c.bench_function("crack_hint_6_chars", |b| {
        b.iter(|| {
            let decrypted = Sha256Cracker.crack_hint(black_box(&task));
            black_box(decrypted);
        })
    });
}

fn benchmark_crack_password(c: &mut Criterion) {
    let alphabet: Arc<[char]> = "ABCDEF".chars().collect();
    let mut registry = PasswordRegistry::new();
    let record = registry
        .create(
            1,
            "bench".into(),
            sha256_hex("ABBAAB"),
            Vec::new(),
            alphabet,
            6,
        )
        .unwrap()
        .clone();

    c.bench_function("crack_password_6_of_6", |b| {
        b.iter(|| {
            let decrypted = Sha256Cracker.crack_password(black_box(&record));
            black_box(decrypted);
        })
    });
}

criterion_group!(
    benches,
    benchmark_candidate_generation,
    benchmark_crack_hint,
    benchmark_crack_password
);
criterion_main!(benches);
