use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::seq::SliceRandom;
use slset::Token;

mod support;

fn bench_search(c: &mut Criterion) {
    let size = support::usize_env("SLSET_BENCH_SEARCH_SIZE", 100_000);
    let query_count = support::usize_env("SLSET_BENCH_QUERY_COUNT", 10_000);
    let entries = support::uniform_random(size, size);
    let sl = support::build_list(&entries);

    let mut rng = support::seeded_rng();
    let existing: Vec<Token> = entries
        .choose_multiple(&mut rng, query_count)
        .map(|(s, _)| Token::parse(s.as_bytes()))
        .collect();
    let missing: Vec<Token> = (0..query_count)
        .map(|i| Token::parse(format!("absent:{i}").as_bytes()))
        .collect();

    let mut group = c.benchmark_group("search");
    group.measurement_time(support::duration_env("SLSET_BENCH_MEASUREMENT_SECS", 10.0));
    group.sample_size(support::usize_env("SLSET_BENCH_SAMPLE_SIZE", 10));
    group.throughput(Throughput::Elements(existing.len() as u64));
    group.bench_function("score/existing_random", |b| {
        b.iter(|| {
            for probe in &existing {
                black_box(sl.search(black_box(probe)).count());
            }
        });
    });
    group.throughput(Throughput::Elements(missing.len() as u64));
    group.bench_function("score/missing_random", |b| {
        b.iter(|| {
            for probe in &missing {
                black_box(sl.search(black_box(probe)).count());
            }
        });
    });
    group.finish();
}

criterion_group!(benches, bench_search);
criterion_main!(benches);
