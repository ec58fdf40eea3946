use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use slset::{RangeSpec, Token};

mod support;

fn bench_range(c: &mut Criterion) {
    let size = support::usize_env("SLSET_BENCH_RANGE_SIZE", 100_000);
    let entries = support::unique_increasing(size);
    let sl = support::build_list(&entries);

    let mut group = c.benchmark_group("range");
    group.measurement_time(support::duration_env("SLSET_BENCH_MEASUREMENT_SECS", 10.0));
    group.sample_size(support::usize_env("SLSET_BENCH_SAMPLE_SIZE", 10));

    let mid = size / 2;
    let cases = [
        ("narrow", format!("[{mid:010}"), format!("[{:010}", mid + 64)),
        ("wide", format!("[{:010}", size / 4), format!("({:010}", 3 * size / 4)),
        ("full", "-".to_string(), "+".to_string()),
    ];
    for (name, lo, hi) in &cases {
        group.bench_with_input(BenchmarkId::new("scan", name), &(lo, hi), |b, (lo, hi)| {
            b.iter(|| {
                let range =
                    RangeSpec::parse(&Token::raw(lo.as_bytes()), &Token::raw(hi.as_bytes()))
                        .expect("valid bounds");
                black_box(sl.range(&range).count());
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_range);
criterion_main!(benches);
