//! OID parsing and encoding benchmarks.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use snmp_session::oid::Oid;
use std::hint::black_box;

const SAMPLES: &[(&str, &str)] = &[
    ("short", "1.3.6.1.2.1.1.1.0"),
    ("table", "1.3.6.1.2.1.2.2.1.10.1001"),
    ("large_arcs", "1.3.6.1.4.1.2636.3.1.13.1.8.4294967295.1.0.0"),
];

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("oid_parse");
    for (name, dotted) in SAMPLES {
        group.bench_with_input(BenchmarkId::from_parameter(name), dotted, |b, s| {
            b.iter(|| Oid::parse(black_box(s)))
        });
    }
    group.finish();
}

fn bench_ber(c: &mut Criterion) {
    let mut group = c.benchmark_group("oid_ber");
    for (name, dotted) in SAMPLES {
        let oid = Oid::parse(dotted).unwrap();
        let encoded = oid.to_ber();

        group.bench_with_input(BenchmarkId::new("encode", name), &oid, |b, oid| {
            b.iter(|| oid.to_ber_smallvec())
        });
        group.bench_with_input(BenchmarkId::new("decode", name), &encoded, |b, data| {
            b.iter(|| Oid::from_ber(black_box(data)))
        });
    }
    group.finish();
}

fn bench_compare(c: &mut Criterion) {
    let base = Oid::parse("1.3.6.1.2.1.2.2").unwrap();
    let row = Oid::parse("1.3.6.1.2.1.2.2.1.10.1001").unwrap();

    c.bench_function("oid_prefix", |b| {
        b.iter(|| black_box(&base).is_prefix_of(black_box(&row)))
    });
    c.bench_function("oid_cmp", |b| b.iter(|| black_box(&base) < black_box(&row)));
}

criterion_group!(benches, bench_parse, bench_ber, bench_compare);
criterion_main!(benches);
