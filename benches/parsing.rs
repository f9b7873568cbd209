//! Benchmarks for markdown parsing.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use fleetreport::markdown::{parse, parse_inline};

fn bench_parse_simple(c: &mut Criterion) {
    let md = "# Hello\n\nWorld";
    c.bench_function("parse_simple", |b| b.iter(|| parse(black_box(md))));
}

fn bench_parse_report(c: &mut Criterion) {
    let md = include_str!("../tests/fixtures/report.md");
    c.bench_function("parse_report", |b| b.iter(|| parse(black_box(md))));
}

fn bench_parse_inline(c: &mut Criterion) {
    let text = "Route **12** recovered after the *Main St.* detour; see `trip_log` and [the dashboard](https://example.com).";
    c.bench_function("parse_inline", |b| b.iter(|| parse_inline(black_box(text))));
}

criterion_group!(benches, bench_parse_simple, bench_parse_report, bench_parse_inline);
criterion_main!(benches);
