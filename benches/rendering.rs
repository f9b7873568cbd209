//! Benchmarks for document rendering and export layout.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use fleetreport::export::{TextMeasure, layout};
use fleetreport::image::ImageLoader;
use fleetreport::markdown::parse;
use fleetreport::render::{Profile, render, to_html};

fn bench_render(c: &mut Criterion) {
    let blocks = parse(include_str!("../tests/fixtures/report.md"));

    c.bench_function("render_print", |b| {
        b.iter(|| render(black_box(blocks.clone()), Profile::Print))
    });
}

fn bench_to_html(c: &mut Criterion) {
    let doc = render(parse(include_str!("../tests/fixtures/report.md")), Profile::Interactive);

    c.bench_function("to_html", |b| b.iter(|| to_html(black_box(&doc))));
}

fn bench_layout(c: &mut Criterion) {
    let doc = render(parse(include_str!("../tests/fixtures/report.md")), Profile::Print);
    let measure = TextMeasure::heuristic();
    let images = ImageLoader::default();

    c.bench_function("layout", |b| {
        b.iter(|| layout(black_box(&doc), &measure, &images))
    });
}

criterion_group!(benches, bench_render, bench_to_html, bench_layout);
criterion_main!(benches);
