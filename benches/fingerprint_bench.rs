use criterion::{black_box, criterion_group, criterion_main, Criterion};
use frame_fingerprint::capture::{CaptureConfig, FrameSource, SyntheticSource};
use frame_fingerprint::fingerprint::{Comparator, Extractor, Fingerprint};

fn bench_extract(c: &mut Criterion) {
    let mut source = SyntheticSource::with_seed(1).noise(8);
    source.open(&CaptureConfig::with_dimensions(640, 480)).unwrap();
    let frame = source.next_frame().unwrap();
    let extractor = Extractor::new();

    c.bench_function("extract_640x480_rgb", |b| {
        b.iter(|| extractor.extract_frame(black_box(&frame)).unwrap())
    });
}

fn bench_compare(c: &mut Criterion) {
    let a = Fingerprint::uniform(false).toggled(3).toggled(77);
    let b = Fingerprint::uniform(false).toggled(200);
    let comparator = Comparator::default();

    c.bench_function("compare", |bench| {
        bench.iter(|| comparator.compare(black_box(&a), black_box(&b)))
    });
}

criterion_group!(benches, bench_extract, bench_compare);
criterion_main!(benches);
