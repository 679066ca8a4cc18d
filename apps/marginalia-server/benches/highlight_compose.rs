//! Highlight Composition Benchmarks
//!
//! Measures wrapper injection over article-length markup with overlapping
//! comment and suggestion ranges, plus the offset mapping it relies on.
//!
//! Run with: `cargo bench --bench highlight_compose`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uuid::Uuid;

use marginalia_server::html::{inject_at_offsets, HighlightConfig, HighlightKind, HighlightRange};
use marginalia_server::markup::{plain_len, RenderedTree};

/// Paragraphs with inline formatting and entities
fn article(paragraphs: usize) -> String {
    let mut html = String::new();
    for i in 0..paragraphs {
        html.push_str(&format!(
            "<p>Paragraph {} opens with <em>emphasis</em> &amp; a <a href=\"#n{}\">link</a>, \
             then runs on with <strong>bold <em>nested</em> words</strong> until it ends.</p>",
            i, i
        ));
    }
    html
}

/// Evenly spread ranges, every third one overlapping its neighbour
fn ranges(len: usize, count: usize) -> Vec<HighlightRange> {
    let step = (len / (count + 1)).max(1);
    (0..count)
        .map(|i| {
            let start = i * step;
            let width = if i % 3 == 0 { step * 2 } else { step / 2 + 1 };
            HighlightRange {
                start,
                end: (start + width).min(len),
                kind: if i % 2 == 0 {
                    HighlightKind::Comment
                } else {
                    HighlightKind::Suggestion
                },
                id: Uuid::new_v4(),
            }
        })
        .collect()
}

fn bench_inject(c: &mut Criterion) {
    let config = HighlightConfig::default();
    let mut group = c.benchmark_group("inject_at_offsets");

    for &count in &[8usize, 32, 96] {
        let html = article(40);
        let ranges = ranges(plain_len(&html), count);
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, _| {
            b.iter(|| inject_at_offsets(black_box(&html), black_box(&ranges), &config))
        });
    }

    group.finish();
}

fn bench_offset_mapping(c: &mut Criterion) {
    let html = article(40);
    let tree = RenderedTree::parse(&html);
    let len = tree.text_len();

    c.bench_function("offset_round_trip", |b| {
        b.iter(|| {
            for offset in (0..len).step_by(97) {
                if let Ok(pos) = tree.offset_to_dom_position(black_box(offset)) {
                    black_box(tree.dom_position_to_offset(pos.0, pos.1).ok());
                }
            }
        })
    });
}

criterion_group!(benches, bench_inject, bench_offset_mapping);
criterion_main!(benches);
