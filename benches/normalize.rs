//! Benchmarks for structured-region normalization and caret math
//!
//! Run with: cargo bench normalize

use graft::page::{Document, DomPoint, NodeId, Scheduler};
use graft::surface::normalize::{normalize, normalize_prefix};

#[global_allocator]
static ALLOC: divan::AllocProfiler = divan::AllocProfiler::system();

fn main() {
    divan::main();
}

/// Build a region with `lines` block children, each holding a sentence
/// split across a couple of inline wrappers
fn build_region(doc: &Document, lines: usize) -> (NodeId, NodeId) {
    let region = doc.append_element(doc.root(), "div", &[("contenteditable", "true")]);
    let mut last_text = region;
    for i in 0..lines {
        let para = doc.append_element(region, "p", &[]);
        doc.append_text(para, "The quick brown fox ");
        let span = doc.append_element(para, "span", &[]);
        doc.append_text(span, "jumps over ");
        last_text = doc.append_text(para, &format!("the lazy dog {}.", i));
    }
    (region, last_text)
}

#[divan::bench(args = [10, 100, 1_000])]
fn normalize_full_region(bencher: divan::Bencher, lines: usize) {
    let doc = Document::new(Scheduler::new());
    let (region, _) = build_region(&doc, lines);
    bencher.bench_local(|| divan::black_box(normalize(&doc, region)));
}

#[divan::bench(args = [10, 100, 1_000])]
fn normalize_caret_prefix(bencher: divan::Bencher, lines: usize) {
    let doc = Document::new(Scheduler::new());
    let (region, last_text) = build_region(&doc, lines);
    let point = DomPoint::Text {
        node: last_text,
        offset: 5,
    };
    bencher.bench_local(|| divan::black_box(normalize_prefix(&doc, region, point)));
}
