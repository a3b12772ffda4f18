//! Normalization laws: nesting invariance, prefix/full agreement, and
//! caret round-trips over structured content.

mod common;

use common::*;
use graft::page::{Document, DomPoint, DomRange, NodeId, Rect};
use graft::surface::adapter;
use graft::surface::normalize::{normalize, normalize_prefix};
use graft::{EditableSurface, SurfaceKind};
use pretty_assertions::assert_eq;

fn region_on(doc: &Document) -> NodeId {
    let region = doc.append_element(doc.root(), "div", &[("contenteditable", "true")]);
    doc.set_layout(region, Rect::new(0.0, 0.0, 600.0, 200.0));
    region
}

fn surface(region: NodeId) -> EditableSurface {
    EditableSurface {
        node: region,
        kind: SurfaceKind::StructuredRegion,
        generation: 0,
    }
}

/// Three structurally different trees with the same visible lines
fn build_variants(doc: &Document) -> Vec<NodeId> {
    // flat text + explicit breaks
    let a = region_on(doc);
    doc.append_text(a, "first line");
    doc.append_element(a, "br", &[]);
    doc.append_text(a, "second line");

    // one block per line
    let b = region_on(doc);
    let b1 = doc.append_element(b, "div", &[]);
    doc.append_text(b1, "first line");
    let b2 = doc.append_element(b, "div", &[]);
    doc.append_text(b2, "second line");

    // blocks nested one level deeper
    let c = region_on(doc);
    let outer = doc.append_element(c, "div", &[]);
    let c1 = doc.append_element(outer, "div", &[]);
    doc.append_text(c1, "first line");
    let c2 = doc.append_element(outer, "div", &[]);
    doc.append_text(c2, "second line");

    vec![a, b, c]
}

#[test]
fn equal_line_structure_normalizes_identically() {
    let doc = page();
    let variants = build_variants(&doc);
    let expected = "first line\nsecond line";
    for region in variants {
        assert_eq!(normalize(&doc, region), expected);
    }
}

#[test]
fn inline_wrappers_are_transparent() {
    let doc = page();
    let plain = region_on(&doc);
    doc.append_text(plain, "some emphasised text");

    let wrapped = region_on(&doc);
    doc.append_text(wrapped, "some ");
    let em = doc.append_element(wrapped, "span", &[]);
    doc.append_text(em, "emphasised");
    doc.append_text(wrapped, " text");

    assert_eq!(normalize(&doc, plain), normalize(&doc, wrapped));
}

#[test]
fn prefix_is_always_a_prefix_of_full_content() {
    let doc = page();
    let region = region_on(&doc);
    let p1 = doc.append_element(region, "p", &[]);
    doc.append_text(p1, "alpha");
    doc.append_element(p1, "br", &[]);
    doc.append_text(p1, "beta");
    let p2 = doc.append_element(region, "p", &[]);
    doc.append_text(p2, "gamma");

    let full = normalize(&doc, region);
    assert_eq!(full, "alpha\nbeta\ngamma");

    for text_node in doc.descendants(region) {
        let Some(text) = doc.text_of(text_node) else {
            continue;
        };
        for offset in 0..=text.chars().count() {
            let (prefix, _) = normalize_prefix(
                &doc,
                region,
                DomPoint::Text {
                    node: text_node,
                    offset,
                },
            );
            assert!(
                full.starts_with(&prefix),
                "prefix {:?} diverges from {:?}",
                prefix,
                full
            );
        }
    }
}

#[test]
fn caret_read_write_round_trips_at_every_text_position() {
    let doc = page();
    let region = region_on(&doc);
    let p1 = doc.append_element(region, "div", &[]);
    doc.append_text(p1, "one");
    let p2 = doc.append_element(region, "div", &[]);
    doc.append_text(p2, "two");
    doc.append_element(p2, "br", &[]);
    doc.append_text(p2, "three");
    let s = surface(region);

    for text_node in doc.text_nodes_in(region) {
        let len = doc.text_of(text_node).unwrap().chars().count();
        for offset in 0..=len {
            doc.set_cursor(Some(DomRange::collapsed(DomPoint::Text {
                node: text_node,
                offset,
            })));
            let caret = adapter::read_caret(&doc, &s);
            adapter::write_caret(&doc, &s, caret);
            let reread = adapter::read_caret(&doc, &s);

            // a line boundary is ambiguous (end-of-line and start-of-next
            // share a text position), but the text-character position is
            // always preserved and one write reaches a fixed point
            assert_eq!(
                reread.offset - reread.newline_count,
                caret.offset - caret.newline_count,
                "text position drifted at node {:?} offset {}",
                text_node,
                offset
            );
            adapter::write_caret(&doc, &s, reread);
            assert_eq!(
                adapter::read_caret(&doc, &s),
                reread,
                "fixed point not reached at node {:?} offset {}",
                text_node,
                offset
            );
        }
    }
}

#[test]
fn caret_offsets_agree_with_content_indexing() {
    let doc = page();
    let region = region_on(&doc);
    let p1 = doc.append_element(region, "div", &[]);
    doc.append_text(p1, "hello");
    let p2 = doc.append_element(region, "div", &[]);
    let target = doc.append_text(p2, "world");
    let s = surface(region);

    let full = normalize(&doc, region);
    doc.set_cursor(Some(DomRange::collapsed(DomPoint::Text {
        node: target,
        offset: 2,
    })));
    let caret = adapter::read_caret(&doc, &s);

    let prefix: String = full.chars().take(caret.offset).collect();
    assert_eq!(prefix, "hello\nwo");
    assert_eq!(
        caret.newline_count,
        prefix.chars().filter(|c| *c == '\n').count()
    );
}

#[test]
fn unicode_content_counts_code_points() {
    let doc = page();
    let region = region_on(&doc);
    let p = doc.append_element(region, "div", &[]);
    let text = doc.append_text(p, "héllo wörld");
    let s = surface(region);

    doc.set_cursor(Some(DomRange::collapsed(DomPoint::Text {
        node: text,
        offset: 8,
    })));
    let caret = adapter::read_caret(&doc, &s);
    assert_eq!(caret.offset, 8, "code points, not bytes");

    adapter::write_caret(&doc, &s, caret);
    assert_eq!(
        doc.cursor(),
        Some(DomRange::collapsed(DomPoint::Text {
            node: text,
            offset: 8
        }))
    );
}
