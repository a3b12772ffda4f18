//! Normalization of structured regions into flat text.
//!
//! One traversal serves both full-content extraction and caret-relative
//! prefix extraction; the two must agree character for character or
//! caret math drifts from displayed text. Rules: text nodes are emitted
//! verbatim, each line-break marker emits exactly one `\n`, and a block
//! boundary emits a `\n` only when the output is non-empty and does not
//! already end in one (which is what collapses consecutive boundaries
//! and makes the result invariant to block nesting depth). Full
//! extraction strips trailing newlines; prefixes keep them, since a
//! boundary already emitted before the caret is a real separator.

use crate::page::{Document, DomPoint, NodeId};

/// Flat text content of a structured region
pub fn normalize(doc: &Document, root: NodeId) -> String {
    let mut walker = Walker {
        doc,
        root,
        out: String::new(),
        synthetic: 0,
        stop: None,
        done: false,
    };
    walker.visit_children(root);
    while walker.out.ends_with('\n') {
        walker.out.pop();
    }
    walker.out
}

/// Flat text preceding `stop`, plus the number of synthetic `\n`
/// separators it contains. The synthetic count is what lets the caret
/// writer re-derive a tree position without re-parsing: real characters
/// live in text nodes, synthetic ones do not.
pub fn normalize_prefix(doc: &Document, root: NodeId, stop: DomPoint) -> (String, usize) {
    let mut walker = Walker {
        doc,
        root,
        out: String::new(),
        synthetic: 0,
        stop: Some(stop),
        done: false,
    };
    walker.visit_children(root);
    (walker.out, walker.synthetic)
}

struct Walker<'a> {
    doc: &'a Document,
    root: NodeId,
    out: String,
    synthetic: usize,
    stop: Option<DomPoint>,
    done: bool,
}

impl Walker<'_> {
    fn boundary(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
            self.synthetic += 1;
        }
    }

    fn visit_children(&mut self, node: NodeId) {
        let children = self.doc.children(node);
        for (index, child) in children.iter().enumerate() {
            if self.stop == Some(DomPoint::Element { node, index }) {
                self.done = true;
                return;
            }
            self.visit(*child);
            if self.done {
                return;
            }
        }
        if self.stop
            == Some(DomPoint::Element {
                node,
                index: children.len(),
            })
        {
            self.done = true;
        }
    }

    fn visit(&mut self, node: NodeId) {
        if let Some(text) = self.doc.text_of(node) {
            if let Some(DomPoint::Text {
                node: stop_node,
                offset,
            }) = self.stop
            {
                if stop_node == node {
                    self.out.extend(text.chars().take(offset));
                    self.done = true;
                    return;
                }
            }
            self.out.push_str(&text);
            return;
        }

        if self.doc.is_line_break(node) {
            self.out.push('\n');
            self.synthetic += 1;
            return;
        }

        let block = node != self.root && self.doc.is_block(node);
        if block {
            self.boundary();
        }
        self.visit_children(node);
        if block && !self.done {
            self.boundary();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Scheduler;

    fn doc() -> Document {
        Document::new(Scheduler::new())
    }

    #[test]
    fn test_plain_text_nodes_concatenate() {
        let d = doc();
        let region = d.append_element(d.root(), "div", &[("contenteditable", "true")]);
        d.append_text(region, "hello ");
        d.append_text(region, "world");
        assert_eq!(normalize(&d, region), "hello world");
    }

    #[test]
    fn test_line_break_markers() {
        let d = doc();
        let region = d.append_element(d.root(), "div", &[("contenteditable", "true")]);
        d.append_text(region, "one");
        d.append_element(region, "br", &[]);
        d.append_text(region, "two");
        assert_eq!(normalize(&d, region), "one\ntwo");
    }

    #[test]
    fn test_consecutive_breaks_produce_blank_line() {
        let d = doc();
        let region = d.append_element(d.root(), "div", &[("contenteditable", "true")]);
        d.append_text(region, "one");
        d.append_element(region, "br", &[]);
        d.append_element(region, "br", &[]);
        d.append_text(region, "two");
        assert_eq!(normalize(&d, region), "one\n\ntwo");
    }

    #[test]
    fn test_block_children_become_lines() {
        let d = doc();
        let region = d.append_element(d.root(), "div", &[("contenteditable", "true")]);
        let p1 = d.append_element(region, "p", &[]);
        d.append_text(p1, "hello");
        let p2 = d.append_element(region, "p", &[]);
        d.append_text(p2, "world");
        assert_eq!(normalize(&d, region), "hello\nworld");
    }

    #[test]
    fn test_trailing_newlines_stripped() {
        let d = doc();
        let region = d.append_element(d.root(), "div", &[("contenteditable", "true")]);
        let p = d.append_element(region, "p", &[]);
        d.append_text(p, "only");
        d.append_element(region, "br", &[]);
        assert_eq!(normalize(&d, region), "only");
    }

    #[test]
    fn test_inline_children_do_not_break_lines() {
        let d = doc();
        let region = d.append_element(d.root(), "div", &[("contenteditable", "true")]);
        d.append_text(region, "a ");
        let b = d.append_element(region, "span", &[]);
        d.append_text(b, "bold");
        d.append_text(region, " c");
        assert_eq!(normalize(&d, region), "a bold c");
    }

    #[test]
    fn test_nesting_depth_invariance() {
        // flat: <div>hello</div><div>world</div>
        let d = doc();
        let flat = d.append_element(d.root(), "div", &[("contenteditable", "true")]);
        let f1 = d.append_element(flat, "div", &[]);
        d.append_text(f1, "hello");
        let f2 = d.append_element(flat, "div", &[]);
        d.append_text(f2, "world");

        // nested: <div><div>hello</div><div>world</div></div>
        let nested = d.append_element(d.root(), "div", &[("contenteditable", "true")]);
        let outer = d.append_element(nested, "div", &[]);
        let n1 = d.append_element(outer, "div", &[]);
        d.append_text(n1, "hello");
        let n2 = d.append_element(outer, "div", &[]);
        d.append_text(n2, "world");

        assert_eq!(normalize(&d, flat), "hello\nworld");
        assert_eq!(normalize(&d, flat), normalize(&d, nested));
    }

    #[test]
    fn test_empty_line_between_paragraphs() {
        let d = doc();
        let region = d.append_element(d.root(), "div", &[("contenteditable", "true")]);
        let p1 = d.append_element(region, "p", &[]);
        d.append_text(p1, "hello");
        let blank = d.append_element(region, "p", &[]);
        d.append_element(blank, "br", &[]);
        let p2 = d.append_element(region, "p", &[]);
        d.append_text(p2, "world");
        assert_eq!(normalize(&d, region), "hello\n\nworld");
    }

    #[test]
    fn test_prefix_stops_inside_text_node() {
        let d = doc();
        let region = d.append_element(d.root(), "div", &[("contenteditable", "true")]);
        let p1 = d.append_element(region, "p", &[]);
        d.append_text(p1, "hello");
        let p2 = d.append_element(region, "p", &[]);
        let t2 = d.append_text(p2, "world");

        let (prefix, synthetic) = normalize_prefix(
            &d,
            region,
            DomPoint::Text {
                node: t2,
                offset: 3,
            },
        );
        assert_eq!(prefix, "hello\nwor");
        assert_eq!(synthetic, 1);
    }

    #[test]
    fn test_prefix_at_start_of_empty_line() {
        let d = doc();
        let region = d.append_element(d.root(), "div", &[("contenteditable", "true")]);
        let p1 = d.append_element(region, "div", &[]);
        d.append_text(p1, "hello");
        let blank = d.append_element(region, "div", &[]);
        d.append_element(blank, "br", &[]);

        let (prefix, synthetic) = normalize_prefix(
            &d,
            region,
            DomPoint::Element {
                node: blank,
                index: 0,
            },
        );
        assert_eq!(prefix, "hello\n");
        assert_eq!(synthetic, 1);
    }

    #[test]
    fn test_prefix_agrees_with_full_normalization() {
        let d = doc();
        let region = d.append_element(d.root(), "div", &[("contenteditable", "true")]);
        let p1 = d.append_element(region, "p", &[]);
        d.append_text(p1, "aa");
        d.append_element(p1, "br", &[]);
        let t = d.append_text(p1, "bb");
        let p2 = d.append_element(region, "p", &[]);
        d.append_text(p2, "cc");

        let full = normalize(&d, region);
        let (prefix, _) = normalize_prefix(
            &d,
            region,
            DomPoint::Text {
                node: t,
                offset: 2,
            },
        );
        assert!(full.starts_with(&prefix));
        assert_eq!(prefix, "aa\nbb");
        assert_eq!(full, "aa\nbb\ncc");
    }
}
