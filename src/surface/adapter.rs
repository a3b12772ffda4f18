//! Uniform read/write access to content and caret across surface kinds.
//!
//! Value fields address the caret with the native selection index;
//! structured regions address it with a live tree range. Both are
//! projected onto [`CaretPosition`]: the code-point offset into the
//! normalized text, plus how many of those characters are synthetic
//! `\n` separators (zero for value fields, where every newline is a
//! real character).

use tracing::debug;

use crate::page::{Document, DomPoint, DomRange};

use super::inject::{self, Injection, InjectionTiming};
use super::normalize::{normalize, normalize_prefix};
use super::{EditableSurface, SurfaceKind};

/// Caret location in normalized-text space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaretPosition {
    /// Code points of normalized text preceding the caret
    pub offset: usize,
    /// How many of those code points are synthetic `\n` separators
    pub newline_count: usize,
}

/// Read the surface's current content as normalized text
pub fn read_content(doc: &Document, surface: &EditableSurface) -> String {
    match surface.kind {
        SurfaceKind::ValueField | SurfaceKind::MultilineValueField => {
            doc.field_value(surface.node).unwrap_or_default()
        }
        SurfaceKind::StructuredRegion => normalize(doc, surface.node),
    }
}

/// Read the caret. With no usable cursor this degrades to the origin
/// rather than failing; autocomplete simply finds no trailing token.
pub fn read_caret(doc: &Document, surface: &EditableSurface) -> CaretPosition {
    match surface.kind {
        SurfaceKind::ValueField | SurfaceKind::MultilineValueField => {
            let Some((start, _)) = doc.field_selection(surface.node) else {
                return CaretPosition::default();
            };
            let value = doc.field_value(surface.node).unwrap_or_default();
            let newline_count = value.chars().take(start).filter(|c| *c == '\n').count();
            CaretPosition {
                offset: start,
                newline_count,
            }
        }
        SurfaceKind::StructuredRegion => {
            let Some(range) = doc.cursor() else {
                debug!("no active cursor range, degrading caret to origin");
                return CaretPosition::default();
            };
            let point = doc.clamp_point_to(range.start, surface.node);
            let (prefix, synthetic) = normalize_prefix(doc, surface.node, point);
            CaretPosition {
                offset: prefix.chars().count(),
                newline_count: synthetic,
            }
        }
    }
}

/// Place the caret at a normalized-text position
pub fn write_caret(doc: &Document, surface: &EditableSurface, pos: CaretPosition) {
    match surface.kind {
        SurfaceKind::ValueField | SurfaceKind::MultilineValueField => {
            doc.set_field_selection(surface.node, pos.offset, pos.offset);
        }
        SurfaceKind::StructuredRegion => {
            // synthetic separators occupy no text-node characters, so
            // the walk target is the offset minus them
            let target = pos.offset.saturating_sub(pos.newline_count);
            let mut accumulated = 0usize;
            for text_node in doc.text_nodes_in(surface.node) {
                let len = doc
                    .text_of(text_node)
                    .map(|t| t.chars().count())
                    .unwrap_or(0);
                if accumulated + len >= target {
                    doc.set_cursor(Some(DomRange::collapsed(DomPoint::Text {
                        node: text_node,
                        offset: target - accumulated,
                    })));
                    return;
                }
                accumulated += len;
            }
            // walk exhausted: collapse to the end of the region
            doc.collapse_cursor_to_end(surface.node);
        }
    }
}

/// Replace the surface's content. Value fields complete synchronously;
/// structured regions go through the injector, which may spread the
/// write over several keystroke yields. `on_complete` runs exactly once
/// when the content is fully in place.
pub fn write_content(
    doc: &Document,
    surface: &EditableSurface,
    text: &str,
    timing: &InjectionTiming,
    on_complete: impl FnOnce() + 'static,
) -> Injection {
    match surface.kind {
        SurfaceKind::ValueField | SurfaceKind::MultilineValueField => {
            doc.focus(surface.node);
            doc.set_field_value(surface.node, text);
            let end = text.chars().count();
            doc.set_field_selection(surface.node, end, end);
            // host-page listeners must see the change exactly as input
            doc.dispatch_input(surface.node);
            on_complete();
            Injection::completed()
        }
        SurfaceKind::StructuredRegion => {
            inject::replace_content(doc, surface.node, text, timing, on_complete)
        }
    }
}
