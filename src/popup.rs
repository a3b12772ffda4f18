//! Popup geometry: where to anchor the suggestion surface.
//!
//! Value fields have no caret geometry of their own, so an offscreen
//! mirror reproduces the pre-caret text with the field's typography and
//! is measured instead. Structured regions read the collapsed cursor
//! rect directly; when the page reports a degenerate box (a caret on an
//! empty line has no text to give it extent), a temporary zero-width
//! marker is inserted at the collapsed point, measured, and removed.

use serde::Serialize;
use tracing::trace;

use crate::catalog::PopupOffsets;
use crate::page::{Display, Document, DomPoint, NodeId, Rect, Style};
use crate::surface::normalize::normalize_prefix;
use crate::surface::{EditableSurface, SurfaceKind};

/// Screen position for the suggestion overlay, scroll-corrected
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AnchorPoint {
    pub x: f32,
    pub y: f32,
}

/// Compute the anchor for the popup under the live caret. `None` means
/// the surface has no usable geometry (not laid out); callers keep the
/// popup hidden rather than guessing.
pub fn resolve_anchor(
    doc: &Document,
    surface: &EditableSurface,
    offsets: PopupOffsets,
) -> Option<AnchorPoint> {
    let anchor = match surface.kind {
        SurfaceKind::ValueField | SurfaceKind::MultilineValueField => {
            field_anchor(doc, surface.node)?
        }
        SurfaceKind::StructuredRegion => region_anchor(doc, surface.node)?,
    };
    let (scroll_x, scroll_y) = doc.scroll();
    let resolved = AnchorPoint {
        x: anchor.x - scroll_x + offsets.x,
        y: anchor.y - scroll_y + offsets.y,
    };
    trace!(x = resolved.x, y = resolved.y, "popup anchor resolved");
    Some(resolved)
}

/// Mirror measurement: reproduce the pre-caret text in an offscreen
/// element with the field's typography and measure its rendered extent.
fn field_anchor(doc: &Document, node: NodeId) -> Option<AnchorPoint> {
    let rect = doc.layout(node)?;
    let value = doc.field_value(node).unwrap_or_default();
    let caret = doc.field_selection(node).map(|(start, _)| start).unwrap_or(0);
    let prefix: String = value.chars().take(caret).collect();

    let mirror = doc.create_element("div");
    doc.set_style(
        mirror,
        Style {
            display: Some(Display::Block),
            visibility_hidden: true,
            opacity: 1.0,
        },
    );
    doc.append_text(mirror, &prefix);
    doc.append_child(doc.root(), mirror);

    let metrics = doc.metrics();
    let (rows, cols) = crate::page::TextMetrics::measure(&prefix);

    doc.remove_node(mirror);

    Some(AnchorPoint {
        x: rect.x + cols as f32 * metrics.char_width,
        y: rect.y + rows as f32 * metrics.line_height,
    })
}

fn region_anchor(doc: &Document, node: NodeId) -> Option<AnchorPoint> {
    let point = match doc.cursor() {
        Some(range) => doc.clamp_point_to(range.start, node),
        None => DomPoint::Element {
            node,
            index: doc.child_count(node),
        },
    };

    let rect = match point {
        DomPoint::Text { .. } => caret_rect(doc, node, point),
        DomPoint::Element {
            node: parent,
            index,
        } => {
            // degenerate box: measure a temporary zero-width marker at
            // the collapsed point instead
            let marker = doc.create_text("\u{200B}");
            doc.insert_child(parent, index, marker);
            let measured = caret_rect(
                doc,
                node,
                DomPoint::Text {
                    node: marker,
                    offset: 0,
                },
            );
            doc.remove_node(marker);
            measured
        }
    }?;

    Some(AnchorPoint {
        x: rect.x,
        y: rect.y + rect.height,
    })
}

/// Rect of a collapsed caret point inside a structured region, derived
/// from the normalized prefix: row = synthetic lines above, column =
/// characters since the last line start.
fn caret_rect(doc: &Document, region: NodeId, point: DomPoint) -> Option<Rect> {
    let rect = doc.layout(region)?;
    let (prefix, _) = normalize_prefix(doc, region, point);
    let metrics = doc.metrics();
    let (rows, cols) = crate::page::TextMetrics::measure(&prefix);
    Some(Rect::new(
        rect.x + cols as f32 * metrics.char_width,
        rect.y + (rows - 1) as f32 * metrics.line_height,
        0.0,
        metrics.line_height,
    ))
}
