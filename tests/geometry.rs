//! Popup anchoring through the live pipeline: the emitted view carries
//! a caret-tracking, scroll-corrected, offset-adjusted anchor.

mod common;

use common::*;
use graft::page::Rect;

#[test]
fn view_anchor_tracks_the_caret_column() {
    let (doc, area, _) = textarea_page();
    let mut catalog = textarea_catalog();
    catalog.popup_offset = graft::PopupOffsets { x: 0.0, y: 4.0 };
    let (controller, views) = started_controller(&doc, catalog, mock_library(2));

    type_into_field(&doc, area, "prompt");
    doc.scheduler().advance(200);

    let view = last_view(&views);
    let anchor = view.anchor.expect("visible session has an anchor");
    // textarea box starts at (0, 600); caret is 6 columns in, first row
    assert_eq!(anchor.x, 6.0 * CHAR_W);
    assert_eq!(anchor.y, 600.0 + LINE_H + 4.0);

    controller.destroy();
}

#[test]
fn view_anchor_is_scroll_corrected() {
    let (doc, area, _) = textarea_page();
    let (controller, views) = started_controller(&doc, textarea_catalog(), mock_library(2));

    doc.set_scroll(0.0, 300.0);
    type_into_field(&doc, area, "prompt");
    doc.scheduler().advance(200);

    let anchor = last_view(&views).anchor.unwrap();
    assert_eq!(anchor.y, 600.0 + LINE_H - 300.0);

    controller.destroy();
}

#[test]
fn structured_anchor_follows_multi_line_caret() {
    let (doc, region) = editor_page();
    let (controller, views) = started_controller(&doc, editor_catalog(), mock_library(2));

    // two lines typed; the caret (and the token) are on the second one
    for child in doc.children(region) {
        doc.remove_node(child);
    }
    doc.append_text(region, "first line");
    doc.append_element(region, "br", &[]);
    let second = doc.append_text(region, "prompt");
    doc.set_cursor(Some(graft::page::DomRange::collapsed(
        graft::page::DomPoint::Text {
            node: second,
            offset: 6,
        },
    )));
    doc.dispatch_input(region);
    doc.scheduler().advance(200);

    let view = last_view(&views);
    assert!(view.visible);
    let anchor = view.anchor.unwrap();
    // region box starts at (0, 500); row 1, column 6
    assert_eq!(anchor.x, 6.0 * CHAR_W);
    assert_eq!(anchor.y, 500.0 + LINE_H + LINE_H);

    controller.destroy();
}

#[test]
fn anchor_updates_when_the_field_moves() {
    // the host relayouts its composer between edits
    let (doc, area, _) = textarea_page();
    let (controller, views) = started_controller(&doc, textarea_catalog(), mock_library(2));

    type_into_field(&doc, area, "prompt");
    doc.scheduler().advance(200);
    let first = last_view(&views).anchor.unwrap();

    doc.set_layout(area, Rect::new(0.0, 700.0, 500.0, 60.0));
    type_into_field(&doc, area, "promp");
    doc.scheduler().advance(200);
    let second = last_view(&views).anchor.unwrap();

    assert_eq!(second.y - first.y, 100.0);

    controller.destroy();
}
