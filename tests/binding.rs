//! Binding resilience: late-appearing surfaces, identity swaps,
//! attribute flips, and the unsupported-page path.

mod common;

use common::*;
use graft::page::{DomPoint, DomRange, Rect};
use graft::{AutocompleteController, BindingContext, Error};
use std::cell::RefCell;
use std::rc::Rc;

#[test]
fn binds_once_the_surface_appears() {
    let doc = page();
    let controller = AutocompleteController::new(BindingContext {
        document: doc.clone(),
        catalog: textarea_catalog(),
        library: mock_library(2),
    })
    .unwrap();

    let views = Rc::new(RefCell::new(Vec::new()));
    let v = Rc::clone(&views);
    controller.on_view(move |view| v.borrow_mut().push(view.clone()));

    let bound = Rc::new(RefCell::new(None));
    let b = Rc::clone(&bound);
    controller.start(move |result| *b.borrow_mut() = Some(result.is_ok()));
    assert_eq!(*bound.borrow(), None, "surface not on the page yet");

    // the host renders its composer a moment later
    let form = doc.append_element(doc.root(), "form", &[("id", "composer")]);
    let area = doc.append_element(form, "textarea", &[]);
    doc.set_layout(area, Rect::new(0.0, 600.0, 500.0, 60.0));

    doc.scheduler().advance(200);
    assert_eq!(*bound.borrow(), Some(true));

    type_into_field(&doc, area, "prompt");
    doc.scheduler().advance(200);
    assert!(last_view(&views).visible);

    controller.destroy();
}

#[test]
fn unsupported_page_reports_timeout_and_stays_inert() {
    let doc = page();
    let mut catalog = textarea_catalog();
    catalog.bind_attempts = 3;
    catalog.bind_retry_ms = 100;
    let controller = AutocompleteController::new(BindingContext {
        document: doc.clone(),
        catalog,
        library: mock_library(2),
    })
    .unwrap();

    let outcome = Rc::new(RefCell::new(None));
    let o = Rc::clone(&outcome);
    controller.start(move |result| {
        *o.borrow_mut() = Some(matches!(result, Err(Error::BindingTimeout { attempts: 3 })));
    });

    doc.scheduler().advance(10_000);
    assert_eq!(*outcome.borrow(), Some(true));

    // non-fatal: commands on the unbound controller are safe no-ops
    controller.select_next();
    controller.confirm_selection();
    controller.dismiss();
    assert!(!controller.trigger_submit());
    assert!(!controller.current_view().visible);

    controller.destroy();
}

#[test]
fn surface_swap_destroys_session_and_rebinds() {
    let (doc, region) = editor_page();
    let (controller, views) = started_controller(&doc, editor_catalog(), mock_library(3));
    let first_generation = controller.binding_generation();

    type_into_region(&doc, region, "prompt");
    doc.scheduler().advance(200);
    assert!(last_view(&views).visible);

    // the host tears the composer down and mounts a fresh one
    doc.remove_node(region);
    let view = last_view(&views);
    assert!(!view.visible, "session dies with its surface");

    let replacement = doc.append_element(doc.root(), "div", &[("contenteditable", "true")]);
    doc.set_layout(replacement, Rect::new(0.0, 500.0, 600.0, 120.0));

    type_into_region(&doc, replacement, "prompt");
    doc.scheduler().advance(200);
    assert!(last_view(&views).visible, "pipeline continues on the new surface");
    assert!(controller.binding_generation() > first_generation);

    controller.destroy();
}

#[test]
fn contenteditable_flip_unbinds_and_rebinds() {
    let (doc, region) = editor_page();
    let (controller, views) = started_controller(&doc, editor_catalog(), mock_library(3));

    type_into_region(&doc, region, "prompt");
    doc.scheduler().advance(200);
    assert!(last_view(&views).visible);
    let generation_before = controller.binding_generation();

    // the host disables editing; the catalog selector no longer matches
    doc.set_attribute(region, "contenteditable", "false");
    assert!(!last_view(&views).visible);
    assert!(controller.binding_generation() > generation_before);

    // flipping back re-resolves through the document observer
    doc.set_attribute(region, "contenteditable", "true");
    type_into_region(&doc, region, "promp");
    doc.scheduler().advance(200);
    assert!(last_view(&views).visible);

    controller.destroy();
}

#[test]
fn stale_caret_outside_surface_clamps_to_end() {
    // a cursor parked elsewhere on the page must not break matching:
    // the caret clamps to the end of the bound region
    let (doc, region) = editor_page();
    let (controller, views) = started_controller(&doc, editor_catalog(), mock_library(2));

    for child in doc.children(region) {
        doc.remove_node(child);
    }
    doc.append_text(region, "prompt");
    let stray = doc.append_text(doc.root(), "elsewhere");
    doc.set_cursor(Some(DomRange::collapsed(DomPoint::Text {
        node: stray,
        offset: 2,
    })));
    doc.dispatch_input(region);
    doc.scheduler().advance(200);

    let view = last_view(&views);
    assert!(view.visible);
    assert_eq!(view.candidates[0].match_end, 6);

    controller.destroy();
}
