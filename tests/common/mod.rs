//! Shared fixtures for integration tests
//!
//! Note: Functions may appear unused because each test file compiles separately.

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;

use graft::page::{Document, NodeId, Rect, Scheduler, TextMetrics};
use graft::{
    AutocompleteController, BindingContext, PromptEntry, SiteCatalog, StaticLibrary,
    SuggestionView,
};

/// Metrics every fixture page uses, so geometry assertions are exact
pub const CHAR_W: f32 = 8.0;
pub const LINE_H: f32 = 20.0;

pub fn page() -> Document {
    let doc = Document::new(Scheduler::new());
    doc.set_metrics(TextMetrics {
        char_width: CHAR_W,
        line_height: LINE_H,
    });
    doc
}

/// A chat page whose composer is a multi-line value field, plus a send
/// button
pub fn textarea_page() -> (Document, NodeId, NodeId) {
    let doc = page();
    let form = doc.append_element(doc.root(), "form", &[("id", "composer")]);
    let area = doc.append_element(form, "textarea", &[("data-id", "root")]);
    doc.set_layout(area, Rect::new(0.0, 600.0, 500.0, 60.0));
    let button = doc.append_element(form, "button", &[("data-testid", "send-button")]);
    doc.set_layout(button, Rect::new(520.0, 600.0, 40.0, 40.0));
    (doc, area, button)
}

/// A chat page whose composer is a structured editable region
pub fn editor_page() -> (Document, NodeId) {
    let doc = page();
    let region = doc.append_element(
        doc.root(),
        "div",
        &[("id", "editor"), ("contenteditable", "true")],
    );
    doc.set_layout(region, Rect::new(0.0, 500.0, 600.0, 120.0));
    (doc, region)
}

pub fn textarea_catalog() -> SiteCatalog {
    let mut catalog = SiteCatalog::new(
        "test-chat",
        vec!["#composer textarea".into(), "textarea[data-id]".into()],
    );
    catalog.trigger_selectors = vec!["button[data-testid=send-button]".into()];
    catalog.debounce_ms = 150;
    catalog.bind_retry_ms = 100;
    catalog
}

pub fn editor_catalog() -> SiteCatalog {
    let mut catalog = SiteCatalog::new("test-editor", vec!["div[contenteditable=true]".into()]);
    catalog.debounce_ms = 150;
    catalog.bind_retry_ms = 100;
    catalog.keystroke_yield_ms = 10;
    catalog
}

/// Library of `Mock prompt 1..=n` entries with matching bodies
pub fn mock_library(n: usize) -> Rc<StaticLibrary> {
    Rc::new(StaticLibrary::new(
        (1..=n)
            .map(|i| PromptEntry::new(format!("Mock prompt {}", i), format!("Mock body {}", i)))
            .collect(),
    ))
}

/// Controller wired to the given document/catalog/library, already
/// started, with every emitted view recorded
pub fn started_controller(
    doc: &Document,
    catalog: SiteCatalog,
    library: Rc<StaticLibrary>,
) -> (AutocompleteController, Rc<RefCell<Vec<SuggestionView>>>) {
    let controller = AutocompleteController::new(BindingContext {
        document: doc.clone(),
        catalog,
        library,
    })
    .expect("catalog is valid");

    let views = Rc::new(RefCell::new(Vec::new()));
    let v = Rc::clone(&views);
    controller.on_view(move |view| v.borrow_mut().push(view.clone()));

    let bound = Rc::new(RefCell::new(None));
    let b = Rc::clone(&bound);
    controller.start(move |result| *b.borrow_mut() = Some(result.is_ok()));
    assert_eq!(*bound.borrow(), Some(true), "fixture page must bind");

    (controller, views)
}

/// Simulate the user typing a full value into a field: value assigned,
/// caret at the end, input event dispatched
pub fn type_into_field(doc: &Document, node: NodeId, text: &str) {
    doc.set_field_value(node, text);
    let end = text.chars().count();
    doc.set_field_selection(node, end, end);
    doc.dispatch_input(node);
}

/// Simulate the user typing into a structured region: content becomes a
/// single text node with the caret at its end
pub fn type_into_region(doc: &Document, region: NodeId, text: &str) {
    for child in doc.children(region) {
        doc.remove_node(child);
    }
    let text_node = doc.append_text(region, text);
    doc.set_cursor(Some(graft::page::DomRange::collapsed(
        graft::page::DomPoint::Text {
            node: text_node,
            offset: text.chars().count(),
        },
    )));
    doc.dispatch_input(region);
}

/// Last emitted view, panicking if none was emitted yet
pub fn last_view(views: &Rc<RefCell<Vec<SuggestionView>>>) -> SuggestionView {
    views
        .borrow()
        .last()
        .cloned()
        .expect("at least one view emission")
}
