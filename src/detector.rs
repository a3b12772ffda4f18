//! Content change detector: debounces raw edit notifications into one
//! "content changed" signal per settled burst.
//!
//! Listens to the union of direct edits, paste, cut, IME composition
//! end and (for structured regions) subtree mutation on the surface
//! itself. Every raw event restarts the single debounce slot; when it
//! fires, content is re-read through the adapter and emitted only if it
//! differs from the last emitted snapshot.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::debug;

use crate::observer::{ObserverRegistry, SubscriptionId};
use crate::page::{Document, EventKind, ListenerId, MutationObserverId, ObserverScope, TimerSlot};
use crate::surface::{adapter, EditableSurface, SurfaceKind};

/// An immutable content reading, stamped with the binding generation of
/// the surface it was read from. Superseded, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSnapshot {
    pub text: String,
    pub generation: u64,
}

struct DetectorState {
    doc: Document,
    debounce_ms: u64,
    slot: TimerSlot,
    listeners: RefCell<Vec<ListenerId>>,
    observer: Cell<Option<MutationObserverId>>,
    attached: Cell<Option<EditableSurface>>,
    last: RefCell<Option<String>>,
    changed: ObserverRegistry<ContentSnapshot>,
    destroyed: Cell<bool>,
}

pub struct ChangeDetector {
    state: Rc<DetectorState>,
}

const EDIT_EVENTS: [EventKind; 4] = [
    EventKind::Input,
    EventKind::Paste,
    EventKind::Cut,
    EventKind::CompositionEnd,
];

impl ChangeDetector {
    pub fn new(doc: Document, debounce_ms: u64) -> Self {
        let slot = TimerSlot::new(doc.scheduler());
        Self {
            state: Rc::new(DetectorState {
                doc,
                debounce_ms,
                slot,
                listeners: RefCell::new(Vec::new()),
                observer: Cell::new(None),
                attached: Cell::new(None),
                last: RefCell::new(None),
                changed: ObserverRegistry::new(),
                destroyed: Cell::new(false),
            }),
        }
    }

    /// Start watching a surface, replacing any previous attachment.
    /// The dedupe state resets: the first settled content after attach
    /// is always emitted.
    pub fn attach(&self, surface: EditableSurface) {
        self.detach();
        let state = &self.state;
        if state.destroyed.get() {
            return;
        }
        state.attached.set(Some(surface));
        *state.last.borrow_mut() = None;

        let mut listeners = state.listeners.borrow_mut();
        for kind in EDIT_EVENTS {
            let weak = Rc::downgrade(state);
            listeners.push(state.doc.add_listener(surface.node, kind, move |_event| {
                schedule_tick(&weak);
            }));
        }
        drop(listeners);

        if surface.kind == SurfaceKind::StructuredRegion {
            let weak = Rc::downgrade(state);
            let id = state.doc.observe(
                ObserverScope::Subtree { root: surface.node },
                move |_records| schedule_tick(&weak),
            );
            state.observer.set(Some(id));
        }
        debug!(node = ?surface.node, generation = surface.generation, "detector attached");
    }

    /// Stop watching. Pending debounce ticks are cancelled.
    pub fn detach(&self) {
        let state = &self.state;
        state.slot.clear();
        for id in state.listeners.borrow_mut().drain(..) {
            state.doc.remove_listener(id);
        }
        if let Some(id) = state.observer.take() {
            state.doc.disconnect(id);
        }
        state.attached.set(None);
        *state.last.borrow_mut() = None;
    }

    pub fn on_change(&self, listener: impl Fn(&ContentSnapshot) + 'static) -> SubscriptionId {
        self.state.changed.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.changed.unsubscribe(id)
    }

    /// Detach and drop all subscribers; nothing fires afterwards
    pub fn destroy(&self) {
        self.detach();
        self.state.destroyed.set(true);
        self.state.changed.clear();
    }
}

fn schedule_tick(weak: &Weak<DetectorState>) {
    let Some(state) = weak.upgrade() else {
        return;
    };
    if state.destroyed.get() {
        return;
    }
    let weak = Weak::clone(weak);
    state.slot.restart(state.debounce_ms, move || {
        if let Some(state) = weak.upgrade() {
            tick(&state);
        }
    });
}

fn tick(state: &Rc<DetectorState>) {
    if state.destroyed.get() {
        return;
    }
    let Some(surface) = state.attached.get() else {
        return;
    };
    let content = adapter::read_content(&state.doc, &surface);
    let unchanged = state.last.borrow().as_deref() == Some(content.as_str());
    if unchanged {
        return;
    }
    *state.last.borrow_mut() = Some(content.clone());
    debug!(
        generation = surface.generation,
        chars = content.chars().count(),
        "content changed"
    );
    state.changed.emit(&ContentSnapshot {
        text: content,
        generation: surface.generation,
    });
}
