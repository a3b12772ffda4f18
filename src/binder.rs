//! Resilient binder: resolves catalog selectors into live surfaces and
//! keeps them current across page mutation.
//!
//! The binder is the only writer of the binding generation. Every other
//! component either holds a generation-stamped surface handle or
//! re-fetches through a getter; a handle from an older generation is
//! stale by definition. Getters never hand out a disconnected node:
//! they re-validate the cache and re-resolve on miss.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use tracing::{debug, info, warn};

use crate::catalog::SiteCatalog;
use crate::error::Error;
use crate::observer::{ObserverRegistry, SubscriptionId};
use crate::page::{Document, MutationObserverId, NodeId, ObserverScope, Selector, TimerSlot};
use crate::surface::{classify, EditableSurface};

/// Payload for binding-change notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BindingChange {
    pub generation: u64,
    pub primary: Option<NodeId>,
    pub secondary: Option<NodeId>,
}

struct BinderState {
    doc: Document,
    catalog: SiteCatalog,
    input_selectors: Vec<Selector>,
    trigger_selectors: Vec<Selector>,
    generation: Cell<u64>,
    primary: Cell<Option<EditableSurface>>,
    secondary: Cell<Option<NodeId>>,
    changed: ObserverRegistry<BindingChange>,
    subtree_observer: Cell<Option<MutationObserverId>>,
    attr_observers: RefCell<Vec<MutationObserverId>>,
    retry_slot: TimerSlot,
    bound_once: Cell<bool>,
    resolving: Cell<bool>,
    destroyed: Cell<bool>,
}

/// Resolves and re-resolves the primary (input) and secondary (trigger)
/// surfaces for one page instance.
pub struct SurfaceBinder {
    state: Rc<BinderState>,
}

/// Parse catalog selectors up front; a malformed candidate is logged
/// and skipped, the remaining candidates keep their priority order.
fn parse_selectors(raw: &[String]) -> Vec<Selector> {
    let mut parsed = Vec::new();
    for source in raw {
        match Selector::parse(source) {
            Ok(selector) => parsed.push(selector),
            Err(err) => warn!(selector = %source, error = %err, "skipping invalid selector"),
        }
    }
    parsed
}

impl SurfaceBinder {
    pub fn new(doc: Document, catalog: SiteCatalog) -> Self {
        let input_selectors = parse_selectors(&catalog.input_selectors);
        let trigger_selectors = parse_selectors(&catalog.trigger_selectors);
        let retry_slot = TimerSlot::new(doc.scheduler());
        Self {
            state: Rc::new(BinderState {
                doc,
                catalog,
                input_selectors,
                trigger_selectors,
                generation: Cell::new(0),
                primary: Cell::new(None),
                secondary: Cell::new(None),
                changed: ObserverRegistry::new(),
                subtree_observer: Cell::new(None),
                attr_observers: RefCell::new(Vec::new()),
                retry_slot,
                bound_once: Cell::new(false),
                resolving: Cell::new(false),
                destroyed: Cell::new(false),
            }),
        }
    }

    /// Resolve the surfaces, retrying on the page clock with the
    /// catalog's fixed delay. `on_ready` fires once: `Ok` when the
    /// primary surface is bound, `Err(BindingTimeout)` when the retry
    /// budget runs out. The document-level observers that keep the
    /// binding current are installed on success.
    pub fn bind(&self, on_ready: impl FnOnce(Result<(), Error>) + 'static) {
        attempt(Rc::clone(&self.state), 1, Box::new(on_ready));
    }

    /// Current primary surface. Re-validates the cached node and
    /// re-resolves on miss; never returns a disconnected node.
    pub fn primary(&self) -> Option<EditableSurface> {
        if self.state.destroyed.get() {
            return None;
        }
        if !self.state.primary_valid() {
            resolve_and_apply(&self.state);
        }
        self.state.primary.get()
    }

    /// Current trigger control, if the catalog names one and it resolved
    pub fn secondary(&self) -> Option<NodeId> {
        if self.state.destroyed.get() {
            return None;
        }
        if let Some(node) = self.state.secondary.get() {
            if self.state.doc.is_connected(node) {
                return Some(node);
            }
            resolve_and_apply(&self.state);
        }
        self.state.secondary.get()
    }

    pub fn generation(&self) -> u64 {
        self.state.generation.get()
    }

    pub fn on_binding_changed(&self, listener: impl Fn(&BindingChange) + 'static) -> SubscriptionId {
        self.state.changed.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.state.changed.unsubscribe(id)
    }

    /// Unbind everything: observers disconnected, pending retries
    /// cancelled, cached handles dropped. Nothing fires afterwards.
    pub fn destroy(&self) {
        let state = &self.state;
        state.destroyed.set(true);
        state.retry_slot.clear();
        if let Some(id) = state.subtree_observer.take() {
            state.doc.disconnect(id);
        }
        for id in state.attr_observers.borrow_mut().drain(..) {
            state.doc.disconnect(id);
        }
        state.primary.set(None);
        state.secondary.set(None);
        state.changed.clear();
    }
}

impl BinderState {
    fn primary_valid(&self) -> bool {
        match self.primary.get() {
            None => false,
            Some(surface) => {
                self.doc.is_connected(surface.node)
                    && classify(&self.doc, surface.node) == Some(surface.kind)
            }
        }
    }

    /// First node resolved by any input selector that is editable and
    /// effectively visible
    fn resolve_primary(&self) -> Option<(NodeId, crate::surface::SurfaceKind)> {
        let root = self.doc.root();
        for selector in &self.input_selectors {
            for node in selector.query_all(&self.doc, root) {
                let Some(kind) = classify(&self.doc, node) else {
                    continue;
                };
                if self.doc.is_effectively_visible(node) {
                    return Some((node, kind));
                }
            }
        }
        None
    }

    /// First visible node resolved by any trigger selector
    fn resolve_secondary(&self) -> Option<NodeId> {
        let root = self.doc.root();
        for selector in &self.trigger_selectors {
            for node in selector.query_all(&self.doc, root) {
                if self.doc.is_effectively_visible(node) {
                    return Some(node);
                }
            }
        }
        None
    }
}

fn attempt(
    state: Rc<BinderState>,
    attempt_no: u32,
    on_ready: Box<dyn FnOnce(Result<(), Error>)>,
) {
    if state.destroyed.get() {
        return;
    }
    if resolve_and_apply(&state) {
        info!(
            site = %state.catalog.site,
            attempt = attempt_no,
            generation = state.generation.get(),
            "surfaces bound"
        );
        install_observers(&state);
        on_ready(Ok(()));
        return;
    }
    if attempt_no >= state.catalog.bind_attempts {
        warn!(
            site = %state.catalog.site,
            attempts = attempt_no,
            "no selector resolved, giving up"
        );
        on_ready(Err(Error::BindingTimeout {
            attempts: attempt_no,
        }));
        return;
    }
    debug!(site = %state.catalog.site, attempt = attempt_no, "surfaces not found, retrying");
    let st = Rc::clone(&state);
    state
        .retry_slot
        .restart(state.catalog.bind_retry_ms, move || {
            attempt(st, attempt_no + 1, on_ready)
        });
}

/// Re-run resolution and swap the cached surfaces if identity changed.
/// Returns true when a primary surface is bound afterwards.
fn resolve_and_apply(state: &Rc<BinderState>) -> bool {
    if state.destroyed.get() {
        return false;
    }
    // resolution re-entered from an observer fired by our own rescoping
    if state.resolving.get() {
        return state.primary.get().is_some();
    }
    state.resolving.set(true);

    let resolved = state.resolve_primary();
    let new_secondary = state.resolve_secondary();
    let old_primary = state.primary.get().map(|s| s.node);
    let old_secondary = state.secondary.get();
    let identity_changed =
        resolved.map(|(node, _)| node) != old_primary || new_secondary != old_secondary;

    if identity_changed {
        let generation = state.generation.get() + 1;
        state.generation.set(generation);
        state.primary.set(resolved.map(|(node, kind)| EditableSurface {
            node,
            kind,
            generation,
        }));
        state.secondary.set(new_secondary);
        rescope_attr_observers(state);

        let notify = state.bound_once.get();
        if notify {
            info!(
                generation,
                primary = ?resolved.map(|(node, _)| node),
                secondary = ?new_secondary,
                "binding identity changed"
            );
        }
        if resolved.is_some() {
            state.bound_once.set(true);
        }
        if notify {
            state.changed.emit(&BindingChange {
                generation,
                primary: resolved.map(|(node, _)| node),
                secondary: new_secondary,
            });
        }
    }

    state.resolving.set(false);
    state.primary.get().is_some()
}

/// Document-subtree observer that re-runs resolution on any structural
/// change, plus attribute-scoped observers on the bound nodes
fn install_observers(state: &Rc<BinderState>) {
    if state.subtree_observer.get().is_some() {
        return;
    }
    let weak = Rc::downgrade(state);
    let id = state.doc.observe(
        ObserverScope::Subtree {
            root: state.doc.root(),
        },
        move |_records| {
            if let Some(state) = weak.upgrade() {
                resolve_and_apply(&state);
            }
        },
    );
    state.subtree_observer.set(Some(id));
    rescope_attr_observers(state);
}

fn rescope_attr_observers(state: &Rc<BinderState>) {
    for id in state.attr_observers.borrow_mut().drain(..) {
        state.doc.disconnect(id);
    }
    // only worth scoping once the document observer is live
    if state.subtree_observer.get().is_none() {
        return;
    }
    let targets: Vec<NodeId> = state
        .primary
        .get()
        .map(|s| s.node)
        .into_iter()
        .chain(state.secondary.get())
        .collect();
    let mut ids = state.attr_observers.borrow_mut();
    for target in targets {
        let weak: Weak<BinderState> = Rc::downgrade(state);
        let id = state
            .doc
            .observe(ObserverScope::Attributes { target }, move |_records| {
                if let Some(state) = weak.upgrade() {
                    resolve_and_apply(&state);
                }
            });
        ids.push(id);
    }
}
