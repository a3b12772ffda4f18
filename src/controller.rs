//! Controller: wires binder → detector → matcher → session → popup and
//! exposes the thin view-model boundary to the presentation layer.
//!
//! One controller per page instance, with everything injected through
//! [`BindingContext`]; there is no process-wide state, so independent
//! instances coexist under test.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde::Serialize;
use tracing::debug;

use crate::binder::{BindingChange, SurfaceBinder};
use crate::catalog::SiteCatalog;
use crate::detector::{ChangeDetector, ContentSnapshot};
use crate::error::Error;
use crate::keys::{Key, Keystroke};
use crate::library::PromptSource;
use crate::matcher::{find_matches, MatchCandidate};
use crate::observer::{ObserverRegistry, SubscriptionId};
use crate::page::Document;
use crate::popup::{resolve_anchor, AnchorPoint};
use crate::session::MatchSession;
use crate::surface::adapter::{self, CaretPosition};
use crate::surface::Injection;

/// Everything a page instance needs, injected at construction
pub struct BindingContext {
    pub document: Document,
    pub catalog: SiteCatalog,
    pub library: Rc<dyn PromptSource>,
}

/// Snapshot of the suggestion UI state, emitted to the presentation
/// layer on every change. Rendering is entirely the embedder's concern.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestionView {
    pub candidates: Vec<MatchCandidate>,
    pub selected_index: usize,
    pub anchor: Option<AnchorPoint>,
    pub visible: bool,
}

/// What the embedder should do with a keystroke it forwarded here
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The keystroke drove the popup; swallow it
    Consumed,
    /// The site's submit keystroke with no popup open; let the host
    /// send (the embedder may record the exchange first)
    Submit,
    /// Not ours; deliver to the host page untouched
    PassThrough,
}

struct ControllerState {
    doc: Document,
    catalog: SiteCatalog,
    library: Rc<dyn PromptSource>,
    binder: SurfaceBinder,
    detector: ChangeDetector,
    session: RefCell<MatchSession>,
    last_anchor: Cell<Option<AnchorPoint>>,
    view: ObserverRegistry<SuggestionView>,
    injection: RefCell<Option<Injection>>,
    destroyed: Cell<bool>,
}

/// The autocomplete pipeline for one page instance
pub struct AutocompleteController {
    state: Rc<ControllerState>,
}

impl AutocompleteController {
    /// Validates the catalog once; everything downstream trusts it.
    pub fn new(context: BindingContext) -> Result<Self, Error> {
        context.catalog.validate()?;
        let binder = SurfaceBinder::new(context.document.clone(), context.catalog.clone());
        let detector = ChangeDetector::new(context.document.clone(), context.catalog.debounce_ms);
        Ok(Self {
            state: Rc::new(ControllerState {
                doc: context.document,
                catalog: context.catalog,
                library: context.library,
                binder,
                detector,
                session: RefCell::new(MatchSession::new()),
                last_anchor: Cell::new(None),
                view: ObserverRegistry::new(),
                injection: RefCell::new(None),
                destroyed: Cell::new(false),
            }),
        })
    }

    /// Bind to the page and start the match loop. `on_ready` reports
    /// `Err(BindingTimeout)` when the page is unsupported; that is a
    /// terminal, non-fatal state.
    pub fn start(&self, on_ready: impl FnOnce(Result<(), Error>) + 'static) {
        let state = &self.state;

        let weak = Rc::downgrade(state);
        state.detector.on_change(move |snapshot| {
            if let Some(state) = weak.upgrade() {
                on_content_changed(&state, snapshot);
            }
        });

        let weak = Rc::downgrade(state);
        state.binder.on_binding_changed(move |change| {
            if let Some(state) = weak.upgrade() {
                on_binding_changed(&state, change);
            }
        });

        let weak = Rc::downgrade(state);
        state.binder.bind(move |result| {
            if result.is_ok() {
                if let Some(state) = weak.upgrade() {
                    if let Some(surface) = state.binder.primary() {
                        state.detector.attach(surface);
                    }
                }
            }
            on_ready(result);
        });
    }

    // ------------------------------------------------------------------
    // Presentation-layer commands
    // ------------------------------------------------------------------

    pub fn select_next(&self) {
        self.navigate(|session| session.next());
    }

    pub fn select_previous(&self) {
        self.navigate(|session| session.previous());
    }

    pub fn select_index(&self, index: usize) {
        self.navigate(move |session| session.select(index));
    }

    fn navigate(&self, op: impl FnOnce(&mut MatchSession)) {
        let state = &self.state;
        if state.destroyed.get() {
            return;
        }
        {
            let mut session = state.session.borrow_mut();
            if !session.is_visible() {
                return;
            }
            op(&mut session);
        }
        emit_view(state);
    }

    /// Confirm the selected candidate: the trailing token is replaced
    /// by the entry's body and the caret lands right after it.
    pub fn confirm_selection(&self) {
        let state = &self.state;
        if state.destroyed.get() {
            return;
        }
        let Some(candidate) = state.session.borrow_mut().confirm() else {
            return;
        };
        emit_view(state);

        let Some(surface) = state.binder.primary() else {
            return;
        };
        let content = adapter::read_content(&state.doc, &surface);
        let chars: Vec<char> = content.chars().collect();
        let start = candidate.match_start.min(chars.len());
        let end = candidate.match_end.min(chars.len());

        let mut new_content: String = chars[..start].iter().collect();
        new_content.push_str(&candidate.body);
        new_content.extend(chars[end..].iter());

        let caret_offset = start + candidate.body.chars().count();
        let caret = CaretPosition {
            offset: caret_offset,
            // every newline before the caret is a separator in
            // normalized space; value fields ignore the count anyway
            newline_count: new_content
                .chars()
                .take(caret_offset)
                .filter(|c| *c == '\n')
                .count(),
        };
        debug!(
            label = %candidate.label,
            start,
            end,
            "confirming candidate"
        );

        if let Some(previous) = state.injection.borrow_mut().take() {
            previous.cancel();
        }
        let doc = state.doc.clone();
        let injection = adapter::write_content(
            &state.doc,
            &surface,
            &new_content,
            &state.catalog.injection_timing(),
            move || adapter::write_caret(&doc, &surface, caret),
        );
        *state.injection.borrow_mut() = Some(injection);
    }

    /// Hide the popup without touching the surface
    pub fn dismiss(&self) {
        let state = &self.state;
        if state.destroyed.get() {
            return;
        }
        let was_visible = {
            let mut session = state.session.borrow_mut();
            let was = session.is_visible();
            session.hide();
            was
        };
        if was_visible {
            emit_view(state);
        }
    }

    /// Convenience mapping of forwarded keystrokes onto commands while
    /// the popup is visible, and submit detection while it is not.
    pub fn handle_keystroke(&self, keystroke: Keystroke) -> KeyOutcome {
        let state = &self.state;
        if state.destroyed.get() {
            return KeyOutcome::PassThrough;
        }
        if state.session.borrow().is_visible() && keystroke.modifiers.is_empty() {
            match keystroke.key {
                Key::ArrowDown => {
                    self.select_next();
                    return KeyOutcome::Consumed;
                }
                Key::ArrowUp => {
                    self.select_previous();
                    return KeyOutcome::Consumed;
                }
                Key::Enter | Key::Tab => {
                    self.confirm_selection();
                    return KeyOutcome::Consumed;
                }
                Key::Escape => {
                    self.dismiss();
                    return KeyOutcome::Consumed;
                }
                _ => {}
            }
        }
        if state.catalog.submit_key.is_submit(&keystroke) {
            return KeyOutcome::Submit;
        }
        KeyOutcome::PassThrough
    }

    /// Click the bound trigger control, if any. Returns whether a
    /// trigger was available.
    pub fn trigger_submit(&self) -> bool {
        let state = &self.state;
        if state.destroyed.get() {
            return false;
        }
        match state.binder.secondary() {
            Some(button) => {
                state.doc.click(button);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // View-model boundary
    // ------------------------------------------------------------------

    pub fn on_view(&self, listener: impl Fn(&SuggestionView) + 'static) -> SubscriptionId {
        self.state.view.subscribe(listener)
    }

    pub fn unsubscribe_view(&self, id: SubscriptionId) -> bool {
        self.state.view.unsubscribe(id)
    }

    pub fn current_view(&self) -> SuggestionView {
        build_view(&self.state)
    }

    pub fn binding_generation(&self) -> u64 {
        self.state.binder.generation()
    }

    /// Total, cooperative teardown: listeners unbound, observers
    /// disconnected, timers cleared, handles dropped. Nothing fires
    /// afterwards.
    pub fn destroy(&self) {
        let state = &self.state;
        if state.destroyed.replace(true) {
            return;
        }
        if let Some(injection) = state.injection.borrow_mut().take() {
            injection.cancel();
        }
        state.detector.destroy();
        state.binder.destroy();
        state.session.borrow_mut().hide();
        state.last_anchor.set(None);
        state.view.clear();
        debug!("controller destroyed");
    }
}

fn build_view(state: &ControllerState) -> SuggestionView {
    let session = state.session.borrow();
    SuggestionView {
        candidates: session.candidates().to_vec(),
        selected_index: session.selected_index(),
        anchor: if session.is_visible() {
            state.last_anchor.get()
        } else {
            None
        },
        visible: session.is_visible(),
    }
}

fn emit_view(state: &Rc<ControllerState>) {
    let view = build_view(state);
    state.view.emit(&view);
}

fn on_content_changed(state: &Rc<ControllerState>, snapshot: &ContentSnapshot) {
    if state.destroyed.get() {
        return;
    }
    // a snapshot from a superseded surface must not drive the session
    if snapshot.generation != state.binder.generation() {
        debug!(
            snapshot_generation = snapshot.generation,
            current = state.binder.generation(),
            "dropping stale snapshot"
        );
        return;
    }
    let Some(surface) = state.binder.primary() else {
        return;
    };
    let caret = adapter::read_caret(&state.doc, &surface).offset;
    let entries = state.library.entries();
    let matches = find_matches(
        &snapshot.text,
        caret,
        &entries,
        &state.catalog.match_config(),
    );

    let had_session = state.session.borrow().is_visible();
    if matches.is_empty() {
        if had_session {
            state.session.borrow_mut().hide();
            emit_view(state);
        }
        return;
    }

    debug!(count = matches.len(), "match session");
    state.session.borrow_mut().show(matches);
    state
        .last_anchor
        .set(resolve_anchor(&state.doc, &surface, state.catalog.popup_offset));
    emit_view(state);
}

fn on_binding_changed(state: &Rc<ControllerState>, change: &BindingChange) {
    if state.destroyed.get() {
        return;
    }
    debug!(generation = change.generation, "binding changed, resetting");
    // an injection typing into the old surface must not keep going
    if let Some(injection) = state.injection.borrow_mut().take() {
        injection.cancel();
    }
    let had_session = state.session.borrow().is_visible();
    state.session.borrow_mut().hide();
    match state.binder.primary() {
        Some(surface) => state.detector.attach(surface),
        None => state.detector.detach(),
    }
    if had_session {
        emit_view(state);
    }
}
