//! Keystroke-faithful content injection for structured regions.
//!
//! Replacing a region's markup wholesale breaks host frameworks that
//! watch for user input, so the injector types instead: focus, select
//! all, insert the first text segment through the platform primitive,
//! then one synthetic line-break keystroke per embedded `\n`, each step
//! separated by a configurable yield so observers see discrete
//! keystrokes rather than one opaque mutation. Every step dispatches a
//! native `input` notification.
//!
//! The step sequence is an explicit state machine driven by the page
//! scheduler (segment → yield → next), so cancellation on destruction
//! is total and tests can step it deterministically.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::error::Error;
use crate::keys::{Key, Keystroke};
use crate::page::{Document, NodeId, TimerSlot};

/// Timing knobs for multi-segment injection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InjectionTiming {
    /// Delay between synthetic keystrokes, so host frameworks observing
    /// discrete input do not coalesce multi-line writes
    pub keystroke_yield_ms: u64,
}

impl Default for InjectionTiming {
    fn default() -> Self {
        Self {
            keystroke_yield_ms: 25,
        }
    }
}

enum Step {
    /// Insert a text segment at the cursor
    Text(String),
    /// Synthesize a line-break keystroke
    Break,
}

struct InjectState {
    doc: Document,
    node: NodeId,
    steps: RefCell<VecDeque<Step>>,
    slot: TimerSlot,
    yield_ms: u64,
    complete: Cell<bool>,
    cancelled: Cell<bool>,
    on_complete: RefCell<Option<Box<dyn FnOnce()>>>,
}

/// Handle to an in-flight (or already finished) injection
pub struct Injection {
    state: Option<Rc<InjectState>>,
}

impl Injection {
    /// An injection that finished synchronously
    pub fn completed() -> Self {
        Self { state: None }
    }

    pub fn is_complete(&self) -> bool {
        match &self.state {
            None => true,
            Some(state) => state.complete.get(),
        }
    }

    /// Stop mid-flight: the pending step never runs and the completion
    /// callback never fires.
    pub fn cancel(&self) {
        if let Some(state) = &self.state {
            if !state.complete.get() {
                state.cancelled.set(true);
                state.slot.clear();
                debug!("injection cancelled mid-flight");
            }
        }
    }
}

/// Replace a structured region's content with `text`, typing it in.
pub fn replace_content(
    doc: &Document,
    node: NodeId,
    text: &str,
    timing: &InjectionTiming,
    on_complete: impl FnOnce() + 'static,
) -> Injection {
    doc.focus(node);

    if !doc.insert_primitive_enabled() {
        debug!("insertion primitive unavailable, using legacy replace");
        legacy_replace(doc, node, text);
        doc.dispatch_input(node);
        on_complete();
        return Injection::completed();
    }

    doc.select_all_in(node);

    let mut steps = VecDeque::new();
    for (i, segment) in text.split('\n').enumerate() {
        if i > 0 {
            steps.push_back(Step::Break);
        }
        steps.push_back(Step::Text(segment.to_string()));
    }

    let state = Rc::new(InjectState {
        doc: doc.clone(),
        node,
        steps: RefCell::new(steps),
        slot: TimerSlot::new(doc.scheduler()),
        yield_ms: timing.keystroke_yield_ms,
        complete: Cell::new(false),
        cancelled: Cell::new(false),
        on_complete: RefCell::new(Some(Box::new(on_complete))),
    });

    // first segment lands immediately; subsequent steps each follow a
    // yield on the page clock
    let first = state.steps.borrow_mut().pop_front();
    if let Some(step) = first {
        if let Err(err) = exec_step(&state, &step) {
            return fall_back(&state, text, err);
        }
    }
    pump(Rc::clone(&state));
    Injection { state: Some(state) }
}

fn exec_step(state: &Rc<InjectState>, step: &Step) -> Result<(), Error> {
    match step {
        Step::Text(segment) => {
            // an empty segment still replaces the selection, which is
            // what clears the region when writing empty content
            state.doc.insert_text_at_cursor(segment)?;
            state.doc.dispatch_input(state.node);
            Ok(())
        }
        Step::Break => {
            // the host sees the keystroke before its default action
            state.doc.dispatch_key(state.node, Keystroke::plain(Key::Enter));
            state.doc.insert_line_break_at_cursor()?;
            state.doc.dispatch_input(state.node);
            Ok(())
        }
    }
}

fn pump(state: Rc<InjectState>) {
    if state.cancelled.get() {
        return;
    }
    let next = state.steps.borrow_mut().pop_front();
    match next {
        None => finish(&state),
        Some(step) => {
            let st = Rc::clone(&state);
            state.slot.restart(state.yield_ms, move || {
                if st.cancelled.get() {
                    return;
                }
                match exec_step(&st, &step) {
                    Ok(()) => pump(st),
                    Err(err) => {
                        // primitive vanished mid-flight; nothing more we
                        // can type, report what we have
                        warn!(error = %err, "injection step failed, finishing early");
                        finish(&st);
                    }
                }
            });
        }
    }
}

fn finish(state: &Rc<InjectState>) {
    if state.complete.replace(true) {
        return;
    }
    if let Some(cb) = state.on_complete.borrow_mut().take() {
        cb();
    }
}

fn fall_back(state: &Rc<InjectState>, text: &str, err: Error) -> Injection {
    debug!(error = %err, "falling back to legacy replace");
    legacy_replace(&state.doc, state.node, text);
    state.doc.dispatch_input(state.node);
    finish(state);
    Injection::completed()
}

/// Single-shot replace-and-reinsert: clear the region and rebuild the
/// equivalent text/line-break structure directly.
fn legacy_replace(doc: &Document, node: NodeId, text: &str) {
    for child in doc.children(node) {
        doc.remove_node(child);
    }
    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            let br = doc.create_element("br");
            doc.append_child(node, br);
        }
        if !line.is_empty() {
            doc.append_text(node, line);
        }
    }
    doc.collapse_cursor_to_end(node);
}
