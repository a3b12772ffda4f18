//! Typed page events: listeners, dispatch with bubbling, focus and
//! click synthesis.
//!
//! The integration layer both consumes these (edit notifications feeding
//! the change detector) and produces them (synthetic keystrokes and input
//! notifications during write-back, so host-page listeners treat the
//! change exactly as user input).

use std::rc::Rc;

use crate::keys::Keystroke;

use super::dom::{Document, NodeId};

/// Event categories the page model understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Content of an editable node changed
    Input,
    /// A key went down (carries a [`Keystroke`])
    KeyDown,
    /// Element received focus
    Focus,
    /// Element lost focus
    Blur,
    /// Clipboard paste into the target
    Paste,
    /// Clipboard cut from the target
    Cut,
    /// An IME composition finished
    CompositionEnd,
    /// Pointer click on the target
    Click,
}

/// A dispatched event. `target` is the node it was dispatched on; the
/// event bubbles to every ancestor.
#[derive(Debug, Clone)]
pub struct PageEvent {
    pub kind: EventKind,
    pub target: NodeId,
    pub key: Option<Keystroke>,
    pub data: Option<String>,
}

impl PageEvent {
    pub fn new(kind: EventKind, target: NodeId) -> Self {
        Self {
            kind,
            target,
            key: None,
            data: None,
        }
    }
}

/// Identifier for a registered event listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct ListenerEntry {
    id: ListenerId,
    node: NodeId,
    kind: EventKind,
    callback: Rc<dyn Fn(&PageEvent)>,
}

/// All listeners registered on the document, keyed by (node, kind)
#[derive(Default)]
pub(super) struct ListenerTable {
    entries: Vec<ListenerEntry>,
    next_id: u64,
}

impl ListenerTable {
    fn add(&mut self, node: NodeId, kind: EventKind, callback: Rc<dyn Fn(&PageEvent)>) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.entries.push(ListenerEntry {
            id,
            node,
            kind,
            callback,
        });
        id
    }

    fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.id != id);
        self.entries.len() != before
    }

    fn matching(&self, node: NodeId, kind: EventKind) -> Vec<Rc<dyn Fn(&PageEvent)>> {
        self.entries
            .iter()
            .filter(|entry| entry.node == node && entry.kind == kind)
            .map(|entry| Rc::clone(&entry.callback))
            .collect()
    }
}

impl Document {
    /// Attach an event listener to a node
    pub fn add_listener(
        &self,
        node: NodeId,
        kind: EventKind,
        callback: impl Fn(&PageEvent) + 'static,
    ) -> ListenerId {
        self.inner
            .listeners
            .borrow_mut()
            .add(node, kind, Rc::new(callback))
    }

    /// Detach an event listener. Returns false if already removed.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.listeners.borrow_mut().remove(id)
    }

    /// Dispatch an event on its target and bubble it through ancestors
    pub fn dispatch(&self, event: PageEvent) {
        let mut path = vec![event.target];
        let mut current = event.target;
        while let Some(parent) = self.parent(current) {
            path.push(parent);
            current = parent;
        }
        for node in path {
            let callbacks = self.inner.listeners.borrow().matching(node, event.kind);
            for callback in callbacks {
                callback.as_ref()(&event);
            }
        }
    }

    /// Dispatch a native-looking "input changed" notification
    pub fn dispatch_input(&self, target: NodeId) {
        self.dispatch(PageEvent::new(EventKind::Input, target));
    }

    /// Dispatch a keystroke on the target
    pub fn dispatch_key(&self, target: NodeId, keystroke: Keystroke) {
        let mut event = PageEvent::new(EventKind::KeyDown, target);
        event.key = Some(keystroke);
        self.dispatch(event);
    }

    /// Move focus to a node, blurring the previous holder
    pub fn focus(&self, node: NodeId) {
        let previous = self.inner.focused.get();
        if previous == Some(node) {
            return;
        }
        self.inner.focused.set(Some(node));
        if let Some(old) = previous {
            self.dispatch(PageEvent::new(EventKind::Blur, old));
        }
        self.dispatch(PageEvent::new(EventKind::Focus, node));
    }

    /// Synthesize a pointer click on a node
    pub fn click(&self, node: NodeId) {
        self.dispatch(PageEvent::new(EventKind::Click, node));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Scheduler;
    use std::cell::{Cell, RefCell};

    fn doc() -> Document {
        Document::new(Scheduler::new())
    }

    #[test]
    fn test_listener_receives_event() {
        let d = doc();
        let el = d.append_element(d.root(), "textarea", &[]);
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        d.add_listener(el, EventKind::Input, move |_| c.set(c.get() + 1));

        d.dispatch_input(el);
        d.dispatch_input(el);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_events_bubble_to_ancestors() {
        let d = doc();
        let wrap = d.append_element(d.root(), "div", &[]);
        let el = d.append_element(wrap, "textarea", &[]);

        let order = Rc::new(RefCell::new(Vec::new()));
        let o = Rc::clone(&order);
        d.add_listener(el, EventKind::Input, move |_| o.borrow_mut().push("target"));
        let o = Rc::clone(&order);
        d.add_listener(wrap, EventKind::Input, move |_| o.borrow_mut().push("parent"));

        d.dispatch_input(el);
        assert_eq!(*order.borrow(), vec!["target", "parent"]);
    }

    #[test]
    fn test_remove_listener() {
        let d = doc();
        let el = d.append_element(d.root(), "input", &[]);
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let id = d.add_listener(el, EventKind::Input, move |_| c.set(c.get() + 1));

        d.dispatch_input(el);
        assert!(d.remove_listener(id));
        d.dispatch_input(el);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn test_focus_fires_blur_then_focus() {
        let d = doc();
        let a = d.append_element(d.root(), "input", &[]);
        let b = d.append_element(d.root(), "input", &[]);

        let order = Rc::new(RefCell::new(Vec::new()));
        let o = Rc::clone(&order);
        d.add_listener(a, EventKind::Blur, move |_| o.borrow_mut().push("blur-a"));
        let o = Rc::clone(&order);
        d.add_listener(b, EventKind::Focus, move |_| o.borrow_mut().push("focus-b"));

        d.focus(a);
        d.focus(b);
        assert_eq!(*order.borrow(), vec!["blur-a", "focus-b"]);
        assert_eq!(d.focused(), Some(b));
    }

    #[test]
    fn test_keystroke_payload() {
        use crate::keys::{Key, Keystroke};
        let d = doc();
        let el = d.append_element(d.root(), "div", &[]);
        let seen = Rc::new(RefCell::new(None));
        let s = Rc::clone(&seen);
        d.add_listener(el, EventKind::KeyDown, move |ev| {
            *s.borrow_mut() = ev.key;
        });

        d.dispatch_key(el, Keystroke::plain(Key::Enter));
        assert_eq!(*seen.borrow(), Some(Keystroke::plain(Key::Enter)));
    }
}
