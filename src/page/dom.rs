//! Arena-backed document tree.
//!
//! This is the seam between the integration layer and the page it does
//! not own: elements, text nodes, attributes, style/layout boxes, scoped
//! mutation observers and a document cursor, mutated freely by whoever
//! embeds the layer. Nodes are arena slots addressed by [`NodeId`];
//! removed nodes stay allocated but disconnected, exactly like detached
//! DOM nodes that scripts may still hold references to.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::cursor::DomRange;
use super::events::ListenerTable;
use super::geometry::{Rect, TextMetrics};
use super::scheduler::Scheduler;

/// Handle to a node in the document arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

/// CSS-ish display value; `None` on an ancestor suppresses rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Display {
    Block,
    Inline,
    None,
}

/// The style subset that affects classification, visibility and
/// normalization. `display: None` means "not overridden" and falls back
/// to the tag's default.
#[derive(Debug, Clone, PartialEq)]
pub struct Style {
    pub display: Option<Display>,
    pub visibility_hidden: bool,
    pub opacity: f32,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            display: None,
            visibility_hidden: false,
            opacity: 1.0,
        }
    }
}

/// Value and native selection state of an `input`/`textarea` element.
/// Selection indices are code-point offsets into `value`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldState {
    pub value: String,
    pub selection_start: usize,
    pub selection_end: usize,
}

#[derive(Debug, Clone)]
pub(super) struct ElementData {
    pub(super) tag: String,
    pub(super) attrs: Vec<(String, String)>,
    pub(super) style: Style,
    pub(super) layout: Option<Rect>,
    pub(super) field: Option<FieldState>,
}

#[derive(Debug, Clone)]
pub(super) enum NodeKind {
    Element(ElementData),
    Text(String),
}

#[derive(Debug, Clone)]
pub(super) struct NodeData {
    pub(super) parent: Option<NodeId>,
    pub(super) children: Vec<NodeId>,
    pub(super) kind: NodeKind,
}

/// One observed mutation, delivered to scoped observers after the
/// mutation completes.
#[derive(Debug, Clone)]
pub enum MutationRecord {
    /// Children of `target` were added or removed
    ChildList { target: NodeId },
    /// An attribute of `target` changed
    Attribute { target: NodeId, name: String },
    /// The text content of `target` (a text node) changed
    CharacterData { target: NodeId },
}

impl MutationRecord {
    pub fn target(&self) -> NodeId {
        match self {
            MutationRecord::ChildList { target }
            | MutationRecord::Attribute { target, .. }
            | MutationRecord::CharacterData { target } => *target,
        }
    }
}

/// What part of the document a mutation observer watches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObserverScope {
    /// Any mutation in the subtree rooted at `root` (inclusive)
    Subtree { root: NodeId },
    /// Attribute mutations on exactly `target`
    Attributes { target: NodeId },
}

/// Identifier for a registered mutation observer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MutationObserverId(pub(super) u64);

#[derive(Clone)]
pub(super) struct ObserverEntry {
    pub(super) id: MutationObserverId,
    pub(super) scope: ObserverScope,
    pub(super) callback: Rc<dyn Fn(&[MutationRecord])>,
}

pub(super) struct DocumentInner {
    pub(super) nodes: RefCell<Vec<NodeData>>,
    pub(super) root: NodeId,
    pub(super) cursor: RefCell<Option<DomRange>>,
    pub(super) focused: Cell<Option<NodeId>>,
    pub(super) scroll: Cell<(f32, f32)>,
    pub(super) metrics: Cell<TextMetrics>,
    pub(super) insert_primitive: Cell<bool>,
    pub(super) listeners: RefCell<ListenerTable>,
    pub(super) observers: RefCell<Vec<ObserverEntry>>,
    pub(super) pending_mutations: RefCell<Vec<MutationRecord>>,
    pub(super) delivering: Cell<bool>,
    pub(super) next_observer_id: Cell<u64>,
    pub(super) scheduler: Scheduler,
}

/// Handle to a document. Cloning is cheap and refers to the same tree.
#[derive(Clone)]
pub struct Document {
    pub(super) inner: Rc<DocumentInner>,
}

/// Tags that default to block-level display
const BLOCK_TAGS: &[&str] = &[
    "div",
    "p",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "ul",
    "ol",
    "li",
    "blockquote",
    "pre",
    "section",
    "article",
    "form",
    "body",
];

impl Document {
    /// Create a document with an empty `body` root sized to a typical
    /// viewport.
    pub fn new(scheduler: Scheduler) -> Self {
        let root_data = NodeData {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Element(ElementData {
                tag: "body".to_string(),
                attrs: Vec::new(),
                style: Style::default(),
                layout: Some(Rect::new(0.0, 0.0, 1024.0, 768.0)),
                field: None,
            }),
        };
        Self {
            inner: Rc::new(DocumentInner {
                nodes: RefCell::new(vec![root_data]),
                root: NodeId(0),
                cursor: RefCell::new(None),
                focused: Cell::new(None),
                scroll: Cell::new((0.0, 0.0)),
                metrics: Cell::new(TextMetrics::default()),
                insert_primitive: Cell::new(true),
                listeners: RefCell::new(ListenerTable::default()),
                observers: RefCell::new(Vec::new()),
                pending_mutations: RefCell::new(Vec::new()),
                delivering: Cell::new(false),
                next_observer_id: Cell::new(1),
                scheduler,
            }),
        }
    }

    pub fn root(&self) -> NodeId {
        self.inner.root
    }

    pub fn scheduler(&self) -> Scheduler {
        self.inner.scheduler.clone()
    }

    // ------------------------------------------------------------------
    // Node construction
    // ------------------------------------------------------------------

    /// Create a detached element
    pub fn create_element(&self, tag: &str) -> NodeId {
        self.push_node(NodeKind::Element(ElementData {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            style: Style::default(),
            layout: None,
            field: if matches!(tag, "input" | "textarea") {
                Some(FieldState::default())
            } else {
                None
            },
        }))
    }

    /// Create a detached text node
    pub fn create_text(&self, text: &str) -> NodeId {
        self.push_node(NodeKind::Text(text.to_string()))
    }

    fn push_node(&self, kind: NodeKind) -> NodeId {
        let mut nodes = self.inner.nodes.borrow_mut();
        let id = NodeId(nodes.len() as u32);
        nodes.push(NodeData {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    // ------------------------------------------------------------------
    // Tree structure
    // ------------------------------------------------------------------

    pub fn append_child(&self, parent: NodeId, child: NodeId) {
        let index = self.inner.nodes.borrow()[parent.0 as usize].children.len();
        self.insert_child(parent, index, child);
    }

    /// Insert `child` at `index` among `parent`'s children, detaching it
    /// from any previous parent first.
    pub fn insert_child(&self, parent: NodeId, index: usize, child: NodeId) {
        let mut records = Vec::new();
        {
            let mut nodes = self.inner.nodes.borrow_mut();
            if let Some(old_parent) = nodes[child.0 as usize].parent {
                nodes[old_parent.0 as usize]
                    .children
                    .retain(|c| *c != child);
                records.push(MutationRecord::ChildList { target: old_parent });
            }
            let index = index.min(nodes[parent.0 as usize].children.len());
            nodes[parent.0 as usize].children.insert(index, child);
            nodes[child.0 as usize].parent = Some(parent);
            records.push(MutationRecord::ChildList { target: parent });
        }
        self.commit(records);
    }

    /// Detach a node from its parent. The node (and its subtree) stays
    /// alive and can be re-inserted.
    pub fn remove_node(&self, node: NodeId) {
        let mut records = Vec::new();
        {
            let mut nodes = self.inner.nodes.borrow_mut();
            if let Some(parent) = nodes[node.0 as usize].parent.take() {
                nodes[parent.0 as usize].children.retain(|c| *c != node);
                records.push(MutationRecord::ChildList { target: parent });
            }
        }
        self.commit(records);
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.inner.nodes.borrow()[node.0 as usize].parent
    }

    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.inner.nodes.borrow()[node.0 as usize].children.clone()
    }

    pub fn child_count(&self, node: NodeId) -> usize {
        self.inner.nodes.borrow()[node.0 as usize].children.len()
    }

    /// True if the node is reachable from the document root
    pub fn is_connected(&self, node: NodeId) -> bool {
        let nodes = self.inner.nodes.borrow();
        let mut current = node;
        loop {
            if current == self.inner.root {
                return true;
            }
            match nodes[current.0 as usize].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// True if `node` is `ancestor` or inside its subtree
    pub fn is_descendant_or_self(&self, node: NodeId, ancestor: NodeId) -> bool {
        let nodes = self.inner.nodes.borrow();
        let mut current = node;
        loop {
            if current == ancestor {
                return true;
            }
            match nodes[current.0 as usize].parent {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }

    /// Preorder traversal of the subtree rooted at `node` (exclusive of
    /// `node` itself when `include_self` is false)
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let nodes = self.inner.nodes.borrow();
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = nodes[node.0 as usize]
            .children
            .iter()
            .rev()
            .copied()
            .collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            for child in nodes[current.0 as usize].children.iter().rev() {
                stack.push(*child);
            }
        }
        out
    }

    // ------------------------------------------------------------------
    // Node inspection
    // ------------------------------------------------------------------

    pub fn is_element(&self, node: NodeId) -> bool {
        matches!(
            self.inner.nodes.borrow()[node.0 as usize].kind,
            NodeKind::Element(_)
        )
    }

    pub fn is_text(&self, node: NodeId) -> bool {
        matches!(
            self.inner.nodes.borrow()[node.0 as usize].kind,
            NodeKind::Text(_)
        )
    }

    pub fn tag(&self, node: NodeId) -> Option<String> {
        match &self.inner.nodes.borrow()[node.0 as usize].kind {
            NodeKind::Element(el) => Some(el.tag.clone()),
            NodeKind::Text(_) => None,
        }
    }

    /// Text content of a text node
    pub fn text_of(&self, node: NodeId) -> Option<String> {
        match &self.inner.nodes.borrow()[node.0 as usize].kind {
            NodeKind::Text(text) => Some(text.clone()),
            NodeKind::Element(_) => None,
        }
    }

    /// Replace the content of a text node
    pub fn set_text(&self, node: NodeId, text: &str) {
        let mut records = Vec::new();
        {
            let mut nodes = self.inner.nodes.borrow_mut();
            if let NodeKind::Text(current) = &mut nodes[node.0 as usize].kind {
                if current != text {
                    *current = text.to_string();
                    records.push(MutationRecord::CharacterData { target: node });
                }
            }
        }
        self.commit(records);
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    pub fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        match &self.inner.nodes.borrow()[node.0 as usize].kind {
            NodeKind::Element(el) => el
                .attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone()),
            NodeKind::Text(_) => None,
        }
    }

    pub fn set_attribute(&self, node: NodeId, name: &str, value: &str) {
        let mut records = Vec::new();
        {
            let mut nodes = self.inner.nodes.borrow_mut();
            if let NodeKind::Element(el) = &mut nodes[node.0 as usize].kind {
                match el.attrs.iter_mut().find(|(n, _)| n == name) {
                    Some((_, v)) if v == value => {}
                    Some((_, v)) => {
                        *v = value.to_string();
                        records.push(MutationRecord::Attribute {
                            target: node,
                            name: name.to_string(),
                        });
                    }
                    None => {
                        el.attrs.push((name.to_string(), value.to_string()));
                        records.push(MutationRecord::Attribute {
                            target: node,
                            name: name.to_string(),
                        });
                    }
                }
            }
        }
        self.commit(records);
    }

    pub fn remove_attribute(&self, node: NodeId, name: &str) {
        let mut records = Vec::new();
        {
            let mut nodes = self.inner.nodes.borrow_mut();
            if let NodeKind::Element(el) = &mut nodes[node.0 as usize].kind {
                let before = el.attrs.len();
                el.attrs.retain(|(n, _)| n != name);
                if el.attrs.len() != before {
                    records.push(MutationRecord::Attribute {
                        target: node,
                        name: name.to_string(),
                    });
                }
            }
        }
        self.commit(records);
    }

    // ------------------------------------------------------------------
    // Style, layout, visibility
    // ------------------------------------------------------------------

    pub fn style(&self, node: NodeId) -> Style {
        match &self.inner.nodes.borrow()[node.0 as usize].kind {
            NodeKind::Element(el) => el.style.clone(),
            NodeKind::Text(_) => Style::default(),
        }
    }

    pub fn set_style(&self, node: NodeId, style: Style) {
        let mut records = Vec::new();
        {
            let mut nodes = self.inner.nodes.borrow_mut();
            if let NodeKind::Element(el) = &mut nodes[node.0 as usize].kind {
                if el.style != style {
                    el.style = style;
                    records.push(MutationRecord::Attribute {
                        target: node,
                        name: "style".to_string(),
                    });
                }
            }
        }
        self.commit(records);
    }

    /// Layout box assigned to an element, if it has been laid out
    pub fn layout(&self, node: NodeId) -> Option<Rect> {
        match &self.inner.nodes.borrow()[node.0 as usize].kind {
            NodeKind::Element(el) => el.layout,
            NodeKind::Text(_) => None,
        }
    }

    /// Assign a layout box. Layout changes are not mutations: observers
    /// do not fire for them, mirroring how layout is invisible to
    /// MutationObserver.
    pub fn set_layout(&self, node: NodeId, rect: Rect) {
        let mut nodes = self.inner.nodes.borrow_mut();
        if let NodeKind::Element(el) = &mut nodes[node.0 as usize].kind {
            el.layout = Some(rect);
        }
    }

    /// Effective display of an element: style override, else tag default
    pub fn effective_display(&self, node: NodeId) -> Display {
        match &self.inner.nodes.borrow()[node.0 as usize].kind {
            NodeKind::Element(el) => el.style.display.unwrap_or_else(|| {
                if BLOCK_TAGS.contains(&el.tag.as_str()) {
                    Display::Block
                } else {
                    Display::Inline
                }
            }),
            NodeKind::Text(_) => Display::Inline,
        }
    }

    /// True for elements that render as block-level boxes
    pub fn is_block(&self, node: NodeId) -> bool {
        self.is_element(node) && self.effective_display(node) == Display::Block
    }

    /// True for the explicit line-break marker element
    pub fn is_line_break(&self, node: NodeId) -> bool {
        self.tag(node).as_deref() == Some("br")
    }

    /// Effective visibility: connected, non-zero rendered box, and no
    /// ancestor that is display-suppressed, `hidden`, or fully
    /// transparent.
    pub fn is_effectively_visible(&self, node: NodeId) -> bool {
        if !self.is_connected(node) {
            return false;
        }
        match self.layout(node) {
            Some(rect) if !rect.is_degenerate() => {}
            _ => return false,
        }
        let mut current = Some(node);
        while let Some(n) = current {
            if self.is_element(n) {
                if self.effective_display(n) == Display::None {
                    return false;
                }
                if self.attribute(n, "hidden").is_some() {
                    return false;
                }
                let style = self.style(n);
                if style.visibility_hidden || style.opacity <= 0.0 {
                    return false;
                }
            }
            current = self.parent(n);
        }
        true
    }

    // ------------------------------------------------------------------
    // Field state (input / textarea)
    // ------------------------------------------------------------------

    pub fn field_value(&self, node: NodeId) -> Option<String> {
        match &self.inner.nodes.borrow()[node.0 as usize].kind {
            NodeKind::Element(el) => el.field.as_ref().map(|f| f.value.clone()),
            NodeKind::Text(_) => None,
        }
    }

    /// Set a field's value, clamping the selection to the new length.
    /// Like assigning `.value` in a browser, this does not fire an input
    /// event; callers that simulate user input dispatch one explicitly.
    pub fn set_field_value(&self, node: NodeId, value: &str) {
        let mut records = Vec::new();
        {
            let mut nodes = self.inner.nodes.borrow_mut();
            if let NodeKind::Element(el) = &mut nodes[node.0 as usize].kind {
                if let Some(field) = &mut el.field {
                    if field.value != value {
                        field.value = value.to_string();
                        let len = field.value.chars().count();
                        field.selection_start = field.selection_start.min(len);
                        field.selection_end = field.selection_end.min(len);
                        records.push(MutationRecord::Attribute {
                            target: node,
                            name: "value".to_string(),
                        });
                    }
                }
            }
        }
        self.commit(records);
    }

    /// Native selection range of a field, in code points
    pub fn field_selection(&self, node: NodeId) -> Option<(usize, usize)> {
        match &self.inner.nodes.borrow()[node.0 as usize].kind {
            NodeKind::Element(el) => el
                .field
                .as_ref()
                .map(|f| (f.selection_start, f.selection_end)),
            NodeKind::Text(_) => None,
        }
    }

    pub fn set_field_selection(&self, node: NodeId, start: usize, end: usize) {
        let mut nodes = self.inner.nodes.borrow_mut();
        if let NodeKind::Element(el) = &mut nodes[node.0 as usize].kind {
            if let Some(field) = &mut el.field {
                let len = field.value.chars().count();
                field.selection_start = start.min(len);
                field.selection_end = end.min(len);
            }
        }
    }

    // ------------------------------------------------------------------
    // Page-level state
    // ------------------------------------------------------------------

    pub fn scroll(&self) -> (f32, f32) {
        self.inner.scroll.get()
    }

    pub fn set_scroll(&self, x: f32, y: f32) {
        self.inner.scroll.set((x, y));
    }

    pub fn metrics(&self) -> TextMetrics {
        self.inner.metrics.get()
    }

    pub fn set_metrics(&self, metrics: TextMetrics) {
        self.inner.metrics.set(metrics);
    }

    /// Whether the cursor-relative insertion primitive is available.
    /// Disabled to model hosts where `insertText` is unsupported.
    pub fn insert_primitive_enabled(&self) -> bool {
        self.inner.insert_primitive.get()
    }

    pub fn set_insert_primitive_enabled(&self, enabled: bool) {
        self.inner.insert_primitive.set(enabled);
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.inner.focused.get()
    }

    // ------------------------------------------------------------------
    // Mutation observers
    // ------------------------------------------------------------------

    /// Register a mutation observer over the given scope
    pub fn observe(
        &self,
        scope: ObserverScope,
        callback: impl Fn(&[MutationRecord]) + 'static,
    ) -> MutationObserverId {
        let id = MutationObserverId(self.inner.next_observer_id.get());
        self.inner.next_observer_id.set(id.0 + 1);
        self.inner.observers.borrow_mut().push(ObserverEntry {
            id,
            scope,
            callback: Rc::new(callback),
        });
        id
    }

    /// Disconnect an observer. Returns false if it was already removed.
    pub fn disconnect(&self, id: MutationObserverId) -> bool {
        let mut observers = self.inner.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|entry| entry.id != id);
        observers.len() != before
    }

    /// Queue records produced by a mutation and deliver them to scoped
    /// observers. Delivery is re-entrancy safe: mutations performed by an
    /// observer are queued and drained in the same flush, with a depth
    /// cap to break runaway feedback loops.
    pub(super) fn commit(&self, records: Vec<MutationRecord>) {
        if records.is_empty() {
            return;
        }
        self.inner
            .pending_mutations
            .borrow_mut()
            .extend(records);
        if self.inner.delivering.get() {
            return;
        }
        self.inner.delivering.set(true);
        let mut rounds = 0u32;
        loop {
            let batch: Vec<MutationRecord> = {
                let mut pending = self.inner.pending_mutations.borrow_mut();
                if pending.is_empty() {
                    break;
                }
                pending.drain(..).collect()
            };
            rounds += 1;
            if rounds > 16 {
                tracing::warn!(
                    dropped = batch.len(),
                    "mutation delivery depth exceeded, dropping records"
                );
                break;
            }
            let observers: Vec<ObserverEntry> = self.inner.observers.borrow().clone();
            for entry in observers {
                let relevant: Vec<MutationRecord> = batch
                    .iter()
                    .filter(|record| self.record_in_scope(record, entry.scope))
                    .cloned()
                    .collect();
                if !relevant.is_empty() {
                    entry.callback.as_ref()(&relevant);
                }
            }
        }
        self.inner.delivering.set(false);
    }

    fn record_in_scope(&self, record: &MutationRecord, scope: ObserverScope) -> bool {
        match scope {
            ObserverScope::Subtree { root } => self.is_descendant_or_self(record.target(), root),
            ObserverScope::Attributes { target } => {
                matches!(record, MutationRecord::Attribute { target: t, .. } if *t == target)
            }
        }
    }

    // ------------------------------------------------------------------
    // Convenience builders
    // ------------------------------------------------------------------

    /// Create an element, set attributes, and append it to a parent in
    /// one call. Used heavily by fixtures and the legacy injector.
    pub fn append_element(&self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let node = self.create_element(tag);
        for (name, value) in attrs {
            self.set_attribute(node, name, value);
        }
        self.append_child(parent, node);
        node
    }

    /// Create a text node and append it to a parent
    pub fn append_text(&self, parent: NodeId, text: &str) -> NodeId {
        let node = self.create_text(text);
        self.append_child(parent, node);
        node
    }
}
