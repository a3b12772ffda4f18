//! Document cursor: tree positions, ranges, and the cursor-relative
//! editing primitives the injector drives.
//!
//! A position is either a character offset inside a text node or a child
//! index inside an element, mirroring how live ranges address a tree.
//! The editing primitives support the shapes editors actually produce
//! (collapsed carets, whole-element selections, single-node spans);
//! exotic cross-node ranges collapse to their start rather than
//! attempting a general tree diff.

use tracing::debug;

use crate::error::Error;

use super::dom::{Document, MutationRecord, NodeId, NodeKind};

/// A position in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomPoint {
    /// `offset` code points into a text node's content
    Text { node: NodeId, offset: usize },
    /// Before child `index` of an element (`index == len` means "at the
    /// end")
    Element { node: NodeId, index: usize },
}

impl DomPoint {
    pub fn node(&self) -> NodeId {
        match self {
            DomPoint::Text { node, .. } | DomPoint::Element { node, .. } => *node,
        }
    }
}

/// A range between two positions. `start` carries the caret for
/// collapsed ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomRange {
    pub start: DomPoint,
    pub end: DomPoint,
}

impl DomRange {
    pub fn collapsed(point: DomPoint) -> Self {
        Self {
            start: point,
            end: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

fn splice_chars(text: &str, char_idx: usize, insert: &str) -> String {
    let byte_idx = text
        .char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let mut out = String::with_capacity(text.len() + insert.len());
    out.push_str(&text[..byte_idx]);
    out.push_str(insert);
    out.push_str(&text[byte_idx..]);
    out
}

fn remove_char_span(text: &str, start: usize, end: usize) -> String {
    text.chars()
        .take(start)
        .chain(text.chars().skip(end))
        .collect()
}

impl Document {
    /// The page's active cursor range, if any
    pub fn cursor(&self) -> Option<DomRange> {
        *self.inner.cursor.borrow()
    }

    pub fn set_cursor(&self, range: Option<DomRange>) {
        *self.inner.cursor.borrow_mut() = range;
    }

    /// Select the entire content of an element
    pub fn select_all_in(&self, node: NodeId) {
        let len = self.child_count(node);
        self.set_cursor(Some(DomRange {
            start: DomPoint::Element { node, index: 0 },
            end: DomPoint::Element { node, index: len },
        }));
    }

    /// Collapse the cursor to the end of an element's content
    pub fn collapse_cursor_to_end(&self, node: NodeId) {
        let len = self.child_count(node);
        self.set_cursor(Some(DomRange::collapsed(DomPoint::Element {
            node,
            index: len,
        })));
    }

    /// Clamp a point into the subtree rooted at `root`: points outside
    /// collapse to the end of `root`'s content.
    pub fn clamp_point_to(&self, point: DomPoint, root: NodeId) -> DomPoint {
        if self.is_descendant_or_self(point.node(), root) {
            point
        } else {
            DomPoint::Element {
                node: root,
                index: self.child_count(root),
            }
        }
    }

    /// Insert text at the cursor through the platform primitive,
    /// replacing the selected range first. Fails when the primitive is
    /// unavailable or there is no cursor; callers fall back to the
    /// legacy replace strategy.
    pub fn insert_text_at_cursor(&self, text: &str) -> Result<(), Error> {
        if !self.insert_primitive_enabled() {
            return Err(Error::InsertionUnavailable);
        }
        let range = self.cursor().ok_or(Error::InsertionUnavailable)?;

        let mut records = Vec::new();
        let caret = self.delete_range_contents(range, &mut records);

        let new_cursor = {
            let mut nodes = self.inner.nodes.borrow_mut();
            match caret {
                DomPoint::Text { node, offset } => {
                    if let NodeKind::Text(content) = &mut nodes[node.0 as usize].kind {
                        *content = splice_chars(content, offset, text);
                        records.push(MutationRecord::CharacterData { target: node });
                    }
                    DomPoint::Text {
                        node,
                        offset: offset + text.chars().count(),
                    }
                }
                DomPoint::Element { node, index } => {
                    let text_id = {
                        let id = NodeId(nodes.len() as u32);
                        nodes.push(super::dom::NodeData {
                            parent: Some(node),
                            children: Vec::new(),
                            kind: NodeKind::Text(text.to_string()),
                        });
                        id
                    };
                    let index = index.min(nodes[node.0 as usize].children.len());
                    nodes[node.0 as usize].children.insert(index, text_id);
                    records.push(MutationRecord::ChildList { target: node });
                    DomPoint::Text {
                        node: text_id,
                        offset: text.chars().count(),
                    }
                }
            }
        };

        self.set_cursor(Some(DomRange::collapsed(new_cursor)));
        self.commit(records);
        Ok(())
    }

    /// Insert a line-break marker at the cursor, as the default action
    /// of a line-break keystroke would.
    pub fn insert_line_break_at_cursor(&self) -> Result<(), Error> {
        if !self.insert_primitive_enabled() {
            return Err(Error::InsertionUnavailable);
        }
        let range = self.cursor().ok_or(Error::InsertionUnavailable)?;

        let mut records = Vec::new();
        let caret = self.delete_range_contents(range, &mut records);

        let new_cursor = {
            let mut nodes = self.inner.nodes.borrow_mut();
            let make_br = |nodes: &mut Vec<super::dom::NodeData>, parent: NodeId| {
                let id = NodeId(nodes.len() as u32);
                nodes.push(super::dom::NodeData {
                    parent: Some(parent),
                    children: Vec::new(),
                    kind: NodeKind::Element(super::dom::ElementData {
                        tag: "br".to_string(),
                        attrs: Vec::new(),
                        style: super::dom::Style::default(),
                        layout: None,
                        field: None,
                    }),
                });
                id
            };
            match caret {
                DomPoint::Element { node, index } => {
                    let br = make_br(&mut nodes, node);
                    let index = index.min(nodes[node.0 as usize].children.len());
                    nodes[node.0 as usize].children.insert(index, br);
                    records.push(MutationRecord::ChildList { target: node });
                    DomPoint::Element {
                        node,
                        index: index + 1,
                    }
                }
                DomPoint::Text { node, offset } => {
                    let located = nodes[node.0 as usize].parent.and_then(|parent| {
                        nodes[parent.0 as usize]
                            .children
                            .iter()
                            .position(|c| *c == node)
                            .map(|index| (parent, index))
                    });
                    // a cursor left in a detached text node has nowhere
                    // to put a line break
                    let Some((parent, text_index)) = located else {
                        debug!("cursor text node is detached, skipping line break");
                        drop(nodes);
                        self.set_cursor(Some(DomRange::collapsed(caret)));
                        self.commit(records);
                        return Ok(());
                    };
                    let content = match &nodes[node.0 as usize].kind {
                        NodeKind::Text(t) => t.clone(),
                        NodeKind::Element(_) => String::new(),
                    };
                    let char_len = content.chars().count();
                    if offset >= char_len {
                        // caret at the end of the text node: br goes after it
                        let br = make_br(&mut nodes, parent);
                        nodes[parent.0 as usize].children.insert(text_index + 1, br);
                        records.push(MutationRecord::ChildList { target: parent });
                        DomPoint::Element {
                            node: parent,
                            index: text_index + 2,
                        }
                    } else if offset == 0 {
                        let br = make_br(&mut nodes, parent);
                        nodes[parent.0 as usize].children.insert(text_index, br);
                        records.push(MutationRecord::ChildList { target: parent });
                        DomPoint::Text { node, offset: 0 }
                    } else {
                        // split the text node around the caret
                        let byte_idx = content
                            .char_indices()
                            .nth(offset)
                            .map(|(i, _)| i)
                            .unwrap_or(content.len());
                        let tail = content[byte_idx..].to_string();
                        if let NodeKind::Text(t) = &mut nodes[node.0 as usize].kind {
                            t.truncate(byte_idx);
                        }
                        records.push(MutationRecord::CharacterData { target: node });

                        let br = make_br(&mut nodes, parent);
                        nodes[parent.0 as usize].children.insert(text_index + 1, br);

                        let tail_id = NodeId(nodes.len() as u32);
                        nodes.push(super::dom::NodeData {
                            parent: Some(parent),
                            children: Vec::new(),
                            kind: NodeKind::Text(tail),
                        });
                        nodes[parent.0 as usize].children.insert(text_index + 2, tail_id);
                        records.push(MutationRecord::ChildList { target: parent });
                        DomPoint::Text {
                            node: tail_id,
                            offset: 0,
                        }
                    }
                }
            }
        };

        self.set_cursor(Some(DomRange::collapsed(new_cursor)));
        self.commit(records);
        Ok(())
    }

    /// Delete the contents of a range for the supported shapes and
    /// return the collapsed caret left behind. Records are appended, not
    /// committed; the caller batches them with its own mutation.
    fn delete_range_contents(
        &self,
        range: DomRange,
        records: &mut Vec<MutationRecord>,
    ) -> DomPoint {
        if range.is_collapsed() {
            return range.start;
        }
        let mut nodes = self.inner.nodes.borrow_mut();
        match (range.start, range.end) {
            (
                DomPoint::Element { node: a, index: i },
                DomPoint::Element { node: b, index: j },
            ) if a == b => {
                let len = nodes[a.0 as usize].children.len();
                let (i, j) = (i.min(len), j.min(len));
                let (i, j) = if i <= j { (i, j) } else { (j, i) };
                let removed: Vec<NodeId> = nodes[a.0 as usize].children.drain(i..j).collect();
                for child in &removed {
                    nodes[child.0 as usize].parent = None;
                }
                if !removed.is_empty() {
                    records.push(MutationRecord::ChildList { target: a });
                }
                DomPoint::Element { node: a, index: i }
            }
            (
                DomPoint::Text { node: a, offset: i },
                DomPoint::Text { node: b, offset: j },
            ) if a == b => {
                let (i, j) = if i <= j { (i, j) } else { (j, i) };
                if let NodeKind::Text(content) = &mut nodes[a.0 as usize].kind {
                    *content = remove_char_span(content, i, j);
                    records.push(MutationRecord::CharacterData { target: a });
                }
                DomPoint::Text { node: a, offset: i }
            }
            (start, _) => {
                debug!("unsupported range shape for deletion, collapsing to start");
                start
            }
        }
    }

    /// Text nodes under `root` in document order. The caret write-back
    /// walk runs over this.
    pub fn text_nodes_in(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|n| self.is_text(*n))
            .collect()
    }
}
