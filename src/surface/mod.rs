//! Editable surfaces: classification and the uniform text/caret
//! adapter over the three editable representations.
//!
//! A surface is a node the user can type into. The three kinds address
//! content and caret differently (flat value + native selection index
//! vs. live tree + range); everything above this module works purely in
//! normalized text and [`CaretPosition`] and never needs to know which
//! kind it is talking to.

pub mod adapter;
pub mod inject;
pub mod normalize;

pub use adapter::CaretPosition;
pub use inject::{Injection, InjectionTiming};

use crate::page::{Document, NodeId};

/// The three editable representations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    /// Single-line field with a flat string value (`input`)
    ValueField,
    /// Multi-line field with a flat string value (`textarea`)
    MultilineValueField,
    /// Editable region built from nested elements and line-break
    /// markers (`contenteditable`)
    StructuredRegion,
}

/// A resolved editable surface, stamped with the binding generation it
/// was resolved under. Handles from an older generation are stale and
/// must be re-fetched from the binder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditableSurface {
    pub node: NodeId,
    pub kind: SurfaceKind,
    pub generation: u64,
}

/// Determine which editable kind a node is, if any
pub fn classify(doc: &Document, node: NodeId) -> Option<SurfaceKind> {
    let tag = doc.tag(node)?;
    match tag.as_str() {
        "input" => match doc.attribute(node, "type").as_deref() {
            None | Some("text") | Some("search") => Some(SurfaceKind::ValueField),
            _ => None,
        },
        "textarea" => Some(SurfaceKind::MultilineValueField),
        _ => match doc.attribute(node, "contenteditable").as_deref() {
            Some("true") | Some("") | Some("plaintext-only") => Some(SurfaceKind::StructuredRegion),
            _ => None,
        },
    }
}
