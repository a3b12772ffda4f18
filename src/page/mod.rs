//! The page model: the document tree, events, cursor, timers and
//! geometry of the host page the integration layer runs against.
//!
//! The layer never owns this tree; it binds into it, observes its
//! mutations, and injects input back into it. Embedders bridge this
//! model to a real document; tests drive it directly.

pub mod cursor;
pub mod dom;
pub mod events;
pub mod geometry;
pub mod scheduler;
pub mod selector;

pub use cursor::{DomPoint, DomRange};
pub use dom::{
    Display, Document, FieldState, MutationObserverId, MutationRecord, NodeId, ObserverScope,
    Style,
};
pub use events::{EventKind, ListenerId, PageEvent};
pub use geometry::{Point, Rect, TextMetrics};
pub use scheduler::{Scheduler, TimerId, TimerSlot};
pub use selector::Selector;
