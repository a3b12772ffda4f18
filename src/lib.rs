//! graft - adaptive text-input integration layer
//!
//! Grafts a reusable prompt library onto editable surfaces of pages it
//! does not control: resolves and re-resolves the editable surface in a
//! mutating document, models content and caret uniformly across the
//! three editable representations, and drives a debounced
//! match-and-select autocomplete loop with keystroke-faithful text
//! injection.

pub mod binder;
pub mod catalog;
pub mod controller;
pub mod detector;
pub mod error;
pub mod keys;
pub mod library;
pub mod logging;
pub mod matcher;
pub mod observer;
pub mod page;
pub mod popup;
pub mod session;
pub mod surface;

// Re-export commonly used types
pub use binder::{BindingChange, SurfaceBinder};
pub use catalog::{PopupOffsets, SiteCatalog, SubmitKeyRule};
pub use controller::{AutocompleteController, BindingContext, KeyOutcome, SuggestionView};
pub use detector::{ChangeDetector, ContentSnapshot};
pub use error::Error;
pub use keys::{Key, Keystroke, Modifiers};
pub use library::{PromptEntry, PromptSource, StaticLibrary};
pub use matcher::{find_matches, MatchCandidate, MatchConfig};
pub use popup::AnchorPoint;
pub use session::MatchSession;
pub use surface::{classify, CaretPosition, EditableSurface, SurfaceKind};
