//! Error taxonomy for the integration layer.
//!
//! Nothing here is fatal to the host page: binding failure means the
//! page is unsupported, a bad selector skips to the next candidate, and a
//! missing insertion primitive falls back to the legacy replace path.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// No selector resolved a usable surface within the retry budget.
    /// Callers surface this as "unsupported on this page", not a crash.
    #[error("no editable surface resolved after {attempts} attempts")]
    BindingTimeout { attempts: u32 },

    /// A selector string could not be parsed. Caught per candidate; the
    /// remaining candidates are still tried.
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },

    /// The page offers no cursor-relative text insertion primitive.
    /// Write-back degrades to the legacy replace-and-reinsert strategy.
    #[error("text insertion primitive unavailable")]
    InsertionUnavailable,

    /// A site catalog failed validation at construction.
    #[error("invalid catalog: {0}")]
    Catalog(String),
}
