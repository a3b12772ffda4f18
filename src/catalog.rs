//! Per-site selector catalogs.
//!
//! A catalog is pure data: ordered selector candidates for the input
//! surface and the trigger control, plus timing and matching knobs. The
//! core has no knowledge of which site it runs on; everything
//! site-specific arrives through this one validated structure.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::keys::{Key, Keystroke};
use crate::matcher::MatchConfig;
use crate::surface::InjectionTiming;

fn default_debounce_ms() -> u64 {
    150
}

fn default_bind_attempts() -> u32 {
    10
}

fn default_bind_retry_ms() -> u64 {
    500
}

fn default_keystroke_yield_ms() -> u64 {
    25
}

fn default_min_token_len() -> usize {
    3
}

fn default_max_results() -> usize {
    5
}

/// What counts as a "submit" keystroke on this site
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitKeyRule {
    /// Plain Enter sends the message
    #[default]
    Enter,
    /// Ctrl+Enter (or Cmd+Enter) sends; plain Enter inserts a newline
    ModEnter,
    /// Shift+Enter sends
    ShiftEnter,
}

impl SubmitKeyRule {
    pub fn is_submit(&self, keystroke: &Keystroke) -> bool {
        if keystroke.key != Key::Enter {
            return false;
        }
        let mods = keystroke.modifiers;
        match self {
            SubmitKeyRule::Enter => mods.is_empty(),
            SubmitKeyRule::ModEnter => mods.ctrl() || mods.meta(),
            SubmitKeyRule::ShiftEnter => mods.shift(),
        }
    }
}

/// Offset applied to the computed popup anchor, in pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PopupOffsets {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
}

/// Everything the integration layer needs to know about one host site
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteCatalog {
    /// Identifier for logging only
    pub site: String,
    /// Selector candidates for the input surface, in priority order
    pub input_selectors: Vec<String>,
    /// Selector candidates for the trigger/send control, in priority
    /// order (optional: autocomplete works without one)
    #[serde(default)]
    pub trigger_selectors: Vec<String>,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default)]
    pub submit_key: SubmitKeyRule,
    #[serde(default)]
    pub popup_offset: PopupOffsets,
    #[serde(default = "default_bind_attempts")]
    pub bind_attempts: u32,
    #[serde(default = "default_bind_retry_ms")]
    pub bind_retry_ms: u64,
    #[serde(default = "default_keystroke_yield_ms")]
    pub keystroke_yield_ms: u64,
    #[serde(default = "default_min_token_len")]
    pub min_token_len: usize,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl SiteCatalog {
    /// A catalog with default knobs for the given selectors
    pub fn new(site: impl Into<String>, input_selectors: Vec<String>) -> Self {
        Self {
            site: site.into(),
            input_selectors,
            trigger_selectors: Vec::new(),
            debounce_ms: default_debounce_ms(),
            submit_key: SubmitKeyRule::default(),
            popup_offset: PopupOffsets::default(),
            bind_attempts: default_bind_attempts(),
            bind_retry_ms: default_bind_retry_ms(),
            keystroke_yield_ms: default_keystroke_yield_ms(),
            min_token_len: default_min_token_len(),
            max_results: default_max_results(),
        }
    }

    /// Parse and validate a YAML catalog
    pub fn from_yaml(input: &str) -> Result<Self, Error> {
        let catalog: SiteCatalog =
            serde_yaml::from_str(input).map_err(|e| Error::Catalog(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Parse and validate a JSON catalog
    pub fn from_json(input: &str) -> Result<Self, Error> {
        let catalog: SiteCatalog =
            serde_json::from_str(input).map_err(|e| Error::Catalog(e.to_string()))?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Validate once at construction; the rest of the layer trusts the
    /// values afterwards.
    pub fn validate(&self) -> Result<(), Error> {
        if self.input_selectors.is_empty() {
            return Err(Error::Catalog("input_selectors must not be empty".into()));
        }
        if self
            .input_selectors
            .iter()
            .chain(self.trigger_selectors.iter())
            .any(|s| s.trim().is_empty())
        {
            return Err(Error::Catalog("selectors must not be blank".into()));
        }
        if self.debounce_ms == 0 || self.debounce_ms > 5_000 {
            return Err(Error::Catalog(format!(
                "debounce_ms {} out of range 1..=5000",
                self.debounce_ms
            )));
        }
        if self.bind_attempts == 0 {
            return Err(Error::Catalog("bind_attempts must be at least 1".into()));
        }
        if self.min_token_len == 0 {
            return Err(Error::Catalog("min_token_len must be at least 1".into()));
        }
        if self.max_results == 0 {
            return Err(Error::Catalog("max_results must be at least 1".into()));
        }
        Ok(())
    }

    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            min_token_len: self.min_token_len,
            max_results: self.max_results,
        }
    }

    pub fn injection_timing(&self) -> InjectionTiming {
        InjectionTiming {
            keystroke_yield_ms: self.keystroke_yield_ms,
        }
    }
}
