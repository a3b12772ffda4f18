//! Selection state over the current match list.
//!
//! Two states: hidden, or visible with a selected index. Every show is
//! a new session: the candidate list is replaced and the index resets
//! to zero, even when already visible. Navigation clamps at the ends
//! rather than wrapping.

use crate::matcher::MatchCandidate;

#[derive(Debug, Default)]
pub struct MatchSession {
    candidates: Vec<MatchCandidate>,
    selected: usize,
    visible: bool,
}

impl MatchSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session over `candidates`. An empty list hides
    /// instead; while visible the index is always in bounds.
    pub fn show(&mut self, candidates: Vec<MatchCandidate>) {
        if candidates.is_empty() {
            self.hide();
            return;
        }
        self.candidates = candidates;
        self.selected = 0;
        self.visible = true;
    }

    /// Hide and destroy the session (candidates are cleared, not kept)
    pub fn hide(&mut self) {
        self.candidates.clear();
        self.selected = 0;
        self.visible = false;
    }

    pub fn next(&mut self) {
        if self.visible && self.selected + 1 < self.candidates.len() {
            self.selected += 1;
        }
    }

    pub fn previous(&mut self) {
        if self.visible && self.selected > 0 {
            self.selected -= 1;
        }
    }

    /// Jump to an index, clamped into bounds
    pub fn select(&mut self, index: usize) {
        if self.visible {
            self.selected = index.min(self.candidates.len() - 1);
        }
    }

    /// Emit the selected candidate and hide
    pub fn confirm(&mut self) -> Option<MatchCandidate> {
        if !self.visible {
            return None;
        }
        let candidate = self.candidates.get(self.selected).cloned();
        self.hide();
        candidate
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn candidates(&self) -> &[MatchCandidate] {
        &self.candidates
    }
}
