//! In-rule error recovery.
//!
//! Opt-in, and never active while backtracking. The only repair
//! attempted is single-token deletion: when the expected token sits
//! right behind the mismatched one, the mismatch is recorded, the
//! offending token dropped, and parsing continues as if nothing
//! happened. Anything more ambitious is the caller's business.

use tracing::debug;

use crate::grammar::interpreter::next_terminal_after_repetition;
use crate::grammar::model::ProdKind;
use crate::tokens::{Token, TokenTypeId};

use super::engine::Recognizer;
use super::errors::RecognitionError;

impl Recognizer<'_> {
    /// Attempt single-token deletion for a mismatch at the current
    /// position. On success the deleted-token error is recorded and the
    /// expected token is consumed.
    pub(super) fn try_token_deletion(
        &mut self,
        expected: TokenTypeId,
        error: &RecognitionError,
    ) -> Option<Token> {
        let behind = self.la(2);
        if !self.analysis().vocab().matches(behind.kind, expected) {
            return None;
        }
        debug!(offset = self.la(1).start, "recovered by single-token deletion");
        self.record_recovered(error.clone());
        self.advance();
        self.advance();
        Some(behind)
    }

    /// After a failed iteration, abandon the repetition when the
    /// upcoming token is exactly the terminal that follows it in the
    /// rule; the failed iteration's error is recorded and the caller
    /// resumes past the loop.
    pub(super) fn try_repetition_exit(
        &mut self,
        kind: ProdKind,
        occurrence: u8,
        error: &RecognitionError,
    ) -> bool {
        if !self.recovery_active() {
            return false;
        }
        let grammar = self.analysis().grammar();
        let next =
            next_terminal_after_repetition(grammar.rule(self.current_rule()), kind, occurrence);
        let Some(expected) = next.token else {
            return false;
        };
        if !self.analysis().vocab().matches(self.la(1).kind, expected) {
            return false;
        }
        debug!(
            offset = self.la(1).start,
            "abandoned repetition after failed iteration"
        );
        self.record_recovered(error.clone());
        true
    }
}
