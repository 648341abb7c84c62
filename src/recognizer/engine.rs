//! The runtime driver dispatch boundary.
//!
//! A [`Recognizer`] walks a token stream under the direction of
//! hand-written rule functions, one per grammar rule. Each dispatch
//! primitive (`option`, `many`, `at_least_one`, their separated forms,
//! `or`) looks up the memoized decision for its
//! (current rule, production kind, occurrence) key in the shared
//! [`GrammarAnalysis`] and either enters the construct or moves on.
//!
//! Rule functions receive `&mut Recognizer` and return whatever value
//! they build; the driver has no opinion on output shape.

use smol_str::SmolStr;
use tracing::trace;

use crate::analysis::GrammarAnalysis;
use crate::grammar::lookahead::{
    lookahead_paths_for_alternation, lookahead_paths_for_optional,
};
use crate::grammar::model::{ProdKind, RuleId};
use crate::tokens::{Token, TokenTypeId};

use super::errors::RecognitionError;

/// One alternative of an `or` dispatch: an optional gate predicate and
/// the parse action.
pub struct OrAlt<'c, 'a, T> {
    pub gate: Option<&'c dyn Fn(&Recognizer<'a>) -> bool>,
    pub action: &'c mut dyn FnMut(&mut Recognizer<'a>) -> Result<T, RecognitionError>,
}

impl<'c, 'a, T> OrAlt<'c, 'a, T> {
    pub fn new(
        action: &'c mut dyn FnMut(&mut Recognizer<'a>) -> Result<T, RecognitionError>,
    ) -> Self {
        Self { gate: None, action }
    }

    pub fn gated(
        gate: &'c dyn Fn(&Recognizer<'a>) -> bool,
        action: &'c mut dyn FnMut(&mut Recognizer<'a>) -> Result<T, RecognitionError>,
    ) -> Self {
        Self {
            gate: Some(gate),
            action,
        }
    }
}

/// Recursive-descent driver over a token stream.
pub struct Recognizer<'a> {
    analysis: &'a GrammarAnalysis,
    tokens: &'a [Token],
    pos: usize,
    rule_stack: Vec<RuleId>,
    backtracking_depth: usize,
    recovery_enabled: bool,
    /// Mismatches repaired by recovery; surfaced so a caller can report
    /// them even after a successful parse.
    recovered: Vec<RecognitionError>,
}

impl<'a> Recognizer<'a> {
    pub fn new(analysis: &'a GrammarAnalysis, tokens: &'a [Token]) -> Self {
        Self {
            analysis,
            tokens,
            pos: 0,
            rule_stack: Vec::new(),
            backtracking_depth: 0,
            recovery_enabled: false,
            recovered: Vec::new(),
        }
    }

    /// Opt in to single-token resynchronization on mismatches.
    pub fn with_recovery(mut self) -> Self {
        self.recovery_enabled = true;
        self
    }

    // ========================================================================
    // Token access
    // ========================================================================

    /// Peek `n` tokens ahead, 1-based; past the end yields EOF.
    pub fn la(&self, n: usize) -> Token {
        match self.tokens.get(self.pos + n - 1) {
            Some(token) => *token,
            None => Token::synthetic(self.analysis.vocab().eof()),
        }
    }

    fn la_kind(&self, n: usize) -> TokenTypeId {
        self.la(n).kind
    }

    /// Offset of the next unconsumed token.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub(super) fn advance(&mut self) {
        self.pos += 1;
    }

    pub(super) fn analysis(&self) -> &'a GrammarAnalysis {
        self.analysis
    }

    pub(super) fn is_backtracking(&self) -> bool {
        self.backtracking_depth > 0
    }

    pub(super) fn recovery_active(&self) -> bool {
        self.recovery_enabled && !self.is_backtracking()
    }

    pub(super) fn record_recovered(&mut self, error: RecognitionError) {
        self.recovered.push(error);
    }

    /// Errors repaired by recovery during this parse.
    pub fn recovered_errors(&self) -> &[RecognitionError] {
        &self.recovered
    }

    pub(super) fn current_rule(&self) -> RuleId {
        *self
            .rule_stack
            .last()
            .expect("dispatch primitive called outside a rule invocation")
    }

    fn current_rule_name(&self) -> SmolStr {
        self.analysis
            .grammar()
            .rule(self.current_rule())
            .name
            .clone()
    }

    fn token_name(&self, id: TokenTypeId) -> SmolStr {
        SmolStr::new(self.analysis.vocab().name(id))
    }

    // ========================================================================
    // Rule invocation
    // ========================================================================

    /// Invoke `rule` as the parse entry point. After the rule returns,
    /// any unconsumed input is an error.
    pub fn parse<T>(
        &mut self,
        rule: RuleId,
        f: impl FnOnce(&mut Self) -> Result<T, RecognitionError>,
    ) -> Result<T, RecognitionError> {
        let value = self.subrule(0, rule, f)?;
        if self.rule_stack.is_empty() && !self.is_backtracking() {
            let next = self.la(1);
            if next.kind != self.analysis.vocab().eof() {
                return Err(RecognitionError::NotAllInputParsed {
                    actual_name: self.token_name(next.kind),
                    actual: next,
                });
            }
        }
        Ok(value)
    }

    /// Invoke another rule from within a rule body.
    pub fn subrule<T>(
        &mut self,
        occurrence: u8,
        rule: RuleId,
        f: impl FnOnce(&mut Self) -> Result<T, RecognitionError>,
    ) -> Result<T, RecognitionError> {
        trace!(rule = %self.analysis.grammar().rule(rule).name, occurrence, "enter rule");
        self.rule_stack.push(rule);
        let result = f(self);
        self.rule_stack.pop();
        result
    }

    // ========================================================================
    // Dispatch primitives
    // ========================================================================

    /// Consume one token of the expected type, or fail (after an optional
    /// single-token recovery attempt).
    pub fn consume(
        &mut self,
        occurrence: u8,
        expected: TokenTypeId,
    ) -> Result<Token, RecognitionError> {
        let actual = self.la(1);
        if self.analysis.vocab().matches(actual.kind, expected) {
            self.advance();
            return Ok(actual);
        }

        let error = RecognitionError::MismatchedToken {
            rule: self.current_rule_name(),
            occurrence,
            expected: self.token_name(expected),
            actual_name: self.token_name(actual.kind),
            actual,
        };
        if self.recovery_active() {
            if let Some(token) = self.try_token_deletion(expected, &error) {
                return Ok(token);
            }
        }
        Err(error)
    }

    /// Zero-or-one: runs `f` iff the lookahead selects the construct.
    pub fn option<T>(
        &mut self,
        occurrence: u8,
        f: impl FnOnce(&mut Self) -> Result<T, RecognitionError>,
    ) -> Result<Option<T>, RecognitionError> {
        if self.should_enter(ProdKind::Optional, occurrence) {
            f(self).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Zero-or-more.
    pub fn many<T>(
        &mut self,
        occurrence: u8,
        mut f: impl FnMut(&mut Self) -> Result<T, RecognitionError>,
    ) -> Result<Vec<T>, RecognitionError> {
        let mut values = Vec::new();
        while self.should_enter(ProdKind::Repetition, occurrence) {
            match f(self) {
                Ok(value) => values.push(value),
                Err(error) => {
                    if self.try_repetition_exit(ProdKind::Repetition, occurrence, &error) {
                        break;
                    }
                    return Err(error);
                }
            }
        }
        Ok(values)
    }

    /// One-or-more; a first iteration that cannot start is an early exit.
    pub fn at_least_one<T>(
        &mut self,
        occurrence: u8,
        mut f: impl FnMut(&mut Self) -> Result<T, RecognitionError>,
    ) -> Result<Vec<T>, RecognitionError> {
        if !self.should_enter(ProdKind::RepetitionMandatory, occurrence) {
            return Err(self.early_exit(ProdKind::RepetitionMandatory, occurrence));
        }
        let mut values = vec![f(self)?];
        while self.should_enter(ProdKind::RepetitionMandatory, occurrence) {
            match f(self) {
                Ok(value) => values.push(value),
                Err(error) => {
                    if self.try_repetition_exit(ProdKind::RepetitionMandatory, occurrence, &error)
                    {
                        break;
                    }
                    return Err(error);
                }
            }
        }
        Ok(values)
    }

    /// Zero-or-more with a separator token between iterations.
    pub fn many_sep<T>(
        &mut self,
        occurrence: u8,
        separator: TokenTypeId,
        mut f: impl FnMut(&mut Self) -> Result<T, RecognitionError>,
    ) -> Result<Vec<T>, RecognitionError> {
        let mut values = Vec::new();
        if self.should_enter(ProdKind::RepetitionWithSeparator, occurrence) {
            values.push(f(self)?);
            while self.analysis.vocab().matches(self.la_kind(1), separator) {
                self.consume(occurrence, separator)?;
                values.push(f(self)?);
            }
        }
        Ok(values)
    }

    /// One-or-more with a separator token between iterations.
    pub fn at_least_one_sep<T>(
        &mut self,
        occurrence: u8,
        separator: TokenTypeId,
        mut f: impl FnMut(&mut Self) -> Result<T, RecognitionError>,
    ) -> Result<Vec<T>, RecognitionError> {
        if !self.should_enter(ProdKind::RepetitionMandatoryWithSeparator, occurrence) {
            return Err(self.early_exit(ProdKind::RepetitionMandatoryWithSeparator, occurrence));
        }
        let mut values = vec![f(self)?];
        while self.analysis.vocab().matches(self.la_kind(1), separator) {
            self.consume(occurrence, separator)?;
            values.push(f(self)?);
        }
        Ok(values)
    }

    /// First-match alternation: the first alternative whose gate passes
    /// and whose lookahead path matches is taken.
    pub fn or<T>(
        &mut self,
        occurrence: u8,
        alternatives: &mut [OrAlt<'_, 'a, T>],
    ) -> Result<T, RecognitionError> {
        let has_predicates = alternatives.iter().any(|alt| alt.gate.is_some());
        let decision =
            self.analysis
                .alternation_decision(self.current_rule(), occurrence, has_predicates);

        let gates: Option<Vec<bool>> = has_predicates.then(|| {
            alternatives
                .iter()
                .map(|alt| alt.gate.map_or(true, |gate| gate(self)))
                .collect()
        });

        let chosen = {
            let mut la = |n: usize| self.la_kind(n);
            decision.choose(self.analysis.vocab(), &mut la, gates.as_deref())
        };
        match chosen {
            Some(index) => (alternatives[index].action)(self),
            None => Err(self.no_viable_alternative(occurrence)),
        }
    }

    /// Speculatively run `f`; state is always restored and recovery is
    /// suppressed while speculation is active.
    pub fn backtrack<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, RecognitionError>,
    ) -> bool {
        let saved_pos = self.pos;
        let saved_depth = self.rule_stack.len();
        self.backtracking_depth += 1;
        let outcome = f(self);
        self.backtracking_depth -= 1;
        self.pos = saved_pos;
        self.rule_stack.truncate(saved_depth);
        outcome.is_ok()
    }

    // ========================================================================
    // Decision plumbing
    // ========================================================================

    fn should_enter(&self, kind: ProdKind, occurrence: u8) -> bool {
        let decision = self
            .analysis
            .optional_decision(self.current_rule(), kind, occurrence);
        let mut la = |n: usize| self.la_kind(n);
        decision.should_enter(self.analysis.vocab(), &mut la)
    }

    fn early_exit(&self, kind: ProdKind, occurrence: u8) -> RecognitionError {
        let rule_id = self.current_rule();
        if self.analysis.has_deferred_errors() {
            // No path enumeration over a broken grammar.
            let actual = self.la(1);
            return RecognitionError::EarlyExit {
                rule: self.current_rule_name(),
                occurrence,
                expected_paths: Vec::new(),
                actual_name: self.token_name(actual.kind),
                actual,
            };
        }
        let paths = lookahead_paths_for_optional(
            self.analysis.grammar(),
            self.analysis.grammar().rule(rule_id),
            kind,
            occurrence,
            self.analysis.max_lookahead(),
        );
        let enter_paths = paths
            .into_iter()
            .next()
            .unwrap_or_default()
            .into_iter()
            .map(|path| path.into_iter().map(|tt| self.token_name(tt)).collect())
            .collect();
        let actual = self.la(1);
        RecognitionError::EarlyExit {
            rule: self.current_rule_name(),
            occurrence,
            expected_paths: enter_paths,
            actual_name: self.token_name(actual.kind),
            actual,
        }
    }

    fn no_viable_alternative(&self, occurrence: u8) -> RecognitionError {
        let rule_id = self.current_rule();
        if self.analysis.has_deferred_errors() {
            let actual = self.la(1);
            return RecognitionError::NoViableAlternative {
                rule: self.current_rule_name(),
                occurrence,
                expected_paths: Vec::new(),
                actual_name: self.token_name(actual.kind),
                actual,
            };
        }
        let paths = lookahead_paths_for_alternation(
            self.analysis.grammar(),
            self.analysis.grammar().rule(rule_id),
            occurrence,
            self.analysis.max_lookahead(),
        );
        let expected = paths
            .into_iter()
            .map(|alt| {
                alt.into_iter()
                    .map(|path| path.into_iter().map(|tt| self.token_name(tt)).collect())
                    .collect()
            })
            .collect();
        let actual = self.la(1);
        RecognitionError::NoViableAlternative {
            rule: self.current_rule_name(),
            occurrence,
            expected_paths: expected,
            actual_name: self.token_name(actual.kind),
            actual,
        }
    }
}
