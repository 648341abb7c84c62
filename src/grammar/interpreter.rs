//! Grammar interpretation: bounded enumeration of terminal paths.
//!
//! [`possible_paths_from`] expands a definition into every token sequence
//! of at most `max_length` tokens it can begin with, each tagged with the
//! grammar remaining after that prefix. Non-terminals are expanded by
//! virtual inline substitution; optional and repetition constructs fork
//! the search into took/skipped branches; alternation branches stay
//! separate per invocation so callers can keep per-alternative identity.
//!
//! Termination is guaranteed purely by the length budget. The function is
//! only sound on grammars the validator has already cleared of left
//! recursion.

use super::model::{Grammar, ProdKind, Production, Repetition, Rule, Sequence, Terminal};
use super::rest::RestWalker;
use crate::tokens::TokenTypeId;

/// A token-path prefix and the grammar remaining after it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathAndSuffix {
    pub partial_path: Vec<TokenTypeId>,
    pub suffix_def: Vec<Production>,
}

/// All token paths of length ≤ `max_length` reachable from `target_def`,
/// extending `curr_path`.
///
/// Pure: identical inputs always produce identical path sets.
pub fn possible_paths_from(
    grammar: &Grammar,
    target_def: &[Production],
    max_length: usize,
    curr_path: &[TokenTypeId],
) -> Vec<PathAndSuffix> {
    let mut curr_path = curr_path.to_vec();
    let mut result: Vec<PathAndSuffix> = Vec::new();
    let mut i = 0;

    // The definition that remains if `next_def` is substituted for the
    // production at position `i`.
    let remaining_path_with = |next_def: &[Production], i: usize| -> Vec<Production> {
        let mut remaining = next_def.to_vec();
        remaining.extend_from_slice(&target_def[i + 1..]);
        remaining
    };

    // Mandatory productions halt the loop: the paths computed from their
    // recursive calls already contain the rest of `target_def`. For
    // optional productions the loop continues, representing the paths
    // that skip the construct.
    while curr_path.len() < max_length && i < target_def.len() {
        match &target_def[i] {
            Production::Terminal(t) => {
                curr_path.push(t.terminal);
            }
            Production::NonTerminal(nt) => {
                let Some(target) = nt.target else {
                    // Unresolved reference; analysis never reaches here,
                    // but an unmatchable branch is the safe rendition.
                    return result;
                };
                let expanded =
                    remaining_path_with(&grammar.rule(target).definition, i);
                result.extend(possible_paths_from(grammar, &expanded, max_length, &curr_path));
                return result;
            }
            Production::Sequence(seq) => {
                let expanded = remaining_path_with(&seq.definition, i);
                result.extend(possible_paths_from(grammar, &expanded, max_length, &curr_path));
                return result;
            }
            Production::Optional(opt) => {
                let expanded = remaining_path_with(&opt.definition, i);
                result.extend(possible_paths_from(grammar, &expanded, max_length, &curr_path));
            }
            Production::Repetition(rep) => {
                let mut taken = rep.definition.clone();
                taken.push(Production::Repetition(Repetition::new(rep.definition.clone())));
                let expanded = remaining_path_with(&taken, i);
                result.extend(possible_paths_from(grammar, &expanded, max_length, &curr_path));
            }
            Production::RepetitionMandatory(rep) => {
                let mut taken = rep.definition.clone();
                taken.push(Production::Repetition(Repetition::new(rep.definition.clone())));
                let expanded = remaining_path_with(&taken, i);
                result.extend(possible_paths_from(grammar, &expanded, max_length, &curr_path));
                return result;
            }
            Production::RepetitionWithSeparator(rep) => {
                let mut iteration = vec![Production::Terminal(Terminal::new(rep.separator))];
                iteration.extend_from_slice(&rep.definition);
                let mut taken = rep.definition.clone();
                taken.push(Production::Repetition(Repetition::new(iteration)));
                let expanded = remaining_path_with(&taken, i);
                result.extend(possible_paths_from(grammar, &expanded, max_length, &curr_path));
            }
            Production::RepetitionMandatoryWithSeparator(rep) => {
                let mut iteration = vec![Production::Terminal(Terminal::new(rep.separator))];
                iteration.extend_from_slice(&rep.definition);
                let taken = vec![
                    Production::Sequence(Sequence::new(rep.definition.clone())),
                    Production::Repetition(Repetition::new(iteration)),
                ];
                let expanded = remaining_path_with(&taken, i);
                result.extend(possible_paths_from(grammar, &expanded, max_length, &curr_path));
                return result;
            }
            Production::Alternation(alt) => {
                for alternative in &alt.alternatives {
                    // Directly empty alternatives contribute no paths of
                    // their own; indirectly empty ones are the
                    // empty-alternative validation's concern.
                    if !alternative.definition.is_empty() {
                        let expanded = remaining_path_with(&alternative.definition, i);
                        result.extend(possible_paths_from(
                            grammar, &expanded, max_length, &curr_path,
                        ));
                    }
                }
                return result;
            }
        }
        i += 1;
    }

    result.push(PathAndSuffix {
        partial_path: curr_path,
        suffix_def: target_def[i..].to_vec(),
    });
    result
}

// ============================================================================
// Next terminal after a repetition occurrence
// ============================================================================

/// The terminal immediately following a repetition occurrence, used to
/// resynchronize in-repetition recovery.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NextTerminalAfter {
    pub token: Option<TokenTypeId>,
    pub occurrence: Option<u8>,
    /// True when nothing at all follows the repetition in its rule.
    pub is_end_of_rule: bool,
}

struct NextTerminalWalker {
    target_kind: ProdKind,
    target_occurrence: u8,
    result: Option<NextTerminalAfter>,
}

impl NextTerminalWalker {
    fn record(&mut self, curr_rest: &[Production], prev_rest: &[Production]) {
        let first_after = curr_rest.iter().chain(prev_rest.iter()).next();
        let mut found = NextTerminalAfter {
            is_end_of_rule: first_after.is_none(),
            ..NextTerminalAfter::default()
        };
        if let Some(Production::Terminal(t)) = first_after {
            found.token = Some(t.terminal);
            found.occurrence = Some(t.idx);
        }
        self.result = Some(found);
    }
}

impl RestWalker for NextTerminalWalker {
    fn is_done(&self) -> bool {
        self.result.is_some()
    }

    fn walk_repetition(
        &mut self,
        rep: &Repetition,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        if self.target_kind == ProdKind::Repetition && rep.idx == self.target_occurrence {
            self.record(curr_rest, prev_rest);
        } else {
            // Default traversal but without the synthetic self-loop: the
            // search is for the target occurrence, not for rest content.
            let mut full_rest = curr_rest.to_vec();
            full_rest.extend_from_slice(prev_rest);
            self.walk(&rep.definition, &full_rest);
        }
    }

    fn walk_repetition_mandatory(
        &mut self,
        rep: &super::model::RepetitionMandatory,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        if self.target_kind == ProdKind::RepetitionMandatory && rep.idx == self.target_occurrence {
            self.record(curr_rest, prev_rest);
        } else {
            let mut full_rest = curr_rest.to_vec();
            full_rest.extend_from_slice(prev_rest);
            self.walk(&rep.definition, &full_rest);
        }
    }

    fn walk_repetition_with_separator(
        &mut self,
        rep: &super::model::RepetitionWithSeparator,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        if self.target_kind == ProdKind::RepetitionWithSeparator
            && rep.idx == self.target_occurrence
        {
            self.record(curr_rest, prev_rest);
        } else {
            let mut full_rest = curr_rest.to_vec();
            full_rest.extend_from_slice(prev_rest);
            self.walk(&rep.definition, &full_rest);
        }
    }

    fn walk_repetition_mandatory_with_separator(
        &mut self,
        rep: &super::model::RepetitionMandatoryWithSeparator,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        if self.target_kind == ProdKind::RepetitionMandatoryWithSeparator
            && rep.idx == self.target_occurrence
        {
            self.record(curr_rest, prev_rest);
        } else {
            let mut full_rest = curr_rest.to_vec();
            full_rest.extend_from_slice(prev_rest);
            self.walk(&rep.definition, &full_rest);
        }
    }
}

/// Find the terminal following the given repetition occurrence in `rule`.
pub fn next_terminal_after_repetition(
    rule: &Rule,
    kind: ProdKind,
    occurrence: u8,
) -> NextTerminalAfter {
    let mut walker = NextTerminalWalker {
        target_kind: kind,
        target_occurrence: occurrence,
        result: None,
    };
    walker.walk_rule(rule);
    walker.result.unwrap_or(NextTerminalAfter {
        is_end_of_rule: true,
        ..NextTerminalAfter::default()
    })
}
