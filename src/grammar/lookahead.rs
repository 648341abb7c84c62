//! The lookahead engine.
//!
//! For every choice point (an alternation, or entering vs skipping an
//! optional/repeated construct) this module enumerates disambiguating
//! token paths bounded by the configured maximum lookahead `k` and
//! compiles a [decision](AltDecision) consulted by the runtime driver.
//!
//! Path computation uses iterative deepening: paths start at length one
//! and only alternatives whose prefix is still shared with a sibling are
//! extended, so a grammar that disambiguates on the first token never
//! pays for deep expansion.

use tracing::trace;

use rustc_hash::{FxHashMap, FxHashSet};

use super::interpreter::possible_paths_from;
use super::model::{
    Alternation, Grammar, Optional, ProdKind, Production, Repetition, RepetitionMandatory,
    RepetitionMandatoryWithSeparator, RepetitionWithSeparator, Rule, Sequence,
};
use super::rest::RestWalker;
use super::visitor::{Visitor, walk_rule};
use crate::tokens::{TokenTypeId, TokenVocabulary};

/// Token paths per alternative: `paths[alt][path][token]`.
pub type AlternativePaths = Vec<Vec<Vec<TokenTypeId>>>;

// ============================================================================
// Locating the choice point inside its rule
// ============================================================================

/// Finds the inner definition of the production at (kind, occurrence).
struct InsideDefinitionFinder {
    target_kind: ProdKind,
    target_occurrence: u8,
    result: Vec<Production>,
}

impl InsideDefinitionFinder {
    fn check(&mut self, kind: ProdKind, idx: u8, definition: &[Production]) {
        if self.target_kind == kind && self.target_occurrence == idx {
            self.result = definition.to_vec();
        }
    }
}

impl Visitor for InsideDefinitionFinder {
    fn visit_optional(&mut self, node: &Optional) {
        self.check(ProdKind::Optional, node.idx, &node.definition);
    }

    fn visit_repetition(&mut self, node: &Repetition) {
        self.check(ProdKind::Repetition, node.idx, &node.definition);
    }

    fn visit_repetition_mandatory(&mut self, node: &RepetitionMandatory) {
        self.check(ProdKind::RepetitionMandatory, node.idx, &node.definition);
    }

    fn visit_repetition_with_separator(&mut self, node: &RepetitionWithSeparator) {
        self.check(ProdKind::RepetitionWithSeparator, node.idx, &node.definition);
    }

    fn visit_repetition_mandatory_with_separator(
        &mut self,
        node: &RepetitionMandatoryWithSeparator,
    ) {
        self.check(
            ProdKind::RepetitionMandatoryWithSeparator,
            node.idx,
            &node.definition,
        );
    }

    fn visit_alternation(&mut self, node: &Alternation) {
        if self.target_kind == ProdKind::Alternation && self.target_occurrence == node.idx {
            self.result = node
                .alternatives
                .iter()
                .cloned()
                .map(Production::Sequence)
                .collect();
        }
    }
}

/// The inner definition of the production at (kind, occurrence) in `rule`.
/// For an alternation, one `Sequence` production per alternative.
pub fn inside_definition(rule: &Rule, kind: ProdKind, occurrence: u8) -> Vec<Production> {
    let mut finder = InsideDefinitionFinder {
        target_kind: kind,
        target_occurrence: occurrence,
        result: Vec::new(),
    };
    walk_rule(rule, &mut finder);
    finder.result
}

/// Finds what remains to be matched after the production at
/// (kind, occurrence) within its rule.
struct AfterDefinitionFinder {
    target_kind: ProdKind,
    target_occurrence: u8,
    result: Option<Vec<Production>>,
}

impl AfterDefinitionFinder {
    fn check(
        &mut self,
        kind: ProdKind,
        idx: u8,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) -> bool {
        if self.target_kind == kind && self.target_occurrence == idx {
            let mut rest = curr_rest.to_vec();
            rest.extend_from_slice(prev_rest);
            self.result = Some(rest);
            return true;
        }
        false
    }
}

impl RestWalker for AfterDefinitionFinder {
    fn is_done(&self) -> bool {
        self.result.is_some()
    }

    fn walk_optional(
        &mut self,
        opt: &Optional,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        if !self.check(ProdKind::Optional, opt.idx, curr_rest, prev_rest) {
            let mut full_rest = curr_rest.to_vec();
            full_rest.extend_from_slice(prev_rest);
            self.walk(&opt.definition, &full_rest);
        }
    }

    fn walk_repetition(
        &mut self,
        rep: &Repetition,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        if !self.check(ProdKind::Repetition, rep.idx, curr_rest, prev_rest) {
            let mut full_rest = vec![Production::Optional(Optional::new(rep.definition.clone()))];
            full_rest.extend_from_slice(curr_rest);
            full_rest.extend_from_slice(prev_rest);
            self.walk(&rep.definition, &full_rest);
        }
    }

    fn walk_repetition_mandatory(
        &mut self,
        rep: &RepetitionMandatory,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        if !self.check(ProdKind::RepetitionMandatory, rep.idx, curr_rest, prev_rest) {
            let mut full_rest = vec![Production::Optional(Optional::new(rep.definition.clone()))];
            full_rest.extend_from_slice(curr_rest);
            full_rest.extend_from_slice(prev_rest);
            self.walk(&rep.definition, &full_rest);
        }
    }

    fn walk_repetition_with_separator(
        &mut self,
        rep: &RepetitionWithSeparator,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        if !self.check(
            ProdKind::RepetitionWithSeparator,
            rep.idx,
            curr_rest,
            prev_rest,
        ) {
            let mut full_rest = curr_rest.to_vec();
            full_rest.extend_from_slice(prev_rest);
            self.walk(&rep.definition, &full_rest);
        }
    }

    fn walk_repetition_mandatory_with_separator(
        &mut self,
        rep: &RepetitionMandatoryWithSeparator,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        if !self.check(
            ProdKind::RepetitionMandatoryWithSeparator,
            rep.idx,
            curr_rest,
            prev_rest,
        ) {
            let mut full_rest = curr_rest.to_vec();
            full_rest.extend_from_slice(prev_rest);
            self.walk(&rep.definition, &full_rest);
        }
    }
}

/// The grammar remaining after the production at (kind, occurrence).
pub fn after_definition(rule: &Rule, kind: ProdKind, occurrence: u8) -> Vec<Production> {
    let mut finder = AfterDefinitionFinder {
        target_kind: kind,
        target_occurrence: occurrence,
        result: None,
    };
    finder.walk_rule(rule);
    finder.result.unwrap_or_default()
}

// ============================================================================
// Path computation
// ============================================================================

fn contains_path(paths: &[Vec<TokenTypeId>], path: &[TokenTypeId]) -> bool {
    paths.iter().any(|other| other == path)
}

/// True if `prefix` is a strict prefix of `other`.
pub fn is_strict_prefix_of_path(prefix: &[TokenTypeId], other: &[TokenTypeId]) -> bool {
    prefix.len() < other.len() && prefix.iter().zip(other).all(|(a, b)| a == b)
}

/// A path is unique when no sibling path begins with it.
fn is_unique_prefix(other_paths: &[&Vec<TokenTypeId>], path: &[TokenTypeId]) -> bool {
    !other_paths.iter().any(|other| {
        path.len() <= other.len() && path.iter().zip(other.iter()).all(|(a, b)| a == b)
    })
}

/// Iterative-deepening lookahead-path computation for a set of competing
/// alternatives.
///
/// Per alternative, each resulting path is either a unique prefix among
/// the sibling alternatives' paths of the same round, or was frozen
/// because its expansion was exhausted or the `k` budget was reached.
pub fn lookahead_sequence_from_alternatives(
    grammar: &Grammar,
    alt_defs: &[Vec<Production>],
    k: usize,
) -> AlternativePaths {
    let mut current: Vec<_> = alt_defs
        .iter()
        .map(|def| possible_paths_from(grammar, def, 1, &[]))
        .collect();
    let mut finished: AlternativePaths = vec![Vec::new(); alt_defs.len()];

    for path_length in 1..=k {
        let dataset = std::mem::replace(&mut current, vec![Vec::new(); alt_defs.len()]);
        for (alt_idx, alt_paths) in dataset.iter().enumerate() {
            let other_paths: Vec<&Vec<TokenTypeId>> = dataset
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != alt_idx)
                .flat_map(|(_, ps)| ps.iter().map(|p| &p.partial_path))
                .collect();

            for path_and_suffix in alt_paths {
                let prefix = &path_and_suffix.partial_path;
                let unique = is_unique_prefix(&other_paths, prefix);

                // Freeze the path even when not unique if there is nothing
                // left to extend it with, or the k budget is exhausted;
                // validation reports the residual ambiguity.
                if unique || path_and_suffix.suffix_def.is_empty() || prefix.len() == k {
                    if !contains_path(&finished[alt_idx], prefix) {
                        finished[alt_idx].push(prefix.clone());
                    }
                } else {
                    current[alt_idx].extend(possible_paths_from(
                        grammar,
                        &path_and_suffix.suffix_def,
                        path_length + 1,
                        prefix,
                    ));
                }
            }
        }
    }
    finished
}

/// Lookahead paths for the alternation at `occurrence` inside `rule`.
pub fn lookahead_paths_for_alternation(
    grammar: &Grammar,
    rule: &Rule,
    occurrence: u8,
    k: usize,
) -> AlternativePaths {
    let alternatives = inside_definition(rule, ProdKind::Alternation, occurrence);
    let alt_defs: Vec<Vec<Production>> = alternatives
        .into_iter()
        .map(|alt| vec![alt])
        .collect();
    lookahead_sequence_from_alternatives(grammar, &alt_defs, k)
}

/// Lookahead paths for an optional/repeated construct: two pseudo
/// alternatives, "enter the construct" vs "skip past it".
pub fn lookahead_paths_for_optional(
    grammar: &Grammar,
    rule: &Rule,
    kind: ProdKind,
    occurrence: u8,
    k: usize,
) -> AlternativePaths {
    let inside = inside_definition(rule, kind, occurrence);
    let after = after_definition(rule, kind, occurrence);
    let alt_defs = vec![
        vec![Production::Sequence(Sequence::new(inside))],
        vec![Production::Sequence(Sequence::new(after))],
    ];
    lookahead_sequence_from_alternatives(grammar, &alt_defs, k)
}

/// True when no token type in any path is used as a category, allowing
/// the faster identity-only matcher.
pub fn token_categories_not_used(paths: &AlternativePaths, vocab: &TokenVocabulary) -> bool {
    paths.iter().flatten().flatten().all(|tt| !vocab.has_category_members(*tt))
}

// ============================================================================
// Compiled decisions
// ============================================================================

/// A compiled alternation decision: which alternative do the next k
/// tokens select, if any.
#[derive(Debug)]
pub enum AltDecision {
    /// Every path of every alternative is exactly one token with no
    /// overlap: O(1) dispatch off a single token peek.
    SingleTokenTable { table: FxHashMap<TokenTypeId, usize> },
    /// Ordered path matching; first alternative with a fully matching
    /// path wins. `gated` selects the variant that consults per-call
    /// gate results before an alternative's paths.
    Paths {
        alts: AlternativePaths,
        use_categories: bool,
        gated: bool,
    },
}

impl AltDecision {
    /// Number of alternatives this decision selects among.
    pub fn alternative_count(&self) -> usize {
        match self {
            AltDecision::SingleTokenTable { table } => {
                table.values().copied().max().map_or(0, |m| m + 1)
            }
            AltDecision::Paths { alts, .. } => alts.len(),
        }
    }

    /// Choose an alternative by peeking tokens through `la` (1-based).
    ///
    /// `gates[i] == false` removes alternative `i` from consideration;
    /// `gates` is only consulted by decisions compiled with predicates.
    pub fn choose(
        &self,
        vocab: &TokenVocabulary,
        la: &mut dyn FnMut(usize) -> TokenTypeId,
        gates: Option<&[bool]>,
    ) -> Option<usize> {
        match self {
            AltDecision::SingleTokenTable { table } => table.get(&la(1)).copied(),
            AltDecision::Paths {
                alts,
                use_categories,
                gated,
            } => {
                for (alt_idx, alt_paths) in alts.iter().enumerate() {
                    if *gated {
                        if let Some(gates) = gates {
                            if !gates.get(alt_idx).copied().unwrap_or(true) {
                                continue;
                            }
                        }
                    }
                    'next_path: for path in alt_paths {
                        for (i, expected) in path.iter().enumerate() {
                            let actual = la(i + 1);
                            let matched = if *use_categories {
                                vocab.matches(actual, *expected)
                            } else {
                                actual == *expected
                            };
                            if !matched {
                                continue 'next_path;
                            }
                        }
                        // A full path matched; an empty path matches
                        // unconditionally.
                        return Some(alt_idx);
                    }
                }
                None
            }
        }
    }
}

/// Compile the decision for an alternation choice point.
///
/// Strategy preference: single-token table, then gated path matching,
/// then plain path matching.
pub fn build_alternation_decision(
    paths: AlternativePaths,
    has_predicates: bool,
    vocab: &TokenVocabulary,
) -> AltDecision {
    let use_categories = !token_categories_not_used(&paths, vocab);
    let all_one_token = paths
        .iter()
        .flatten()
        .all(|path| path.len() == 1);

    if !has_predicates && all_one_token && !use_categories {
        // No path token has category members here, so identity entries
        // are the whole table.
        let mut table = FxHashMap::default();
        for (alt_idx, alt_paths) in paths.iter().enumerate() {
            for path in alt_paths {
                table.entry(path[0]).or_insert(alt_idx);
            }
        }
        trace!(alternatives = paths.len(), "compiled single-token alternation decision");
        return AltDecision::SingleTokenTable { table };
    }

    AltDecision::Paths {
        alts: paths,
        use_categories,
        gated: has_predicates,
    }
}

/// A compiled enter-or-skip decision for an optional/repeated construct.
#[derive(Debug)]
pub enum OptDecision {
    /// Exactly one single-token entry path without categories.
    SingleToken { expected: TokenTypeId },
    /// All entry paths are one token long.
    TokenSet { set: FxHashSet<TokenTypeId> },
    /// General ordered path matching over the entry paths.
    Paths {
        paths: Vec<Vec<TokenTypeId>>,
        use_categories: bool,
    },
}

impl OptDecision {
    /// True iff the construct should be entered for the upcoming tokens.
    pub fn should_enter(
        &self,
        vocab: &TokenVocabulary,
        la: &mut dyn FnMut(usize) -> TokenTypeId,
    ) -> bool {
        match self {
            OptDecision::SingleToken { expected } => la(1) == *expected,
            OptDecision::TokenSet { set } => set.contains(&la(1)),
            OptDecision::Paths {
                paths,
                use_categories,
            } => {
                'next_path: for path in paths {
                    for (i, expected) in path.iter().enumerate() {
                        let actual = la(i + 1);
                        let matched = if *use_categories {
                            vocab.matches(actual, *expected)
                        } else {
                            actual == *expected
                        };
                        if !matched {
                            continue 'next_path;
                        }
                    }
                    return true;
                }
                false
            }
        }
    }
}

/// Compile the decision for an optional/repeated construct from its
/// two-pseudo-alternative path computation; only the "enter" paths
/// (alternative 0) participate.
pub fn build_optional_decision(paths: AlternativePaths, vocab: &TokenVocabulary) -> OptDecision {
    let use_categories = !token_categories_not_used(&paths, vocab);
    let enter_paths = paths.into_iter().next().unwrap_or_default();
    let all_one_token = enter_paths.iter().all(|p| p.len() == 1);

    if all_one_token {
        if enter_paths.len() == 1 && !vocab.has_category_members(enter_paths[0][0]) {
            return OptDecision::SingleToken {
                expected: enter_paths[0][0],
            };
        }
        if !enter_paths.is_empty() {
            let mut set = FxHashSet::default();
            for path in &enter_paths {
                set.insert(path[0]);
                set.extend(vocab.category_members(path[0]));
            }
            return OptDecision::TokenSet { set };
        }
    }

    OptDecision::Paths {
        paths: enter_paths,
        use_categories,
    }
}
