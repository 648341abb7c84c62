//! The static validation battery.
//!
//! Every check runs over the whole resolved grammar and appends its
//! findings to the shared collector; nothing short-circuits, so one pass
//! surfaces the complete error set. Suppression applies per site via
//! [`IgnoredIssues`], except for the two categories that guarantee
//! runtime malfunction (empty repetition bodies and non-last empty
//! alternatives).

use regex::Regex;
use smol_str::SmolStr;
use tracing::debug;

use rustc_hash::{FxHashMap, FxHashSet};

use super::first::is_definition_nullable;
use super::lookahead::{is_strict_prefix_of_path, lookahead_paths_for_alternation};
use super::model::{
    Alternation, Grammar, NonTerminal, Optional, ProdKind, Production, Repetition,
    RepetitionMandatory, RepetitionMandatoryWithSeparator, RepetitionWithSeparator, Rule, RuleId,
    Sequence, Terminal,
};
use super::visitor::{Visitor, walk_rule};
use crate::diagnostics::{
    Diagnostic, DiagnosticCategory, DiagnosticCollector, IgnoredIssues,
};
use crate::tokens::TokenVocabulary;

/// More alternatives than an occurrence index can address.
pub const MAX_ALTERNATIVES: usize = 256;

/// Identifier patterns enforced by the naming check.
#[derive(Clone, Debug)]
pub struct NamingPolicy {
    /// Rule names; lowercase-leading identifiers by default.
    pub rule_pattern: Regex,
    /// Production labels; dollar-prefixed by default.
    pub label_pattern: Regex,
    /// Token-type names; unrestricted unless configured.
    pub token_pattern: Option<Regex>,
}

impl Default for NamingPolicy {
    fn default() -> Self {
        // Static literals; the patterns are compile-time constants.
        Self {
            rule_pattern: Regex::new(r"^[a-z][a-zA-Z0-9_]*$").expect("static pattern"),
            label_pattern: Regex::new(r"^\$[a-zA-Z0-9_]+$").expect("static pattern"),
            token_pattern: None,
        }
    }
}

/// Runs the full battery over a resolved grammar.
pub fn validate_grammar(
    grammar: &Grammar,
    vocab: &TokenVocabulary,
    max_lookahead: usize,
    naming: &NamingPolicy,
    ignored: &IgnoredIssues,
) -> Vec<Diagnostic> {
    let mut collector = DiagnosticCollector::new();

    let mut left_recursive = false;
    for id in grammar.rule_ids() {
        left_recursive |= check_left_recursion(grammar, id, ignored, &mut collector);
    }

    for (_, rule) in grammar.rules() {
        check_duplicate_occurrences(rule, vocab, ignored, &mut collector);
        // Ambiguity analysis expands rule references; it is unbounded on
        // a left-recursive grammar and must wait for that error to be
        // fixed first.
        check_alternations(
            grammar,
            rule,
            max_lookahead,
            !left_recursive,
            ignored,
            &mut collector,
        );
        check_empty_repetitions(grammar, rule, &mut collector);
        check_naming(rule, naming, ignored, &mut collector);
    }
    check_namespace_collisions(grammar, vocab, ignored, &mut collector);
    if let Some(token_pattern) = &naming.token_pattern {
        check_token_naming(vocab, token_pattern, ignored, &mut collector);
    }

    let diagnostics = collector.take();
    debug!(count = diagnostics.len(), "grammar validation finished");
    diagnostics
}

// ============================================================================
// Duplicate occurrence indices
// ============================================================================

/// Groups every indexed production in one rule by
/// (kind, occurrence, leaf target name); more than one member is a
/// collision in the lookahead cache key space.
struct OccurrenceCollector<'v> {
    vocab: &'v TokenVocabulary,
    groups: FxHashMap<(ProdKind, u8, Option<SmolStr>), usize>,
}

impl OccurrenceCollector<'_> {
    fn record(&mut self, kind: ProdKind, idx: u8, target: Option<SmolStr>) {
        *self.groups.entry((kind, idx, target)).or_insert(0) += 1;
    }
}

impl Visitor for OccurrenceCollector<'_> {
    fn visit_terminal(&mut self, node: &Terminal) {
        self.record(
            ProdKind::Terminal,
            node.idx,
            Some(SmolStr::new(self.vocab.name(node.terminal))),
        );
    }

    fn visit_non_terminal(&mut self, node: &NonTerminal) {
        self.record(
            ProdKind::NonTerminal,
            node.idx,
            Some(node.referenced_rule.clone()),
        );
    }

    fn visit_optional(&mut self, node: &Optional) {
        self.record(ProdKind::Optional, node.idx, None);
    }

    fn visit_repetition(&mut self, node: &Repetition) {
        self.record(ProdKind::Repetition, node.idx, None);
    }

    fn visit_repetition_mandatory(&mut self, node: &RepetitionMandatory) {
        self.record(ProdKind::RepetitionMandatory, node.idx, None);
    }

    fn visit_repetition_with_separator(&mut self, node: &RepetitionWithSeparator) {
        self.record(ProdKind::RepetitionWithSeparator, node.idx, None);
    }

    fn visit_repetition_mandatory_with_separator(
        &mut self,
        node: &RepetitionMandatoryWithSeparator,
    ) {
        self.record(ProdKind::RepetitionMandatoryWithSeparator, node.idx, None);
    }

    fn visit_alternation(&mut self, node: &Alternation) {
        self.record(ProdKind::Alternation, node.idx, None);
    }
}

fn check_duplicate_occurrences(
    rule: &Rule,
    vocab: &TokenVocabulary,
    ignored: &IgnoredIssues,
    collector: &mut DiagnosticCollector,
) {
    let mut occurrences = OccurrenceCollector {
        vocab,
        groups: FxHashMap::default(),
    };
    walk_rule(rule, &mut occurrences);

    for ((kind, idx, target), count) in occurrences.groups {
        if count > 1 {
            collector.add_unless_ignored(
                Diagnostic::error(
                    rule.name.clone(),
                    DiagnosticCategory::DuplicateOccurrence { target },
                )
                .at(kind, idx),
                ignored,
            );
        }
    }
}

// ============================================================================
// Left recursion
// ============================================================================

/// Appends every rule reachable at the first input position of
/// `definition` to `out`. Returns true when the definition as a whole can
/// derive nothing, meaning a following production is also in first
/// position.
fn first_position_refs(grammar: &Grammar, definition: &[Production], out: &mut Vec<RuleId>) -> bool {
    for prod in definition {
        if !first_position_refs_of(grammar, prod, out) {
            return false;
        }
    }
    true
}

fn first_position_refs_of(grammar: &Grammar, prod: &Production, out: &mut Vec<RuleId>) -> bool {
    match prod {
        Production::Terminal(_) => false,
        Production::NonTerminal(nt) => match nt.target {
            Some(target) => {
                out.push(target);
                is_definition_nullable(grammar, &grammar.rule(target).definition)
            }
            // Unresolved references never reach validation.
            None => false,
        },
        Production::Sequence(seq) => first_position_refs(grammar, &seq.definition, out),
        Production::Optional(p) => {
            first_position_refs(grammar, &p.definition, out);
            true
        }
        Production::Repetition(p) => {
            first_position_refs(grammar, &p.definition, out);
            true
        }
        Production::RepetitionWithSeparator(p) => {
            first_position_refs(grammar, &p.definition, out);
            true
        }
        Production::RepetitionMandatory(p) => {
            first_position_refs(grammar, &p.definition, out);
            is_definition_nullable(grammar, &p.definition)
        }
        Production::RepetitionMandatoryWithSeparator(p) => {
            first_position_refs(grammar, &p.definition, out);
            is_definition_nullable(grammar, &p.definition)
        }
        Production::Alternation(alt) => {
            let mut nullable = false;
            for alternative in &alt.alternatives {
                nullable |= first_position_refs(grammar, &alternative.definition, out);
            }
            nullable
        }
    }
}

/// Returns true when `start` is left recursive.
fn check_left_recursion(
    grammar: &Grammar,
    start: RuleId,
    ignored: &IgnoredIssues,
    collector: &mut DiagnosticCollector,
) -> bool {
    let mut path = vec![start];
    let mut visited = FxHashSet::default();
    if left_recursion_dfs(grammar, start, start, &mut path, &mut visited) {
        let names = path
            .iter()
            .map(|id| grammar.rule(*id).name.clone())
            .collect();
        collector.add_unless_ignored(
            Diagnostic::error(
                grammar.rule(start).name.clone(),
                DiagnosticCategory::LeftRecursion { path: names },
            ),
            ignored,
        );
        return true;
    }
    false
}

fn left_recursion_dfs(
    grammar: &Grammar,
    start: RuleId,
    current: RuleId,
    path: &mut Vec<RuleId>,
    visited: &mut FxHashSet<RuleId>,
) -> bool {
    let mut refs = Vec::new();
    first_position_refs(grammar, &grammar.rule(current).definition, &mut refs);
    for next in refs {
        if next == start {
            path.push(start);
            return true;
        }
        if visited.insert(next) {
            path.push(next);
            if left_recursion_dfs(grammar, start, next, path, visited) {
                return true;
            }
            path.pop();
        }
    }
    false
}

// ============================================================================
// Alternation checks: arity, dead alternatives, ambiguity
// ============================================================================

struct AlternationCollector {
    found: Vec<Alternation>,
}

impl Visitor for AlternationCollector {
    fn visit_alternation(&mut self, node: &Alternation) {
        self.found.push(node.clone());
    }
}

fn check_alternations(
    grammar: &Grammar,
    rule: &Rule,
    max_lookahead: usize,
    analyze_ambiguity: bool,
    ignored: &IgnoredIssues,
    collector: &mut DiagnosticCollector,
) {
    let mut alternations = AlternationCollector { found: Vec::new() };
    walk_rule(rule, &mut alternations);

    for alternation in &alternations.found {
        let count = alternation.alternatives.len();
        if count > MAX_ALTERNATIVES {
            collector.add_unless_ignored(
                Diagnostic::error(
                    rule.name.clone(),
                    DiagnosticCategory::TooManyAlternatives { count },
                )
                .at(ProdKind::Alternation, alternation.idx),
                ignored,
            );
            // Path computation over this many alternatives is pointless.
            continue;
        }

        check_dead_alternatives(grammar, rule, alternation, collector);
        if analyze_ambiguity {
            check_alternation_ambiguity(
                grammar,
                rule,
                alternation,
                max_lookahead,
                ignored,
                collector,
            );
        }
    }
}

/// An empty (or nullable, hence unconditionally matching) alternative
/// anywhere but last makes all later alternatives unreachable.
fn check_dead_alternatives(
    grammar: &Grammar,
    rule: &Rule,
    alternation: &Alternation,
    collector: &mut DiagnosticCollector,
) {
    let Some((_, all_but_last)) = alternation.alternatives.split_last() else {
        return;
    };
    for (i, alternative) in all_but_last.iter().enumerate() {
        if is_definition_nullable(grammar, &alternative.definition) {
            collector.add(
                Diagnostic::error(
                    rule.name.clone(),
                    DiagnosticCategory::EmptyAlternativeNotLast { alternative: i },
                )
                .at(ProdKind::Alternation, alternation.idx),
            );
        }
    }
}

fn check_alternation_ambiguity(
    grammar: &Grammar,
    rule: &Rule,
    alternation: &Alternation,
    max_lookahead: usize,
    ignored: &IgnoredIssues,
    collector: &mut DiagnosticCollector,
) {
    let paths = lookahead_paths_for_alternation(grammar, rule, alternation.idx, max_lookahead);

    // Identical paths: neither alternative can ever be told apart within
    // the k budget, so the later one is unreachable for that input.
    let mut seen: FxHashMap<&[crate::tokens::TokenTypeId], usize> = FxHashMap::default();
    for (alt_idx, alt_paths) in paths.iter().enumerate() {
        for path in alt_paths {
            match seen.get(&path.as_slice()) {
                Some(&earlier) if earlier != alt_idx => {
                    collector.add_unless_ignored(
                        Diagnostic::error(
                            rule.name.clone(),
                            DiagnosticCategory::AmbiguousAlternatives {
                                alternatives: (earlier, alt_idx),
                                path: path.clone(),
                            },
                        )
                        .at(ProdKind::Alternation, alternation.idx),
                        ignored,
                    );
                }
                Some(_) => {}
                None => {
                    seen.insert(path.as_slice(), alt_idx);
                }
            }
        }
    }

    // Strict-prefix shadowing: first-match semantics send the input to
    // the earlier, shorter alternative.
    for (later_idx, later_paths) in paths.iter().enumerate() {
        for path in later_paths {
            for (earlier_idx, earlier_paths) in paths.iter().enumerate().take(later_idx) {
                for prefix in earlier_paths {
                    if is_strict_prefix_of_path(prefix, path) {
                        collector.add_unless_ignored(
                            Diagnostic::warning(
                                rule.name.clone(),
                                DiagnosticCategory::AmbiguousPrefix {
                                    prefix_alternative: earlier_idx,
                                    shadowed_alternative: later_idx,
                                    path: prefix.clone(),
                                },
                            )
                            .at(ProdKind::Alternation, alternation.idx),
                            ignored,
                        );
                    }
                }
            }
        }
    }
}

// ============================================================================
// Empty repetitions
// ============================================================================

struct RepetitionCollector {
    found: Vec<(ProdKind, u8, Vec<Production>)>,
}

impl Visitor for RepetitionCollector {
    fn visit_repetition(&mut self, node: &Repetition) {
        self.found
            .push((ProdKind::Repetition, node.idx, node.definition.clone()));
    }

    fn visit_repetition_mandatory(&mut self, node: &RepetitionMandatory) {
        self.found.push((
            ProdKind::RepetitionMandatory,
            node.idx,
            node.definition.clone(),
        ));
    }

    fn visit_repetition_with_separator(&mut self, node: &RepetitionWithSeparator) {
        self.found.push((
            ProdKind::RepetitionWithSeparator,
            node.idx,
            node.definition.clone(),
        ));
    }

    fn visit_repetition_mandatory_with_separator(
        &mut self,
        node: &RepetitionMandatoryWithSeparator,
    ) {
        self.found.push((
            ProdKind::RepetitionMandatoryWithSeparator,
            node.idx,
            node.definition.clone(),
        ));
    }
}

fn check_empty_repetitions(
    grammar: &Grammar,
    rule: &Rule,
    collector: &mut DiagnosticCollector,
) {
    let mut repetitions = RepetitionCollector { found: Vec::new() };
    walk_rule(rule, &mut repetitions);

    for (kind, idx, definition) in repetitions.found {
        if is_definition_nullable(grammar, &definition) {
            collector.add(
                Diagnostic::error(rule.name.clone(), DiagnosticCategory::EmptyRepetition)
                    .at(kind, idx),
            );
        }
    }
}

// ============================================================================
// Naming and namespaces
// ============================================================================

struct LabelCollector {
    labels: Vec<(ProdKind, u8, SmolStr)>,
}

impl LabelCollector {
    fn record(&mut self, kind: ProdKind, idx: u8, label: &Option<SmolStr>) {
        if let Some(label) = label {
            self.labels.push((kind, idx, label.clone()));
        }
    }
}

impl Visitor for LabelCollector {
    fn visit_terminal(&mut self, node: &Terminal) {
        self.record(ProdKind::Terminal, node.idx, &node.label);
    }

    fn visit_non_terminal(&mut self, node: &NonTerminal) {
        self.record(ProdKind::NonTerminal, node.idx, &node.label);
    }

    fn visit_sequence(&mut self, node: &Sequence) {
        self.record(ProdKind::Sequence, 0, &node.label);
    }

    fn visit_optional(&mut self, node: &Optional) {
        self.record(ProdKind::Optional, node.idx, &node.label);
    }

    fn visit_repetition(&mut self, node: &Repetition) {
        self.record(ProdKind::Repetition, node.idx, &node.label);
    }

    fn visit_repetition_mandatory(&mut self, node: &RepetitionMandatory) {
        self.record(ProdKind::RepetitionMandatory, node.idx, &node.label);
    }

    fn visit_repetition_with_separator(&mut self, node: &RepetitionWithSeparator) {
        self.record(ProdKind::RepetitionWithSeparator, node.idx, &node.label);
    }

    fn visit_repetition_mandatory_with_separator(
        &mut self,
        node: &RepetitionMandatoryWithSeparator,
    ) {
        self.record(
            ProdKind::RepetitionMandatoryWithSeparator,
            node.idx,
            &node.label,
        );
    }

    fn visit_alternation(&mut self, node: &Alternation) {
        self.record(ProdKind::Alternation, node.idx, &node.label);
    }
}

fn check_naming(
    rule: &Rule,
    naming: &NamingPolicy,
    ignored: &IgnoredIssues,
    collector: &mut DiagnosticCollector,
) {
    if !naming.rule_pattern.is_match(&rule.name) {
        collector.add_unless_ignored(
            Diagnostic::error(
                rule.name.clone(),
                DiagnosticCategory::NamingViolation {
                    name: rule.name.clone(),
                    pattern: SmolStr::new(naming.rule_pattern.as_str()),
                },
            )
            .at(ProdKind::Rule, 0),
            ignored,
        );
    }

    let mut labels = LabelCollector { labels: Vec::new() };
    walk_rule(rule, &mut labels);
    for (kind, idx, label) in labels.labels {
        if !naming.label_pattern.is_match(&label) {
            collector.add_unless_ignored(
                Diagnostic::error(
                    rule.name.clone(),
                    DiagnosticCategory::NamingViolation {
                        name: label,
                        pattern: SmolStr::new(naming.label_pattern.as_str()),
                    },
                )
                .at(kind, idx),
                ignored,
            );
        }
    }
}

fn check_token_naming(
    vocab: &TokenVocabulary,
    pattern: &Regex,
    ignored: &IgnoredIssues,
    collector: &mut DiagnosticCollector,
) {
    for (_, name) in vocab.iter() {
        if !pattern.is_match(name) {
            // Token diagnostics have no owning rule; the suppression key
            // uses the empty rule name.
            collector.add_unless_ignored(
                Diagnostic::error(
                    SmolStr::default(),
                    DiagnosticCategory::NamingViolation {
                        name: SmolStr::new(name),
                        pattern: SmolStr::new(pattern.as_str()),
                    },
                )
                .at(ProdKind::Rule, 0),
                ignored,
            );
        }
    }
}

fn check_namespace_collisions(
    grammar: &Grammar,
    vocab: &TokenVocabulary,
    ignored: &IgnoredIssues,
    collector: &mut DiagnosticCollector,
) {
    for (_, rule) in grammar.rules() {
        if vocab.id_of(&rule.name).is_some() {
            collector.add_unless_ignored(
                Diagnostic::error(
                    rule.name.clone(),
                    DiagnosticCategory::NamespaceCollision {
                        name: rule.name.clone(),
                    },
                )
                .at(ProdKind::Rule, 0),
                ignored,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticCode;
    use crate::grammar::resolve::resolve_grammar;
    use crate::tokens::TokenTypeId;

    fn t(n: u32) -> Production {
        Production::Terminal(Terminal::new(TokenTypeId(n)))
    }

    fn vocab(n: usize) -> TokenVocabulary {
        let mut builder = TokenVocabulary::builder();
        for i in 0..n {
            builder.token(format!("T{i}"));
        }
        builder.build().unwrap()
    }

    fn validate(grammar: &Grammar, vocab: &TokenVocabulary) -> Vec<Diagnostic> {
        validate_grammar(
            grammar,
            vocab,
            3,
            &NamingPolicy::default(),
            &IgnoredIssues::new(),
        )
    }

    fn codes(diagnostics: &[Diagnostic]) -> Vec<DiagnosticCode> {
        diagnostics.iter().map(|d| d.code()).collect()
    }

    #[test]
    fn test_clean_grammar_passes() {
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "r",
                vec![
                    t(0),
                    Production::Repetition(Repetition::new(vec![t(1)])),
                ],
            ))
            .unwrap();
        assert!(validate(&grammar, &vocab(2)).is_empty());
    }

    #[test]
    fn test_direct_left_recursion_reports_cycle_path() {
        // c := c A
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "c",
                vec![Production::NonTerminal(NonTerminal::new("c")), t(0)],
            ))
            .unwrap();
        assert!(resolve_grammar(&mut grammar).is_empty());

        let diagnostics = validate(&grammar, &vocab(1));
        assert_eq!(codes(&diagnostics), vec![DiagnosticCode::LeftRecursion]);
        match &diagnostics[0].category {
            DiagnosticCategory::LeftRecursion { path } => {
                assert_eq!(path.as_slice(), ["c", "c"]);
            }
            other => panic!("unexpected category {other:?}"),
        }
    }

    #[test]
    fn test_indirect_left_recursion_through_nullable_prefix() {
        // a := (X)? b      b := a
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "a",
                vec![
                    Production::Optional(Optional::new(vec![t(0)])),
                    Production::NonTerminal(NonTerminal::new("b")),
                ],
            ))
            .unwrap();
        grammar
            .add_rule(Rule::new(
                "b",
                vec![Production::NonTerminal(NonTerminal::new("a"))],
            ))
            .unwrap();
        assert!(resolve_grammar(&mut grammar).is_empty());

        let diagnostics = validate(&grammar, &vocab(1));
        assert!(
            diagnostics
                .iter()
                .filter(|d| d.code() == DiagnosticCode::LeftRecursion)
                .count()
                >= 2
        );
    }

    #[test]
    fn test_duplicate_occurrence_same_terminal() {
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new("r", vec![t(0), t(0)]))
            .unwrap();
        let diagnostics = validate(&grammar, &vocab(1));
        assert_eq!(codes(&diagnostics), vec![DiagnosticCode::DuplicateOccurrence]);
    }

    #[test]
    fn test_distinct_occurrence_indices_pass() {
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "r",
                vec![t(0), Production::Terminal(Terminal::new(TokenTypeId(0)).with_idx(1))],
            ))
            .unwrap();
        assert!(validate(&grammar, &vocab(1)).is_empty());
    }

    #[test]
    fn test_empty_repetition_is_fatal_and_unsuppressible() {
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "r",
                vec![Production::Repetition(Repetition::new(vec![
                    Production::Optional(Optional::new(vec![t(0)])),
                ]))],
            ))
            .unwrap();

        let ignored = IgnoredIssues::new().ignore("r", ProdKind::Repetition, 0);
        let diagnostics = validate_grammar(
            &grammar,
            &vocab(1),
            3,
            &NamingPolicy::default(),
            &ignored,
        );
        assert!(codes(&diagnostics).contains(&DiagnosticCode::EmptyRepetition));
    }

    #[test]
    fn test_ambiguous_identical_paths() {
        // r := A B | A B, identical within any k.
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "r",
                vec![Production::Alternation(Alternation::new(vec![
                    Sequence::new(vec![t(0), t(1)]),
                    Sequence::new(vec![t(0), t(1)]),
                ]))],
            ))
            .unwrap();
        let diagnostics = validate(&grammar, &vocab(2));
        assert!(codes(&diagnostics).contains(&DiagnosticCode::AmbiguousAlternatives));
    }

    #[test]
    fn test_prefix_ambiguity_is_a_warning() {
        // r := A | A B; the first alternative shadows the second.
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "r",
                vec![Production::Alternation(Alternation::new(vec![
                    Sequence::new(vec![t(0)]),
                    Sequence::new(vec![t(0), t(1)]),
                ]))],
            ))
            .unwrap();
        let diagnostics = validate(&grammar, &vocab(2));
        let prefix: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.code() == DiagnosticCode::AmbiguousPrefix)
            .collect();
        assert_eq!(prefix.len(), 1);
        assert_eq!(prefix[0].severity, crate::diagnostics::Severity::Warning);
    }

    #[test]
    fn test_ambiguity_suppressible_by_site() {
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "r",
                vec![Production::Alternation(Alternation::new(vec![
                    Sequence::new(vec![t(0)]),
                    Sequence::new(vec![Production::Terminal(
                        Terminal::new(TokenTypeId(0)).with_idx(1),
                    )]),
                ]))],
            ))
            .unwrap();
        let ignored = IgnoredIssues::new().ignore("r", ProdKind::Alternation, 0);
        let diagnostics = validate_grammar(
            &grammar,
            &vocab(1),
            3,
            &NamingPolicy::default(),
            &ignored,
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_too_many_alternatives_cites_count() {
        let alternatives: Vec<Sequence> =
            (0..257).map(|_| Sequence::new(vec![t(0)])).collect();
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "r",
                vec![Production::Alternation(Alternation::new(alternatives))],
            ))
            .unwrap();
        let diagnostics = validate(&grammar, &vocab(1));
        assert!(diagnostics.iter().any(|d| matches!(
            d.category,
            DiagnosticCategory::TooManyAlternatives { count: 257 }
        )));
    }

    #[test]
    fn test_empty_alternative_not_last_is_fatal() {
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "r",
                vec![Production::Alternation(Alternation::new(vec![
                    Sequence::new(vec![]),
                    Sequence::new(vec![t(0)]),
                ]))],
            ))
            .unwrap();
        let diagnostics = validate(&grammar, &vocab(1));
        assert!(codes(&diagnostics).contains(&DiagnosticCode::EmptyAlternativeNotLast));
    }

    #[test]
    fn test_empty_last_alternative_is_allowed() {
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "r",
                vec![
                    Production::Alternation(Alternation::new(vec![
                        Sequence::new(vec![t(0)]),
                        Sequence::new(vec![]),
                    ])),
                    t(1),
                ],
            ))
            .unwrap();
        let diagnostics = validate(&grammar, &vocab(2));
        assert!(!codes(&diagnostics).contains(&DiagnosticCode::EmptyAlternativeNotLast));
    }

    #[test]
    fn test_rule_name_pattern() {
        let mut grammar = Grammar::new();
        grammar.add_rule(Rule::new("BadName", vec![t(0)])).unwrap();
        let diagnostics = validate(&grammar, &vocab(1));
        assert!(codes(&diagnostics).contains(&DiagnosticCode::NamingViolation));
    }

    #[test]
    fn test_label_pattern() {
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "r",
                vec![Production::Terminal(
                    Terminal::new(TokenTypeId(0)).with_label("noDollar"),
                )],
            ))
            .unwrap();
        let diagnostics = validate(&grammar, &vocab(1));
        assert!(codes(&diagnostics).contains(&DiagnosticCode::NamingViolation));
    }

    #[test]
    fn test_namespace_collision() {
        let mut builder = TokenVocabulary::builder();
        builder.token("expr");
        let vocab = builder.build().unwrap();

        let mut grammar = Grammar::new();
        grammar.add_rule(Rule::new("expr", vec![t(0)])).unwrap();
        let diagnostics = validate(&grammar, &vocab);
        assert!(codes(&diagnostics).contains(&DiagnosticCode::NamespaceCollision));
    }

    #[test]
    fn test_label_naming_violation_suppressible_at_site() {
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "r",
                vec![Production::Terminal(
                    Terminal::new(TokenTypeId(0)).with_label("noDollar"),
                )],
            ))
            .unwrap();
        let ignored = IgnoredIssues::new().ignore_code(
            "r",
            ProdKind::Terminal,
            0,
            DiagnosticCode::NamingViolation,
        );
        let diagnostics =
            validate_grammar(&grammar, &vocab(1), 3, &NamingPolicy::default(), &ignored);
        assert!(!codes(&diagnostics).contains(&DiagnosticCode::NamingViolation));
    }

    #[test]
    fn test_rule_naming_violation_suppressible() {
        let mut grammar = Grammar::new();
        grammar.add_rule(Rule::new("BadName", vec![t(0)])).unwrap();
        let ignored = IgnoredIssues::new().ignore_code(
            "BadName",
            ProdKind::Rule,
            0,
            DiagnosticCode::NamingViolation,
        );
        let diagnostics =
            validate_grammar(&grammar, &vocab(1), 3, &NamingPolicy::default(), &ignored);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_namespace_collision_suppressible() {
        let mut builder = TokenVocabulary::builder();
        builder.token("expr");
        let vocab = builder.build().unwrap();

        let mut grammar = Grammar::new();
        grammar.add_rule(Rule::new("expr", vec![t(0)])).unwrap();
        let ignored = IgnoredIssues::new().ignore_code(
            "expr",
            ProdKind::Rule,
            0,
            DiagnosticCode::NamespaceCollision,
        );
        let diagnostics = validate_grammar(&grammar, &vocab, 3, &NamingPolicy::default(), &ignored);
        assert!(diagnostics.is_empty());
    }
}
