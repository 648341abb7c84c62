//! One-shot grammar analysis.
//!
//! `analyze` runs the full pipeline over a grammar exactly once:
//! resolution, then the validation battery, then FOLLOW-set computation.
//! Each stage only runs when the previous one produced zero errors; a
//! partially resolved graph is not safe to validate and FOLLOW sets over
//! an invalid grammar would mislead every downstream consumer.
//!
//! The result is a frozen [`GrammarAnalysis`]: the grammar and token
//! vocabulary become immutable and shareable, and only the lookahead
//! decision cache is populated lazily, on first use per call site.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::info;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::diagnostics::{DefaultMessages, Diagnostic, IgnoredIssues, MessageProvider};
use crate::grammar::checks::{NamingPolicy, validate_grammar};
use crate::grammar::follow::{FollowSets, compute_follow_sets};
use crate::grammar::lookahead::{
    AltDecision, OptDecision, build_alternation_decision, build_optional_decision,
    lookahead_paths_for_alternation, lookahead_paths_for_optional,
};
use crate::grammar::model::{Grammar, ProdKind, RuleId};
use crate::grammar::resolve::resolve_grammar;
use crate::tokens::TokenVocabulary;

/// Composite key identifying one choice point: the enclosing rule, the
/// production kind, and its occurrence index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub rule: RuleId,
    pub kind: ProdKind,
    pub occurrence: u8,
}

/// Tunables for grammar analysis.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Maximum number of tokens a decision may inspect.
    pub max_lookahead: usize,
    /// Identifier patterns enforced during validation.
    pub naming: NamingPolicy,
    /// Per-site diagnostic suppressions.
    pub ignored_issues: IgnoredIssues,
    /// When true, definition errors are returned on the analysis handle
    /// instead of failing `analyze`; meant for tooling that wants to
    /// inspect a broken grammar. FOLLOW sets are still skipped.
    pub defer_definition_errors: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_lookahead: 3,
            naming: NamingPolicy::default(),
            ignored_issues: IgnoredIssues::default(),
            defer_definition_errors: false,
        }
    }
}

/// The batched definition errors of a failed analysis.
#[derive(Debug, Error)]
#[error("{}", render_batch(diagnostics))]
pub struct DefinitionErrors {
    pub diagnostics: Vec<Diagnostic>,
}

fn render_batch(diagnostics: &[Diagnostic]) -> String {
    let messages = DefaultMessages;
    diagnostics
        .iter()
        .map(|d| messages.render(d))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A fully analyzed grammar, frozen and shareable across parses.
pub struct GrammarAnalysis {
    grammar: Arc<Grammar>,
    vocab: Arc<TokenVocabulary>,
    follows: FollowSets,
    config: AnalysisConfig,
    /// Diagnostics that did not fail the analysis: warnings, plus all
    /// definition errors when `defer_definition_errors` is set.
    diagnostics: Vec<Diagnostic>,
    alt_decisions: RwLock<FxHashMap<CacheKey, Arc<AltDecision>>>,
    opt_decisions: RwLock<FxHashMap<CacheKey, Arc<OptDecision>>>,
}

impl std::fmt::Debug for GrammarAnalysis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrammarAnalysis")
            .field("rules", &self.grammar.rule_ids().count())
            .field("diagnostics", &self.diagnostics.len())
            .finish_non_exhaustive()
    }
}

/// Resolve, validate and precompute FOLLOW sets for a grammar.
pub fn analyze(
    mut grammar: Grammar,
    vocab: TokenVocabulary,
    config: AnalysisConfig,
) -> Result<GrammarAnalysis, DefinitionErrors> {
    let mut diagnostics = resolve_grammar(&mut grammar);
    let resolved = diagnostics.is_empty();

    if resolved {
        diagnostics.extend(validate_grammar(
            &grammar,
            &vocab,
            config.max_lookahead,
            &config.naming,
            &config.ignored_issues,
        ));
    }

    let has_errors = diagnostics.iter().any(|d| d.severity.is_error());
    if has_errors && !config.defer_definition_errors {
        return Err(DefinitionErrors { diagnostics });
    }

    let follows = if resolved && !has_errors {
        compute_follow_sets(&grammar)
    } else {
        FollowSets::default()
    };

    info!(
        rules = grammar.rule_ids().count(),
        diagnostics = diagnostics.len(),
        "grammar analysis complete"
    );

    Ok(GrammarAnalysis {
        grammar: Arc::new(grammar),
        vocab: Arc::new(vocab),
        follows,
        config,
        diagnostics,
        alt_decisions: RwLock::new(FxHashMap::default()),
        opt_decisions: RwLock::new(FxHashMap::default()),
    })
}

impl GrammarAnalysis {
    pub fn grammar(&self) -> &Arc<Grammar> {
        &self.grammar
    }

    pub fn vocab(&self) -> &Arc<TokenVocabulary> {
        &self.vocab
    }

    pub fn follows(&self) -> &FollowSets {
        &self.follows
    }

    pub fn max_lookahead(&self) -> usize {
        self.config.max_lookahead
    }

    /// Warnings, plus deferred definition errors when configured.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub(crate) fn has_deferred_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity.is_error())
    }

    /// The memoized decision for the alternation at
    /// (rule, occurrence), built on first use.
    pub fn alternation_decision(
        &self,
        rule: RuleId,
        occurrence: u8,
        has_predicates: bool,
    ) -> Arc<AltDecision> {
        let key = CacheKey {
            rule,
            kind: ProdKind::Alternation,
            occurrence,
        };
        if let Some(decision) = self.alt_decisions.read().get(&key) {
            return Arc::clone(decision);
        }
        if self.has_deferred_errors() {
            // The path interpreter is not safe over a broken grammar
            // (unresolved references, left recursion). Dispatch always
            // fails instead of parsing against bogus lookahead.
            return Arc::new(AltDecision::Paths {
                alts: Vec::new(),
                use_categories: false,
                gated: has_predicates,
            });
        }
        let paths = lookahead_paths_for_alternation(
            &self.grammar,
            self.grammar.rule(rule),
            occurrence,
            self.config.max_lookahead,
        );
        let decision = Arc::new(build_alternation_decision(
            paths,
            has_predicates,
            &self.vocab,
        ));
        self.alt_decisions
            .write()
            .entry(key)
            .or_insert(decision)
            .clone()
    }

    /// The memoized enter-or-skip decision for the optional/repeated
    /// construct at (rule, kind, occurrence), built on first use.
    pub fn optional_decision(&self, rule: RuleId, kind: ProdKind, occurrence: u8) -> Arc<OptDecision> {
        let key = CacheKey {
            rule,
            kind,
            occurrence,
        };
        if let Some(decision) = self.opt_decisions.read().get(&key) {
            return Arc::clone(decision);
        }
        if self.has_deferred_errors() {
            return Arc::new(OptDecision::TokenSet {
                set: FxHashSet::default(),
            });
        }
        let paths = lookahead_paths_for_optional(
            &self.grammar,
            self.grammar.rule(rule),
            kind,
            occurrence,
            self.config.max_lookahead,
        );
        let decision = Arc::new(build_optional_decision(paths, &self.vocab));
        self.opt_decisions
            .write()
            .entry(key)
            .or_insert(decision)
            .clone()
    }
}
