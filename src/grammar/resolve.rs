//! Cross-rule reference resolution.
//!
//! Rewrites every [`NonTerminal`](super::model::NonTerminal) into a direct
//! [`RuleId`] link to its target rule. Resolution happens exactly once,
//! before any concurrent use of the grammar, so mutating the tree in place
//! is safe.
//!
//! Unresolved references are collected as diagnostics rather than failing
//! fast; the caller must not run validation or lookahead computation on a
//! partially resolved grammar.

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::trace;

use super::model::{Grammar, Production, ProdKind, RuleId};
use crate::diagnostics::{Diagnostic, DiagnosticCategory};

/// Resolve every rule reference in the grammar.
///
/// Returns the accumulated `RuleNotFound` diagnostics; an empty result
/// means every `NonTerminal` now carries a target.
pub fn resolve_grammar(grammar: &mut Grammar) -> Vec<Diagnostic> {
    let by_name: FxHashMap<SmolStr, RuleId> = grammar
        .rules()
        .map(|(id, rule)| (rule.name.clone(), id))
        .collect();

    let mut diagnostics = Vec::new();
    for rule in grammar.rules_mut() {
        let rule_name = rule.name.clone();
        resolve_definition(&mut rule.definition, &rule_name, &by_name, &mut diagnostics);
    }
    trace!(
        unresolved = diagnostics.len(),
        "grammar reference resolution finished"
    );
    diagnostics
}

fn resolve_definition(
    definition: &mut [Production],
    rule_name: &SmolStr,
    by_name: &FxHashMap<SmolStr, RuleId>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    for prod in definition {
        match prod {
            Production::NonTerminal(nt) => match by_name.get(&nt.referenced_rule) {
                Some(target) => nt.target = Some(*target),
                None => {
                    diagnostics.push(
                        Diagnostic::error(
                            rule_name.clone(),
                            DiagnosticCategory::RuleNotFound {
                                missing: nt.referenced_rule.clone(),
                            },
                        )
                        .at(ProdKind::NonTerminal, nt.idx),
                    );
                }
            },
            Production::Terminal(_) => {}
            Production::Sequence(seq) => {
                resolve_definition(&mut seq.definition, rule_name, by_name, diagnostics)
            }
            Production::Optional(p) => {
                resolve_definition(&mut p.definition, rule_name, by_name, diagnostics)
            }
            Production::Repetition(p) => {
                resolve_definition(&mut p.definition, rule_name, by_name, diagnostics)
            }
            Production::RepetitionMandatory(p) => {
                resolve_definition(&mut p.definition, rule_name, by_name, diagnostics)
            }
            Production::RepetitionWithSeparator(p) => {
                resolve_definition(&mut p.definition, rule_name, by_name, diagnostics)
            }
            Production::RepetitionMandatoryWithSeparator(p) => {
                resolve_definition(&mut p.definition, rule_name, by_name, diagnostics)
            }
            Production::Alternation(alt) => {
                for alternative in &mut alt.alternatives {
                    resolve_definition(&mut alternative.definition, rule_name, by_name, diagnostics)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::DiagnosticCode;
    use crate::grammar::model::{NonTerminal, Optional, Rule, Terminal};
    use crate::tokens::TokenTypeId;

    #[test]
    fn test_resolution_links_every_reference() {
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "top",
                vec![
                    Production::NonTerminal(NonTerminal::new("leaf")),
                    Production::Optional(Optional::new(vec![Production::NonTerminal(
                        NonTerminal::new("leaf").with_idx(1),
                    )])),
                ],
            ))
            .unwrap();
        let leaf = grammar
            .add_rule(Rule::new(
                "leaf",
                vec![Production::Terminal(Terminal::new(TokenTypeId(0)))],
            ))
            .unwrap();

        let diagnostics = resolve_grammar(&mut grammar);
        assert!(diagnostics.is_empty());

        let top = grammar.rule_by_name("top").unwrap();
        let Production::NonTerminal(first) = &top.definition[0] else {
            panic!("expected non-terminal");
        };
        assert_eq!(first.target, Some(leaf));
    }

    #[test]
    fn test_all_missing_references_surface_together() {
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "top",
                vec![
                    Production::NonTerminal(NonTerminal::new("ghost")),
                    Production::NonTerminal(NonTerminal::new("phantom").with_idx(1)),
                ],
            ))
            .unwrap();

        let diagnostics = resolve_grammar(&mut grammar);
        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics
            .iter()
            .all(|d| d.code() == DiagnosticCode::RuleNotFound && d.rule == "top"));
    }
}
