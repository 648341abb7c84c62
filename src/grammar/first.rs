//! FIRST-set computation and nullability analysis.
//!
//! Both walk rule bodies and follow resolved rule references; unresolved
//! references contribute nothing. Cycle guards make these total even on
//! left-recursive grammars, since the validator that rejects such grammars
//! is itself a caller.

use rustc_hash::FxHashSet;

use super::model::{Grammar, Production, RuleId};
use crate::tokens::TokenTypeId;

/// The set of token types that may begin the given definition.
pub fn first_of_sequence(grammar: &Grammar, definition: &[Production]) -> FxHashSet<TokenTypeId> {
    let mut result = FxHashSet::default();
    let mut visiting = FxHashSet::default();
    first_sequence_inner(grammar, definition, &mut result, &mut visiting);
    result
}

/// The set of token types that may begin the given production.
pub fn first_of(grammar: &Grammar, prod: &Production) -> FxHashSet<TokenTypeId> {
    first_of_sequence(grammar, std::slice::from_ref(prod))
}

fn first_sequence_inner(
    grammar: &Grammar,
    definition: &[Production],
    result: &mut FxHashSet<TokenTypeId>,
    visiting: &mut FxHashSet<RuleId>,
) {
    for prod in definition {
        first_prod_inner(grammar, prod, result, visiting);
        if !is_nullable(grammar, prod) {
            break;
        }
    }
}

fn first_prod_inner(
    grammar: &Grammar,
    prod: &Production,
    result: &mut FxHashSet<TokenTypeId>,
    visiting: &mut FxHashSet<RuleId>,
) {
    match prod {
        Production::Terminal(t) => {
            result.insert(t.terminal);
        }
        Production::NonTerminal(nt) => {
            if let Some(target) = nt.target {
                if visiting.insert(target) {
                    first_sequence_inner(grammar, &grammar.rule(target).definition, result, visiting);
                    visiting.remove(&target);
                }
            }
        }
        Production::Sequence(seq) => first_sequence_inner(grammar, &seq.definition, result, visiting),
        Production::Optional(p) => first_sequence_inner(grammar, &p.definition, result, visiting),
        Production::Repetition(p) => first_sequence_inner(grammar, &p.definition, result, visiting),
        Production::RepetitionMandatory(p) => {
            first_sequence_inner(grammar, &p.definition, result, visiting)
        }
        Production::RepetitionWithSeparator(p) => {
            first_sequence_inner(grammar, &p.definition, result, visiting)
        }
        Production::RepetitionMandatoryWithSeparator(p) => {
            first_sequence_inner(grammar, &p.definition, result, visiting)
        }
        Production::Alternation(alt) => {
            for alternative in &alt.alternatives {
                first_sequence_inner(grammar, &alternative.definition, result, visiting);
            }
        }
    }
}

/// True if the definition may match zero tokens.
pub fn is_definition_nullable(grammar: &Grammar, definition: &[Production]) -> bool {
    let mut visiting = FxHashSet::default();
    definition
        .iter()
        .all(|p| nullable_inner(grammar, p, &mut visiting))
}

/// True if the production may match zero tokens.
pub fn is_nullable(grammar: &Grammar, prod: &Production) -> bool {
    let mut visiting = FxHashSet::default();
    nullable_inner(grammar, prod, &mut visiting)
}

fn nullable_inner(
    grammar: &Grammar,
    prod: &Production,
    visiting: &mut FxHashSet<RuleId>,
) -> bool {
    match prod {
        Production::Terminal(_) => false,
        Production::NonTerminal(nt) => match nt.target {
            Some(target) => {
                if !visiting.insert(target) {
                    // A rule reached again without consuming cannot prove
                    // nullability; left recursion is reported elsewhere.
                    return false;
                }
                let nullable = grammar
                    .rule(target)
                    .definition
                    .iter()
                    .all(|p| nullable_inner(grammar, p, visiting));
                visiting.remove(&target);
                nullable
            }
            None => false,
        },
        Production::Sequence(seq) => seq
            .definition
            .iter()
            .all(|p| nullable_inner(grammar, p, visiting)),
        Production::Optional(_)
        | Production::Repetition(_)
        | Production::RepetitionWithSeparator(_) => true,
        Production::RepetitionMandatory(p) => p
            .definition
            .iter()
            .all(|x| nullable_inner(grammar, x, visiting)),
        Production::RepetitionMandatoryWithSeparator(p) => p
            .definition
            .iter()
            .all(|x| nullable_inner(grammar, x, visiting)),
        Production::Alternation(alt) => alt
            .alternatives
            .iter()
            .any(|a| a.definition.iter().all(|p| nullable_inner(grammar, p, visiting))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::model::{
        Alternation, NonTerminal, Optional, Repetition, Rule, Sequence, Terminal,
    };
    use crate::grammar::resolve::resolve_grammar;

    fn t(n: u32) -> Production {
        Production::Terminal(Terminal::new(TokenTypeId(n)))
    }

    #[test]
    fn test_first_skips_past_nullable_prefix() {
        let grammar = Grammar::new();
        let def = vec![
            Production::Optional(Optional::new(vec![t(0)])),
            Production::Repetition(Repetition::new(vec![t(1)])),
            t(2),
            t(3),
        ];
        let first = first_of_sequence(&grammar, &def);
        assert_eq!(
            first,
            FxHashSet::from_iter([TokenTypeId(0), TokenTypeId(1), TokenTypeId(2)])
        );
    }

    #[test]
    fn test_first_through_rule_reference() {
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "top",
                vec![Production::NonTerminal(NonTerminal::new("leaf"))],
            ))
            .unwrap();
        grammar.add_rule(Rule::new("leaf", vec![t(7)])).unwrap();
        resolve_grammar(&mut grammar);

        let top_def = grammar.rule_by_name("top").unwrap().definition.clone();
        assert_eq!(
            first_of_sequence(&grammar, &top_def),
            FxHashSet::from_iter([TokenTypeId(7)])
        );
    }

    #[test]
    fn test_alternation_first_is_union() {
        let grammar = Grammar::new();
        let def = vec![Production::Alternation(Alternation::new(vec![
            Sequence::new(vec![t(0)]),
            Sequence::new(vec![t(1)]),
        ]))];
        assert_eq!(
            first_of_sequence(&grammar, &def),
            FxHashSet::from_iter([TokenTypeId(0), TokenTypeId(1)])
        );
    }

    #[test]
    fn test_nullability() {
        let grammar = Grammar::new();
        assert!(is_definition_nullable(
            &grammar,
            &[Production::Optional(Optional::new(vec![t(0)]))]
        ));
        assert!(!is_definition_nullable(&grammar, &[t(0)]));
        // A mandatory repetition over a nullable body is itself nullable.
        assert!(is_definition_nullable(
            &grammar,
            &[Production::RepetitionMandatory(
                crate::grammar::model::RepetitionMandatory::new(vec![Production::Optional(
                    Optional::new(vec![t(0)])
                )])
            )]
        ));
    }

    #[test]
    fn test_first_terminates_on_cyclic_references() {
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "a",
                vec![Production::NonTerminal(NonTerminal::new("b")), t(1)],
            ))
            .unwrap();
        grammar
            .add_rule(Rule::new(
                "b",
                vec![Production::NonTerminal(NonTerminal::new("a")), t(2)],
            ))
            .unwrap();
        resolve_grammar(&mut grammar);

        let a_def = grammar.rule_by_name("a").unwrap().definition.clone();
        // Must not hang; the cycle contributes nothing beyond what is
        // reachable before it closes.
        let _ = first_of_sequence(&grammar, &a_def);
    }
}
