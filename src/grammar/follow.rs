//! FOLLOW-set computation.
//!
//! For every optional/repeated construct the FOLLOW set holds the token
//! types that may legally appear immediately after the construct, both
//! within its own rule and, through call-site analysis, in every rule
//! that invokes it. The sets feed lookahead disambiguation and the
//! recognizer's resynchronization recovery.
//!
//! Runs once per grammar, after validation reports zero errors.

use tracing::debug;

use rustc_hash::{FxHashMap, FxHashSet};

use super::first::{first_of_sequence, is_definition_nullable};
use super::model::{
    Grammar, NonTerminal, Optional, ProdKind, Production, Repetition, RepetitionMandatory,
    RepetitionMandatoryWithSeparator, RepetitionWithSeparator, RuleId,
};
use super::rest::{RestWalker, concat_rest, repetition_self_loop, separated_self_loop};
use crate::tokens::TokenTypeId;

/// Identifies an optional/repeated construct occurrence within a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FollowKey {
    pub rule: RuleId,
    pub kind: ProdKind,
    pub occurrence: u8,
}

/// The computed FOLLOW sets of a grammar.
#[derive(Debug, Default)]
pub struct FollowSets {
    after_construct: FxHashMap<FollowKey, FxHashSet<TokenTypeId>>,
    rule_follow: FxHashMap<RuleId, FxHashSet<TokenTypeId>>,
    resync: FxHashMap<(RuleId, u8), FxHashSet<TokenTypeId>>,
}

impl FollowSets {
    /// Tokens that may appear immediately after the construct at
    /// (kind, occurrence) in `rule`.
    pub fn after(
        &self,
        rule: RuleId,
        kind: ProdKind,
        occurrence: u8,
    ) -> Option<&FxHashSet<TokenTypeId>> {
        self.after_construct.get(&FollowKey {
            rule,
            kind,
            occurrence,
        })
    }

    /// Tokens that may appear after any invocation of `rule`.
    pub fn of_rule(&self, rule: RuleId) -> Option<&FxHashSet<TokenTypeId>> {
        self.rule_follow.get(&rule)
    }

    /// Resynchronization set for the rule invocation at `occurrence`
    /// inside `rule`: the tokens starting whatever follows that call
    /// site.
    pub fn resync_at(&self, rule: RuleId, occurrence: u8) -> Option<&FxHashSet<TokenTypeId>> {
        self.resync.get(&(rule, occurrence))
    }
}

/// One optional/repeated construct and the grammar remaining after it.
struct ConstructSite {
    kind: ProdKind,
    occurrence: u8,
    rest: Vec<Production>,
}

/// One rule invocation and the grammar remaining after it.
struct CallSite {
    occurrence: u8,
    target: Option<RuleId>,
    rest: Vec<Production>,
}

/// Collects every construct and call site of one rule along with its
/// full rest, including the self-loop continuation inside repetitions.
#[derive(Default)]
struct SiteCollector {
    constructs: Vec<ConstructSite>,
    call_sites: Vec<CallSite>,
}

impl RestWalker for SiteCollector {
    fn walk_prod_ref(
        &mut self,
        nt: &NonTerminal,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        self.call_sites.push(CallSite {
            occurrence: nt.idx,
            target: nt.target,
            rest: concat_rest(curr_rest, prev_rest),
        });
    }

    fn walk_optional(
        &mut self,
        opt: &Optional,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        let full_rest = concat_rest(curr_rest, prev_rest);
        self.constructs.push(ConstructSite {
            kind: ProdKind::Optional,
            occurrence: opt.idx,
            rest: full_rest.clone(),
        });
        self.walk(&opt.definition, &full_rest);
    }

    fn walk_repetition(
        &mut self,
        rep: &Repetition,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        let after = concat_rest(curr_rest, prev_rest);
        self.constructs.push(ConstructSite {
            kind: ProdKind::Repetition,
            occurrence: rep.idx,
            rest: after.clone(),
        });
        let mut inner_rest = vec![repetition_self_loop(&rep.definition)];
        inner_rest.extend(after);
        self.walk(&rep.definition, &inner_rest);
    }

    fn walk_repetition_mandatory(
        &mut self,
        rep: &RepetitionMandatory,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        let after = concat_rest(curr_rest, prev_rest);
        self.constructs.push(ConstructSite {
            kind: ProdKind::RepetitionMandatory,
            occurrence: rep.idx,
            rest: after.clone(),
        });
        let mut inner_rest = vec![repetition_self_loop(&rep.definition)];
        inner_rest.extend(after);
        self.walk(&rep.definition, &inner_rest);
    }

    fn walk_repetition_with_separator(
        &mut self,
        rep: &RepetitionWithSeparator,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        let after = concat_rest(curr_rest, prev_rest);
        self.constructs.push(ConstructSite {
            kind: ProdKind::RepetitionWithSeparator,
            occurrence: rep.idx,
            rest: after.clone(),
        });
        let mut inner_rest = vec![separated_self_loop(&rep.definition, rep.separator)];
        inner_rest.extend(after);
        self.walk(&rep.definition, &inner_rest);
    }

    fn walk_repetition_mandatory_with_separator(
        &mut self,
        rep: &RepetitionMandatoryWithSeparator,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        let after = concat_rest(curr_rest, prev_rest);
        self.constructs.push(ConstructSite {
            kind: ProdKind::RepetitionMandatoryWithSeparator,
            occurrence: rep.idx,
            rest: after.clone(),
        });
        let mut inner_rest = vec![separated_self_loop(&rep.definition, rep.separator)];
        inner_rest.extend(after);
        self.walk(&rep.definition, &inner_rest);
    }
}

/// Computes FOLLOW sets for a resolved, validated grammar.
///
/// Rule-level FOLLOW is a fixed point over call sites: everything that
/// can start after an invocation of R follows R, and when a call site's
/// rest can derive nothing, whatever follows the invoking rule follows
/// R as well. Construct-level FOLLOW is FIRST of the rest after the
/// construct, widened by the enclosing rule's FOLLOW when that rest is
/// nullable.
pub fn compute_follow_sets(grammar: &Grammar) -> FollowSets {
    let mut sites: FxHashMap<RuleId, SiteCollector> = FxHashMap::default();
    for (id, rule) in grammar.rules() {
        let mut collector = SiteCollector::default();
        collector.walk_rule(rule);
        sites.insert(id, collector);
    }

    let mut rule_follow: FxHashMap<RuleId, FxHashSet<TokenTypeId>> = grammar
        .rule_ids()
        .map(|id| (id, FxHashSet::default()))
        .collect();

    // Fixed point; terminates because sets only grow and token types
    // are finite.
    loop {
        let mut changed = false;
        for (&caller, collector) in &sites {
            for call in &collector.call_sites {
                let Some(target) = call.target else { continue };
                let mut addition = first_of_sequence(grammar, &call.rest);
                if is_definition_nullable(grammar, &call.rest) {
                    addition.extend(rule_follow[&caller].iter().copied());
                }
                let entry = rule_follow
                    .entry(target)
                    .or_default();
                let before = entry.len();
                entry.extend(addition);
                changed |= entry.len() != before;
            }
        }
        if !changed {
            break;
        }
    }

    let mut result = FollowSets {
        rule_follow,
        ..FollowSets::default()
    };

    for (&rule, collector) in &sites {
        for construct in &collector.constructs {
            let mut follow = first_of_sequence(grammar, &construct.rest);
            if is_definition_nullable(grammar, &construct.rest) {
                if let Some(rf) = result.rule_follow.get(&rule) {
                    follow.extend(rf.iter().copied());
                }
            }
            result.after_construct.insert(
                FollowKey {
                    rule,
                    kind: construct.kind,
                    occurrence: construct.occurrence,
                },
                follow,
            );
        }
        for call in &collector.call_sites {
            result
                .resync
                .entry((rule, call.occurrence))
                .or_default()
                .extend(first_of_sequence(grammar, &call.rest));
        }
    }

    debug!(
        constructs = result.after_construct.len(),
        call_sites = result.resync.len(),
        "computed follow sets"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::model::{Rule, Sequence, Terminal};
    use crate::grammar::resolve::resolve_grammar;
    use crate::tokens::TokenTypeId;

    fn t(n: u32) -> Production {
        Production::Terminal(Terminal::new(TokenTypeId(n)))
    }

    fn tt(n: u32) -> TokenTypeId {
        TokenTypeId(n)
    }

    #[test]
    fn test_follow_within_a_single_rule() {
        // r := (A)? B
        let mut grammar = Grammar::new();
        let id = grammar
            .add_rule(Rule::new(
                "r",
                vec![Production::Optional(Optional::new(vec![t(0)])), t(1)],
            ))
            .unwrap();
        let follows = compute_follow_sets(&grammar);
        let after = follows.after(id, ProdKind::Optional, 0).unwrap();
        assert_eq!(after, &FxHashSet::from_iter([tt(1)]));
    }

    #[test]
    fn test_follow_crosses_rule_boundaries() {
        // outer := inner C        inner := (A)?
        // Nothing follows the optional inside `inner` locally, so its
        // FOLLOW comes from the call site.
        let mut grammar = Grammar::new();
        grammar
            .add_rule(Rule::new(
                "outer",
                vec![
                    Production::NonTerminal(crate::grammar::model::NonTerminal::new("inner")),
                    t(2),
                ],
            ))
            .unwrap();
        let inner = grammar
            .add_rule(Rule::new(
                "inner",
                vec![Production::Optional(Optional::new(vec![t(0)]))],
            ))
            .unwrap();
        assert!(resolve_grammar(&mut grammar).is_empty());

        let follows = compute_follow_sets(&grammar);
        assert_eq!(
            follows.of_rule(inner).unwrap(),
            &FxHashSet::from_iter([tt(2)])
        );
        assert_eq!(
            follows.after(inner, ProdKind::Optional, 0).unwrap(),
            &FxHashSet::from_iter([tt(2)])
        );
    }

    #[test]
    fn test_repetition_follow_excludes_loop_restart() {
        // r := (A)* B ; the loop itself restarts with A but FOLLOW of
        // the whole construct is what comes after exiting it.
        let mut grammar = Grammar::new();
        let id = grammar
            .add_rule(Rule::new(
                "r",
                vec![Production::Repetition(Repetition::new(vec![t(0)])), t(1)],
            ))
            .unwrap();
        let follows = compute_follow_sets(&grammar);
        let after = follows.after(id, ProdKind::Repetition, 0).unwrap();
        assert_eq!(after, &FxHashSet::from_iter([tt(1)]));
    }

    #[test]
    fn test_nested_optional_follow_inside_separated_repetition() {
        // r := ((X)? sep-list-of X) rendered as:
        // r := ( (A)? B ) sep-by C, target the inner optional.
        let mut grammar = Grammar::new();
        let id = grammar
            .add_rule(Rule::new(
                "r",
                vec![Production::RepetitionWithSeparator(
                    RepetitionWithSeparator::new(
                        vec![Production::Optional(Optional::new(vec![t(0)])), t(1)],
                        tt(2),
                    ),
                )],
            ))
            .unwrap();
        let follows = compute_follow_sets(&grammar);
        let after = follows.after(id, ProdKind::Optional, 0).unwrap();
        // B always follows; the separator does not because B is
        // mandatory before the next iteration.
        assert_eq!(after, &FxHashSet::from_iter([tt(1)]));
    }

    #[test]
    fn test_resync_set_at_call_site() {
        let mut grammar = Grammar::new();
        let outer = grammar
            .add_rule(Rule::new(
                "outer",
                vec![
                    Production::NonTerminal(crate::grammar::model::NonTerminal::new("inner")),
                    t(3),
                ],
            ))
            .unwrap();
        grammar
            .add_rule(Rule::new("inner", vec![t(0)]))
            .unwrap();
        assert!(resolve_grammar(&mut grammar).is_empty());

        let follows = compute_follow_sets(&grammar);
        assert_eq!(
            follows.resync_at(outer, 0).unwrap(),
            &FxHashSet::from_iter([tt(3)])
        );
    }
}
