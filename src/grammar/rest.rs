//! "Rest of sequence" traversal.
//!
//! [`RestWalker`] visits every production in a rule body along with the
//! grammar that remains to be matched immediately after it. The rest is
//! tracked as two parts: `curr_rest` (what follows within the current
//! sequence) and `prev_rest` (what follows the enclosing construct); a
//! consumer concatenates them when it needs the full continuation.
//!
//! Repetition constructs contribute a synthetic optional self-loop to the
//! rest of their own body: after matching one iteration of `(DE)+` the
//! remaining grammar is `(DE)? F`, not plain `F`.

use super::model::{
    Alternation, NonTerminal, Optional, Production, Repetition, RepetitionMandatory,
    RepetitionMandatoryWithSeparator, RepetitionWithSeparator, Rule, Sequence, Terminal,
};

pub(crate) fn concat_rest(curr_rest: &[Production], prev_rest: &[Production]) -> Vec<Production> {
    let mut full = Vec::with_capacity(curr_rest.len() + prev_rest.len());
    full.extend_from_slice(curr_rest);
    full.extend_from_slice(prev_rest);
    full
}

/// One optional iteration of a repetition body, used as the self-loop part
/// of the rest after entering the repetition.
pub(crate) fn repetition_self_loop(definition: &[Production]) -> Production {
    Production::Optional(Optional::new(definition.to_vec()))
}

/// As above for separated repetitions: the next iteration starts with the
/// separator.
pub(crate) fn separated_self_loop(
    rep_def: &[Production],
    separator: crate::tokens::TokenTypeId,
) -> Production {
    let mut def = Vec::with_capacity(rep_def.len() + 1);
    def.push(Production::Terminal(Terminal::new(separator)));
    def.extend_from_slice(rep_def);
    Production::Optional(Optional::new(def))
}

/// Walks a rule body tracking the grammar that remains after each node.
#[allow(unused_variables)]
pub trait RestWalker {
    /// Early-exit hook; once true, no further nodes are visited.
    fn is_done(&self) -> bool {
        false
    }

    fn walk_rule(&mut self, rule: &Rule) {
        self.walk(&rule.definition, &[]);
    }

    fn walk(&mut self, definition: &[Production], prev_rest: &[Production]) {
        for (i, prod) in definition.iter().enumerate() {
            if self.is_done() {
                return;
            }
            let curr_rest = &definition[i + 1..];
            match prod {
                Production::Terminal(p) => self.walk_terminal(p, curr_rest, prev_rest),
                Production::NonTerminal(p) => self.walk_prod_ref(p, curr_rest, prev_rest),
                Production::Sequence(p) => self.walk_sequence(p, curr_rest, prev_rest),
                Production::Optional(p) => self.walk_optional(p, curr_rest, prev_rest),
                Production::Repetition(p) => self.walk_repetition(p, curr_rest, prev_rest),
                Production::RepetitionMandatory(p) => {
                    self.walk_repetition_mandatory(p, curr_rest, prev_rest)
                }
                Production::RepetitionWithSeparator(p) => {
                    self.walk_repetition_with_separator(p, curr_rest, prev_rest)
                }
                Production::RepetitionMandatoryWithSeparator(p) => {
                    self.walk_repetition_mandatory_with_separator(p, curr_rest, prev_rest)
                }
                Production::Alternation(p) => self.walk_alternation(p, curr_rest, prev_rest),
            }
        }
    }

    fn walk_terminal(
        &mut self,
        terminal: &Terminal,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
    }

    fn walk_prod_ref(
        &mut self,
        ref_prod: &NonTerminal,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
    }

    // ABC(DEF)G => after D the rest is EF, then G.
    fn walk_sequence(
        &mut self,
        seq: &Sequence,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        let full_rest = concat_rest(curr_rest, prev_rest);
        self.walk(&seq.definition, &full_rest);
    }

    // ABC(DE)?F => after the (DE)? the rest is F.
    fn walk_optional(
        &mut self,
        opt: &Optional,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        let full_rest = concat_rest(curr_rest, prev_rest);
        self.walk(&opt.definition, &full_rest);
    }

    // ABC(DE)*F => inside the (DE)* the rest is (DE)?F.
    fn walk_repetition(
        &mut self,
        rep: &Repetition,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        let mut full_rest = vec![repetition_self_loop(&rep.definition)];
        full_rest.extend_from_slice(curr_rest);
        full_rest.extend_from_slice(prev_rest);
        self.walk(&rep.definition, &full_rest);
    }

    // ABC(DE)+F => inside the (DE)+ the rest is (DE)?F.
    fn walk_repetition_mandatory(
        &mut self,
        rep: &RepetitionMandatory,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        let mut full_rest = vec![repetition_self_loop(&rep.definition)];
        full_rest.extend_from_slice(curr_rest);
        full_rest.extend_from_slice(prev_rest);
        self.walk(&rep.definition, &full_rest);
    }

    // ABC(DE(,DE)*)?F => inside the body the rest is (,DE)?F.
    fn walk_repetition_with_separator(
        &mut self,
        rep: &RepetitionWithSeparator,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        let mut full_rest = vec![separated_self_loop(&rep.definition, rep.separator)];
        full_rest.extend_from_slice(curr_rest);
        full_rest.extend_from_slice(prev_rest);
        self.walk(&rep.definition, &full_rest);
    }

    fn walk_repetition_mandatory_with_separator(
        &mut self,
        rep: &RepetitionMandatoryWithSeparator,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        let mut full_rest = vec![separated_self_loop(&rep.definition, rep.separator)];
        full_rest.extend_from_slice(curr_rest);
        full_rest.extend_from_slice(prev_rest);
        self.walk(&rep.definition, &full_rest);
    }

    // ABC(D|E|F)G => after each alternative the rest is G.
    fn walk_alternation(
        &mut self,
        alt: &Alternation,
        curr_rest: &[Production],
        prev_rest: &[Production],
    ) {
        let full_rest = concat_rest(curr_rest, prev_rest);
        for alternative in &alt.alternatives {
            self.walk(&alternative.definition, &full_rest);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::TokenTypeId;

    /// Records the full rest observed for every terminal occurrence.
    #[derive(Default)]
    struct TerminalRests {
        rests: Vec<(TokenTypeId, Vec<Production>)>,
    }

    impl RestWalker for TerminalRests {
        fn walk_terminal(
            &mut self,
            terminal: &Terminal,
            curr_rest: &[Production],
            prev_rest: &[Production],
        ) {
            self.rests
                .push((terminal.terminal, concat_rest(curr_rest, prev_rest)));
        }
    }

    fn t(n: u32) -> Production {
        Production::Terminal(Terminal::new(TokenTypeId(n)))
    }

    #[test]
    fn test_rest_within_flat_sequence() {
        let rule = Rule::new("r", vec![t(0), t(1), t(2)]);
        let mut walker = TerminalRests::default();
        walker.walk_rule(&rule);

        assert_eq!(walker.rests.len(), 3);
        assert_eq!(walker.rests[0].1, vec![t(1), t(2)]);
        assert_eq!(walker.rests[1].1, vec![t(2)]);
        assert!(walker.rests[2].1.is_empty());
    }

    #[test]
    fn test_rest_after_optional_contents() {
        // A (B)? C: inside the optional, the rest is C.
        let rule = Rule::new(
            "r",
            vec![
                t(0),
                Production::Optional(Optional::new(vec![t(1)])),
                t(2),
            ],
        );
        let mut walker = TerminalRests::default();
        walker.walk_rule(&rule);

        let b_rest = &walker.rests.iter().find(|(tt, _)| *tt == TokenTypeId(1)).unwrap().1;
        assert_eq!(*b_rest, vec![t(2)]);
    }

    #[test]
    fn test_repetition_rest_includes_self_loop() {
        // (B)* C: inside the repetition, the rest is (B)? C.
        let rule = Rule::new(
            "r",
            vec![Production::Repetition(Repetition::new(vec![t(1)])), t(2)],
        );
        let mut walker = TerminalRests::default();
        walker.walk_rule(&rule);

        let b_rest = &walker.rests.iter().find(|(tt, _)| *tt == TokenTypeId(1)).unwrap().1;
        assert_eq!(b_rest.len(), 2);
        assert!(matches!(b_rest[0], Production::Optional(_)));
        assert_eq!(b_rest[1], t(2));
    }
}
