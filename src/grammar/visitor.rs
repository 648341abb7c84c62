//! Double-dispatch traversal over the grammar AST.
//!
//! [`Visitor`] has one method per node kind with no-op defaults; the
//! dispatch in [`accept`] matches exhaustively, so a new node kind cannot
//! be added without the compiler flagging every traversal.

use super::model::{
    Alternation, NonTerminal, Optional, Production, Repetition, RepetitionMandatory,
    RepetitionMandatoryWithSeparator, RepetitionWithSeparator, Rule, Sequence, Terminal,
};

/// A visitor over the closed set of production kinds.
#[allow(unused_variables)]
pub trait Visitor {
    fn visit_terminal(&mut self, node: &Terminal) {}
    fn visit_non_terminal(&mut self, node: &NonTerminal) {}
    fn visit_sequence(&mut self, node: &Sequence) {}
    fn visit_optional(&mut self, node: &Optional) {}
    fn visit_repetition(&mut self, node: &Repetition) {}
    fn visit_repetition_mandatory(&mut self, node: &RepetitionMandatory) {}
    fn visit_repetition_with_separator(&mut self, node: &RepetitionWithSeparator) {}
    fn visit_repetition_mandatory_with_separator(
        &mut self,
        node: &RepetitionMandatoryWithSeparator,
    ) {
    }
    fn visit_alternation(&mut self, node: &Alternation) {}
}

/// Dispatch a single node to the matching visitor method.
pub fn accept(prod: &Production, visitor: &mut dyn Visitor) {
    match prod {
        Production::Terminal(p) => visitor.visit_terminal(p),
        Production::NonTerminal(p) => visitor.visit_non_terminal(p),
        Production::Sequence(p) => visitor.visit_sequence(p),
        Production::Optional(p) => visitor.visit_optional(p),
        Production::Repetition(p) => visitor.visit_repetition(p),
        Production::RepetitionMandatory(p) => visitor.visit_repetition_mandatory(p),
        Production::RepetitionWithSeparator(p) => visitor.visit_repetition_with_separator(p),
        Production::RepetitionMandatoryWithSeparator(p) => {
            visitor.visit_repetition_mandatory_with_separator(p)
        }
        Production::Alternation(p) => visitor.visit_alternation(p),
    }
}

/// Visit a node, then every node nested beneath it, depth first.
///
/// Rule references are not followed; traversal stays within one rule body.
pub fn walk_production(prod: &Production, visitor: &mut dyn Visitor) {
    accept(prod, visitor);
    match prod {
        Production::Terminal(_) | Production::NonTerminal(_) => {}
        Production::Sequence(p) => walk_definition(&p.definition, visitor),
        Production::Optional(p) => walk_definition(&p.definition, visitor),
        Production::Repetition(p) => walk_definition(&p.definition, visitor),
        Production::RepetitionMandatory(p) => walk_definition(&p.definition, visitor),
        Production::RepetitionWithSeparator(p) => walk_definition(&p.definition, visitor),
        Production::RepetitionMandatoryWithSeparator(p) => {
            walk_definition(&p.definition, visitor)
        }
        Production::Alternation(p) => {
            for alt in &p.alternatives {
                visitor.visit_sequence(alt);
                walk_definition(&alt.definition, visitor);
            }
        }
    }
}

/// Visit every node in an ordered definition, depth first.
pub fn walk_definition(definition: &[Production], visitor: &mut dyn Visitor) {
    for prod in definition {
        walk_production(prod, visitor);
    }
}

/// Visit every node in a rule body, depth first.
pub fn walk_rule(rule: &Rule, visitor: &mut dyn Visitor) {
    walk_definition(&rule.definition, visitor);
}
