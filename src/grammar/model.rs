//! The grammar AST.
//!
//! A grammar is a set of named [`Rule`]s whose bodies are ordered sequences
//! of [`Production`]s. Productions form a closed sum type; every consumer
//! matches exhaustively so adding a node kind forces every visitor to
//! handle it.
//!
//! Productions carry an *occurrence index* (`idx`) disambiguating multiple
//! uses of the same production kind within one rule body. The triple
//! (enclosing rule, production kind, occurrence) is the composite key used
//! for lookahead caching and diagnostics.

use indexmap::IndexMap;
use smol_str::SmolStr;
use thiserror::Error;

use crate::tokens::TokenTypeId;

/// Identity of a rule within one [`Grammar`].
///
/// Index into the insertion-ordered rule table; stable once assigned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub(crate) u32);

impl RuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Discriminant of a production kind.
///
/// Used in diagnostics and as part of lookahead cache keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "interchange", derive(serde::Serialize, serde::Deserialize))]
pub enum ProdKind {
    Terminal,
    NonTerminal,
    Sequence,
    Optional,
    Repetition,
    RepetitionMandatory,
    RepetitionWithSeparator,
    RepetitionMandatoryWithSeparator,
    Alternation,
    Rule,
}

impl ProdKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProdKind::Terminal => "Terminal",
            ProdKind::NonTerminal => "NonTerminal",
            ProdKind::Sequence => "Sequence",
            ProdKind::Optional => "Optional",
            ProdKind::Repetition => "Repetition",
            ProdKind::RepetitionMandatory => "RepetitionMandatory",
            ProdKind::RepetitionWithSeparator => "RepetitionWithSeparator",
            ProdKind::RepetitionMandatoryWithSeparator => "RepetitionMandatoryWithSeparator",
            ProdKind::Alternation => "Alternation",
            ProdKind::Rule => "Rule",
        }
    }
}

// ============================================================================
// Node types
// ============================================================================

/// A reference to a terminal token type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Terminal {
    pub terminal: TokenTypeId,
    pub idx: u8,
    pub label: Option<SmolStr>,
}

impl Terminal {
    pub fn new(terminal: TokenTypeId) -> Self {
        Self {
            terminal,
            idx: 0,
            label: None,
        }
    }

    pub fn with_idx(mut self, idx: u8) -> Self {
        self.idx = idx;
        self
    }

    pub fn with_label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A reference to another rule by name.
///
/// `target` is filled in by resolution; every later stage assumes it is
/// present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NonTerminal {
    pub referenced_rule: SmolStr,
    pub idx: u8,
    pub label: Option<SmolStr>,
    pub target: Option<RuleId>,
}

impl NonTerminal {
    pub fn new(referenced_rule: impl Into<SmolStr>) -> Self {
        Self {
            referenced_rule: referenced_rule.into(),
            idx: 0,
            label: None,
            target: None,
        }
    }

    pub fn with_idx(mut self, idx: u8) -> Self {
        self.idx = idx;
        self
    }

    pub fn with_label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// An ordered sequence with no parsing semantics of its own.
///
/// Used for alternation branches and for synthetic "rest of rule" slices
/// built during analysis.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sequence {
    pub definition: Vec<Production>,
    pub label: Option<SmolStr>,
}

impl Sequence {
    pub fn new(definition: Vec<Production>) -> Self {
        Self {
            definition,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Zero-or-one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Optional {
    pub definition: Vec<Production>,
    pub idx: u8,
    pub label: Option<SmolStr>,
}

impl Optional {
    pub fn new(definition: Vec<Production>) -> Self {
        Self {
            definition,
            idx: 0,
            label: None,
        }
    }

    pub fn with_idx(mut self, idx: u8) -> Self {
        self.idx = idx;
        self
    }

    pub fn with_label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Zero-or-more.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Repetition {
    pub definition: Vec<Production>,
    pub idx: u8,
    pub label: Option<SmolStr>,
}

impl Repetition {
    pub fn new(definition: Vec<Production>) -> Self {
        Self {
            definition,
            idx: 0,
            label: None,
        }
    }

    pub fn with_idx(mut self, idx: u8) -> Self {
        self.idx = idx;
        self
    }

    pub fn with_label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// One-or-more.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepetitionMandatory {
    pub definition: Vec<Production>,
    pub idx: u8,
    pub label: Option<SmolStr>,
}

impl RepetitionMandatory {
    pub fn new(definition: Vec<Production>) -> Self {
        Self {
            definition,
            idx: 0,
            label: None,
        }
    }

    pub fn with_idx(mut self, idx: u8) -> Self {
        self.idx = idx;
        self
    }

    pub fn with_label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Zero-or-more with a required separator between elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepetitionWithSeparator {
    pub definition: Vec<Production>,
    pub separator: TokenTypeId,
    pub idx: u8,
    pub label: Option<SmolStr>,
}

impl RepetitionWithSeparator {
    pub fn new(definition: Vec<Production>, separator: TokenTypeId) -> Self {
        Self {
            definition,
            separator,
            idx: 0,
            label: None,
        }
    }

    pub fn with_idx(mut self, idx: u8) -> Self {
        self.idx = idx;
        self
    }

    pub fn with_label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// One-or-more with a required separator between elements.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RepetitionMandatoryWithSeparator {
    pub definition: Vec<Production>,
    pub separator: TokenTypeId,
    pub idx: u8,
    pub label: Option<SmolStr>,
}

impl RepetitionMandatoryWithSeparator {
    pub fn new(definition: Vec<Production>, separator: TokenTypeId) -> Self {
        Self {
            definition,
            separator,
            idx: 0,
            label: None,
        }
    }

    pub fn with_idx(mut self, idx: u8) -> Self {
        self.idx = idx;
        self
    }

    pub fn with_label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// An ordered choice among alternatives, decided first-match by lookahead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Alternation {
    pub alternatives: Vec<Sequence>,
    pub idx: u8,
    pub label: Option<SmolStr>,
}

impl Alternation {
    pub fn new(alternatives: Vec<Sequence>) -> Self {
        Self {
            alternatives,
            idx: 0,
            label: None,
        }
    }

    pub fn with_idx(mut self, idx: u8) -> Self {
        self.idx = idx;
        self
    }

    pub fn with_label(mut self, label: impl Into<SmolStr>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// Any grammar production.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Production {
    Terminal(Terminal),
    NonTerminal(NonTerminal),
    Sequence(Sequence),
    Optional(Optional),
    Repetition(Repetition),
    RepetitionMandatory(RepetitionMandatory),
    RepetitionWithSeparator(RepetitionWithSeparator),
    RepetitionMandatoryWithSeparator(RepetitionMandatoryWithSeparator),
    Alternation(Alternation),
}

impl Production {
    pub fn kind(&self) -> ProdKind {
        match self {
            Production::Terminal(_) => ProdKind::Terminal,
            Production::NonTerminal(_) => ProdKind::NonTerminal,
            Production::Sequence(_) => ProdKind::Sequence,
            Production::Optional(_) => ProdKind::Optional,
            Production::Repetition(_) => ProdKind::Repetition,
            Production::RepetitionMandatory(_) => ProdKind::RepetitionMandatory,
            Production::RepetitionWithSeparator(_) => ProdKind::RepetitionWithSeparator,
            Production::RepetitionMandatoryWithSeparator(_) => {
                ProdKind::RepetitionMandatoryWithSeparator
            }
            Production::Alternation(_) => ProdKind::Alternation,
        }
    }

    /// Occurrence index, absent for the leaf-less [`Sequence`] wrapper.
    pub fn idx(&self) -> Option<u8> {
        match self {
            Production::Terminal(p) => Some(p.idx),
            Production::NonTerminal(p) => Some(p.idx),
            Production::Sequence(_) => None,
            Production::Optional(p) => Some(p.idx),
            Production::Repetition(p) => Some(p.idx),
            Production::RepetitionMandatory(p) => Some(p.idx),
            Production::RepetitionWithSeparator(p) => Some(p.idx),
            Production::RepetitionMandatoryWithSeparator(p) => Some(p.idx),
            Production::Alternation(p) => Some(p.idx),
        }
    }

    pub fn label(&self) -> Option<&SmolStr> {
        match self {
            Production::Terminal(p) => p.label.as_ref(),
            Production::NonTerminal(p) => p.label.as_ref(),
            Production::Sequence(p) => p.label.as_ref(),
            Production::Optional(p) => p.label.as_ref(),
            Production::Repetition(p) => p.label.as_ref(),
            Production::RepetitionMandatory(p) => p.label.as_ref(),
            Production::RepetitionWithSeparator(p) => p.label.as_ref(),
            Production::RepetitionMandatoryWithSeparator(p) => p.label.as_ref(),
            Production::Alternation(p) => p.label.as_ref(),
        }
    }

    /// True for constructs that may legally match zero tokens on their own
    /// (before considering nested content).
    pub fn is_optional_kind(&self) -> bool {
        matches!(
            self,
            Production::Optional(_)
                | Production::Repetition(_)
                | Production::RepetitionWithSeparator(_)
        )
    }
}

// ============================================================================
// Rules and the grammar table
// ============================================================================

/// A named top-level production.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub name: SmolStr,
    pub definition: Vec<Production>,
}

impl Rule {
    pub fn new(name: impl Into<SmolStr>, definition: Vec<Production>) -> Self {
        Self {
            name: name.into(),
            definition,
        }
    }
}

/// Errors raised while assembling a [`Grammar`].
///
/// Construction misuse is a hard failure, unlike definition diagnostics
/// which are batched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum GrammarBuildError {
    #[error("duplicate rule name: '{0}'")]
    DuplicateRule(SmolStr),
}

/// The full set of named rules, insertion ordered.
#[derive(Clone, Debug, Default)]
pub struct Grammar {
    rules: IndexMap<SmolStr, Rule>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rule(&mut self, rule: Rule) -> Result<RuleId, GrammarBuildError> {
        if self.rules.contains_key(&rule.name) {
            return Err(GrammarBuildError::DuplicateRule(rule.name));
        }
        let id = RuleId(self.rules.len() as u32);
        self.rules.insert(rule.name.clone(), rule);
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[id.index()]
    }

    pub fn rule_by_name(&self, name: &str) -> Option<&Rule> {
        self.rules.get(name)
    }

    pub fn rule_id(&self, name: &str) -> Option<RuleId> {
        self.rules.get_index_of(name).map(|i| RuleId(i as u32))
    }

    pub fn rule_ids(&self) -> impl Iterator<Item = RuleId> {
        (0..self.rules.len() as u32).map(RuleId)
    }

    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &Rule)> {
        self.rules
            .values()
            .enumerate()
            .map(|(i, r)| (RuleId(i as u32), r))
    }

    pub(crate) fn rules_mut(&mut self) -> impl Iterator<Item = &mut Rule> {
        self.rules.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_rule_rejected() {
        let mut grammar = Grammar::new();
        grammar.add_rule(Rule::new("expr", vec![])).unwrap();
        assert_eq!(
            grammar.add_rule(Rule::new("expr", vec![])).unwrap_err(),
            GrammarBuildError::DuplicateRule(SmolStr::new("expr"))
        );
    }

    #[test]
    fn test_rule_ids_are_stable() {
        let mut grammar = Grammar::new();
        let a = grammar.add_rule(Rule::new("a", vec![])).unwrap();
        let b = grammar.add_rule(Rule::new("b", vec![])).unwrap();
        assert_eq!(grammar.rule_id("a"), Some(a));
        assert_eq!(grammar.rule_id("b"), Some(b));
        assert_eq!(grammar.rule(b).name, "b");
    }

    #[test]
    fn test_production_kind_and_idx() {
        let t = Production::Terminal(Terminal::new(TokenTypeId(0)).with_idx(3));
        assert_eq!(t.kind(), ProdKind::Terminal);
        assert_eq!(t.idx(), Some(3));

        let seq = Production::Sequence(Sequence::new(vec![]));
        assert_eq!(seq.idx(), None);
    }
}
