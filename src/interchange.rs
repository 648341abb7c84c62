//! Grammar interchange.
//!
//! Lossless serialization of a grammar definition to plain tagged nodes,
//! with token types referenced by name so a serialized grammar is
//! portable across processes that rebuild the same vocabulary.
//!
//! Deserialization produces an unresolved [`Grammar`]; the caller runs
//! [`analyze`](crate::analysis::analyze) on it as with a hand-built one.

use smol_str::SmolStr;
use thiserror::Error;

use serde::{Deserialize, Serialize};

use crate::grammar::model::{
    Alternation, Grammar, GrammarBuildError, NonTerminal, Optional, Production, Repetition,
    RepetitionMandatory, RepetitionMandatoryWithSeparator, RepetitionWithSeparator, Rule, Sequence,
    Terminal,
};
use crate::tokens::TokenVocabulary;

#[derive(Debug, Error)]
pub enum InterchangeError {
    #[error("serialized grammar references unknown token type '{name}'")]
    UnknownTokenType { name: SmolStr },

    #[error(transparent)]
    Grammar(#[from] GrammarBuildError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// One grammar node in serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SerializedNode {
    Terminal {
        terminal: SmolStr,
        #[serde(default)]
        idx: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<SmolStr>,
    },
    NonTerminal {
        rule: SmolStr,
        #[serde(default)]
        idx: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<SmolStr>,
    },
    Sequence {
        definition: Vec<SerializedNode>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<SmolStr>,
    },
    Optional {
        definition: Vec<SerializedNode>,
        #[serde(default)]
        idx: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<SmolStr>,
    },
    Repetition {
        definition: Vec<SerializedNode>,
        #[serde(default)]
        idx: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<SmolStr>,
    },
    RepetitionMandatory {
        definition: Vec<SerializedNode>,
        #[serde(default)]
        idx: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<SmolStr>,
    },
    RepetitionWithSeparator {
        definition: Vec<SerializedNode>,
        separator: SmolStr,
        #[serde(default)]
        idx: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<SmolStr>,
    },
    RepetitionMandatoryWithSeparator {
        definition: Vec<SerializedNode>,
        separator: SmolStr,
        #[serde(default)]
        idx: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<SmolStr>,
    },
    Alternation {
        alternatives: Vec<SerializedNode>,
        #[serde(default)]
        idx: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<SmolStr>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedRule {
    pub name: SmolStr,
    pub definition: Vec<SerializedNode>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedGrammar {
    pub rules: Vec<SerializedRule>,
}

// ============================================================================
// Export
// ============================================================================

pub fn export_grammar(grammar: &Grammar, vocab: &TokenVocabulary) -> SerializedGrammar {
    let rules = grammar
        .rules()
        .map(|(_, rule)| SerializedRule {
            name: rule.name.clone(),
            definition: export_definition(&rule.definition, vocab),
        })
        .collect();
    SerializedGrammar { rules }
}

fn export_definition(definition: &[Production], vocab: &TokenVocabulary) -> Vec<SerializedNode> {
    definition.iter().map(|p| export_node(p, vocab)).collect()
}

fn export_node(prod: &Production, vocab: &TokenVocabulary) -> SerializedNode {
    match prod {
        Production::Terminal(p) => SerializedNode::Terminal {
            terminal: SmolStr::new(vocab.name(p.terminal)),
            idx: p.idx,
            label: p.label.clone(),
        },
        Production::NonTerminal(p) => SerializedNode::NonTerminal {
            rule: p.referenced_rule.clone(),
            idx: p.idx,
            label: p.label.clone(),
        },
        Production::Sequence(p) => SerializedNode::Sequence {
            definition: export_definition(&p.definition, vocab),
            label: p.label.clone(),
        },
        Production::Optional(p) => SerializedNode::Optional {
            definition: export_definition(&p.definition, vocab),
            idx: p.idx,
            label: p.label.clone(),
        },
        Production::Repetition(p) => SerializedNode::Repetition {
            definition: export_definition(&p.definition, vocab),
            idx: p.idx,
            label: p.label.clone(),
        },
        Production::RepetitionMandatory(p) => SerializedNode::RepetitionMandatory {
            definition: export_definition(&p.definition, vocab),
            idx: p.idx,
            label: p.label.clone(),
        },
        Production::RepetitionWithSeparator(p) => SerializedNode::RepetitionWithSeparator {
            definition: export_definition(&p.definition, vocab),
            separator: SmolStr::new(vocab.name(p.separator)),
            idx: p.idx,
            label: p.label.clone(),
        },
        Production::RepetitionMandatoryWithSeparator(p) => {
            SerializedNode::RepetitionMandatoryWithSeparator {
                definition: export_definition(&p.definition, vocab),
                separator: SmolStr::new(vocab.name(p.separator)),
                idx: p.idx,
                label: p.label.clone(),
            }
        }
        Production::Alternation(p) => SerializedNode::Alternation {
            alternatives: p
                .alternatives
                .iter()
                .map(|alt| SerializedNode::Sequence {
                    definition: export_definition(&alt.definition, vocab),
                    label: alt.label.clone(),
                })
                .collect(),
            idx: p.idx,
            label: p.label.clone(),
        },
    }
}

pub fn to_json(grammar: &Grammar, vocab: &TokenVocabulary) -> Result<String, InterchangeError> {
    Ok(serde_json::to_string_pretty(&export_grammar(grammar, vocab))?)
}

// ============================================================================
// Import
// ============================================================================

pub fn import_grammar(
    serialized: &SerializedGrammar,
    vocab: &TokenVocabulary,
) -> Result<Grammar, InterchangeError> {
    let mut grammar = Grammar::new();
    for rule in &serialized.rules {
        grammar.add_rule(Rule::new(
            rule.name.clone(),
            import_definition(&rule.definition, vocab)?,
        ))?;
    }
    Ok(grammar)
}

fn import_definition(
    definition: &[SerializedNode],
    vocab: &TokenVocabulary,
) -> Result<Vec<Production>, InterchangeError> {
    definition.iter().map(|n| import_node(n, vocab)).collect()
}

fn import_node(
    node: &SerializedNode,
    vocab: &TokenVocabulary,
) -> Result<Production, InterchangeError> {
    let lookup = |name: &SmolStr| {
        vocab
            .id_of(name)
            .ok_or_else(|| InterchangeError::UnknownTokenType { name: name.clone() })
    };

    Ok(match node {
        SerializedNode::Terminal {
            terminal,
            idx,
            label,
        } => {
            let mut p = Terminal::new(lookup(terminal)?).with_idx(*idx);
            p.label = label.clone();
            Production::Terminal(p)
        }
        SerializedNode::NonTerminal { rule, idx, label } => {
            let mut p = NonTerminal::new(rule.clone()).with_idx(*idx);
            p.label = label.clone();
            Production::NonTerminal(p)
        }
        SerializedNode::Sequence { definition, label } => {
            let mut p = Sequence::new(import_definition(definition, vocab)?);
            p.label = label.clone();
            Production::Sequence(p)
        }
        SerializedNode::Optional {
            definition,
            idx,
            label,
        } => {
            let mut p = Optional::new(import_definition(definition, vocab)?).with_idx(*idx);
            p.label = label.clone();
            Production::Optional(p)
        }
        SerializedNode::Repetition {
            definition,
            idx,
            label,
        } => {
            let mut p = Repetition::new(import_definition(definition, vocab)?).with_idx(*idx);
            p.label = label.clone();
            Production::Repetition(p)
        }
        SerializedNode::RepetitionMandatory {
            definition,
            idx,
            label,
        } => {
            let mut p =
                RepetitionMandatory::new(import_definition(definition, vocab)?).with_idx(*idx);
            p.label = label.clone();
            Production::RepetitionMandatory(p)
        }
        SerializedNode::RepetitionWithSeparator {
            definition,
            separator,
            idx,
            label,
        } => {
            let mut p = RepetitionWithSeparator::new(
                import_definition(definition, vocab)?,
                lookup(separator)?,
            )
            .with_idx(*idx);
            p.label = label.clone();
            Production::RepetitionWithSeparator(p)
        }
        SerializedNode::RepetitionMandatoryWithSeparator {
            definition,
            separator,
            idx,
            label,
        } => {
            let mut p = RepetitionMandatoryWithSeparator::new(
                import_definition(definition, vocab)?,
                lookup(separator)?,
            )
            .with_idx(*idx);
            p.label = label.clone();
            Production::RepetitionMandatoryWithSeparator(p)
        }
        SerializedNode::Alternation {
            alternatives,
            idx,
            label,
        } => {
            let mut seqs = Vec::with_capacity(alternatives.len());
            for alt in alternatives {
                seqs.push(match import_node(alt, vocab)? {
                    Production::Sequence(seq) => seq,
                    other => Sequence::new(vec![other]),
                });
            }
            let mut p = Alternation::new(seqs).with_idx(*idx);
            p.label = label.clone();
            Production::Alternation(p)
        }
    })
}

pub fn from_json(json: &str, vocab: &TokenVocabulary) -> Result<Grammar, InterchangeError> {
    let serialized: SerializedGrammar = serde_json::from_str(json)?;
    import_grammar(&serialized, vocab)
}
