//! Token-type identities, the token vocabulary, and token matching.
//!
//! The core never lexes. It consumes a [`TokenVocabulary`]: a registry
//! mapping token-type names to cheap integer identities, each optionally
//! belonging to one or more *categories* (supertypes). A concrete token
//! satisfies its own type and, transitively, every category it belongs to.
//!
//! The vocabulary always contains a distinguished end-of-input type,
//! available via [`TokenVocabulary::eof`].

use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use smol_str::SmolStr;
use thiserror::Error;

/// Identity of a token type within one vocabulary.
///
/// Plain index into the vocabulary; cheap to copy, hash and compare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TokenTypeId(pub(crate) u32);

impl TokenTypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single token as supplied by the external lexer.
///
/// The core only needs the type identity; offsets are carried through for
/// error reporting and are not interpreted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenTypeId,
    pub start: u32,
    pub end: u32,
}

impl Token {
    pub fn new(kind: TokenTypeId, start: u32, end: u32) -> Self {
        Self { kind, start, end }
    }

    /// A token with no source position, useful for synthesized tokens.
    pub fn synthetic(kind: TokenTypeId) -> Self {
        Self {
            kind,
            start: 0,
            end: 0,
        }
    }
}

/// Errors raised while building a [`TokenVocabulary`].
///
/// These indicate a programming error in the grammar's definition and are
/// reported immediately rather than batched.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VocabularyError {
    #[error("a token vocabulary cannot be empty")]
    Empty,

    #[error("duplicate token type name: '{0}'")]
    DuplicateName(SmolStr),

    #[error("token type '{child}' references an undefined category")]
    UnknownCategory { child: SmolStr },
}

#[derive(Clone, Debug)]
struct TokenTypeInfo {
    name: SmolStr,
    /// Direct category parents as declared.
    parents: Vec<TokenTypeId>,
}

/// Builder for a [`TokenVocabulary`].
///
/// Token types must be declared before being used as categories, so a
/// category is always declared above its members.
#[derive(Debug, Default)]
pub struct VocabularyBuilder {
    types: IndexMap<SmolStr, TokenTypeInfo>,
    errors: Vec<VocabularyError>,
}

impl VocabularyBuilder {
    /// Declare a plain token type and return its identity.
    pub fn token(&mut self, name: impl Into<SmolStr>) -> TokenTypeId {
        self.token_in(name, &[])
    }

    /// Declare a token type belonging to the given categories.
    pub fn token_in(&mut self, name: impl Into<SmolStr>, categories: &[TokenTypeId]) -> TokenTypeId {
        let name = name.into();
        let id = TokenTypeId(self.types.len() as u32);
        let info = TokenTypeInfo {
            name: name.clone(),
            parents: categories.to_vec(),
        };
        for cat in categories {
            if cat.index() >= self.types.len() {
                self.errors.push(VocabularyError::UnknownCategory {
                    child: name.clone(),
                });
            }
        }
        if self.types.insert(name.clone(), info).is_some() {
            self.errors.push(VocabularyError::DuplicateName(name));
        }
        id
    }

    /// Finalize the vocabulary: validates the declarations, appends the
    /// end-of-input type and computes the transitive category closure.
    pub fn build(mut self) -> Result<TokenVocabulary, VocabularyError> {
        if self.types.is_empty() {
            return Err(VocabularyError::Empty);
        }
        if let Some(err) = self.errors.drain(..).next() {
            return Err(err);
        }

        // EOF is always present so "expecting EOF but found ..." style
        // checks work against any vocabulary. A user-declared EOF keeps
        // its identity.
        let eof = match self.types.get_index_of("EOF") {
            Some(idx) => TokenTypeId(idx as u32),
            None => {
                let id = TokenTypeId(self.types.len() as u32);
                self.types.insert(
                    SmolStr::new_static("EOF"),
                    TokenTypeInfo {
                        name: SmolStr::new_static("EOF"),
                        parents: Vec::new(),
                    },
                );
                id
            }
        };

        let n = self.types.len();
        // ancestors[t] = every category t satisfies (transitively).
        let mut ancestors: Vec<FxHashSet<TokenTypeId>> = vec![FxHashSet::default(); n];
        for (i, info) in self.types.values().enumerate() {
            let mut stack: Vec<TokenTypeId> = info.parents.clone();
            while let Some(parent) = stack.pop() {
                if ancestors[i].insert(parent) {
                    stack.extend(self.types[parent.index()].parents.iter().copied());
                }
            }
        }

        // members[c] = every concrete type that satisfies category c.
        let mut members: Vec<FxHashSet<TokenTypeId>> = vec![FxHashSet::default(); n];
        for (i, cats) in ancestors.iter().enumerate() {
            for cat in cats {
                members[cat.index()].insert(TokenTypeId(i as u32));
            }
        }

        Ok(TokenVocabulary {
            names: self.types.keys().cloned().collect(),
            ancestors,
            members,
            eof,
        })
    }
}

/// A frozen registry of token types with their category closure.
#[derive(Debug)]
pub struct TokenVocabulary {
    names: Vec<SmolStr>,
    /// Per type: every category it satisfies, transitively.
    ancestors: Vec<FxHashSet<TokenTypeId>>,
    /// Per type: every concrete type that satisfies it as a category.
    members: Vec<FxHashSet<TokenTypeId>>,
    eof: TokenTypeId,
}

impl TokenVocabulary {
    pub fn builder() -> VocabularyBuilder {
        VocabularyBuilder::default()
    }

    /// The distinguished end-of-input token type.
    pub fn eof(&self) -> TokenTypeId {
        self.eof
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn name(&self, id: TokenTypeId) -> &str {
        &self.names[id.index()]
    }

    pub fn id_of(&self, name: &str) -> Option<TokenTypeId> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| TokenTypeId(i as u32))
    }

    /// Category-aware matching: an `actual` token type satisfies
    /// `expected` if it is the same type or `expected` is one of its
    /// categories.
    pub fn matches(&self, actual: TokenTypeId, expected: TokenTypeId) -> bool {
        actual == expected || self.ancestors[actual.index()].contains(&expected)
    }

    /// True if the type has any concrete members beyond itself, i.e. it is
    /// used as a category somewhere in the vocabulary.
    pub fn has_category_members(&self, id: TokenTypeId) -> bool {
        !self.members[id.index()].is_empty()
    }

    /// Every concrete type satisfying `id` as a category (not including
    /// `id` itself).
    pub fn category_members(&self, id: TokenTypeId) -> impl Iterator<Item = TokenTypeId> + '_ {
        self.members[id.index()].iter().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TokenTypeId, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(i, n)| (TokenTypeId(i as u32), n.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_vocabulary_rejected() {
        let builder = TokenVocabulary::builder();
        assert_eq!(builder.build().unwrap_err(), VocabularyError::Empty);
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut builder = TokenVocabulary::builder();
        builder.token("Ident");
        builder.token("Ident");
        assert!(matches!(
            builder.build().unwrap_err(),
            VocabularyError::DuplicateName(_)
        ));
    }

    #[test]
    fn test_eof_always_present() {
        let mut builder = TokenVocabulary::builder();
        builder.token("A");
        let vocab = builder.build().unwrap();
        assert_eq!(vocab.name(vocab.eof()), "EOF");
        assert_eq!(vocab.id_of("EOF"), Some(vocab.eof()));
    }

    #[test]
    fn test_identity_matching() {
        let mut builder = TokenVocabulary::builder();
        let a = builder.token("A");
        let b = builder.token("B");
        let vocab = builder.build().unwrap();
        assert!(vocab.matches(a, a));
        assert!(!vocab.matches(a, b));
    }

    #[test]
    fn test_category_matching_is_transitive() {
        let mut builder = TokenVocabulary::builder();
        let keyword = builder.token("Keyword");
        let modifier = builder.token_in("Modifier", &[keyword]);
        let public_kw = builder.token_in("Public", &[modifier]);
        let ident = builder.token("Ident");
        let vocab = builder.build().unwrap();

        assert!(vocab.matches(public_kw, modifier));
        assert!(vocab.matches(public_kw, keyword));
        assert!(vocab.matches(modifier, keyword));
        assert!(!vocab.matches(keyword, public_kw));
        assert!(!vocab.matches(ident, keyword));
    }

    #[test]
    fn test_category_members() {
        let mut builder = TokenVocabulary::builder();
        let keyword = builder.token("Keyword");
        let if_kw = builder.token_in("If", &[keyword]);
        let else_kw = builder.token_in("Else", &[keyword]);
        let ident = builder.token("Ident");
        let vocab = builder.build().unwrap();

        assert!(vocab.has_category_members(keyword));
        assert!(!vocab.has_category_members(ident));
        let members: FxHashSet<_> = vocab.category_members(keyword).collect();
        assert_eq!(members, FxHashSet::from_iter([if_kw, else_kw]));
    }

    #[test]
    fn test_unknown_category_rejected() {
        let mut builder = TokenVocabulary::builder();
        builder.token_in("Orphan", &[TokenTypeId(17)]);
        assert!(matches!(
            builder.build().unwrap_err(),
            VocabularyError::UnknownCategory { .. }
        ));
    }
}
