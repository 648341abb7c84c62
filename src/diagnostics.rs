//! Definition diagnostics.
//!
//! Resolution and validation never fail fast: each check appends zero or
//! more structured diagnostics to a collector and the whole batch surfaces
//! together, so a grammar author sees every problem in one pass.
//!
//! A diagnostic carries machine-readable facts only (offending rule,
//! production kind, occurrence, category payload). Human-readable
//! rendering is a swappable [`MessageProvider`] concern.

use smol_str::SmolStr;
use rustc_hash::FxHashSet;

use crate::grammar::model::ProdKind;
use crate::tokens::TokenTypeId;

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity of a definition diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn is_error(self) -> bool {
        matches!(self, Severity::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

/// Machine-distinguishable diagnostic category, without payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    RuleNotFound,
    DuplicateOccurrence,
    LeftRecursion,
    AmbiguousAlternatives,
    AmbiguousPrefix,
    EmptyRepetition,
    NamingViolation,
    NamespaceCollision,
    TooManyAlternatives,
    EmptyAlternativeNotLast,
}

impl DiagnosticCode {
    /// Categories that indicate certain runtime malfunction can never be
    /// suppressed.
    pub fn is_suppressible(self) -> bool {
        !matches!(
            self,
            DiagnosticCode::EmptyRepetition | DiagnosticCode::EmptyAlternativeNotLast
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DiagnosticCode::RuleNotFound => "rule-not-found",
            DiagnosticCode::DuplicateOccurrence => "duplicate-occurrence",
            DiagnosticCode::LeftRecursion => "left-recursion",
            DiagnosticCode::AmbiguousAlternatives => "ambiguous-alternation",
            DiagnosticCode::AmbiguousPrefix => "ambiguous-prefix",
            DiagnosticCode::EmptyRepetition => "empty-repetition",
            DiagnosticCode::NamingViolation => "naming-violation",
            DiagnosticCode::NamespaceCollision => "namespace-collision",
            DiagnosticCode::TooManyAlternatives => "too-many-alternatives",
            DiagnosticCode::EmptyAlternativeNotLast => "non-last-empty-alternative",
        }
    }
}

/// Category payload: the structured facts of one diagnostic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticCategory {
    /// A `NonTerminal` references a rule that does not exist.
    RuleNotFound { missing: SmolStr },
    /// Two productions of the same kind share an occurrence index.
    DuplicateOccurrence { target: Option<SmolStr> },
    /// The rule can re-invoke itself without consuming a token; the path
    /// lists rule names from the rule back to itself.
    LeftRecursion { path: Vec<SmolStr> },
    /// Two alternatives share an identical full-length path within k.
    AmbiguousAlternatives {
        alternatives: (usize, usize),
        path: Vec<TokenTypeId>,
    },
    /// An earlier alternative's path is a strict prefix of a later one's,
    /// making the later alternative unreachable for that input.
    AmbiguousPrefix {
        prefix_alternative: usize,
        shadowed_alternative: usize,
        path: Vec<TokenTypeId>,
    },
    /// A repetition whose body can match zero tokens; infinite loop at
    /// runtime. Never suppressible.
    EmptyRepetition,
    /// A name does not match the configured identifier pattern.
    NamingViolation { name: SmolStr, pattern: SmolStr },
    /// A terminal and a rule share the same name.
    NamespaceCollision { name: SmolStr },
    /// More than 256 alternatives in one alternation.
    TooManyAlternatives { count: usize },
    /// An empty (unconditionally matching) alternative that is not last
    /// makes the following alternatives dead. Never suppressible.
    EmptyAlternativeNotLast { alternative: usize },
}

impl DiagnosticCategory {
    pub fn code(&self) -> DiagnosticCode {
        match self {
            DiagnosticCategory::RuleNotFound { .. } => DiagnosticCode::RuleNotFound,
            DiagnosticCategory::DuplicateOccurrence { .. } => DiagnosticCode::DuplicateOccurrence,
            DiagnosticCategory::LeftRecursion { .. } => DiagnosticCode::LeftRecursion,
            DiagnosticCategory::AmbiguousAlternatives { .. } => {
                DiagnosticCode::AmbiguousAlternatives
            }
            DiagnosticCategory::AmbiguousPrefix { .. } => DiagnosticCode::AmbiguousPrefix,
            DiagnosticCategory::EmptyRepetition => DiagnosticCode::EmptyRepetition,
            DiagnosticCategory::NamingViolation { .. } => DiagnosticCode::NamingViolation,
            DiagnosticCategory::NamespaceCollision { .. } => DiagnosticCode::NamespaceCollision,
            DiagnosticCategory::TooManyAlternatives { .. } => DiagnosticCode::TooManyAlternatives,
            DiagnosticCategory::EmptyAlternativeNotLast { .. } => {
                DiagnosticCode::EmptyAlternativeNotLast
            }
        }
    }
}

/// One definition diagnostic: which rule, which production, what's wrong.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// The rule containing the offending production.
    pub rule: SmolStr,
    /// Kind of the offending production, when one is identifiable.
    pub prod_kind: Option<ProdKind>,
    /// Occurrence index of the offending production, when applicable.
    pub occurrence: Option<u8>,
    pub severity: Severity,
    pub category: DiagnosticCategory,
}

impl Diagnostic {
    pub fn error(rule: impl Into<SmolStr>, category: DiagnosticCategory) -> Self {
        Self {
            rule: rule.into(),
            prod_kind: None,
            occurrence: None,
            severity: Severity::Error,
            category,
        }
    }

    pub fn warning(rule: impl Into<SmolStr>, category: DiagnosticCategory) -> Self {
        Self {
            rule: rule.into(),
            prod_kind: None,
            occurrence: None,
            severity: Severity::Warning,
            category,
        }
    }

    pub fn at(mut self, kind: ProdKind, occurrence: u8) -> Self {
        self.prod_kind = Some(kind);
        self.occurrence = Some(occurrence);
        self
    }

    pub fn code(&self) -> DiagnosticCode {
        self.category.code()
    }
}

// ============================================================================
// SUPPRESSION
// ============================================================================

/// One suppression entry, keyed by call site and optionally narrowed to a
/// single category.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct IgnoredIssue {
    pub rule: SmolStr,
    pub prod_kind: ProdKind,
    pub occurrence: u8,
    /// `None` suppresses every suppressible category at this site.
    pub code: Option<DiagnosticCode>,
}

/// The configured set of suppressed diagnostic sites.
///
/// Suppression never applies to categories whose
/// [`DiagnosticCode::is_suppressible`] is false.
#[derive(Clone, Debug, Default)]
pub struct IgnoredIssues {
    entries: FxHashSet<IgnoredIssue>,
}

impl IgnoredIssues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Suppress every suppressible category at the given site.
    pub fn ignore(mut self, rule: impl Into<SmolStr>, kind: ProdKind, occurrence: u8) -> Self {
        self.entries.insert(IgnoredIssue {
            rule: rule.into(),
            prod_kind: kind,
            occurrence,
            code: None,
        });
        self
    }

    /// Suppress a single category at the given site.
    pub fn ignore_code(
        mut self,
        rule: impl Into<SmolStr>,
        kind: ProdKind,
        occurrence: u8,
        code: DiagnosticCode,
    ) -> Self {
        self.entries.insert(IgnoredIssue {
            rule: rule.into(),
            prod_kind: kind,
            occurrence,
            code: Some(code),
        });
        self
    }

    pub fn is_ignored(&self, diagnostic: &Diagnostic) -> bool {
        if !diagnostic.code().is_suppressible() {
            return false;
        }
        let (Some(kind), Some(occurrence)) = (diagnostic.prod_kind, diagnostic.occurrence) else {
            return false;
        };
        let site_wide = IgnoredIssue {
            rule: diagnostic.rule.clone(),
            prod_kind: kind,
            occurrence,
            code: None,
        };
        let exact = IgnoredIssue {
            code: Some(diagnostic.code()),
            ..site_wide.clone()
        };
        self.entries.contains(&site_wide) || self.entries.contains(&exact)
    }
}

// ============================================================================
// COLLECTOR
// ============================================================================

/// Accumulates diagnostics across checks; filtering by the ignored set
/// happens at insertion so counts reflect what the caller will see.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn add_unless_ignored(&mut self, diagnostic: Diagnostic, ignored: &IgnoredIssues) {
        if !ignored.is_ignored(&diagnostic) {
            self.diagnostics.push(diagnostic);
        }
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity.is_error())
            .count()
    }

    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }

    pub fn extend(&mut self, diagnostics: impl IntoIterator<Item = Diagnostic>) {
        self.diagnostics.extend(diagnostics);
    }
}

// ============================================================================
// MESSAGE RENDERING
// ============================================================================

/// Swappable human-readable rendering of diagnostics.
pub trait MessageProvider {
    fn render(&self, diagnostic: &Diagnostic) -> String;
}

/// Default plain-text messages.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultMessages;

impl MessageProvider for DefaultMessages {
    fn render(&self, d: &Diagnostic) -> String {
        let site = match (d.prod_kind, d.occurrence) {
            (Some(kind), Some(occ)) => format!(" at {}#{}", kind.as_str(), occ),
            _ => String::new(),
        };
        let what = match &d.category {
            DiagnosticCategory::RuleNotFound { missing } => {
                format!("reference to missing rule '{missing}'")
            }
            DiagnosticCategory::DuplicateOccurrence { target } => match target {
                Some(t) => format!("duplicate occurrence index (target '{t}')"),
                None => "duplicate occurrence index".to_string(),
            },
            DiagnosticCategory::LeftRecursion { path } => {
                format!("left recursion: {}", path.join(" --> "))
            }
            DiagnosticCategory::AmbiguousAlternatives { alternatives, path } => format!(
                "alternatives {} and {} are ambiguous for lookahead path {:?}",
                alternatives.0, alternatives.1, path
            ),
            DiagnosticCategory::AmbiguousPrefix {
                prefix_alternative,
                shadowed_alternative,
                path,
            } => format!(
                "alternative {prefix_alternative} is a prefix of alternative \
                 {shadowed_alternative} (path {path:?}); the longer alternative may be unreachable"
            ),
            DiagnosticCategory::EmptyRepetition => {
                "repetition body may match zero tokens (infinite loop at runtime)".to_string()
            }
            DiagnosticCategory::NamingViolation { name, pattern } => {
                format!("name '{name}' does not match pattern /{pattern}/")
            }
            DiagnosticCategory::NamespaceCollision { name } => {
                format!("terminal and rule share the name '{name}'")
            }
            DiagnosticCategory::TooManyAlternatives { count } => {
                format!("alternation has {count} alternatives; at most 256 are supported")
            }
            DiagnosticCategory::EmptyAlternativeNotLast { alternative } => format!(
                "alternative {alternative} matches unconditionally but is not last; \
                 later alternatives are unreachable"
            ),
        };
        format!(
            "{}: in rule '{}'{}: {}",
            d.severity.as_str(),
            d.rule,
            site,
            what
        )
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&DefaultMessages.render(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suppression_by_site() {
        let ignored = IgnoredIssues::new().ignore("expr", ProdKind::Alternation, 1);
        let diag = Diagnostic::warning(
            "expr",
            DiagnosticCategory::AmbiguousPrefix {
                prefix_alternative: 0,
                shadowed_alternative: 1,
                path: vec![],
            },
        )
        .at(ProdKind::Alternation, 1);
        assert!(ignored.is_ignored(&diag));

        let other_occurrence = Diagnostic { occurrence: Some(2), ..diag };
        assert!(!ignored.is_ignored(&other_occurrence));
    }

    #[test]
    fn test_suppression_by_category_is_independent() {
        let ignored = IgnoredIssues::new().ignore_code(
            "expr",
            ProdKind::Alternation,
            0,
            DiagnosticCode::AmbiguousPrefix,
        );
        let prefix = Diagnostic::warning(
            "expr",
            DiagnosticCategory::AmbiguousPrefix {
                prefix_alternative: 0,
                shadowed_alternative: 1,
                path: vec![],
            },
        )
        .at(ProdKind::Alternation, 0);
        let full = Diagnostic::error(
            "expr",
            DiagnosticCategory::AmbiguousAlternatives {
                alternatives: (0, 1),
                path: vec![],
            },
        )
        .at(ProdKind::Alternation, 0);

        assert!(ignored.is_ignored(&prefix));
        assert!(!ignored.is_ignored(&full));
    }

    #[test]
    fn test_fatal_categories_never_suppressed() {
        let ignored = IgnoredIssues::new().ignore("r", ProdKind::Repetition, 0);
        let diag = Diagnostic::error("r", DiagnosticCategory::EmptyRepetition)
            .at(ProdKind::Repetition, 0);
        assert!(!ignored.is_ignored(&diag));
    }

    #[test]
    fn test_collector_batches() {
        let mut collector = DiagnosticCollector::new();
        collector.add(Diagnostic::error(
            "a",
            DiagnosticCategory::RuleNotFound {
                missing: SmolStr::new("b"),
            },
        ));
        collector.add(Diagnostic::warning(
            "a",
            DiagnosticCategory::AmbiguousPrefix {
                prefix_alternative: 0,
                shadowed_alternative: 1,
                path: vec![],
            },
        ));
        assert_eq!(collector.diagnostics().len(), 2);
        assert_eq!(collector.error_count(), 1);
        assert!(collector.has_errors());
    }

    #[test]
    fn test_default_messages_name_the_site() {
        let diag = Diagnostic::error(
            "expr",
            DiagnosticCategory::LeftRecursion {
                path: vec![SmolStr::new("expr"), SmolStr::new("expr")],
            },
        );
        let text = DefaultMessages.render(&diag);
        assert!(text.contains("expr"));
        assert!(text.contains("expr --> expr"));
    }
}
