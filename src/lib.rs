//! # glimpse
//!
//! Grammar analysis and LL(k) lookahead core for recursive-descent
//! parsers. A grammar is described as data (rules over a token
//! vocabulary), analyzed once (resolution, validation, FOLLOW sets), and
//! then drives a token-stream [`Recognizer`] through compiled, memoized
//! lookahead decisions.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! recognizer  → Runtime driver: dispatch, gates, backtracking, recovery
//!   ↓
//! analysis    → One-shot pipeline, frozen analysis handle, decision cache
//!   ↓
//! grammar     → Node model, traversals, resolution, FIRST/FOLLOW,
//!               path interpreter, lookahead engine, validation battery
//!   ↓
//! diagnostics → Structured definition diagnostics, suppression, rendering
//!   ↓
//! tokens      → Token-type identities, vocabulary, category matching
//! ```

// ============================================================================
// MODULES (dependency order: tokens → diagnostics → grammar → analysis →
// recognizer)
// ============================================================================

/// Token-type identities, the vocabulary, category-aware matching
pub mod tokens;

/// Definition diagnostics: categories, suppression, message rendering
pub mod diagnostics;

/// Grammar model and static analysis passes
pub mod grammar;

/// One-shot analysis pipeline and the frozen analysis handle
pub mod analysis;

/// Parser runtime driver: dispatch boundary over a token stream
pub mod recognizer;

/// Serialized grammar interchange (JSON tagged nodes)
#[cfg(feature = "interchange")]
pub mod interchange;

// Re-export the types nearly every consumer touches
pub use analysis::{AnalysisConfig, GrammarAnalysis, analyze};
pub use diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use grammar::model::{Grammar, Production, Rule, RuleId};
pub use recognizer::{OrAlt, RecognitionError, Recognizer};
pub use tokens::{Token, TokenTypeId, TokenVocabulary};
