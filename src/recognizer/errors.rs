//! Recognition failures.
//!
//! Unlike definition diagnostics these are per-parse and data dependent;
//! the caller decides whether to recover or report them to an end user.
//! Token types and lookahead paths are rendered by name so a failure can
//! be understood without access to the vocabulary.

use smol_str::SmolStr;
use thiserror::Error;

use crate::tokens::Token;

#[derive(Debug, Clone, Error)]
pub enum RecognitionError {
    /// A single expected token was absent.
    #[error(
        "in rule '{rule}': expected {expected} but found {actual_name} at offset {}",
        actual.start
    )]
    MismatchedToken {
        rule: SmolStr,
        occurrence: u8,
        expected: SmolStr,
        actual_name: SmolStr,
        actual: Token,
    },

    /// No alternative's lookahead matched the upcoming tokens.
    #[error(
        "in rule '{rule}': none of {} alternatives matched; expected one of {} but found {actual_name}",
        expected_paths.len(),
        render_paths(expected_paths)
    )]
    NoViableAlternative {
        rule: SmolStr,
        occurrence: u8,
        /// One entry per alternative, each a list of token-name paths.
        expected_paths: Vec<Vec<Vec<SmolStr>>>,
        actual_name: SmolStr,
        actual: Token,
    },

    /// A mandatory repetition's first iteration failed to match.
    #[error(
        "in rule '{rule}': expected at least one iteration starting with {} but found {actual_name}",
        render_alt(expected_paths)
    )]
    EarlyExit {
        rule: SmolStr,
        occurrence: u8,
        /// Entry paths of the repetition body.
        expected_paths: Vec<Vec<SmolStr>>,
        actual_name: SmolStr,
        actual: Token,
    },

    /// The outermost rule completed with input remaining.
    #[error("redundant input: expected end of input but found {actual_name} at offset {}", actual.start)]
    NotAllInputParsed { actual_name: SmolStr, actual: Token },
}

fn render_alt(paths: &[Vec<SmolStr>]) -> String {
    let rendered: Vec<String> = paths
        .iter()
        .map(|path| format!("[{}]", path.join(", ")))
        .collect();
    rendered.join(" | ")
}

fn render_paths(alternatives: &[Vec<Vec<SmolStr>>]) -> String {
    let rendered: Vec<String> = alternatives.iter().map(|alt| render_alt(alt)).collect();
    rendered.join(" , ")
}
