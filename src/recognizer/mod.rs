//! Parser runtime driver.
//!
//! The recognizer is the dispatch boundary between hand-written rule
//! functions and the compiled lookahead decisions of a
//! [`GrammarAnalysis`](crate::analysis::GrammarAnalysis). It owns token
//! cursor, rule stack, backtracking state and the opt-in recovery
//! contract; it does not build syntax trees.

mod engine;
mod errors;
mod recovery;

pub use engine::{OrAlt, Recognizer};
pub use errors::RecognitionError;
