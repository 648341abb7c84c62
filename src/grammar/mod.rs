//! Grammar definition and static analysis.
//!
//! Submodules, in dependency order: the node model, the two traversal
//! frameworks (plain visitor and rest walker), cross-rule resolution,
//! FIRST/nullability, FOLLOW sets, the bounded path interpreter, the
//! lookahead engine, and the validation battery.

pub mod model;
pub mod visitor;
pub mod rest;
pub mod resolve;
pub mod first;
pub mod follow;
pub mod interpreter;
pub mod lookahead;
pub mod checks;
