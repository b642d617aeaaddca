//! An interpreter for the untyped λ-calculus.
//!
//! Source text is lexed, parsed into locally nameless [`Term`]s (with `let`,
//! multivariate abstractions and natural numbers desugared away), and then
//! reduced in normal order until a normal form is reached or a step bound runs
//! out.

pub mod lexer;
pub mod parser;
mod printer;
pub mod reducer;
pub mod term;

pub use parser::{parse, ParseError};
pub use reducer::{evaluate, evaluate_with, EvalConfig, Evaluation, Outcome};
pub use term::{Term, TermRef};

/// Stack left before the recursive walks grow the stack.
const MIN_STACK_RED_ZONE: usize = 32 * 1024;
const STACK_GROWTH_SIZE: usize = 1024 * 1024;
