//! FILENAME: rule-parser/src/lib.rs
//! PURPOSE: Library root for the category rule parser.
//! CONTEXT: This module exposes the lexer, parser, AST and predicate
//! compiler needed to turn a recategorization rule such as
//! `'Northwestern Press' | ('Northwestern Press' & 'CIERA Press')`
//! into a predicate over per-entity category membership flags.
//!
//! PIPELINE: Rule String --> Lexer --> Tokens --> Parser --> AST --> CategoryPredicate
//!
//! SUPPORTED FEATURES:
//! - Quoted category literals, matched as whole names
//! - Boolean operators: & | ~ and their keyword forms and/or/not
//! - Parentheses for grouping
//! - The "only" modifier: no base category outside the rule may be present

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod predicate;
pub mod token;

// Register the separate tests module
#[cfg(test)]
mod tests;

// Re-export commonly used types for convenience
pub use ast::{BinaryOperator, Expression, Rule, UnaryOperator};
pub use lexer::Lexer;
pub use parser::{parse, ParseError, ParseResult, Parser, MAX_DEPTH};
pub use predicate::{compile, CategoryPredicate, RuleError};
pub use token::Token;
