//! FILENAME: rule-parser/src/parser.rs
//! PURPOSE: Recursive descent parser that converts a stream of Tokens into a Rule.
//! CONTEXT: This is the second stage of the parsing pipeline. It takes tokens
//! from the Lexer and builds an Expression tree plus the "only" flag.
//!
//! GRAMMAR:
//!   rule     --> ["only"] or_expr ["only"]
//!   or_expr  --> and_expr ( ("|" | "or") and_expr )*
//!   and_expr --> unary ( ("&" | "and") unary )*
//!   unary    --> ("~" | "!" | "not") unary | primary
//!   primary  --> CATEGORY | "(" or_expr ")"
//!
//! Chains of the same operator are built as balanced trees, so a long
//! `'A' & 'B' & ...` stays shallow. Nesting (parentheses and negation) and
//! the height of the finished tree are both capped at `MAX_DEPTH`.

use crate::ast::{BinaryOperator, Expression, Rule, UnaryOperator};
use crate::lexer::Lexer;
use crate::token::Token;

/// Parser errors with descriptive messages.
#[derive(Debug, PartialEq, Clone)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        ParseError {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

pub type ParseResult<T> = Result<T, ParseError>;

/// Deepest nesting and tallest expression tree a rule may have.
pub const MAX_DEPTH: usize = 256;

/// An expression together with the height of its tree.
struct Parsed {
    expr: Expression,
    height: usize,
}

impl Parsed {
    fn leaf(expr: Expression) -> Self {
        Parsed { expr, height: 1 }
    }
}

/// The Parser struct holds the lexer and current token state.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    current_token: Token,
    /// Open parentheses and negations around the current position.
    nesting: usize,
}

impl<'a> Parser<'a> {
    /// Creates a new parser from an input string.
    /// Automatically advances to the first token.
    pub fn new(input: &'a str) -> Self {
        let mut lexer = Lexer::new(input);
        let current_token = lexer.next_token();
        Parser {
            lexer,
            current_token,
            nesting: 0,
        }
    }

    /// Parses the entire input and returns the rule.
    pub fn parse(&mut self) -> ParseResult<Rule> {
        let mut only = false;

        if self.current_token == Token::Only {
            only = true;
            self.advance();
        }

        if self.current_token == Token::EOF {
            return Err(ParseError::new("Empty expression"));
        }

        let expression = self.parse_or()?.expr;

        if self.current_token == Token::Only {
            if only {
                return Err(ParseError::new("'only' may appear at most once"));
            }
            only = true;
            self.advance();
        }

        // Ensure we consumed all tokens
        if self.current_token != Token::EOF {
            return Err(self.unexpected("after expression"));
        }

        Ok(Rule { expression, only })
    }

    /// Advances to the next token.
    fn advance(&mut self) {
        self.current_token = self.lexer.next_token();
    }

    /// Checks if the current token matches the expected token.
    /// If it matches, advances and returns Ok. Otherwise returns an error.
    fn expect(&mut self, expected: Token) -> ParseResult<()> {
        if self.current_token == expected {
            self.advance();
            Ok(())
        } else {
            Err(ParseError::new(format!(
                "Expected {}, found {}",
                expected, self.current_token
            )))
        }
    }

    fn unexpected(&self, context: &str) -> ParseError {
        match &self.current_token {
            Token::Illegal('\'') | Token::Illegal('"') => {
                ParseError::new("Unterminated category literal")
            }
            Token::Illegal(ch) => ParseError::new(format!("Illegal character: {}", ch)),
            Token::Word(word) => ParseError::new(format!(
                "Unknown word '{}' {} (category names must be quoted)",
                word, context
            )),
            Token::Only => ParseError::new("'only' must start or end the rule"),
            token => ParseError::new(format!("Unexpected token {} {}", token, context)),
        }
    }

    /// Parses disjunctions (|, or).
    fn parse_or(&mut self) -> ParseResult<Parsed> {
        let mut operands = vec![self.parse_and()?];

        while self.current_token == Token::Or {
            self.advance();
            operands.push(self.parse_and()?);
        }

        balance(BinaryOperator::Or, operands)
    }

    /// Parses conjunctions (&, and).
    fn parse_and(&mut self) -> ParseResult<Parsed> {
        let mut operands = vec![self.parse_unary()?];

        while self.current_token == Token::And {
            self.advance();
            operands.push(self.parse_unary()?);
        }

        balance(BinaryOperator::And, operands)
    }

    /// Parses negation.
    fn parse_unary(&mut self) -> ParseResult<Parsed> {
        if self.current_token == Token::Not {
            self.advance();
            self.enter()?;
            let operand = self.parse_unary()?;
            self.nesting -= 1;
            let height = operand.height;
            return grow(
                height,
                Expression::UnaryOp {
                    op: UnaryOperator::Not,
                    operand: Box::new(operand.expr),
                },
            );
        }

        self.parse_primary()
    }

    /// Parses category literals and parenthesized expressions.
    fn parse_primary(&mut self) -> ParseResult<Parsed> {
        match self.current_token.clone() {
            Token::Category(name) => {
                if name.is_empty() {
                    return Err(ParseError::new("Empty category name"));
                }
                self.advance();
                Ok(Parsed::leaf(Expression::Category(name)))
            }

            Token::LParen => {
                self.advance();
                self.enter()?;
                let expr = self.parse_or()?;
                self.expect(Token::RParen)?;
                self.nesting -= 1;
                Ok(expr)
            }

            Token::EOF => Err(ParseError::new("Unexpected end of expression")),

            _ => Err(self.unexpected("in expression")),
        }
    }

    fn enter(&mut self) -> ParseResult<()> {
        self.nesting += 1;
        if self.nesting > MAX_DEPTH {
            return Err(ParseError::new(format!(
                "Expression nested deeper than {} levels",
                MAX_DEPTH
            )));
        }
        Ok(())
    }
}

/// Wraps a subtree of the given height in one more node.
fn grow(height: usize, expr: Expression) -> ParseResult<Parsed> {
    let height = height + 1;
    if height > MAX_DEPTH {
        return Err(ParseError::new(format!(
            "Expression nested deeper than {} levels",
            MAX_DEPTH
        )));
    }
    Ok(Parsed { expr, height })
}

/// Joins operands of one associative operator into a balanced tree.
fn balance(op: BinaryOperator, mut operands: Vec<Parsed>) -> ParseResult<Parsed> {
    if operands.len() <= 1 {
        return operands
            .pop()
            .ok_or_else(|| ParseError::new("Empty expression"));
    }

    let right_half = operands.split_off(operands.len() / 2);
    let left = balance(op, operands)?;
    let right = balance(op, right_half)?;
    grow(
        left.height.max(right.height),
        Expression::BinaryOp {
            left: Box::new(left.expr),
            op,
            right: Box::new(right.expr),
        },
    )
}

/// Convenience function to parse a rule string directly.
pub fn parse(input: &str) -> ParseResult<Rule> {
    let mut parser = Parser::new(input);
    parser.parse()
}
