//! FILENAME: rule-parser/src/ast.rs
//! PURPOSE: Defines the Abstract Syntax Tree (AST) for category rules.
//! CONTEXT: After the Lexer tokenizes a rule string, the Parser converts
//! those tokens into this tree structure. The predicate compiler then
//! resolves category names against a grouping's base categories.
//!
//! SUPPORTED EXPRESSIONS:
//! - Category literals: 'Northwestern Press'
//! - Binary operations: & (and), | (or)
//! - Unary operations: ~ (not)
//! - The "only" modifier on the whole rule

/// Represents a parsed boolean expression over category membership.
#[derive(Debug, PartialEq, Clone)]
pub enum Expression {
    /// True when the entity carries this base category.
    Category(String),

    /// A binary operation: left op right (e.g., 'A' & 'B').
    BinaryOp {
        left: Box<Expression>,
        op: BinaryOperator,
        right: Box<Expression>,
    },

    /// A unary operation: op operand (e.g., ~'A').
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expression>,
    },
}

impl Expression {
    /// Collects every category name referenced by the expression,
    /// in order of first appearance and without duplicates.
    pub fn categories(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_categories(&mut names);
        names
    }

    fn collect_categories<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expression::Category(name) => {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            Expression::BinaryOp { left, right, .. } => {
                left.collect_categories(names);
                right.collect_categories(names);
            }
            Expression::UnaryOp { operand, .. } => operand.collect_categories(names),
        }
    }
}

/// A complete rule: an expression plus the "only" modifier.
#[derive(Debug, PartialEq, Clone)]
pub struct Rule {
    pub expression: Expression,
    /// When set, entities must carry no base category other than the
    /// ones the expression mentions.
    pub only: bool,
}

/// Binary operators. Or binds loosest.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum BinaryOperator {
    Or,  // |
    And, // &
}

/// Unary operators.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnaryOperator {
    Not, // ~
}

impl std::fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOperator::Or => write!(f, "|"),
            BinaryOperator::And => write!(f, "&"),
        }
    }
}

impl std::fmt::Display for UnaryOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOperator::Not => write!(f, "~"),
        }
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expression::Category(name) => write!(f, "'{}'", name.replace('\'', "''")),
            Expression::BinaryOp { left, op, right } => write!(f, "({} {} {})", left, op, right),
            Expression::UnaryOp { op, operand } => write!(f, "{}{}", op, operand),
        }
    }
}

impl std::fmt::Display for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.only {
            write!(f, "only {}", self.expression)
        } else {
            write!(f, "{}", self.expression)
        }
    }
}
