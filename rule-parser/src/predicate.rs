//! FILENAME: rule-parser/src/predicate.rs
//! PURPOSE: Compiles a parsed Rule into a predicate over category membership flags.
//! CONTEXT: Third stage of the pipeline. Category names are resolved once,
//! against the base categories of a grouping, into flag indices. The
//! resulting predicate is evaluated per entity against a `&[bool]` whose
//! positions follow the same base category order.

use crate::ast::{BinaryOperator, Expression, Rule, UnaryOperator};
use crate::parser::{parse, ParseError};

/// Errors raised while turning a rule string into a predicate.
#[derive(Debug, PartialEq, Clone)]
pub enum RuleError {
    /// The rule text is not a valid expression.
    Parse(ParseError),
    /// The rule names a category absent from the grouping.
    UnknownCategory(String),
}

impl std::fmt::Display for RuleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleError::Parse(e) => write!(f, "{}", e),
            RuleError::UnknownCategory(name) => write!(f, "Unknown category: '{}'", name),
        }
    }
}

impl std::error::Error for RuleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RuleError::Parse(e) => Some(e),
            RuleError::UnknownCategory(_) => None,
        }
    }
}

impl From<ParseError> for RuleError {
    fn from(e: ParseError) -> Self {
        RuleError::Parse(e)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Flag(usize),
    Not(Box<Node>),
    And(Box<Node>, Box<Node>),
    Or(Box<Node>, Box<Node>),
}

impl Node {
    fn eval(&self, flags: &[bool]) -> bool {
        match self {
            Node::Flag(i) => flags.get(*i).copied().unwrap_or(false),
            Node::Not(inner) => !inner.eval(flags),
            Node::And(l, r) => l.eval(flags) && r.eval(flags),
            Node::Or(l, r) => l.eval(flags) || r.eval(flags),
        }
    }
}

/// A rule resolved against one grouping's base categories.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryPredicate {
    root: Node,
    /// Flags that must all be false ("only" rules). Empty otherwise.
    excluded: Vec<usize>,
}

impl CategoryPredicate {
    /// Compiles a parsed rule. Every category literal must match a base
    /// category exactly.
    pub fn compile(rule: &Rule, base_categories: &[String]) -> Result<Self, RuleError> {
        let root = resolve(&rule.expression, base_categories)?;

        let excluded = if rule.only {
            let mentioned = rule.expression.categories();
            base_categories
                .iter()
                .enumerate()
                .filter(|(_, name)| !mentioned.contains(&name.as_str()))
                .map(|(i, _)| i)
                .collect()
        } else {
            Vec::new()
        };

        Ok(CategoryPredicate { root, excluded })
    }

    /// Evaluates the predicate for one entity's membership flags.
    pub fn matches(&self, flags: &[bool]) -> bool {
        self.root.eval(flags)
            && !self
                .excluded
                .iter()
                .any(|&i| flags.get(i).copied().unwrap_or(false))
    }

    /// Base category indices an "only" rule forbids.
    pub fn excluded(&self) -> &[usize] {
        &self.excluded
    }
}

fn resolve(expr: &Expression, base_categories: &[String]) -> Result<Node, RuleError> {
    match expr {
        Expression::Category(name) => base_categories
            .iter()
            .position(|c| c == name)
            .map(Node::Flag)
            .ok_or_else(|| RuleError::UnknownCategory(name.clone())),
        Expression::UnaryOp {
            op: UnaryOperator::Not,
            operand,
        } => Ok(Node::Not(Box::new(resolve(operand, base_categories)?))),
        Expression::BinaryOp { left, op, right } => {
            let l = Box::new(resolve(left, base_categories)?);
            let r = Box::new(resolve(right, base_categories)?);
            Ok(match op {
                BinaryOperator::And => Node::And(l, r),
                BinaryOperator::Or => Node::Or(l, r),
            })
        }
    }
}

/// Parses and compiles a rule string in one step.
pub fn compile(input: &str, base_categories: &[String]) -> Result<CategoryPredicate, RuleError> {
    let rule = parse(input)?;
    CategoryPredicate::compile(&rule, base_categories)
}
