//! FILENAME: rule-parser/src/tests.rs
//! PURPOSE: Consolidated unit tests for the rule parser crate.

use crate::ast::{BinaryOperator, Expression, Rule, UnaryOperator};
use crate::lexer::Lexer;
use crate::parser::{parse, MAX_DEPTH};
use crate::predicate::{compile, CategoryPredicate, RuleError};
use crate::token::Token;

fn cat(name: &str) -> Expression {
    Expression::Category(name.to_string())
}

fn bases(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

// ========================================
// LEXER TESTS
// ========================================

#[test]
fn lexer_tokenizes_symbols() {
    let mut lexer = Lexer::new("'A' & ('B' | ~'C')");

    assert_eq!(lexer.next_token(), Token::Category("A".to_string()));
    assert_eq!(lexer.next_token(), Token::And);
    assert_eq!(lexer.next_token(), Token::LParen);
    assert_eq!(lexer.next_token(), Token::Category("B".to_string()));
    assert_eq!(lexer.next_token(), Token::Or);
    assert_eq!(lexer.next_token(), Token::Not);
    assert_eq!(lexer.next_token(), Token::Category("C".to_string()));
    assert_eq!(lexer.next_token(), Token::RParen);
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_tokenizes_keywords_case_insensitively() {
    let mut lexer = Lexer::new("AND Or not ONLY");

    assert_eq!(lexer.next_token(), Token::And);
    assert_eq!(lexer.next_token(), Token::Or);
    assert_eq!(lexer.next_token(), Token::Not);
    assert_eq!(lexer.next_token(), Token::Only);
    assert_eq!(lexer.next_token(), Token::EOF);
}

#[test]
fn lexer_reads_categories_with_spaces_and_symbols() {
    let mut lexer = Lexer::new("'Stellar Dynamics & Stellar Populations' \"N/A\"");

    assert_eq!(
        lexer.next_token(),
        Token::Category("Stellar Dynamics & Stellar Populations".to_string())
    );
    assert_eq!(lexer.next_token(), Token::Category("N/A".to_string()));
}

#[test]
fn lexer_handles_escaped_quote() {
    let mut lexer = Lexer::new("'Women''s History'");
    assert_eq!(lexer.next_token(), Token::Category("Women's History".to_string()));
}

#[test]
fn lexer_flags_unterminated_literal() {
    let mut lexer = Lexer::new("'Open");
    assert_eq!(lexer.next_token(), Token::Illegal('\''));
}

#[test]
fn lexer_keeps_unknown_words() {
    let mut lexer = Lexer::new("Press");
    assert_eq!(lexer.next_token(), Token::Word("Press".to_string()));
}

// ========================================
// PARSER TESTS
// ========================================

#[test]
fn parser_parses_single_category() {
    let rule = parse("'CIERA Press'").unwrap();
    assert_eq!(
        rule,
        Rule {
            expression: cat("CIERA Press"),
            only: false,
        }
    );
}

#[test]
fn parser_and_binds_tighter_than_or() {
    let rule = parse("'A' | 'B' & 'C'").unwrap();
    assert_eq!(
        rule.expression,
        Expression::BinaryOp {
            left: Box::new(cat("A")),
            op: BinaryOperator::Or,
            right: Box::new(Expression::BinaryOp {
                left: Box::new(cat("B")),
                op: BinaryOperator::And,
                right: Box::new(cat("C")),
            }),
        }
    );
}

#[test]
fn parser_respects_parentheses() {
    let rule = parse("('A' | 'B') & 'C'").unwrap();
    assert_eq!(
        rule.expression,
        Expression::BinaryOp {
            left: Box::new(Expression::BinaryOp {
                left: Box::new(cat("A")),
                op: BinaryOperator::Or,
                right: Box::new(cat("B")),
            }),
            op: BinaryOperator::And,
            right: Box::new(cat("C")),
        }
    );
}

#[test]
fn parser_parses_negation() {
    let rule = parse("not 'A' and ~~'B'").unwrap();
    assert_eq!(
        rule.expression,
        Expression::BinaryOp {
            left: Box::new(Expression::UnaryOp {
                op: UnaryOperator::Not,
                operand: Box::new(cat("A")),
            }),
            op: BinaryOperator::And,
            right: Box::new(Expression::UnaryOp {
                op: UnaryOperator::Not,
                operand: Box::new(Expression::UnaryOp {
                    op: UnaryOperator::Not,
                    operand: Box::new(cat("B")),
                }),
            }),
        }
    );
}

#[test]
fn parser_accepts_leading_and_trailing_only() {
    let leading = parse("only 'Compact Objects' | 'Gravitational Waves'").unwrap();
    let trailing = parse("'Compact Objects' | 'Gravitational Waves' only").unwrap();

    assert!(leading.only);
    assert!(trailing.only);
    assert_eq!(leading.expression, trailing.expression);
}

#[test]
fn parser_rejects_only_twice() {
    assert!(parse("only 'A' only").is_err());
}

#[test]
fn parser_rejects_only_inside_expression() {
    let err = parse("'A' & only 'B'").unwrap_err();
    assert!(err.message.contains("only"));
}

#[test]
fn parser_rejects_empty_input() {
    assert_eq!(parse("").unwrap_err().message, "Empty expression");
    assert_eq!(parse("  only ").unwrap_err().message, "Empty expression");
}

#[test]
fn parser_rejects_unquoted_names() {
    let err = parse("Press | 'CIERA Press'").unwrap_err();
    assert!(err.message.contains("Press"));
    assert!(err.message.contains("quoted"));
}

#[test]
fn parser_rejects_dangling_operator() {
    assert!(parse("'A' &").is_err());
    assert!(parse("| 'A'").is_err());
}

#[test]
fn parser_rejects_unbalanced_parentheses() {
    assert!(parse("('A' | 'B'").is_err());
    assert!(parse("'A' | 'B')").is_err());
}

#[test]
fn parser_rejects_illegal_characters() {
    let err = parse("'A' + 'B'").unwrap_err();
    assert!(err.message.contains('+'));
}

#[test]
fn parser_rejects_unterminated_literal() {
    let err = parse("'A' | 'B").unwrap_err();
    assert_eq!(err.message, "Unterminated category literal");
}

#[test]
fn parser_rejects_empty_category() {
    assert!(parse("''").is_err());
}

#[test]
fn rule_display_round_trips_through_parser() {
    let rule = parse("only ~'A' & ('B' | 'C''s')").unwrap();
    let reparsed = parse(&rule.to_string()).unwrap();
    assert_eq!(rule, reparsed);
}

#[test]
fn expression_lists_categories_once() {
    let rule = parse("'A' | ('A' & 'B')").unwrap();
    assert_eq!(rule.expression.categories(), vec!["A", "B"]);
}

#[test]
fn parser_rejects_deep_parentheses() {
    let input = format!("{}'A'{}", "(".repeat(1000), ")".repeat(1000));
    let err = parse(&input).unwrap_err();
    assert!(err.message.contains("nested deeper"));
}

#[test]
fn parser_rejects_deep_negation() {
    let input = format!("{}'A'", "~".repeat(MAX_DEPTH + 1));
    assert!(parse(&input).unwrap_err().message.contains("nested deeper"));
}

#[test]
fn parser_accepts_nesting_below_limit() {
    let input = format!("{}'A'{}", "(".repeat(200), ")".repeat(200));
    assert_eq!(parse(&input).unwrap().expression, cat("A"));
}

#[test]
fn parser_builds_long_chains_as_balanced_trees() {
    let input = vec!["'A'"; 3000].join(" & ");
    let rule = parse(&input).unwrap();

    fn height(expr: &Expression) -> usize {
        match expr {
            Expression::Category(_) => 1,
            Expression::UnaryOp { operand, .. } => 1 + height(operand),
            Expression::BinaryOp { left, right, .. } => 1 + height(left).max(height(right)),
        }
    }
    assert!(height(&rule.expression) <= 13);
}

// ========================================
// PREDICATE TESTS
// ========================================

#[test]
fn predicate_evaluates_inclusive_rule() {
    let base = bases(&["CIERA Press", "External Press", "Northwestern Press"]);
    let predicate = compile(
        "'Northwestern Press' | ('Northwestern Press' & 'CIERA Press')",
        &base,
    )
    .unwrap();

    assert!(predicate.matches(&[true, false, true]));
    assert!(!predicate.matches(&[true, true, false]));
    assert!(!predicate.matches(&[true, false, false]));
    assert!(predicate.matches(&[false, false, true]));
}

#[test]
fn predicate_rejects_unknown_category() {
    let base = bases(&["A", "B"]);
    assert_eq!(
        compile("'A' | 'C'", &base).unwrap_err(),
        RuleError::UnknownCategory("C".to_string())
    );
}

#[test]
fn predicate_wraps_parse_errors() {
    let base = bases(&["A"]);
    assert!(matches!(compile("'A' &&", &base), Err(RuleError::Parse(_))));
}

#[test]
fn predicate_matches_whole_names_only() {
    // "Press" is a substring of "CIERA Press"; the two must stay distinct.
    let base = bases(&["CIERA Press", "Press"]);
    let predicate = compile("'Press'", &base).unwrap();

    assert!(predicate.matches(&[false, true]));
    assert!(!predicate.matches(&[true, false]));

    let only = compile("only 'Press'", &base).unwrap();
    assert_eq!(only.excluded(), &[0]);
    assert!(only.matches(&[false, true]));
    assert!(!only.matches(&[true, true]));
}

#[test]
fn predicate_only_excludes_unmentioned_categories() {
    let base = bases(&["A", "B", "C"]);
    let predicate = compile("'A' | 'B' only", &base).unwrap();

    assert_eq!(predicate.excluded(), &[2]);
    assert!(predicate.matches(&[true, false, false]));
    assert!(predicate.matches(&[true, true, false]));
    assert!(!predicate.matches(&[true, false, true]));
    assert!(!predicate.matches(&[false, false, true]));
}

#[test]
fn predicate_only_with_every_category_mentioned_has_no_exclusion() {
    let base = bases(&["A", "B"]);
    let predicate = compile("only 'A' & 'B'", &base).unwrap();

    assert!(predicate.excluded().is_empty());
    assert!(predicate.matches(&[true, true]));
}

#[test]
fn predicate_negation() {
    let base = bases(&["A", "B"]);
    let predicate = compile("'A' & ~'B'", &base).unwrap();

    assert!(predicate.matches(&[true, false]));
    assert!(!predicate.matches(&[true, true]));
}

#[test]
fn predicate_compiles_from_parsed_rule() {
    let base = bases(&["A"]);
    let rule = parse("'A'").unwrap();
    let predicate = CategoryPredicate::compile(&rule, &base).unwrap();
    assert!(predicate.matches(&[true]));
    assert!(!predicate.matches(&[false]));
}

#[test]
fn predicate_evaluates_long_chains() {
    let all_a = compile(&vec!["'A'"; 3000].join(" & "), &bases(&["A"])).unwrap();
    assert!(all_a.matches(&[true]));
    assert!(!all_a.matches(&[false]));

    let names: Vec<String> = (0..3000).map(|i| format!("C{}", i)).collect();
    let input = names
        .iter()
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(" | ");
    let any = compile(&input, &names).unwrap();

    let mut flags = vec![false; names.len()];
    assert!(!any.matches(&flags));
    flags[2999] = true;
    assert!(any.matches(&flags));
}

#[test]
fn predicate_reports_deep_nesting_as_parse_error() {
    let input = format!("{}'A'{}", "(".repeat(1000), ")".repeat(1000));
    assert!(matches!(compile(&input, &bases(&["A"])), Err(RuleError::Parse(_))));
}
