//! FILENAME: rule-parser/src/token.rs
//! PURPOSE: Token definitions for the category rule lexer.
//! CONTEXT: Tokens are the atomic units produced by the lexer and consumed by the parser.

/// Tokens recognized by the rule lexer.
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    /// A quoted base category name: 'Northwestern Press' or "CIERA Press"
    Category(String),
    /// A bare word that is not a keyword. Always rejected by the parser,
    /// kept as a token so the error message can name it.
    Word(String),

    // Operators
    And,
    Or,
    Not,
    /// Modifier: "these categories and no others"
    Only,

    // Delimiters
    LParen,
    RParen,

    // Special
    EOF,
    Illegal(char),
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Category(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Token::Word(s) => write!(f, "{}", s),
            Token::And => write!(f, "&"),
            Token::Or => write!(f, "|"),
            Token::Not => write!(f, "not"),
            Token::Only => write!(f, "only"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::EOF => write!(f, "EOF"),
            Token::Illegal(c) => write!(f, "ILLEGAL({})", c),
        }
    }
}
