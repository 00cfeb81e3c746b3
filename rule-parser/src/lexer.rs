//! FILENAME: rule-parser/src/lexer.rs
//! PURPOSE: Scans a raw category rule string and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. It handles
//! whitespace skipping, quoted category literals and the boolean keywords.
//!
//! SUPPORTED OPERATORS:
//! - Symbols: & | ~ ! ( )
//! - Keywords (case-insensitive): and, or, not, only
//! - Category literals: 'Name' or "Name" (a doubled quote escapes itself)

use crate::token::Token;
use std::iter::Peekable;
use std::str::Chars;

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some('&') => Token::And,
            Some('|') => Token::Or,
            Some('~') | Some('!') => Token::Not,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,

            // Category literals, either quote style
            Some(quote @ ('\'' | '"')) => self.read_category(quote),

            // Keywords (and stray words, which the parser rejects)
            Some(ch) if is_word_char(ch) => self.read_word(ch),

            // End of input
            None => Token::EOF,

            // Unknown character
            Some(ch) => Token::Illegal(ch),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    /// Reads a quoted category name. The literal is taken verbatim, so
    /// 'Press' and 'CIERA Press' are always distinct tokens.
    fn read_category(&mut self, quote: char) -> Token {
        let mut result = String::new();
        while let Some(ch) = self.input.next() {
            if ch == quote {
                // Doubled quote is an escaped quote character
                if self.input.peek() == Some(&quote) {
                    result.push(quote);
                    self.input.next();
                } else {
                    return Token::Category(result);
                }
            } else {
                result.push(ch);
            }
        }
        // Unterminated literal
        Token::Illegal(quote)
    }

    fn read_word(&mut self, first_char: char) -> Token {
        let mut word = String::from(first_char);

        while let Some(&ch) = self.input.peek() {
            if is_word_char(ch) {
                word.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        match word.to_lowercase().as_str() {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "only" => Token::Only,
            _ => Token::Word(word),
        }
    }
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}
