use log::{debug, trace};
use phf::phf_map;

use crate::error::LoxError;
use crate::reporter::Reporter;
use crate::token::{Literal, Token, TokenType};

/// Reserved words. `fun` and `fn` are two spellings of the same keyword.
pub static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and" => TokenType::And,
    "class" => TokenType::Class,
    "else" => TokenType::Else,
    "false" => TokenType::False,
    "fn" => TokenType::Fun,
    "fun" => TokenType::Fun,
    "for" => TokenType::For,
    "if" => TokenType::If,
    "nil" => TokenType::Nil,
    "or" => TokenType::Or,
    "print" => TokenType::Print,
    "return" => TokenType::Return,
    "super" => TokenType::Super,
    "this" => TokenType::This,
    "true" => TokenType::True,
    "var" => TokenType::Var,
    "while" => TokenType::While,
};

pub fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

pub fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// One physical source line, kept for error display.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub number: usize,
    pub start: usize,
    pub end: usize,
    pub content: String,
}

pub struct Scanner<'a> {
    source: &'a str,
    start: usize,
    current: usize,
    line: usize,
    line_start: usize,
    lines: Vec<Line>,
    errors: Vec<LoxError>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            start: 0,
            current: 0,
            line: 1,
            line_start: 0,
            lines: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Scan the whole source. Lexical errors go to `reporter`; scanning
    /// always runs to the end and the result always ends with `Eof`.
    pub fn scan_tokens(&mut self, reporter: &mut Reporter) -> Vec<Token> {
        let mut tokens = Vec::new();

        while !self.is_at_end() {
            self.start = self.current;
            if let Some(token) = self.scan_token() {
                trace!("scanned {}", token);
                tokens.push(token);
            }
        }

        if self.line_start < self.source.len() {
            self.close_line(self.source.len());
        }

        tokens.push(Token::new(
            TokenType::Eof,
            "",
            self.line,
            self.current..self.current,
        ));

        debug!(
            "scanned {} tokens over {} lines ({} errors)",
            tokens.len(),
            self.lines.len(),
            self.errors.len()
        );

        for error in self.errors.drain(..) {
            reporter.report(error);
        }

        tokens
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn take_lines(&mut self) -> Vec<Line> {
        std::mem::take(&mut self.lines)
    }

    fn scan_token(&mut self) -> Option<Token> {
        let c = self.advance();

        match c {
            ' ' | '\r' | '\t' | '\n' => None,
            '(' => Some(self.add_token(TokenType::LeftParen)),
            ')' => Some(self.add_token(TokenType::RightParen)),
            '{' => Some(self.add_token(TokenType::LeftBrace)),
            '}' => Some(self.add_token(TokenType::RightBrace)),
            ',' => Some(self.add_token(TokenType::Comma)),
            '.' => Some(self.add_token(TokenType::Dot)),
            '-' => Some(self.add_token(TokenType::Minus)),
            '+' => Some(self.add_token(TokenType::Plus)),
            ';' => Some(self.add_token(TokenType::Semicolon)),
            '*' => Some(self.add_token(TokenType::Star)),
            '/' => {
                if self.match_char('/') {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.advance();
                    }
                    None
                } else {
                    Some(self.add_token(TokenType::Slash))
                }
            }
            '!' => {
                let token_type = if self.match_char('=') {
                    TokenType::BangEqual
                } else {
                    TokenType::Bang
                };
                Some(self.add_token(token_type))
            }
            '=' => {
                let token_type = if self.match_char('=') {
                    TokenType::EqualEqual
                } else {
                    TokenType::Equal
                };
                Some(self.add_token(token_type))
            }
            '<' => {
                let token_type = if self.match_char('=') {
                    TokenType::LessEqual
                } else {
                    TokenType::Less
                };
                Some(self.add_token(token_type))
            }
            '>' => {
                let token_type = if self.match_char('=') {
                    TokenType::GreaterEqual
                } else {
                    TokenType::Greater
                };
                Some(self.add_token(token_type))
            }
            '"' => Some(self.string()),
            c if c.is_ascii_digit() => Some(self.number()),
            c if is_identifier_start(c) => Some(self.identifier()),
            _ => {
                self.errors.push(LoxError::scan(
                    self.line,
                    self.start..self.current,
                    "Unexpected character.",
                ));
                Some(self.add_token(TokenType::Unknown))
            }
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current..].chars().next().unwrap_or('\0');
        self.current += c.len_utf8();
        if c == '\n' {
            self.close_line(self.current - 1);
        }
        c
    }

    fn peek(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.current..].chars();
        chars.next();
        chars.next()
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Record the line ending at byte `end` and move on to the next one.
    fn close_line(&mut self, end: usize) {
        let content = self.source[self.line_start..end].trim_end_matches('\r');
        self.lines.push(Line {
            number: self.line,
            start: self.line_start,
            end,
            content: content.to_string(),
        });
        self.line += 1;
        self.line_start = end + 1;
    }

    fn add_token(&self, token_type: TokenType) -> Token {
        Token::new(
            token_type,
            &self.source[self.start..self.current],
            self.line,
            self.start..self.current,
        )
    }

    fn add_token_with_literal(&self, token_type: TokenType, literal: Literal) -> Token {
        Token {
            literal: Some(literal),
            ..self.add_token(token_type)
        }
    }

    fn identifier(&mut self) -> Token {
        while self.peek().is_some_and(is_identifier_char) {
            self.advance();
        }

        let text = &self.source[self.start..self.current];
        let token_type = KEYWORDS.get(text).copied().unwrap_or(TokenType::Identifier);
        self.add_token(token_type)
    }

    fn number(&mut self) -> Token {
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        // A fractional part needs at least one digit after the dot.
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.source[self.start..self.current];
        let value = match text.parse::<f64>() {
            Ok(value) => value,
            Err(e) => {
                self.errors.push(LoxError::scan(
                    self.line,
                    self.start..self.current,
                    format!("Invalid number '{}': {}.", text, e),
                ));
                0.0
            }
        };
        self.add_token_with_literal(TokenType::Number, Literal::Number(value))
    }

    fn string(&mut self) -> Token {
        while self.peek().is_some_and(|c| c != '"') {
            self.advance();
        }

        if self.is_at_end() {
            self.errors.push(LoxError::scan(
                self.line,
                self.start..self.current,
                "Unterminated string.",
            ));
            let value = self.source[self.start + 1..self.current].to_string();
            return self.add_token_with_literal(TokenType::String, Literal::String(value));
        }

        // The closing quote.
        self.advance();

        let value = self.source[self.start + 1..self.current - 1].to_string();
        self.add_token_with_literal(TokenType::String, Literal::String(value))
    }
}
