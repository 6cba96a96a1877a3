//! SQL Tokenizer implementation.

use super::{Keyword, Span, Token, TokenKind};
use crate::dialect::Dialect;

/// A lexer that tokenizes SQL input according to a [`Dialect`].
pub struct Lexer<'a> {
    /// The input source code.
    input: &'a str,
    /// Dialect controlling identifier quoting.
    dialect: &'a dyn Dialect,
    /// The current byte position.
    pos: usize,
    /// The byte position of the start of the current token.
    start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    #[must_use]
    pub fn new(input: &'a str, dialect: &'a dyn Dialect) -> Self {
        Self {
            input,
            dialect,
            pos: 0,
            start: 0,
        }
    }

    /// Returns the current character without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Returns the next character without advancing.
    fn peek_next(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advances to the next character and returns it.
    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    /// Skips whitespace and comments.
    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.peek().is_some_and(char::is_whitespace) {
                self.advance();
            }

            // -- line comment
            if self.peek() == Some('-') && self.peek_next() == Some('-') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.advance();
                }
                continue;
            }

            // /* block comment */
            if self.peek() == Some('/') && self.peek_next() == Some('*') {
                self.advance();
                self.advance();
                loop {
                    match self.advance() {
                        Some('*') if self.peek() == Some('/') => {
                            self.advance();
                            break;
                        }
                        None => break,
                        _ => {}
                    }
                }
                continue;
            }

            break;
        }
    }

    /// Creates a token spanning from `start` to the current position.
    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(kind, Span::new(self.start, self.pos))
    }

    /// Scans an identifier or keyword.
    fn scan_identifier(&mut self) -> Token {
        while self
            .peek()
            .is_some_and(|c| c.is_alphanumeric() || c == '_' || c == '$')
        {
            self.advance();
        }

        let text = &self.input[self.start..self.pos];
        match Keyword::from_str(text) {
            Some(keyword) => self.make_token(TokenKind::Keyword(keyword)),
            None => self.make_token(TokenKind::Identifier(String::from(text))),
        }
    }

    /// Scans a quoted identifier delimited by `open` and `close`.
    ///
    /// A doubled closing delimiter inside the identifier stands for itself.
    fn scan_quoted_identifier(&mut self, open: char, close: char) -> Token {
        debug_assert_eq!(self.peek(), Some(open));
        self.advance();
        let mut value = String::new();

        loop {
            match self.advance() {
                Some(c) if c == close => {
                    if close != ']' && self.peek() == Some(close) {
                        value.push(close);
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(c) => value.push(c),
                None => {
                    return self.make_token(TokenKind::Error(String::from(
                        "Unterminated quoted identifier",
                    )));
                }
            }
        }

        if value.is_empty() {
            return self.make_token(TokenKind::Error(String::from("Empty quoted identifier")));
        }
        self.make_token(TokenKind::QuotedIdentifier(value))
    }

    /// Scans a number (integer or float).
    fn scan_number(&mut self) -> Token {
        let mut is_float = false;

        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }

        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            let after_e = self.peek_next();
            let has_exponent = after_e.is_some_and(|c| c.is_ascii_digit() || c == '+' || c == '-');
            if has_exponent {
                is_float = true;
                self.advance();
                if self.peek().is_some_and(|c| c == '+' || c == '-') {
                    self.advance();
                }
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let text = &self.input[self.start..self.pos];

        if is_float {
            match text.parse::<f64>() {
                Ok(f) => self.make_token(TokenKind::Float(f)),
                Err(e) => self.make_token(TokenKind::Error(format!("Invalid float: {e}"))),
            }
        } else {
            match text.parse::<i64>() {
                Ok(i) => self.make_token(TokenKind::Integer(i)),
                Err(e) => self.make_token(TokenKind::Error(format!("Invalid integer: {e}"))),
            }
        }
    }

    /// Scans a single-quoted string literal.
    fn scan_string(&mut self) -> Token {
        self.advance();
        let mut value = String::new();

        loop {
            match self.advance() {
                Some('\'') => {
                    if self.peek() == Some('\'') {
                        value.push('\'');
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(c) => value.push(c),
                None => {
                    return self.make_token(TokenKind::Error(String::from(
                        "Unterminated string literal",
                    )));
                }
            }
        }

        self.make_token(TokenKind::String(value))
    }

    /// Scans a blob literal (X'...' or x'...').
    fn scan_blob(&mut self) -> Token {
        self.advance(); // X
        self.advance(); // '
        let mut hex = String::new();

        loop {
            match self.advance() {
                Some('\'') => break,
                Some(c) if c.is_ascii_hexdigit() => hex.push(c),
                Some(_) => {
                    return self.make_token(TokenKind::Error(String::from(
                        "Invalid character in blob literal",
                    )));
                }
                None => {
                    return self
                        .make_token(TokenKind::Error(String::from("Unterminated blob literal")));
                }
            }
        }

        if hex.len() % 2 != 0 {
            return self.make_token(TokenKind::Error(String::from(
                "Odd number of hex digits in blob literal",
            )));
        }

        let bytes = (0..hex.len())
            .step_by(2)
            .filter_map(|i| u8::from_str_radix(&hex[i..i + 2], 16).ok())
            .collect();
        self.make_token(TokenKind::Blob(bytes))
    }

    /// Scans the next token.
    #[must_use]
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        self.start = self.pos;

        let Some(c) = self.peek() else {
            return self.make_token(TokenKind::Eof);
        };

        if self.dialect.is_identifier_quote(c) {
            return self.scan_quoted_identifier(c, c);
        }
        if c == '[' && self.dialect.supports_bracket_identifiers() {
            return self.scan_quoted_identifier('[', ']');
        }

        match c {
            '\'' => return self.scan_string(),
            'X' | 'x' if self.peek_next() == Some('\'') => return self.scan_blob(),
            c if c.is_ascii_digit() => return self.scan_number(),
            '.' if self.peek_next().is_some_and(|n| n.is_ascii_digit()) => {
                return self.scan_number();
            }
            c if c.is_alphabetic() || c == '_' => return self.scan_identifier(),
            _ => {}
        }

        self.advance();
        let kind = match c {
            '(' => TokenKind::LeftParen,
            ')' => TokenKind::RightParen,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '?' => TokenKind::Question,
            '.' => TokenKind::Dot,
            '=' => {
                if self.peek() == Some('=') && self.dialect.supports_double_equals() {
                    self.advance();
                }
                TokenKind::Eq
            }
            '<' => match self.peek() {
                Some('=') => {
                    self.advance();
                    TokenKind::LtEq
                }
                Some('>') => {
                    self.advance();
                    TokenKind::NotEq
                }
                _ => TokenKind::Lt,
            },
            '>' => {
                if self.peek() == Some('=') {
                    self.advance();
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '!' if self.peek() == Some('=') => {
                self.advance();
                TokenKind::NotEq
            }
            '|' if self.peek() == Some('|') => {
                self.advance();
                TokenKind::Concat
            }
            other => TokenKind::Error(format!("Unexpected character: {other}")),
        };
        self.make_token(kind)
    }

    /// Tokenizes the entire input and returns all tokens, ending with EOF.
    #[must_use]
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let is_eof = token.is_eof();
            tokens.push(token);
            if is_eof {
                break;
            }
        }
        tokens
    }
}
