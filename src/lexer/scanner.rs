//! Lexer/Scanner for Monkey source code.

use crate::lexer::token::{Token, TokenKind};
use crate::span::Span;

/// The lexer transforms source code into a stream of tokens.
///
/// Scanning never fails: characters the language does not know become
/// [`TokenKind::Illegal`] tokens and are reported by the parser.
pub struct Scanner<'a> {
    source: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
    current_pos: usize,
    line: usize,
    column: usize,
    start_pos: usize,
    start_line: usize,
    start_column: usize,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            line: 1,
            column: 1,
            start_pos: 0,
            start_line: 1,
            start_column: 1,
        }
    }

    /// Scan all tokens from the source, including the trailing `Eof`.
    pub fn scan_tokens(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token();
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        tokens
    }

    /// Scan the next token. Keeps returning `Eof` once the input is exhausted.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace_and_comments();
        self.mark_start();

        let Some((_, c)) = self.advance() else {
            return Token::eof(self.current_pos, self.line, self.column);
        };

        match c {
            '(' => self.make_token(TokenKind::LParen),
            ')' => self.make_token(TokenKind::RParen),
            '{' => self.make_token(TokenKind::LBrace),
            '}' => self.make_token(TokenKind::RBrace),
            '[' => self.make_token(TokenKind::LBracket),
            ']' => self.make_token(TokenKind::RBracket),
            ',' => self.make_token(TokenKind::Comma),
            ';' => self.make_token(TokenKind::Semicolon),
            ':' => self.make_token(TokenKind::Colon),
            '+' => self.make_token(TokenKind::Plus),
            '-' => self.make_token(TokenKind::Minus),
            '*' => self.make_token(TokenKind::Asterisk),
            '/' => self.make_token(TokenKind::Slash),
            '<' => self.make_token(TokenKind::Lt),
            '>' => self.make_token(TokenKind::Gt),
            '=' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::Eq)
                } else {
                    self.make_token(TokenKind::Assign)
                }
            }
            '!' => {
                if self.match_char('=') {
                    self.make_token(TokenKind::NotEq)
                } else {
                    self.make_token(TokenKind::Bang)
                }
            }
            '"' => self.scan_string(),
            c if c.is_ascii_digit() => self.scan_number(),
            c if is_identifier_start(c) => self.scan_identifier(),
            _ => self.make_token(TokenKind::Illegal),
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r') => {
                    self.advance();
                }
                Some('\n') => {
                    self.advance();
                    self.line += 1;
                    self.column = 1;
                }
                Some('/') if self.peek_next() == Some('/') => {
                    while self.peek().is_some() && self.peek() != Some('\n') {
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// Double-quoted string without escapes. An unterminated string runs to end of input.
    fn scan_string(&mut self) -> Token {
        let content_start = self.current_pos;

        while let Some(c) = self.peek() {
            if c == '"' {
                break;
            }
            if c == '\n' {
                self.advance();
                self.line += 1;
                self.column = 1;
            } else {
                self.advance();
            }
        }

        let content_end = self.current_pos;
        self.advance(); // closing quote

        let literal = &self.source[content_start..content_end];
        Token::new(TokenKind::String, literal, self.current_span())
    }

    fn scan_number(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        self.make_token(TokenKind::Int)
    }

    fn scan_identifier(&mut self) -> Token {
        while let Some(c) = self.peek() {
            if is_identifier_start(c) || c.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }

        let text = &self.source[self.start_pos..self.current_pos];
        let kind = TokenKind::keyword(text).unwrap_or(TokenKind::Ident);
        self.make_token(kind)
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        if let Some((pos, c)) = self.chars.next() {
            self.current_pos = pos + c.len_utf8();
            self.column += 1;
            Some((pos, c))
        } else {
            None
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.source[self.current_pos..].chars();
        iter.next();
        iter.next()
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn mark_start(&mut self) {
        self.start_pos = self.current_pos;
        self.start_line = self.line;
        self.start_column = self.column;
    }

    fn current_span(&self) -> Span {
        Span::new(
            self.start_pos,
            self.current_pos,
            self.start_line,
            self.start_column,
        )
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        let literal = &self.source[self.start_pos..self.current_pos];
        Token::new(kind, literal, self.current_span())
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scan(source: &str) -> Vec<TokenKind> {
        Scanner::new(source)
            .scan_tokens()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    fn literals(source: &str) -> Vec<String> {
        Scanner::new(source)
            .scan_tokens()
            .into_iter()
            .map(|t| t.literal)
            .collect()
    }

    #[test]
    fn test_basic_tokens() {
        assert_eq!(
            scan("=+(){},;:[]"),
            vec![
                TokenKind::Assign,
                TokenKind::Plus,
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBrace,
                TokenKind::RBrace,
                TokenKind::Comma,
                TokenKind::Semicolon,
                TokenKind::Colon,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            scan("!-/*5 < 10 > 5 == != !"),
            vec![
                TokenKind::Bang,
                TokenKind::Minus,
                TokenKind::Slash,
                TokenKind::Asterisk,
                TokenKind::Int,
                TokenKind::Lt,
                TokenKind::Int,
                TokenKind::Gt,
                TokenKind::Int,
                TokenKind::Eq,
                TokenKind::NotEq,
                TokenKind::Bang,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            scan("fn let true false if else return fnord"),
            vec![
                TokenKind::Function,
                TokenKind::Let,
                TokenKind::True,
                TokenKind::False,
                TokenKind::If,
                TokenKind::Else,
                TokenKind::Return,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_let_statement_literals() {
        assert_eq!(
            literals("let five_5 = 55;"),
            vec!["let", "five_5", "=", "55", ";", ""]
        );
    }

    #[test]
    fn test_string() {
        let tokens = Scanner::new(r#""foo bar" "" "open"#).scan_tokens();
        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].literal, "foo bar");
        assert_eq!(tokens[1].literal, "");
        assert_eq!(tokens[2].literal, "open");
        assert_eq!(tokens[3].kind, TokenKind::Eof);
    }

    #[test]
    fn test_illegal_character() {
        let tokens = Scanner::new("5 @ 5").scan_tokens();
        assert_eq!(tokens[1].kind, TokenKind::Illegal);
        assert_eq!(tokens[1].literal, "@");
        assert_eq!(tokens[2].kind, TokenKind::Int);
    }

    #[test]
    fn test_comments_and_lines() {
        let tokens = Scanner::new("1 // one\n  two").scan_tokens();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].literal, "two");
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[1].span.column, 3);
    }

    #[test]
    fn test_eof_is_sticky() {
        let mut scanner = Scanner::new("x");
        assert_eq!(scanner.next_token().kind, TokenKind::Ident);
        assert_eq!(scanner.next_token().kind, TokenKind::Eof);
        assert_eq!(scanner.next_token().kind, TokenKind::Eof);
    }
}
