use std::fmt;

use serde::Serialize;

use crate::error::LexError;
use crate::span::Span;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TokenKind {
    // Keywords
    Si, Sino, FinSi, Mientras, FinMientras, Mostrar, Leer,
    Mod, And, Or, Not, True, False,
    // #CONFIG
    Config,
    // Operators
    Equal,         // = (assignment or equality)
    NotEqual,      // <>
    Less,          // <
    LessEqual,     // <=
    Greater,       // >
    GreaterEqual,  // >=
    Plus,          // +
    Minus,         // -
    Star,          // *
    Slash,         // /
    // Punctuation
    LParen,        // (
    RParen,        // )
    Comma,         // ,
    Dot,           // .
    // Identifiers and literals
    Identifier(String),
    Integer(i64),
    Decimal(f64),
    Text(String),
    // Special
    Newline,
    Eof,
}

impl TokenKind {
    pub(crate) fn keyword(word: &str) -> Option<Self> {
        let kind = match word {
            "SI" => Self::Si,
            "SINO" => Self::Sino,
            "FINSI" => Self::FinSi,
            "MIENTRAS" => Self::Mientras,
            "FINMIENTRAS" => Self::FinMientras,
            "MOSTRAR" => Self::Mostrar,
            "LEER" => Self::Leer,
            "MOD" => Self::Mod,
            "Y" | "AND" => Self::And,
            "O" | "OR" => Self::Or,
            "NO" | "NOT" => Self::Not,
            "VERDADERO" => Self::True,
            "FALSO" => Self::False,
            _ => return None,
        };
        Some(kind)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Newline => write!(f, "end of line"),
            TokenKind::Eof => write!(f, "end of input"),
            _ => write!(f, "'{}'", self.lexeme),
        }
    }
}

const DIRECTIVE: &str = "#CONFIG";

/// Lazy token stream over a source text. Yields `Eof` once, then stops.
/// Cloning the lexer (or building a new one) restarts from that point.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a str,
    position: usize,
    line: usize,
    column: usize,
    finished: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            position: 0,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.position..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.position..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.position += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while self.peek().is_some_and(&predicate) {
            self.bump();
        }
    }

    fn at_directive(&self) -> bool {
        self.source[self.position..]
            .strip_prefix(DIRECTIVE)
            .is_some_and(|rest| !rest.starts_with(|ch: char| ch.is_alphanumeric() || ch == '_'))
    }

    fn skip_blanks_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(' ' | '\t' | '\r') => {
                    self.bump();
                }
                Some('#') if !self.at_directive() => {
                    // Comments run to end of line
                    self.eat_while(|ch| ch != '\n');
                }
                _ => break,
            }
        }
    }

    fn lex_number(&mut self, start: Span) -> Result<TokenKind, LexError> {
        self.eat_while(|ch| ch.is_ascii_digit());
        let is_decimal = self.peek() == Some('.') && self.peek_next().is_some_and(|ch| ch.is_ascii_digit());
        if is_decimal {
            self.bump();
            self.eat_while(|ch| ch.is_ascii_digit());
        }

        let lexeme = &self.source[start.start..self.position];
        let invalid = || LexError::InvalidNumber {
            line: start.line,
            column: start.column,
            lexeme: lexeme.to_string(),
        };
        if is_decimal {
            lexeme.parse().map(TokenKind::Decimal).map_err(|_| invalid())
        } else {
            lexeme.parse().map(TokenKind::Integer).map_err(|_| invalid())
        }
    }

    fn lex_word(&mut self, start: Span) -> TokenKind {
        self.eat_while(|ch| ch.is_alphanumeric() || ch == '_');
        let word = &self.source[start.start..self.position];
        TokenKind::keyword(word).unwrap_or_else(|| TokenKind::Identifier(word.to_string()))
    }

    /// Strings are double quoted; `""` inside one stands for a single `"`.
    fn lex_text(&mut self, start: Span) -> Result<TokenKind, LexError> {
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') if self.peek() == Some('"') => {
                    self.bump();
                    text.push('"');
                }
                Some('"') => return Ok(TokenKind::Text(text)),
                Some('\n') | None => {
                    return Err(LexError::UnterminatedString {
                        line: start.line,
                        column: start.column,
                    });
                }
                Some(ch) => text.push(ch),
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_blanks_and_comments();

        let mut span = Span {
            line: self.line,
            column: self.column,
            start: self.position,
            end: self.position,
        };

        let Some(ch) = self.peek() else {
            self.finished = true;
            return Ok(Token {
                kind: TokenKind::Eof,
                lexeme: String::new(),
                span,
            });
        };

        let kind = match ch {
            '0'..='9' => self.lex_number(span)?,
            '"' => self.lex_text(span)?,
            c if c.is_alphabetic() => self.lex_word(span),
            '#' => {
                for _ in DIRECTIVE.chars() {
                    self.bump();
                }
                TokenKind::Config
            }
            _ => {
                self.bump();
                match ch {
                    '\n' => TokenKind::Newline,
                    '=' => TokenKind::Equal,
                    '<' => match self.peek() {
                        Some('=') => {
                            self.bump();
                            TokenKind::LessEqual
                        }
                        Some('>') => {
                            self.bump();
                            TokenKind::NotEqual
                        }
                        _ => TokenKind::Less,
                    },
                    '>' => {
                        if self.peek() == Some('=') {
                            self.bump();
                            TokenKind::GreaterEqual
                        } else {
                            TokenKind::Greater
                        }
                    }
                    '+' => TokenKind::Plus,
                    '-' => TokenKind::Minus,
                    '*' => TokenKind::Star,
                    '/' => TokenKind::Slash,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    ',' => TokenKind::Comma,
                    '.' => TokenKind::Dot,
                    _ => {
                        return Err(LexError::UnexpectedChar {
                            line: span.line,
                            column: span.column,
                            found: ch,
                        });
                    }
                }
            }
        };

        span.end = self.position;
        Ok(Token {
            kind,
            lexeme: self.source[span.start..span.end].to_string(),
            span,
        })
    }
}

impl Iterator for Lexer<'_> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.is_err() {
            self.finished = true;
        }
        Some(token)
    }
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(source).collect()
}
