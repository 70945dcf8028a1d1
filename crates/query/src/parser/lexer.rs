//! Tokenizer for the query language.

use crate::error::ParseError;
use rivulet_core::CompareOp;

/// Reserved words. Matched case-insensitively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Keyword {
    Select,
    From,
    Where,
    And,
    Insert,
    Into,
    Values,
    Update,
    Set,
    Delete,
    True,
    False,
    Null,
}

impl Keyword {
    fn lookup(word: &str) -> Option<Keyword> {
        let keyword = match word.to_ascii_lowercase().as_str() {
            "select" => Keyword::Select,
            "from" => Keyword::From,
            "where" => Keyword::Where,
            "and" => Keyword::And,
            "insert" => Keyword::Insert,
            "into" => Keyword::Into,
            "values" => Keyword::Values,
            "update" => Keyword::Update,
            "set" => Keyword::Set,
            "delete" => Keyword::Delete,
            "true" => Keyword::True,
            "false" => Keyword::False,
            "null" => Keyword::Null,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Keyword::Select => "select",
            Keyword::From => "from",
            Keyword::Where => "where",
            Keyword::And => "and",
            Keyword::Insert => "insert",
            Keyword::Into => "into",
            Keyword::Values => "values",
            Keyword::Update => "update",
            Keyword::Set => "set",
            Keyword::Delete => "delete",
            Keyword::True => "true",
            Keyword::False => "false",
            Keyword::Null => "null",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum TokenKind {
    Keyword(Keyword),
    Ident(String),
    Placeholder(String),
    Int(i64),
    Float(f64),
    Text(String),
    Op(CompareOp),
    Star,
    Comma,
    LParen,
    RParen,
    End,
}

impl TokenKind {
    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Keyword(k) => format!("'{}'", k.as_str()),
            TokenKind::Ident(name) => format!("identifier '{name}'"),
            TokenKind::Placeholder(name) => format!("placeholder ':{name}'"),
            TokenKind::Int(v) => format!("number {v}"),
            TokenKind::Float(v) => format!("number {v:?}"),
            TokenKind::Text(_) => "text literal".to_string(),
            TokenKind::Op(op) => format!("'{op}'"),
            TokenKind::Star => "'*'".to_string(),
            TokenKind::Comma => "','".to_string(),
            TokenKind::LParen => "'('".to_string(),
            TokenKind::RParen => "')'".to_string(),
            TokenKind::End => "end of input".to_string(),
        }
    }
}

/// A token and the byte offset where it starts.
#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

/// Splits a query string into tokens, ending with `TokenKind::End`.
pub fn tokenize(input: &str) -> Result<Vec<Token>, ParseError> {
    let mut lexer = Lexer { input, pos: 0 };
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::End;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.advance();
        }
        &self.input[start..self.pos]
    }

    fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace();
        let start = self.pos;
        let token = |kind| Ok(Token { kind, position: start });

        let c = match self.peek() {
            Some(c) => c,
            None => return token(TokenKind::End),
        };

        match c {
            '*' | ',' | '(' | ')' | '=' => {
                self.advance();
                token(match c {
                    '*' => TokenKind::Star,
                    ',' => TokenKind::Comma,
                    '(' => TokenKind::LParen,
                    ')' => TokenKind::RParen,
                    _ => TokenKind::Op(CompareOp::Eq),
                })
            }
            '!' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    token(TokenKind::Op(CompareOp::Ne))
                } else {
                    Err(ParseError::syntax(start, "expected '!='"))
                }
            }
            '<' | '>' => {
                self.advance();
                let or_equal = self.peek() == Some('=');
                if or_equal {
                    self.advance();
                }
                token(TokenKind::Op(match (c, or_equal) {
                    ('<', false) => CompareOp::Lt,
                    ('<', true) => CompareOp::Le,
                    (_, false) => CompareOp::Gt,
                    (_, true) => CompareOp::Ge,
                }))
            }
            '\'' => self.text(start),
            ':' => {
                self.advance();
                let name = self.take_while(is_ident_char);
                if name.is_empty() || !name.starts_with(is_ident_start) {
                    return Err(ParseError::syntax(start, "expected a placeholder name after ':'"));
                }
                token(TokenKind::Placeholder(name.to_string()))
            }
            '-' if self.peek_second().is_some_and(|d| d.is_ascii_digit()) => self.number(start),
            c if c.is_ascii_digit() => self.number(start),
            c if is_ident_start(c) => {
                let word = self.take_while(is_ident_char);
                token(match Keyword::lookup(word) {
                    Some(keyword) => TokenKind::Keyword(keyword),
                    None => TokenKind::Ident(word.to_string()),
                })
            }
            other => Err(ParseError::syntax(start, format!("unexpected character '{other}'"))),
        }
    }

    fn text(&mut self, start: usize) -> Result<Token, ParseError> {
        self.advance();
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(ParseError::syntax(start, "unterminated text literal")),
                Some('\'') => {
                    self.advance();
                    if self.peek() == Some('\'') {
                        text.push('\'');
                        self.advance();
                    } else {
                        return Ok(Token {
                            kind: TokenKind::Text(text),
                            position: start,
                        });
                    }
                }
                Some(c) => {
                    text.push(c);
                    self.advance();
                }
            }
        }
    }

    /// `-?digits[.digits][(e|E)[+-]digits]`; a fraction or exponent makes it a float.
    fn number(&mut self, start: usize) -> Result<Token, ParseError> {
        if self.peek() == Some('-') {
            self.advance();
        }
        self.take_while(|c| c.is_ascii_digit());

        let mut is_float = false;
        if self.peek() == Some('.') {
            self.advance();
            if self.take_while(|c| c.is_ascii_digit()).is_empty() {
                return Err(ParseError::syntax(start, "expected digits after '.'"));
            }
            is_float = true;
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.advance();
            if matches!(self.peek(), Some('+' | '-')) {
                self.advance();
            }
            if self.take_while(|c| c.is_ascii_digit()).is_empty() {
                return Err(ParseError::syntax(start, "expected digits in exponent"));
            }
            is_float = true;
        }
        if self.peek().is_some_and(is_ident_char) {
            return Err(ParseError::syntax(start, "malformed number"));
        }

        let literal = &self.input[start..self.pos];
        let kind = if is_float {
            match literal.parse::<f64>() {
                Ok(v) if v.is_finite() => TokenKind::Float(v),
                _ => return Err(ParseError::syntax(start, "float literal out of range")),
            }
        } else {
            match literal.parse::<i64>() {
                Ok(v) => TokenKind::Int(v),
                Err(_) => return Err(ParseError::syntax(start, "integer literal out of range")),
            }
        };
        Ok(Token {
            kind,
            position: start,
        })
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
