//! Indentation-aware tokenizer for UVL.
//!
//! Leading whitespace is turned into [`TokenKind::Indent`] and
//! [`TokenKind::Dedent`] tokens, every non-blank line ends with a
//! [`TokenKind::Newline`]. Tabs and spaces count as one column each. Inside
//! `{}`, `[]` and `()` line breaks and indentation are ignored.

use std::fmt;

use crate::uvl::error::ParseError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Indent,
    Dedent,
    Newline,
    Ident(String),
    /// `"..."`: a name that is not a plain identifier.
    Quoted(String),
    /// `'...'`: a string value.
    Str(String),
    Int(i64),
    Float(f64),
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Dot,
    DotDot,
    Star,
    Not,
    And,
    Or,
    Implies,
    Equiv,
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Indent => write!(f, "indentation"),
            TokenKind::Dedent => write!(f, "end of block"),
            TokenKind::Newline => write!(f, "newline"),
            TokenKind::Ident(s) => write!(f, "'{}'", s),
            TokenKind::Quoted(s) => write!(f, "\"{}\"", s),
            TokenKind::Str(s) => write!(f, "string '{}'", s),
            TokenKind::Int(n) => write!(f, "{}", n),
            TokenKind::Float(x) => write!(f, "{}", x),
            TokenKind::LBrace => write!(f, "'{{'"),
            TokenKind::RBrace => write!(f, "'}}'"),
            TokenKind::LBracket => write!(f, "'['"),
            TokenKind::RBracket => write!(f, "']'"),
            TokenKind::LParen => write!(f, "'('"),
            TokenKind::RParen => write!(f, "')'"),
            TokenKind::Comma => write!(f, "','"),
            TokenKind::Dot => write!(f, "'.'"),
            TokenKind::DotDot => write!(f, "'..'"),
            TokenKind::Star => write!(f, "'*'"),
            TokenKind::Not => write!(f, "'!'"),
            TokenKind::And => write!(f, "'&'"),
            TokenKind::Or => write!(f, "'|'"),
            TokenKind::Implies => write!(f, "'=>'"),
            TokenKind::Equiv => write!(f, "'<=>'"),
            TokenKind::Eof => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    source: &'a str,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    indents: Vec<usize>,
    depth: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            indents: vec![0],
            depth: 0,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn push(&mut self, kind: TokenKind, line: usize, column: usize) {
        self.tokens.push(Token { kind, line, column });
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>, expected: Vec<String>) -> ParseError {
        ParseError::at(self.source, line, column, message, expected)
    }

    fn current_indent(&self) -> usize {
        self.indents.last().copied().unwrap_or(0)
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut at_line_start = true;
        loop {
            if at_line_start && self.depth == 0 {
                let line = self.line;
                let mut width = 0;
                // Indentation ends at the first block comment on the line.
                let mut measuring = true;
                loop {
                    while let Some(' ' | '\t') = self.peek() {
                        if measuring {
                            width += 1;
                        }
                        self.bump();
                    }
                    if self.peek() == Some('/') && self.peek_at(1) == Some('*') {
                        self.skip_block_comment()?;
                        measuring = false;
                        continue;
                    }
                    break;
                }
                match (self.peek(), self.peek_at(1)) {
                    (None, _) => break,
                    (Some('\n' | '\r'), _) => {
                        self.bump();
                        continue;
                    }
                    (Some('/'), Some('/')) => {
                        self.skip_line_comment();
                        continue;
                    }
                    _ => {}
                }
                self.indent_to(width, line)?;
                at_line_start = false;
            }

            while let Some(' ' | '\t' | '\r') = self.peek() {
                self.bump();
            }
            let (line, column) = (self.line, self.column);
            let Some(c) = self.peek() else { break };

            match c {
                '\n' => {
                    self.bump();
                    if self.depth == 0 {
                        self.push(TokenKind::Newline, line, column);
                        at_line_start = true;
                    }
                }
                '/' if self.peek_at(1) == Some('/') => self.skip_line_comment(),
                '/' if self.peek_at(1) == Some('*') => self.skip_block_comment()?,
                '{' | '[' | '(' => {
                    self.bump();
                    self.depth += 1;
                    let kind = match c {
                        '{' => TokenKind::LBrace,
                        '[' => TokenKind::LBracket,
                        _ => TokenKind::LParen,
                    };
                    self.push(kind, line, column);
                }
                '}' | ']' | ')' => {
                    self.bump();
                    self.depth = self.depth.saturating_sub(1);
                    let kind = match c {
                        '}' => TokenKind::RBrace,
                        ']' => TokenKind::RBracket,
                        _ => TokenKind::RParen,
                    };
                    self.push(kind, line, column);
                }
                ',' => self.single(TokenKind::Comma, line, column),
                '*' => self.single(TokenKind::Star, line, column),
                '!' => self.single(TokenKind::Not, line, column),
                '&' => self.single(TokenKind::And, line, column),
                '|' => self.single(TokenKind::Or, line, column),
                '.' => {
                    self.bump();
                    if self.peek() == Some('.') {
                        self.bump();
                        self.push(TokenKind::DotDot, line, column);
                    } else {
                        self.push(TokenKind::Dot, line, column);
                    }
                }
                '=' => {
                    if self.peek_at(1) != Some('>') {
                        return Err(self.error(line, column, "unexpected character '='", vec!["'=>'".to_string()]));
                    }
                    self.bump();
                    self.bump();
                    self.push(TokenKind::Implies, line, column);
                }
                '<' => {
                    if self.peek_at(1) != Some('=') || self.peek_at(2) != Some('>') {
                        return Err(self.error(line, column, "unexpected character '<'", vec!["'<=>'".to_string()]));
                    }
                    self.bump();
                    self.bump();
                    self.bump();
                    self.push(TokenKind::Equiv, line, column);
                }
                '"' => {
                    let text = self.delimited('"', "quoted name")?;
                    self.push(TokenKind::Quoted(text), line, column);
                }
                '\'' => {
                    let text = self.delimited('\'', "string")?;
                    self.push(TokenKind::Str(text), line, column);
                }
                c if c.is_ascii_digit() || (c == '-' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) => {
                    let kind = self.number(line, column)?;
                    self.push(kind, line, column);
                }
                c if c.is_alphabetic() || c == '_' => {
                    let mut ident = String::new();
                    while let Some(c) = self.peek() {
                        if c.is_alphanumeric() || c == '_' {
                            ident.push(c);
                            self.bump();
                        } else {
                            break;
                        }
                    }
                    self.push(TokenKind::Ident(ident), line, column);
                }
                other => {
                    return Err(self.error(line, column, format!("unexpected character '{}'", other), vec![]));
                }
            }
        }
        Ok(self.finish())
    }

    fn single(&mut self, kind: TokenKind, line: usize, column: usize) {
        self.bump();
        self.push(kind, line, column);
    }

    fn indent_to(&mut self, width: usize, line: usize) -> Result<(), ParseError> {
        let current = self.current_indent();
        if width > current {
            self.indents.push(width);
            self.push(TokenKind::Indent, line, 1);
            return Ok(());
        }
        while width < self.current_indent() {
            self.indents.pop();
            self.push(TokenKind::Dedent, line, 1);
        }
        if width != self.current_indent() {
            let expected = format!("indentation of {} columns", self.current_indent());
            return Err(self.error(line, width + 1, "inconsistent indentation", vec![expected]));
        }
        Ok(())
    }

    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                break;
            }
            self.bump();
        }
    }

    fn skip_block_comment(&mut self) -> Result<(), ParseError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        self.bump();
        loop {
            match self.peek() {
                None => return Err(self.error(line, column, "unclosed comment", vec!["'*/'".to_string()])),
                Some('*') if self.peek_at(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    return Ok(());
                }
                Some(_) => {
                    self.bump();
                }
            }
        }
    }

    fn delimited(&mut self, quote: char, what: &str) -> Result<String, ParseError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut text = String::new();
        loop {
            match self.peek() {
                Some(c) if c == quote => {
                    self.bump();
                    return Ok(text);
                }
                None | Some('\n') => {
                    return Err(self.error(line, column, format!("unterminated {}", what), vec![format!("'{}'", quote)]));
                }
                Some(c) => {
                    text.push(c);
                    self.bump();
                }
            }
        }
    }

    fn number(&mut self, line: usize, column: usize) -> Result<TokenKind, ParseError> {
        let mut text = String::new();
        if self.peek() == Some('-') {
            text.push('-');
            self.bump();
        }
        while let Some(c) = self.peek().filter(|c| c.is_ascii_digit()) {
            text.push(c);
            self.bump();
        }
        let is_float = self.peek() == Some('.') && self.peek_at(1).is_some_and(|d| d.is_ascii_digit());
        if is_float {
            text.push('.');
            self.bump();
            while let Some(c) = self.peek().filter(|c| c.is_ascii_digit()) {
                text.push(c);
                self.bump();
            }
            return text
                .parse()
                .map(TokenKind::Float)
                .map_err(|_| self.error(line, column, format!("invalid number '{}'", text), vec![]));
        }
        text.parse()
            .map(TokenKind::Int)
            .map_err(|_| self.error(line, column, format!("invalid number '{}'", text), vec![]))
    }

    fn finish(mut self) -> Vec<Token> {
        let (line, column) = (self.line, self.column);
        if !matches!(self.tokens.last(), None | Some(Token { kind: TokenKind::Newline, .. })) {
            self.push(TokenKind::Newline, line, column);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, line, column);
        }
        self.push(TokenKind::Eof, line, column);
        self.tokens
    }
}
