//! Recursive-descent parser from UVL tokens to a [`UvlDocument`].
//!
//! ```text
//! document    := ('namespace' ref NL)? imports? features? constraints?
//! imports     := 'imports' NL INDENT (ref ('as' ref)? NL)* DEDENT
//! features    := 'features' NL INDENT feature* DEDENT
//! feature     := ref attributes? NL (INDENT group* DEDENT)?
//! group       := (IDENT | cardinality) NL (INDENT feature* DEDENT)?
//! cardinality := '[' INT ('..' (INT | '*'))? ']'
//! attributes  := '{' (attribute (',' attribute)*)? '}'
//! attribute   := key value?
//! constraints := 'constraints' NL INDENT (expr NL)* DEDENT
//! expr        := impl ('<=>' impl)*
//! impl        := or ('=>' or)*
//! or          := and ('|' and)*
//! and         := unary ('&' unary)*
//! unary       := '!' unary | '(' expr ')' | ref
//! ```

use log::debug;

use crate::uvl::ast::{
    AttributeValue, ConstraintDecl, ConstraintExpr, FeatureDecl, GroupDecl, GroupKind, Import, UvlDocument,
};
use crate::uvl::error::ParseError;
use crate::uvl::lexer::{tokenize, Token, TokenKind};

/// Parses a complete UVL document.
pub fn parse(source: &str) -> Result<UvlDocument, ParseError> {
    let tokens = tokenize(source)?;
    let document = Parser::new(source, tokens).document()?;
    debug!(
        "Parsed UVL document: {} root feature(s), {} constraint(s), {} import(s)",
        document.root_features.len(),
        document.constraints.len(),
        document.imports.len()
    );
    Ok(document)
}

const SECTIONS: [&str; 5] = ["'namespace'", "'imports'", "'features'", "'constraints'", "end of input"];

struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, tokens: Vec<Token>) -> Self {
        Self { source, tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with `Eof`.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek_kind(), TokenKind::Ident(s) if s == keyword)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn unexpected(&self, expected: &[&str]) -> ParseError {
        let token = self.peek();
        ParseError::at(
            self.source,
            token.line,
            token.column,
            format!("unexpected {}", token.kind),
            expected.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token, ParseError> {
        if self.at(&kind) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&[what]))
        }
    }

    fn skip_newlines(&mut self) {
        while self.eat(&TokenKind::Newline) {}
    }

    fn document(&mut self) -> Result<UvlDocument, ParseError> {
        let mut document = UvlDocument::default();
        self.skip_newlines();

        if self.at_keyword("namespace") {
            self.advance();
            document.namespace = Some(self.reference()?);
            self.expect(TokenKind::Newline, "newline")?;
        }
        if self.at_keyword("imports") {
            self.advance();
            document.imports = self.block(|p| p.import())?;
        }
        if self.at_keyword("features") {
            self.advance();
            document.root_features = self.block(|p| p.feature())?;
        }
        if self.at_keyword("constraints") {
            self.advance();
            document.constraints = self.block(|p| p.constraint())?;
        }

        self.skip_newlines();
        if !self.at(&TokenKind::Eof) {
            return Err(self.unexpected(&SECTIONS));
        }
        Ok(document)
    }

    /// `NL (INDENT item* DEDENT)?`
    fn block<T, F>(&mut self, mut item: F) -> Result<Vec<T>, ParseError>
    where
        F: FnMut(&mut Self) -> Result<T, ParseError>,
    {
        self.expect(TokenKind::Newline, "newline")?;
        let mut items = Vec::new();
        if self.eat(&TokenKind::Indent) {
            while !self.eat(&TokenKind::Dedent) {
                items.push(item(self)?);
            }
        }
        Ok(items)
    }

    fn import(&mut self) -> Result<Import, ParseError> {
        let line = self.peek().line;
        let namespace = self.reference()?;
        let alias = if self.at_keyword("as") {
            self.advance();
            self.reference()?
        } else {
            namespace.clone()
        };
        if !self.at(&TokenKind::Newline) {
            return Err(self.unexpected(&["'as'", "newline"]));
        }
        self.advance();
        Ok(Import { namespace, alias, line })
    }

    fn feature(&mut self) -> Result<FeatureDecl, ParseError> {
        let line = self.peek().line;
        let name = self.reference()?;
        let attributes = if self.at(&TokenKind::LBrace) {
            self.attributes()?
        } else {
            Vec::new()
        };
        if !self.at(&TokenKind::Newline) {
            return Err(self.unexpected(&["'{'", "newline"]));
        }
        let groups = self.block(|p| p.group())?;
        Ok(FeatureDecl {
            name,
            attributes,
            groups,
            line,
        })
    }

    fn group(&mut self) -> Result<GroupDecl, ParseError> {
        let line = self.peek().line;
        let kind = match self.peek_kind().clone() {
            TokenKind::Ident(keyword) => {
                self.advance();
                GroupKind::Keyword(keyword)
            }
            TokenKind::LBracket => self.cardinality()?,
            _ => return Err(self.unexpected(&["'or'", "'alternative'", "'optional'", "'mandatory'", "'['"])),
        };
        let children = self.block(|p| p.feature())?;
        Ok(GroupDecl { kind, children, line })
    }

    fn cardinality(&mut self) -> Result<GroupKind, ParseError> {
        self.expect(TokenKind::LBracket, "'['")?;
        let min = self.unsigned()?;
        let max = if self.eat(&TokenKind::DotDot) {
            if self.eat(&TokenKind::Star) {
                None
            } else {
                Some(self.unsigned()?)
            }
        } else {
            Some(min)
        };
        self.expect(TokenKind::RBracket, "']'")?;
        Ok(GroupKind::Cardinality { min, max })
    }

    fn unsigned(&mut self) -> Result<u64, ParseError> {
        match *self.peek_kind() {
            TokenKind::Int(n) if n >= 0 => {
                self.advance();
                Ok(n as u64)
            }
            _ => Err(self.unexpected(&["non-negative integer"])),
        }
    }

    fn attributes(&mut self) -> Result<Vec<(String, AttributeValue)>, ParseError> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut attributes = Vec::new();
        if self.eat(&TokenKind::RBrace) {
            return Ok(attributes);
        }
        loop {
            let key = self.reference()?;
            let value = match self.peek_kind() {
                TokenKind::Comma | TokenKind::RBrace => AttributeValue::Bool(true),
                _ => self.value()?,
            };
            attributes.push((key, value));
            if self.eat(&TokenKind::RBrace) {
                return Ok(attributes);
            }
            if !self.eat(&TokenKind::Comma) {
                return Err(self.unexpected(&["','", "'}'"]));
            }
        }
    }

    fn value(&mut self) -> Result<AttributeValue, ParseError> {
        let value = match self.peek_kind().clone() {
            TokenKind::Ident(s) if s == "true" => AttributeValue::Bool(true),
            TokenKind::Ident(s) if s == "false" => AttributeValue::Bool(false),
            TokenKind::Int(n) => AttributeValue::Int(n),
            TokenKind::Float(x) => AttributeValue::Float(x),
            TokenKind::Str(s) | TokenKind::Quoted(s) => AttributeValue::Str(s),
            TokenKind::LBrace => return self.attributes().map(AttributeValue::Attributes),
            TokenKind::LBracket => return self.vector(),
            _ => return Err(self.unexpected(&["'true'", "'false'", "number", "string", "'{'", "'['"])),
        };
        self.advance();
        Ok(value)
    }

    fn vector(&mut self) -> Result<AttributeValue, ParseError> {
        self.expect(TokenKind::LBracket, "'['")?;
        let mut values = Vec::new();
        if self.eat(&TokenKind::RBracket) {
            return Ok(AttributeValue::Vector(values));
        }
        loop {
            values.push(self.value()?);
            if self.eat(&TokenKind::RBracket) {
                return Ok(AttributeValue::Vector(values));
            }
            if !self.eat(&TokenKind::Comma) {
                return Err(self.unexpected(&["','", "']'"]));
            }
        }
    }

    fn reference(&mut self) -> Result<String, ParseError> {
        let mut name = self.id()?;
        while self.eat(&TokenKind::Dot) {
            name.push('.');
            name.push_str(&self.id()?);
        }
        Ok(name)
    }

    fn id(&mut self) -> Result<String, ParseError> {
        match self.peek_kind().clone() {
            TokenKind::Ident(s) | TokenKind::Quoted(s) => {
                self.advance();
                Ok(s)
            }
            _ => Err(self.unexpected(&["feature name"])),
        }
    }

    fn constraint(&mut self) -> Result<ConstraintDecl, ParseError> {
        let line = self.peek().line;
        let expr = self.equiv()?;
        if !self.at(&TokenKind::Newline) {
            return Err(self.unexpected(&["'&'", "'|'", "'=>'", "'<=>'", "newline"]));
        }
        self.advance();
        Ok(ConstraintDecl { expr, line })
    }

    fn equiv(&mut self) -> Result<ConstraintExpr, ParseError> {
        let mut lhs = self.implication()?;
        while self.eat(&TokenKind::Equiv) {
            let rhs = self.implication()?;
            lhs = ConstraintExpr::Equiv(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn implication(&mut self) -> Result<ConstraintExpr, ParseError> {
        let mut lhs = self.disjunction()?;
        while self.eat(&TokenKind::Implies) {
            let rhs = self.disjunction()?;
            lhs = ConstraintExpr::Implies(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn disjunction(&mut self) -> Result<ConstraintExpr, ParseError> {
        let mut lhs = self.conjunction()?;
        while self.eat(&TokenKind::Or) {
            let rhs = self.conjunction()?;
            lhs = ConstraintExpr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn conjunction(&mut self) -> Result<ConstraintExpr, ParseError> {
        let mut lhs = self.unary()?;
        while self.eat(&TokenKind::And) {
            let rhs = self.unary()?;
            lhs = ConstraintExpr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<ConstraintExpr, ParseError> {
        match self.peek_kind() {
            TokenKind::Not => {
                self.advance();
                Ok(ConstraintExpr::Not(Box::new(self.unary()?)))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.equiv()?;
                if !self.eat(&TokenKind::RParen) {
                    return Err(self.unexpected(&["'&'", "'|'", "'=>'", "'<=>'", "')'"]));
                }
                Ok(inner)
            }
            TokenKind::Ident(_) | TokenKind::Quoted(_) => Ok(ConstraintExpr::Ref(self.reference()?)),
            _ => Err(self.unexpected(&["feature name", "'!'", "'('"])),
        }
    }
}
