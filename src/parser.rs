//! Recursive-descent parser for the Cypher subset.
//! The hub owns the token cursor and the script-level driver: it splits a
//! script into `;`-separated statements (brace-depth aware, so CALL bodies
//! survive), parses each one through the per-family modules, and folds
//! `UNION [ALL]` pairs left-associatively. Parser state is a restorable
//! position cursor, which the MATCH family uses to roll back ambiguous
//! chain parses.

use tracing::debug;

use crate::ast::Statement;
use crate::error::{EngineError, EngineResult};
use crate::lexer::{tokenize, Keyword, Token, TokenKind};

mod parse_call;
mod parse_create;
mod parse_expr;
mod parse_match;
mod parse_merge;
mod parse_misc;
mod parse_return;
mod parse_where;

#[cfg(test)]
mod tests;

/// Parse a full script: zero or more statements separated by `;`.
/// Empty segments (leading/trailing/doubled semicolons) are dropped.
pub fn parse_script(input: &str) -> EngineResult<Vec<Statement>> {
    let tokens = tokenize(input)?;
    let mut statements = Vec::new();
    for segment in split_on_semicolons(tokens) {
        if segment.is_empty() {
            continue;
        }
        let mut parser = Parser::new(segment);
        statements.push(parser.parse_statement_with_unions()?);
    }
    debug!(target: "cyphera::parse", statements = statements.len(), "parsed script");
    Ok(statements)
}

/// Parse exactly one statement (still honoring UNION chains).
pub fn parse_statement(input: &str) -> EngineResult<Statement> {
    let mut statements = parse_script(input)?;
    match statements.len() {
        1 => Ok(statements.remove(0)),
        0 => Err(EngineError::syntax("empty statement", 0)),
        _ => Err(EngineError::syntax("expected a single statement", 0)),
    }
}

// Split at top-level semicolons only; a `;` inside a CALL { ... } body
// belongs to the inner script.
fn split_on_semicolons(tokens: Vec<Token>) -> Vec<Vec<Token>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    let mut brace_depth = 0i32;
    for token in tokens {
        match token.kind {
            TokenKind::LBrace => {
                brace_depth += 1;
                current.push(token);
            }
            TokenKind::RBrace => {
                brace_depth -= 1;
                current.push(token);
            }
            TokenKind::Semicolon if brace_depth == 0 => {
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(token),
        }
    }
    segments.push(current);
    segments
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub(crate) fn new(tokens: Vec<Token>) -> Self {
        Parser { tokens, pos: 0 }
    }

    pub(crate) fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    pub(crate) fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    pub(crate) fn peek_at(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    pub(crate) fn advance(&mut self) -> Option<TokenKind> {
        let kind = self.tokens.get(self.pos).map(|t| t.kind.clone());
        if kind.is_some() {
            self.pos += 1;
        }
        kind
    }

    pub(crate) fn save(&self) -> usize {
        self.pos
    }

    pub(crate) fn restore(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub(crate) fn at(&self, kind: &TokenKind) -> bool {
        self.peek() == Some(kind)
    }

    pub(crate) fn at_kw(&self, kw: Keyword) -> bool {
        matches!(self.peek(), Some(TokenKind::Keyword(k)) if *k == kw)
    }

    pub(crate) fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_kw(&mut self, kw: Keyword) -> bool {
        if self.at_kw(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: &TokenKind) -> EngineResult<()> {
        if self.eat(kind) {
            Ok(())
        } else {
            self.fail(format!("expected '{}'", kind))
        }
    }

    pub(crate) fn expect_kw(&mut self, kw: Keyword) -> EngineResult<()> {
        if self.eat_kw(kw) {
            Ok(())
        } else {
            self.fail(format!("expected {:?}", kw))
        }
    }

    pub(crate) fn expect_ident(&mut self) -> EngineResult<String> {
        match self.peek() {
            Some(TokenKind::Ident(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => self.fail("expected identifier"),
        }
    }

    /// Byte offset of the current token, or of the end of input.
    pub(crate) fn position(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.pos)
            .unwrap_or(0)
    }

    pub(crate) fn fail<T, S: Into<String>>(&self, message: S) -> EngineResult<T> {
        let mut message = message.into();
        if let Some(kind) = self.peek() {
            message.push_str(&format!(" near '{}'", kind));
        } else {
            message.push_str(" at end of statement");
        }
        Err(EngineError::syntax(message, self.position()))
    }

    /// One statement plus any trailing `UNION [ALL]` arms. ORDER/SKIP/LIMIT
    /// written after the final arm shape the whole union, so they are
    /// lifted off that arm's RETURN clause onto the Union node.
    pub(crate) fn parse_statement_with_unions(&mut self) -> EngineResult<Statement> {
        let mut left = self.parse_statement()?;
        while self.eat_kw(Keyword::Union) {
            let all = self.eat_kw(Keyword::All);
            let mut right = self.parse_statement()?;
            let (order_by, skip, limit) = lift_trailing_shape(&mut right);
            left = Statement::Union {
                left: Box::new(left),
                right: Box::new(right),
                all,
                order_by,
                skip,
                limit,
            };
        }
        if !self.at_end() {
            return self.fail("unexpected trailing input");
        }
        Ok(left)
    }

    /// Consume a `{ ... }` group and hand back the tokens between the
    /// braces; nested braces stay balanced.
    pub(crate) fn take_braced(&mut self) -> EngineResult<Vec<Token>> {
        self.expect(&TokenKind::LBrace)?;
        let mut depth = 1i32;
        let mut inner = Vec::new();
        while let Some(token) = self.tokens.get(self.pos) {
            match token.kind {
                TokenKind::LBrace => depth += 1,
                TokenKind::RBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return Ok(inner);
                    }
                }
                _ => {}
            }
            inner.push(token.clone());
            self.pos += 1;
        }
        self.fail("unbalanced '{' in CALL body")
    }

    pub(crate) fn parse_statement(&mut self) -> EngineResult<Statement> {
        match self.peek() {
            Some(TokenKind::Keyword(Keyword::Match)) => {
                self.pos += 1;
                parse_match::parse_match(self, false)
            }
            Some(TokenKind::Keyword(Keyword::Optional)) => {
                self.pos += 1;
                self.expect_kw(Keyword::Match)?;
                parse_match::parse_match(self, true)
            }
            Some(TokenKind::Keyword(Keyword::Create)) => {
                self.pos += 1;
                parse_create::parse_create(self)
            }
            Some(TokenKind::Keyword(Keyword::Merge)) => {
                self.pos += 1;
                parse_merge::parse_merge(self)
            }
            Some(TokenKind::Keyword(Keyword::Unwind)) => {
                self.pos += 1;
                parse_misc::parse_unwind(self)
            }
            Some(TokenKind::Keyword(Keyword::Foreach)) => {
                self.pos += 1;
                parse_misc::parse_foreach(self)
            }
            Some(TokenKind::Keyword(Keyword::Return)) => {
                self.pos += 1;
                parse_misc::parse_bare_return(self)
            }
            Some(TokenKind::Keyword(Keyword::Call)) => {
                self.pos += 1;
                parse_call::parse_call(self)
            }
            Some(_) => self.fail("expected a statement"),
            None => Err(EngineError::syntax("empty statement", 0)),
        }
    }
}

// Pull ORDER/SKIP/LIMIT off the statement's trailing RETURN clause, if any.
fn lift_trailing_shape(
    stmt: &mut Statement,
) -> (
    Vec<(crate::ast::Expression, bool)>,
    Option<crate::ast::Expression>,
    Option<crate::ast::Expression>,
) {
    let ret = match stmt {
        Statement::MatchReturn { ret, .. }
        | Statement::MatchChain { ret, .. }
        | Statement::MatchMultiReturn { ret, .. }
        | Statement::Unwind { ret, .. }
        | Statement::Return { ret }
        | Statement::Call { ret, .. } => Some(ret),
        Statement::MatchPath { ret, .. } => ret.as_mut(),
        Statement::Create { ret, .. }
        | Statement::CreateRel { ret, .. }
        | Statement::Merge { ret, .. }
        | Statement::MergeRel { ret, .. }
        | Statement::MatchSet { ret, .. } => ret.as_mut(),
        _ => None,
    };
    match ret {
        Some(ret) => (
            std::mem::take(&mut ret.order_by),
            ret.skip.take(),
            ret.limit.take(),
        ),
        None => (Vec::new(), None, None),
    }
}
