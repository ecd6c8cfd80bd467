//! WHERE predicate parsing with the precedence chain OR > AND > NOT >
//! comparison. IS NULL / IS NOT NULL are postfix, STARTS WITH / ENDS WITH /
//! CONTAINS / IN are infix, and a parenthesized predicate restarts the
//! chain.

use super::parse_expr::parse_expression;
use super::Parser;
use crate::ast::{CompOp, WhereClause};
use crate::error::EngineResult;
use crate::lexer::{Keyword, TokenKind};

pub(crate) fn parse_where(p: &mut Parser) -> EngineResult<WhereClause> {
    parse_or(p)
}

fn parse_or(p: &mut Parser) -> EngineResult<WhereClause> {
    let mut left = parse_and(p)?;
    while p.eat_kw(Keyword::Or) {
        let right = parse_and(p)?;
        left = WhereClause::Or(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_and(p: &mut Parser) -> EngineResult<WhereClause> {
    let mut left = parse_not(p)?;
    while p.eat_kw(Keyword::And) {
        let right = parse_not(p)?;
        left = WhereClause::And(Box::new(left), Box::new(right));
    }
    Ok(left)
}

fn parse_not(p: &mut Parser) -> EngineResult<WhereClause> {
    if p.eat_kw(Keyword::Not) {
        return Ok(WhereClause::Not(Box::new(parse_not(p)?)));
    }
    parse_comparison(p)
}

fn parse_comparison(p: &mut Parser) -> EngineResult<WhereClause> {
    // `(` may open a nested predicate or a parenthesized value expression;
    // try the predicate first and roll back if it does not parse.
    if p.at(&TokenKind::LParen) {
        let mark = p.save();
        p.advance();
        if let Ok(inner) = parse_or(p) {
            if p.eat(&TokenKind::RParen) {
                return Ok(inner);
            }
        }
        p.restore(mark);
    }

    let left = parse_expression(p)?;

    if p.eat_kw(Keyword::Is) {
        let negated = p.eat_kw(Keyword::Not);
        p.expect_kw(Keyword::Null)?;
        let op = if negated { CompOp::IsNotNull } else { CompOp::IsNull };
        return Ok(WhereClause::Condition { left, op, right: None });
    }

    let op = match p.peek() {
        Some(TokenKind::Eq) => {
            p.advance();
            CompOp::Eq
        }
        Some(TokenKind::Lt) => {
            p.advance();
            if p.eat(&TokenKind::Gt) {
                CompOp::Ne
            } else if p.eat(&TokenKind::Eq) {
                CompOp::Le
            } else {
                CompOp::Lt
            }
        }
        Some(TokenKind::Gt) => {
            p.advance();
            if p.eat(&TokenKind::Eq) {
                CompOp::Ge
            } else {
                CompOp::Gt
            }
        }
        Some(TokenKind::Keyword(Keyword::In)) => {
            p.advance();
            CompOp::In
        }
        Some(TokenKind::Keyword(Keyword::Starts)) => {
            p.advance();
            p.expect_kw(Keyword::With)?;
            CompOp::StartsWith
        }
        Some(TokenKind::Keyword(Keyword::Ends)) => {
            p.advance();
            p.expect_kw(Keyword::With)?;
            CompOp::EndsWith
        }
        Some(TokenKind::Keyword(Keyword::Contains)) => {
            p.advance();
            CompOp::Contains
        }
        _ => return p.fail("expected comparison operator"),
    };
    let right = parse_expression(p)?;
    Ok(WhereClause::Condition { left, op, right: Some(right) })
}
