//! Value expression parsing: add/sub over mul/div over unary over primary.
//! Primaries cover literals, parameters, `*`, parenthesized expressions,
//! list literals, function calls, property access, and bare identifiers.

use super::Parser;
use crate::ast::{AggFunc, ArithOp, Expression};
use crate::error::EngineResult;
use crate::lexer::{Keyword, TokenKind};
use crate::value::Value;

pub(crate) fn parse_expression(p: &mut Parser) -> EngineResult<Expression> {
    let mut left = parse_multiplicative(p)?;
    loop {
        let op = match p.peek() {
            Some(TokenKind::Plus) => ArithOp::Add,
            Some(TokenKind::Dash) => ArithOp::Sub,
            _ => break,
        };
        p.advance();
        let right = parse_multiplicative(p)?;
        left = Expression::Arith { left: Box::new(left), op, right: Box::new(right) };
    }
    Ok(left)
}

fn parse_multiplicative(p: &mut Parser) -> EngineResult<Expression> {
    let mut left = parse_unary(p)?;
    loop {
        let op = match p.peek() {
            Some(TokenKind::Star) => ArithOp::Mul,
            Some(TokenKind::Slash) => ArithOp::Div,
            _ => break,
        };
        p.advance();
        let right = parse_unary(p)?;
        left = Expression::Arith { left: Box::new(left), op, right: Box::new(right) };
    }
    Ok(left)
}

fn parse_unary(p: &mut Parser) -> EngineResult<Expression> {
    if p.eat(&TokenKind::Dash) {
        return Ok(Expression::Neg(Box::new(parse_unary(p)?)));
    }
    parse_primary(p)
}

fn parse_primary(p: &mut Parser) -> EngineResult<Expression> {
    match p.peek().cloned() {
        Some(TokenKind::Int(n)) => {
            p.advance();
            Ok(Expression::Literal(Value::Int(n)))
        }
        Some(TokenKind::Float(x)) => {
            p.advance();
            Ok(Expression::Literal(Value::Float(x)))
        }
        Some(TokenKind::Str(s)) => {
            p.advance();
            Ok(Expression::Literal(Value::Str(s)))
        }
        Some(TokenKind::Keyword(Keyword::True)) => {
            p.advance();
            Ok(Expression::Literal(Value::Bool(true)))
        }
        Some(TokenKind::Keyword(Keyword::False)) => {
            p.advance();
            Ok(Expression::Literal(Value::Bool(false)))
        }
        Some(TokenKind::Keyword(Keyword::Null)) => {
            p.advance();
            Ok(Expression::Literal(Value::Null))
        }
        Some(TokenKind::Param(name)) => {
            p.advance();
            Ok(Expression::Parameter(name))
        }
        Some(TokenKind::Star) => {
            p.advance();
            Ok(Expression::All)
        }
        Some(TokenKind::LBracket) => {
            p.advance();
            let mut items = Vec::new();
            if !p.at(&TokenKind::RBracket) {
                loop {
                    items.push(parse_expression(p)?);
                    if !p.eat(&TokenKind::Comma) {
                        break;
                    }
                }
            }
            p.expect(&TokenKind::RBracket)?;
            Ok(Expression::ListLiteral(items))
        }
        Some(TokenKind::LParen) => {
            p.advance();
            let inner = parse_expression(p)?;
            p.expect(&TokenKind::RParen)?;
            Ok(inner)
        }
        Some(TokenKind::Ident(name)) => {
            p.advance();
            if p.at(&TokenKind::LParen) {
                return parse_function(p, &name);
            }
            if p.eat(&TokenKind::Dot) {
                let prop = p.expect_ident()?;
                return Ok(Expression::Property(name, prop));
            }
            Ok(Expression::Variable(name))
        }
        _ => p.fail("expected expression"),
    }
}

fn parse_function(p: &mut Parser, name: &str) -> EngineResult<Expression> {
    p.expect(&TokenKind::LParen)?;
    let lowered = name.to_ascii_lowercase();
    let agg = match lowered.as_str() {
        "count" => Some(AggFunc::Count),
        "sum" => Some(AggFunc::Sum),
        "min" => Some(AggFunc::Min),
        "max" => Some(AggFunc::Max),
        "avg" => Some(AggFunc::Avg),
        "collect" => Some(AggFunc::Collect),
        _ => None,
    };
    if let Some(func) = agg {
        let distinct = p.eat_kw(Keyword::Distinct);
        let arg = if p.eat(&TokenKind::Star) {
            // count(*) counts rows; the other aggregators require a value.
            if func != AggFunc::Count {
                return p.fail(format!("{} requires an argument", lowered));
            }
            None
        } else {
            Some(Box::new(parse_expression(p)?))
        };
        p.expect(&TokenKind::RParen)?;
        return Ok(Expression::Aggregate { func, distinct, arg });
    }
    let expr = match lowered.as_str() {
        "labels" => Expression::Labels(p.expect_ident()?),
        "type" => Expression::TypeOf(p.expect_ident()?),
        "id" => Expression::Id(p.expect_ident()?),
        "nodes" => Expression::Nodes(p.expect_ident()?),
        "length" => Expression::Length(Box::new(parse_expression(p)?)),
        _ => return p.fail(format!("unknown function '{}'", name)),
    };
    p.expect(&TokenKind::RParen)?;
    Ok(expr)
}
