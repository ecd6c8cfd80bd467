//! RETURN clause parsing: optional DISTINCT, a non-empty item list with
//! optional AS aliases, then optional ORDER BY / SKIP / LIMIT trailers.

use super::parse_expr::parse_expression;
use super::Parser;
use crate::ast::{ReturnClause, ReturnItem};
use crate::error::EngineResult;
use crate::lexer::Keyword;

/// Parse the clause body; the RETURN keyword itself is already consumed.
pub(crate) fn parse_return_clause(p: &mut Parser) -> EngineResult<ReturnClause> {
    let distinct = p.eat_kw(Keyword::Distinct);
    let mut items = Vec::new();
    loop {
        let expr = parse_expression(p)?;
        let alias = if p.eat_kw(Keyword::As) { Some(p.expect_ident()?) } else { None };
        items.push(ReturnItem { expr, alias });
        if !p.eat(&crate::lexer::TokenKind::Comma) {
            break;
        }
    }

    let mut order_by = Vec::new();
    if p.eat_kw(Keyword::Order) {
        p.expect_kw(Keyword::By)?;
        loop {
            let expr = parse_expression(p)?;
            let ascending = if p.eat_kw(Keyword::Desc) {
                false
            } else {
                p.eat_kw(Keyword::Asc);
                true
            };
            order_by.push((expr, ascending));
            if !p.eat(&crate::lexer::TokenKind::Comma) {
                break;
            }
        }
    }

    let skip = if p.eat_kw(Keyword::Skip) { Some(parse_expression(p)?) } else { None };
    let limit = if p.eat_kw(Keyword::Limit) { Some(parse_expression(p)?) } else { None };

    Ok(ReturnClause { distinct, items, order_by, skip, limit })
}
