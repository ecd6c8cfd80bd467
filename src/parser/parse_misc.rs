//! UNWIND, FOREACH, and bare RETURN statements.

use super::parse_expr::parse_expression;
use super::parse_return::parse_return_clause;
use super::Parser;
use crate::ast::Statement;
use crate::error::EngineResult;
use crate::lexer::Keyword;

/// `UNWIND <list-or-expr> AS var RETURN <returnList>`
pub(crate) fn parse_unwind(p: &mut Parser) -> EngineResult<Statement> {
    let list = parse_expression(p)?;
    p.expect_kw(Keyword::As)?;
    let var = p.expect_ident()?;
    p.expect_kw(Keyword::Return)?;
    let ret = parse_return_clause(p)?;
    Ok(Statement::Unwind { list, var, ret })
}

/// `FOREACH var IN <list-or-expr> <statement>` — the body is a full
/// statement consuming the rest of the segment.
pub(crate) fn parse_foreach(p: &mut Parser) -> EngineResult<Statement> {
    let var = p.expect_ident()?;
    p.expect_kw(Keyword::In)?;
    let list = parse_expression(p)?;
    let body = p.parse_statement()?;
    Ok(Statement::Foreach { var, list, body: Box::new(body) })
}

/// `RETURN <returnList>` with no MATCH.
pub(crate) fn parse_bare_return(p: &mut Parser) -> EngineResult<Statement> {
    let ret = parse_return_clause(p)?;
    Ok(Statement::Return { ret })
}
