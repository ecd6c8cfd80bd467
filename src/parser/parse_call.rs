//! CALL subqueries: a brace-delimited inner script followed by a mandatory
//! outer RETURN clause. The inner body is collected by balanced-brace scan
//! and parsed as its own `;`-separated script.

use super::parse_return::parse_return_clause;
use super::Parser;
use crate::ast::Statement;
use crate::error::EngineResult;
use crate::lexer::{Keyword, Token, TokenKind};

pub(crate) fn parse_call(p: &mut Parser) -> EngineResult<Statement> {
    let inner = p.take_braced()?;
    let mut subquery = Vec::new();
    for segment in split_segments(inner) {
        if segment.is_empty() {
            continue;
        }
        let mut inner_parser = Parser::new(segment);
        subquery.push(inner_parser.parse_statement_with_unions()?);
    }
    if subquery.is_empty() {
        return p.fail("CALL body must contain at least one statement");
    }
    p.expect_kw(Keyword::Return)?;
    let ret = parse_return_clause(p)?;
    Ok(Statement::Call { subquery, ret })
}

fn split_segments(tokens: Vec<Token>) -> Vec<Vec<Token>> {
    let mut segments = Vec::new();
    let mut current = Vec::new();
    let mut depth = 0i32;
    for token in tokens {
        match token.kind {
            TokenKind::LBrace => {
                depth += 1;
                current.push(token);
            }
            TokenKind::RBrace => {
                depth -= 1;
                current.push(token);
            }
            TokenKind::Semicolon if depth == 0 => {
                segments.push(std::mem::take(&mut current));
            }
            _ => current.push(token),
        }
    }
    segments.push(current);
    segments
}
