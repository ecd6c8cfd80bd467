//! MERGE statements: node and relationship forms with zero or more
//! ON CREATE SET / ON MATCH SET trailers and an optional RETURN.

use super::parse_match::{parse_node_pattern, parse_optional_return, parse_rel_pattern, parse_set_items};
use super::Parser;
use crate::ast::{SetItem, Statement};
use crate::error::EngineResult;
use crate::lexer::{Keyword, TokenKind};

pub(crate) fn parse_merge(p: &mut Parser) -> EngineResult<Statement> {
    let node = parse_node_pattern(p)?;

    if p.at(&TokenKind::Dash) || p.at(&TokenKind::Lt) {
        let rel = parse_rel_pattern(p)?;
        if rel.var_length {
            return p.fail("MERGE cannot use a variable-length relationship");
        }
        let end = parse_node_pattern(p)?;
        let (on_create, on_match) = parse_merge_trailers(p)?;
        let ret = parse_optional_return(p)?;
        return Ok(Statement::MergeRel { start: node, rel: rel.pat, end, on_create, on_match, ret });
    }

    let (on_create, on_match) = parse_merge_trailers(p)?;
    let ret = parse_optional_return(p)?;
    Ok(Statement::Merge { node, on_create, on_match, ret })
}

fn parse_merge_trailers(p: &mut Parser) -> EngineResult<(Vec<SetItem>, Vec<SetItem>)> {
    let mut on_create = Vec::new();
    let mut on_match = Vec::new();
    while p.eat_kw(Keyword::On) {
        if p.eat_kw(Keyword::Create) {
            p.expect_kw(Keyword::Set)?;
            on_create.extend(parse_set_items(p)?);
        } else if p.eat_kw(Keyword::Match) {
            p.expect_kw(Keyword::Set)?;
            on_match.extend(parse_set_items(p)?);
        } else {
            return p.fail("expected CREATE or MATCH after ON");
        }
    }
    Ok((on_create, on_match))
}
