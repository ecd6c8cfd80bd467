//! CREATE statements: node-only and single-relationship forms, each with
//! optional trailing SET updates and an optional RETURN.

use super::parse_match::{parse_node_pattern, parse_optional_return, parse_rel_pattern, parse_set_items};
use super::Parser;
use crate::ast::Statement;
use crate::error::EngineResult;
use crate::lexer::{Keyword, TokenKind};

pub(crate) fn parse_create(p: &mut Parser) -> EngineResult<Statement> {
    let node = parse_node_pattern(p)?;

    if p.at(&TokenKind::Dash) || p.at(&TokenKind::Lt) {
        let rel = parse_rel_pattern(p)?;
        if rel.var_length {
            return p.fail("CREATE cannot use a variable-length relationship");
        }
        let end = parse_node_pattern(p)?;
        let set = parse_trailing_set(p)?;
        let ret = parse_optional_return(p)?;
        return Ok(Statement::CreateRel { start: node, rel: rel.pat, end, set, ret });
    }

    let set = parse_trailing_set(p)?;
    let ret = parse_optional_return(p)?;
    Ok(Statement::Create { node, set, ret })
}

fn parse_trailing_set(p: &mut Parser) -> EngineResult<Vec<crate::ast::SetItem>> {
    if p.eat_kw(Keyword::Set) {
        parse_set_items(p)
    } else {
        Ok(Vec::new())
    }
}
