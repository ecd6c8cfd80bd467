//! MATCH statement family: single node/relationship patterns, multi-hop
//! chains, comma-separated pattern products, and variable-length paths,
//! each with the optional WHERE and a RETURN / SET / DELETE tail.
//!
//! Ambiguity rule: a single-hop chain whose RETURN (and WHERE) touch only
//! the relationship variable, with unconstrained endpoints, re-parses as a
//! plain relationship scan.

use std::collections::BTreeSet;

use super::parse_expr::parse_expression;
use super::parse_return::parse_return_clause;
use super::parse_where::parse_where;
use super::Parser;
use crate::ast::{
    Expression, MatchTarget, NodePattern, RelDir, RelPattern, ReturnClause, SetItem, Statement,
    WhereClause,
};
use crate::error::EngineResult;
use crate::lexer::{Keyword, TokenKind};

pub(crate) fn parse_match(p: &mut Parser, optional: bool) -> EngineResult<Statement> {
    // `p = (...)` path variable prefix.
    let path_var = match (p.peek(), p.peek_at(1)) {
        (Some(TokenKind::Ident(name)), Some(TokenKind::Eq)) => {
            let name = name.clone();
            p.advance();
            p.advance();
            Some(name)
        }
        _ => None,
    };

    let start = parse_node_pattern(p)?;

    let mut hops: Vec<(ParsedRel, NodePattern)> = Vec::new();
    while rel_follows(p) {
        let rel = parse_rel_pattern(p)?;
        let node = parse_node_pattern(p)?;
        hops.push((rel, node));
    }

    if hops.is_empty() && p.at(&TokenKind::Comma) {
        if path_var.is_some() {
            return p.fail("path variable cannot span multiple patterns");
        }
        let mut patterns = vec![start];
        while p.eat(&TokenKind::Comma) {
            patterns.push(parse_node_pattern(p)?);
        }
        let where_clause = parse_optional_where(p)?;
        p.expect_kw(Keyword::Return)?;
        let ret = parse_return_clause(p)?;
        return Ok(Statement::MatchMultiReturn { optional, patterns, where_clause, ret });
    }

    if !hops.is_empty() {
        return finish_pattern_chain(p, optional, path_var, start, hops);
    }

    // Plain single-node pattern.
    let where_clause = parse_optional_where(p)?;
    match p.peek() {
        Some(TokenKind::Keyword(Keyword::Delete)) => {
            p.advance();
            let delete_var = p.expect_ident()?;
            Ok(Statement::MatchDelete { target: MatchTarget::Node(start), where_clause, delete_var })
        }
        Some(TokenKind::Keyword(Keyword::Set)) => {
            p.advance();
            let sets = parse_set_items(p)?;
            let ret = parse_optional_return(p)?;
            Ok(Statement::MatchSet { pattern: start, where_clause, sets, ret })
        }
        Some(TokenKind::Keyword(Keyword::Return)) => {
            p.advance();
            let ret = parse_return_clause(p)?;
            Ok(Statement::MatchReturn { optional, target: MatchTarget::Node(start), where_clause, ret })
        }
        _ => p.fail("MATCH requires RETURN, SET, or DELETE"),
    }
}

fn finish_pattern_chain(
    p: &mut Parser,
    optional: bool,
    path_var: Option<String>,
    start: NodePattern,
    hops: Vec<(ParsedRel, NodePattern)>,
) -> EngineResult<Statement> {
    let var_length = hops.iter().any(|(rel, _)| rel.var_length);
    if var_length && hops.len() > 1 {
        return p.fail("variable-length relationship must be the only hop");
    }

    if var_length {
        let path_var = match path_var {
            Some(v) => v,
            None => return p.fail("variable-length pattern requires a path variable"),
        };
        let (rel, end) = hops.into_iter().next().expect("one hop checked above");
        let where_clause = parse_optional_where(p)?;
        let ret = if p.eat_kw(Keyword::Return) { Some(parse_return_clause(p)?) } else { None };
        if ret.is_none() && !p.at_end() {
            return p.fail("expected RETURN");
        }
        return Ok(Statement::MatchPath {
            optional,
            path_var,
            start,
            rel: rel.pat,
            end,
            where_clause,
            ret,
        });
    }

    let where_clause = parse_optional_where(p)?;

    if p.eat_kw(Keyword::Delete) {
        let delete_var = p.expect_ident()?;
        // Only a bare relationship scan can be deleted through a chain.
        if hops.len() == 1 && endpoints_unconstrained(&start, &hops) && path_var.is_none() {
            let rel = hops.into_iter().next().unwrap().0.pat;
            return Ok(Statement::MatchDelete { target: MatchTarget::Rel(rel), where_clause, delete_var });
        }
        return p.fail("DELETE requires a single node or relationship pattern");
    }

    p.expect_kw(Keyword::Return)?;
    let ret = parse_return_clause(p)?;

    // Single-hop ambiguity: when only the relationship variable is used and
    // the endpoints constrain nothing, this is really a relationship scan.
    if hops.len() == 1 && path_var.is_none() && endpoints_unconstrained(&start, &hops) {
        let rel_var = hops[0].0.pat.var.clone();
        if let Some(rel_var) = rel_var {
            let mut used = BTreeSet::new();
            vars_in_return(&ret, &mut used);
            if let Some(w) = &where_clause {
                vars_in_where(w, &mut used);
            }
            if !used.is_empty() && used.iter().all(|v| *v == rel_var) {
                let rel = hops.into_iter().next().unwrap().0.pat;
                return Ok(Statement::MatchReturn {
                    optional,
                    target: MatchTarget::Rel(rel),
                    where_clause,
                    ret,
                });
            }
        }
    }

    Ok(Statement::MatchChain {
        optional,
        path_var,
        start,
        hops: hops.into_iter().map(|(rel, node)| (rel.pat, node)).collect(),
        where_clause,
        ret,
    })
}

fn endpoints_unconstrained(start: &NodePattern, hops: &[(ParsedRel, NodePattern)]) -> bool {
    let end = &hops[0].1;
    start.labels.is_empty()
        && start.props.is_empty()
        && end.labels.is_empty()
        && end.props.is_empty()
}

pub(crate) fn parse_optional_where(p: &mut Parser) -> EngineResult<Option<WhereClause>> {
    if p.eat_kw(Keyword::Where) {
        Ok(Some(parse_where(p)?))
    } else {
        Ok(None)
    }
}

pub(crate) fn parse_optional_return(p: &mut Parser) -> EngineResult<Option<ReturnClause>> {
    if p.eat_kw(Keyword::Return) {
        Ok(Some(parse_return_clause(p)?))
    } else {
        Ok(None)
    }
}

/// `(var? (:Label)* ({prop: expr, ...})?)`
pub(crate) fn parse_node_pattern(p: &mut Parser) -> EngineResult<NodePattern> {
    p.expect(&TokenKind::LParen)?;
    let mut pattern = NodePattern::default();
    if let Some(TokenKind::Ident(name)) = p.peek() {
        pattern.var = Some(name.clone());
        p.advance();
    }
    while p.eat(&TokenKind::Colon) {
        pattern.labels.push(p.expect_ident()?);
    }
    if p.at(&TokenKind::LBrace) {
        pattern.props = parse_property_entries(p)?;
    }
    p.expect(&TokenKind::RParen)?;
    Ok(pattern)
}

pub(crate) struct ParsedRel {
    pub pat: RelPattern,
    pub var_length: bool,
}

// True when the upcoming tokens open a relationship: `-[` or `<-[`.
fn rel_follows(p: &mut Parser) -> bool {
    match (p.peek(), p.peek_at(1)) {
        (Some(TokenKind::Dash), Some(TokenKind::LBracket)) => true,
        (Some(TokenKind::Lt), Some(TokenKind::Dash)) => true,
        _ => false,
    }
}

/// `-[var? (:Type)? (*)? ({...})?]->`, `<-[...]-`, or undirected `-[...]-`.
pub(crate) fn parse_rel_pattern(p: &mut Parser) -> EngineResult<ParsedRel> {
    let incoming = p.eat(&TokenKind::Lt);
    p.expect(&TokenKind::Dash)?;
    p.expect(&TokenKind::LBracket)?;

    let mut var = None;
    if let Some(TokenKind::Ident(name)) = p.peek() {
        var = Some(name.clone());
        p.advance();
    }
    let mut rel_type = None;
    if p.eat(&TokenKind::Colon) {
        rel_type = Some(p.expect_ident()?);
    }
    let var_length = p.eat(&TokenKind::Star);
    let props = if p.at(&TokenKind::LBrace) { parse_property_entries(p)? } else { Vec::new() };

    p.expect(&TokenKind::RBracket)?;
    p.expect(&TokenKind::Dash)?;
    let outgoing = p.eat(&TokenKind::Gt);

    let dir = match (incoming, outgoing) {
        (true, true) => return p.fail("relationship cannot point both ways"),
        (true, false) => RelDir::In,
        (false, true) => RelDir::Out,
        (false, false) => RelDir::Either,
    };
    Ok(ParsedRel { pat: RelPattern { var, rel_type, props, dir }, var_length })
}

/// `{key: expr, ...}` including the braces.
pub(crate) fn parse_property_entries(p: &mut Parser) -> EngineResult<Vec<(String, Expression)>> {
    p.expect(&TokenKind::LBrace)?;
    let mut entries = Vec::new();
    if !p.at(&TokenKind::RBrace) {
        loop {
            let key = p.expect_ident()?;
            p.expect(&TokenKind::Colon)?;
            entries.push((key, parse_expression(p)?));
            if !p.eat(&TokenKind::Comma) {
                break;
            }
        }
    }
    p.expect(&TokenKind::RBrace)?;
    Ok(entries)
}

/// `var.prop = expr (, var.prop = expr)*`
pub(crate) fn parse_set_items(p: &mut Parser) -> EngineResult<Vec<SetItem>> {
    let mut items = Vec::new();
    loop {
        let var = p.expect_ident()?;
        p.expect(&TokenKind::Dot)?;
        let prop = p.expect_ident()?;
        p.expect(&TokenKind::Eq)?;
        items.push(SetItem { var, prop, value: parse_expression(p)? });
        if !p.eat(&TokenKind::Comma) {
            break;
        }
    }
    Ok(items)
}

fn vars_in_expr(expr: &Expression, out: &mut BTreeSet<String>) {
    match expr {
        Expression::Variable(v) | Expression::Property(v, _) => {
            out.insert(v.clone());
        }
        Expression::Labels(v)
        | Expression::TypeOf(v)
        | Expression::Id(v)
        | Expression::Nodes(v) => {
            out.insert(v.clone());
        }
        Expression::Arith { left, right, .. } => {
            vars_in_expr(left, out);
            vars_in_expr(right, out);
        }
        Expression::Neg(inner) | Expression::Length(inner) => vars_in_expr(inner, out),
        Expression::ListLiteral(items) => {
            for item in items {
                vars_in_expr(item, out);
            }
        }
        Expression::Aggregate { arg: Some(arg), .. } => vars_in_expr(arg, out),
        _ => {}
    }
}

fn vars_in_return(ret: &ReturnClause, out: &mut BTreeSet<String>) {
    for item in &ret.items {
        vars_in_expr(&item.expr, out);
    }
    for (expr, _) in &ret.order_by {
        vars_in_expr(expr, out);
    }
}

fn vars_in_where(clause: &WhereClause, out: &mut BTreeSet<String>) {
    match clause {
        WhereClause::Condition { left, right, .. } => {
            vars_in_expr(left, out);
            if let Some(right) = right {
                vars_in_expr(right, out);
            }
        }
        WhereClause::And(a, b) | WhereClause::Or(a, b) => {
            vars_in_where(a, out);
            vars_in_where(b, out);
        }
        WhereClause::Not(inner) => vars_in_where(inner, out),
    }
}
