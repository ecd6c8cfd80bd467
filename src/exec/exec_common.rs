//! Shared execution helpers: literal property filters, pattern candidate
//! collection through the access-path planner, and the small bind-stream
//! adapters the operator trees are assembled from.

use std::collections::VecDeque;

use crate::ast::{NodePattern, RelPattern, WhereClause};
use crate::error::EngineResult;
use crate::eval::{eval_expr, eval_where, Bindings};
use crate::exec::{BindStream, BoxBinds, ExecContext, Row, RowStream};
use crate::planner::{node_access_path, AccessPath};
use crate::value::{eq_values, NodeRecord, PropertyMap, RelRecord};

/// Evaluate a pattern's literal property map against env/params. Null
/// values stay in the map; a Null never equality-matches, which is exactly
/// the filter semantics the null-propagation rules require.
pub(crate) fn eval_pattern_props(
    props: &[(String, crate::ast::Expression)],
    env: &Bindings,
    params: &PropertyMap,
) -> EngineResult<PropertyMap> {
    let mut out = PropertyMap::new();
    for (key, expr) in props {
        out.insert(key.clone(), eval_expr(expr, env, params)?);
    }
    Ok(out)
}

/// AND over every wanted key: strict three-valued equality must answer a
/// definite true.
pub(crate) fn props_filter(record: &PropertyMap, wanted: &PropertyMap) -> bool {
    wanted.iter().all(|(key, want)| {
        record
            .get(key)
            .map(|have| eq_values(have, want) == Some(true))
            .unwrap_or(false)
    })
}

pub(crate) fn node_matches(node: &NodeRecord, pattern: &NodePattern, wanted: &PropertyMap) -> bool {
    pattern.labels.iter().all(|l| node.has_label(l)) && props_filter(&node.properties, wanted)
}

pub(crate) fn rel_matches(rel: &RelRecord, pattern: &RelPattern, wanted: &PropertyMap) -> bool {
    pattern
        .rel_type
        .as_deref()
        .map(|t| rel.rel_type == t)
        .unwrap_or(true)
        && props_filter(&rel.properties, wanted)
}

/// Candidate nodes for a pattern, index probe or label scan per the
/// planner, with the remaining literal equalities applied.
pub(crate) fn collect_pattern_nodes(
    ctx: &ExecContext<'_>,
    pattern: &NodePattern,
    env: &Bindings,
) -> EngineResult<Vec<NodeRecord>> {
    let wanted = eval_pattern_props(&pattern.props, env, &ctx.params)?;
    let source = match node_access_path(ctx.store, pattern)? {
        AccessPath::Scan(scan) => ctx.store.scan_nodes(&scan)?,
        AccessPath::IndexProbe { label, property, value } => {
            let probe = eval_expr(&value, env, &ctx.params)?;
            ctx.store.index_lookup(label.as_deref(), &property, &probe)?
        }
    };
    let mut out = Vec::new();
    for node in source {
        let node = node?;
        if node_matches(&node, pattern, &wanted) {
            out.push(node);
        }
    }
    Ok(out)
}

/// True only when the clause (if any) answers a definite true.
pub(crate) fn where_passes(
    clause: &Option<WhereClause>,
    env: &Bindings,
    params: &PropertyMap,
) -> EngineResult<bool> {
    match clause {
        Some(w) => Ok(eval_where(w, env, params)?.is_true()),
        None => Ok(true),
    }
}

/// Yields the given environment exactly once.
pub(crate) struct OnceBinds {
    env: Option<Bindings>,
}

impl OnceBinds {
    pub(crate) fn new(env: Bindings) -> Self {
        OnceBinds { env: Some(env) }
    }
}

impl BindStream for OnceBinds {
    fn next_bindings(&mut self) -> EngineResult<Option<Bindings>> {
        Ok(self.env.take())
    }
}

/// Yields a pre-built queue of environments in order.
pub(crate) struct VecBinds {
    items: VecDeque<Bindings>,
}

impl VecBinds {
    pub(crate) fn new(items: Vec<Bindings>) -> Self {
        VecBinds { items: items.into() }
    }
}

impl BindStream for VecBinds {
    fn next_bindings(&mut self) -> EngineResult<Option<Bindings>> {
        Ok(self.items.pop_front())
    }
}

/// Adapter for pattern statements without a RETURN: produces no rows but
/// still drains its source so the final bindings carry over.
pub(crate) struct BindOnly<'a> {
    binds: BoxBinds<'a>,
    last: Option<Bindings>,
    done: bool,
}

impl<'a> BindOnly<'a> {
    pub(crate) fn new(binds: BoxBinds<'a>) -> Self {
        BindOnly { binds, last: None, done: false }
    }
}

impl<'a> RowStream for BindOnly<'a> {
    fn next_pair(&mut self) -> EngineResult<Option<(Row, Bindings)>> {
        if !self.done {
            while let Some(env) = self.binds.next_bindings()? {
                self.last = Some(env);
            }
            self.done = true;
        }
        Ok(None)
    }

    fn carry_env(&self) -> Option<Bindings> {
        self.last.clone()
    }
}
