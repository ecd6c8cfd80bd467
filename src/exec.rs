//! Pull-based execution engine.
//! Every statement compiles to a small tree of operators. Binding
//! environments flow through the pattern-matching operators (`BindStream`);
//! projected rows flow out of the RETURN shaping layer (`RowStream`).
//! Operators produce at most one item per poll; aggregation, DISTINCT, and
//! ORDER BY materialize inside their operator on first poll, everything
//! else streams.

use std::sync::Arc;

use serde_json::json;
use tracing::debug;

use crate::ast::{MatchTarget, Statement};
use crate::error::EngineResult;
use crate::eval::Bindings;
use crate::storage::GraphStore;
use crate::value::{canonical_key, PropertyMap, Value};

pub(crate) mod exec_agg;
pub(crate) mod exec_call;
pub(crate) mod exec_chain;
pub(crate) mod exec_common;
pub(crate) mod exec_match;
pub(crate) mod exec_path;
pub(crate) mod exec_return;
pub(crate) mod exec_union;
pub(crate) mod exec_unwind;
pub(crate) mod exec_write;

/// One result row: an ordered alias -> Value mapping. Complete when
/// yielded, never partially constructed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    columns: Vec<(String, Value)>,
}

impl Row {
    pub(crate) fn push<S: Into<String>>(&mut self, alias: S, value: Value) {
        self.columns.push((alias.into(), value));
    }

    pub fn get(&self, alias: &str) -> Option<&Value> {
        self.columns.iter().find(|(a, _)| a == alias).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns.iter().map(|(a, v)| (a.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        for (alias, value) in &self.columns {
            obj.insert(alias.clone(), value.to_json());
        }
        json!(obj)
    }

    /// Deterministic serialization used by DISTINCT and UNION dedup.
    pub(crate) fn dedup_key(&self) -> String {
        let mut out = String::new();
        for (alias, value) in &self.columns {
            out.push_str(alias);
            out.push('=');
            out.push_str(&canonical_key(value));
            out.push('|');
        }
        out
    }
}

/// Binding environments flowing through pattern operators.
pub(crate) trait BindStream {
    fn next_bindings(&mut self) -> EngineResult<Option<Bindings>>;
}

pub(crate) type BoxBinds<'a> = Box<dyn BindStream + 'a>;

/// Projected rows, each carrying the environment it was produced under so
/// CALL and the session driver can thread bindings forward.
pub(crate) trait RowStream {
    fn next_pair(&mut self) -> EngineResult<Option<(Row, Bindings)>>;

    /// Bindings to carry into the next statement once this stream is
    /// exhausted: the last row's environment, or the statement's final
    /// bindings when it produced no rows (CREATE without RETURN, FOREACH).
    fn carry_env(&self) -> Option<Bindings> {
        None
    }
}

pub(crate) type BoxRows<'a> = Box<dyn RowStream + 'a>;

/// Per-run execution context: the storage handle plus the immutable
/// parameter map.
pub(crate) struct ExecContext<'a> {
    pub store: &'a dyn GraphStore,
    pub params: Arc<PropertyMap>,
}

impl<'a> Clone for ExecContext<'a> {
    fn clone(&self) -> Self {
        ExecContext { store: self.store, params: Arc::clone(&self.params) }
    }
}

/// Compile one statement into its operator tree.
pub(crate) fn statement_stream<'a>(
    ctx: ExecContext<'a>,
    stmt: Statement,
    env: Bindings,
) -> EngineResult<BoxRows<'a>> {
    debug!(target: "cyphera::exec", "dispatching {}", statement_name(&stmt));
    match stmt {
        Statement::MatchReturn { optional, target, where_clause, ret } => {
            let pattern_vars = target.var().map(|v| vec![v.to_string()]).unwrap_or_default();
            let binds: BoxBinds<'a> = match target {
                MatchTarget::Node(pattern) => Box::new(exec_match::NodeScanBinds::new(
                    ctx.clone(),
                    pattern,
                    where_clause,
                    env,
                )),
                MatchTarget::Rel(pattern) => Box::new(exec_match::RelScanBinds::new(
                    ctx.clone(),
                    pattern,
                    where_clause,
                    env,
                )),
            };
            Ok(Box::new(exec_return::ReturnShaper::new(
                ctx,
                ret,
                binds,
                exec_return::ShaperOpts { optional, pattern_vars },
            )))
        }
        Statement::MatchChain { optional, path_var, start, hops, where_clause, ret } => {
            let mut pattern_vars = Vec::new();
            if let Some(v) = &path_var {
                pattern_vars.push(v.clone());
            }
            if let Some(v) = &start.var {
                pattern_vars.push(v.clone());
            }
            for (rel, node) in &hops {
                if let Some(v) = &rel.var {
                    pattern_vars.push(v.clone());
                }
                if let Some(v) = &node.var {
                    pattern_vars.push(v.clone());
                }
            }
            let binds = Box::new(exec_chain::ChainBinds::new(
                ctx.clone(),
                path_var,
                start,
                hops,
                where_clause,
                env,
            ));
            Ok(Box::new(exec_return::ReturnShaper::new(
                ctx,
                ret,
                binds,
                exec_return::ShaperOpts { optional, pattern_vars },
            )))
        }
        Statement::MatchMultiReturn { optional, patterns, where_clause, ret } => {
            let pattern_vars: Vec<String> =
                patterns.iter().filter_map(|p| p.var.clone()).collect();
            let binds = Box::new(exec_match::MultiPatternBinds::new(
                ctx.clone(),
                patterns,
                where_clause,
                optional,
                env,
            ));
            Ok(Box::new(exec_return::ReturnShaper::new(
                ctx,
                ret,
                binds,
                exec_return::ShaperOpts { optional, pattern_vars },
            )))
        }
        Statement::MatchPath { optional, path_var, start, rel, end, where_clause, ret } => {
            let mut pattern_vars = vec![path_var.clone()];
            if let Some(v) = &start.var {
                pattern_vars.push(v.clone());
            }
            if let Some(v) = &end.var {
                pattern_vars.push(v.clone());
            }
            let binds = Box::new(exec_path::VarLengthBinds::new(
                ctx.clone(),
                path_var,
                start,
                rel,
                end,
                where_clause,
                env,
            ));
            match ret {
                Some(ret) => Ok(Box::new(exec_return::ReturnShaper::new(
                    ctx,
                    ret,
                    binds,
                    exec_return::ShaperOpts { optional, pattern_vars },
                ))),
                // No RETURN: nothing streams out, but the last match still
                // carries its bindings to later statements.
                None => Ok(Box::new(exec_common::BindOnly::new(binds))),
            }
        }
        Statement::Create { node, set, ret } => {
            Ok(Box::new(exec_write::CreateStream::new(ctx, node, set, ret, env)))
        }
        Statement::CreateRel { start, rel, end, set, ret } => {
            Ok(Box::new(exec_write::CreateRelStream::new(ctx, start, rel, end, set, ret, env)))
        }
        Statement::Merge { node, on_create, on_match, ret } => {
            Ok(Box::new(exec_write::MergeStream::new(ctx, node, on_create, on_match, ret, env)))
        }
        Statement::MergeRel { start, rel, end, on_create, on_match, ret } => {
            Ok(Box::new(exec_write::MergeRelStream::new(
                ctx, start, rel, end, on_create, on_match, ret, env,
            )))
        }
        Statement::MatchDelete { target, where_clause, delete_var } => {
            Ok(Box::new(exec_write::DeleteStream::new(ctx, target, where_clause, delete_var, env)))
        }
        Statement::MatchSet { pattern, where_clause, sets, ret } => {
            Ok(Box::new(exec_write::SetStream::new(ctx, pattern, where_clause, sets, ret, env)))
        }
        Statement::Unwind { list, var, ret } => {
            Ok(Box::new(exec_unwind::UnwindStream::new(ctx, list, var, ret, env)))
        }
        Statement::Foreach { var, list, body } => {
            Ok(Box::new(exec_unwind::ForeachStream::new(ctx, var, list, *body, env)))
        }
        Statement::Return { ret } => {
            let binds = Box::new(exec_common::OnceBinds::new(env));
            Ok(Box::new(exec_return::ReturnShaper::new(
                ctx,
                ret,
                binds,
                exec_return::ShaperOpts::default(),
            )))
        }
        Statement::Union { left, right, all, order_by, skip, limit } => Ok(Box::new(
            exec_union::UnionStream::new(ctx, *left, *right, all, order_by, skip, limit, env),
        )),
        Statement::Call { subquery, ret } => {
            Ok(Box::new(exec_call::CallStream::new(ctx, subquery, ret, env)))
        }
    }
}

fn statement_name(stmt: &Statement) -> &'static str {
    match stmt {
        Statement::MatchReturn { .. } => "MatchReturn",
        Statement::MatchChain { .. } => "MatchChain",
        Statement::MatchMultiReturn { .. } => "MatchMultiReturn",
        Statement::MatchPath { .. } => "MatchPath",
        Statement::Create { .. } => "Create",
        Statement::CreateRel { .. } => "CreateRel",
        Statement::Merge { .. } => "Merge",
        Statement::MergeRel { .. } => "MergeRel",
        Statement::MatchDelete { .. } => "MatchDelete",
        Statement::MatchSet { .. } => "MatchSet",
        Statement::Unwind { .. } => "Unwind",
        Statement::Foreach { .. } => "Foreach",
        Statement::Return { .. } => "Return",
        Statement::Union { .. } => "Union",
        Statement::Call { .. } => "Call",
    }
}
