//! Single-pattern matching: node scans (index-aware), relationship scans,
//! and the Cartesian product over comma-separated patterns.

use crate::ast::{NodePattern, RelPattern, WhereClause};
use crate::error::EngineResult;
use crate::eval::Bindings;
use crate::exec::exec_common::{
    collect_pattern_nodes, eval_pattern_props, node_matches, rel_matches, where_passes,
};
use crate::exec::{BindStream, ExecContext};
use crate::planner::{node_access_path, AccessPath};
use crate::storage::RecordIter;
use crate::value::{NodeRecord, PropertyMap, RelRecord, Value};

pub(crate) struct NodeScanBinds<'a> {
    ctx: ExecContext<'a>,
    pattern: NodePattern,
    where_clause: Option<WhereClause>,
    base: Bindings,
    wanted: PropertyMap,
    source: Option<RecordIter<'a, NodeRecord>>,
}

impl<'a> NodeScanBinds<'a> {
    pub(crate) fn new(
        ctx: ExecContext<'a>,
        pattern: NodePattern,
        where_clause: Option<WhereClause>,
        base: Bindings,
    ) -> Self {
        NodeScanBinds { ctx, pattern, where_clause, base, wanted: PropertyMap::new(), source: None }
    }

    fn open(&mut self) -> EngineResult<()> {
        self.wanted = eval_pattern_props(&self.pattern.props, &self.base, &self.ctx.params)?;
        let source = match node_access_path(self.ctx.store, &self.pattern)? {
            AccessPath::Scan(scan) => self.ctx.store.scan_nodes(&scan)?,
            AccessPath::IndexProbe { label, property, value } => {
                let probe = crate::eval::eval_expr(&value, &self.base, &self.ctx.params)?;
                self.ctx.store.index_lookup(label.as_deref(), &property, &probe)?
            }
        };
        self.source = Some(source);
        Ok(())
    }
}

impl<'a> BindStream for NodeScanBinds<'a> {
    fn next_bindings(&mut self) -> EngineResult<Option<Bindings>> {
        if self.source.is_none() {
            self.open()?;
        }
        let source = self.source.as_mut().expect("opened above");
        for node in source.by_ref() {
            let node = node?;
            if !node_matches(&node, &self.pattern, &self.wanted) {
                continue;
            }
            let mut env = self.base.clone();
            if let Some(var) = &self.pattern.var {
                env.insert(var.clone(), Value::Node(Box::new(node)));
            }
            if where_passes(&self.where_clause, &env, &self.ctx.params)? {
                return Ok(Some(env));
            }
        }
        Ok(None)
    }
}

pub(crate) struct RelScanBinds<'a> {
    ctx: ExecContext<'a>,
    pattern: RelPattern,
    where_clause: Option<WhereClause>,
    base: Bindings,
    wanted: PropertyMap,
    source: Option<RecordIter<'a, RelRecord>>,
}

impl<'a> RelScanBinds<'a> {
    pub(crate) fn new(
        ctx: ExecContext<'a>,
        pattern: RelPattern,
        where_clause: Option<WhereClause>,
        base: Bindings,
    ) -> Self {
        RelScanBinds { ctx, pattern, where_clause, base, wanted: PropertyMap::new(), source: None }
    }
}

impl<'a> BindStream for RelScanBinds<'a> {
    fn next_bindings(&mut self) -> EngineResult<Option<Bindings>> {
        if self.source.is_none() {
            self.wanted = eval_pattern_props(&self.pattern.props, &self.base, &self.ctx.params)?;
            self.source = Some(self.ctx.store.scan_relationships()?);
        }
        let source = self.source.as_mut().expect("opened above");
        for rel in source.by_ref() {
            let rel = rel?;
            if !rel_matches(&rel, &self.pattern, &self.wanted) {
                continue;
            }
            let mut env = self.base.clone();
            if let Some(var) = &self.pattern.var {
                env.insert(var.clone(), Value::Rel(Box::new(rel)));
            }
            if where_passes(&self.where_clause, &env, &self.ctx.params)? {
                return Ok(Some(env));
            }
        }
        Ok(None)
    }
}

/// Cartesian product over disjoint node patterns. Candidate sets are
/// fetched independently up front; under OPTIONAL an empty set degrades to
/// a single Null so the product still yields an outer row.
pub(crate) struct MultiPatternBinds<'a> {
    ctx: ExecContext<'a>,
    patterns: Vec<NodePattern>,
    where_clause: Option<WhereClause>,
    optional: bool,
    base: Bindings,
    sets: Option<Vec<Vec<Value>>>,
    cursor: Vec<usize>,
    exhausted: bool,
}

impl<'a> MultiPatternBinds<'a> {
    pub(crate) fn new(
        ctx: ExecContext<'a>,
        patterns: Vec<NodePattern>,
        where_clause: Option<WhereClause>,
        optional: bool,
        base: Bindings,
    ) -> Self {
        MultiPatternBinds {
            ctx,
            patterns,
            where_clause,
            optional,
            base,
            sets: None,
            cursor: Vec::new(),
            exhausted: false,
        }
    }

    fn open(&mut self) -> EngineResult<()> {
        let mut sets = Vec::with_capacity(self.patterns.len());
        for pattern in &self.patterns {
            let nodes = collect_pattern_nodes(&self.ctx, pattern, &self.base)?;
            let mut values: Vec<Value> = nodes.into_iter().map(|n| Value::Node(Box::new(n))).collect();
            if values.is_empty() {
                if self.optional {
                    values.push(Value::Null);
                } else {
                    self.exhausted = true;
                }
            }
            sets.push(values);
        }
        self.cursor = vec![0; sets.len()];
        self.sets = Some(sets);
        Ok(())
    }

    // Rightmost position advances first; overflow exhausts the product.
    fn advance(&mut self) {
        let sets = self.sets.as_ref().expect("opened");
        for i in (0..self.cursor.len()).rev() {
            self.cursor[i] += 1;
            if self.cursor[i] < sets[i].len() {
                return;
            }
            self.cursor[i] = 0;
        }
        self.exhausted = true;
    }
}

impl<'a> BindStream for MultiPatternBinds<'a> {
    fn next_bindings(&mut self) -> EngineResult<Option<Bindings>> {
        if self.sets.is_none() {
            self.open()?;
        }
        while !self.exhausted {
            let sets = self.sets.as_ref().expect("opened");
            let mut env = self.base.clone();
            for (i, pattern) in self.patterns.iter().enumerate() {
                if let Some(var) = &pattern.var {
                    env.insert(var.clone(), sets[i][self.cursor[i]].clone());
                }
            }
            self.advance();
            if where_passes(&self.where_clause, &env, &self.ctx.params)? {
                return Ok(Some(env));
            }
        }
        Ok(None)
    }
}
