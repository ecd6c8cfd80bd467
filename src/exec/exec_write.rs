//! Write operators: CREATE, CREATE-relationship, MERGE with ON CREATE /
//! ON MATCH, first-match DELETE (node deletion cascades through the
//! adapter contract), and multi-match SET. Each operator performs its store
//! work on first poll, binds the affected records into the environment,
//! and optionally projects a RETURN through the ordinary shaping layer.

use tracing::debug;

use crate::ast::{MatchTarget, NodePattern, RelPattern, ReturnClause, SetItem, WhereClause};
use crate::error::{EngineError, EngineResult};
use crate::eval::{eval_expr, Bindings};
use crate::exec::exec_common::{
    collect_pattern_nodes, eval_pattern_props, rel_matches, where_passes, OnceBinds, VecBinds,
};
use crate::exec::exec_return::{ReturnShaper, ShaperOpts};
use crate::exec::{ExecContext, Row, RowStream};
use crate::value::{NodeRecord, PropertyMap, Value};

/// Evaluate a pattern's property map for a write: Null values are dropped,
/// absence and Null are indistinguishable on read.
fn props_for_write(
    props: &[(String, crate::ast::Expression)],
    env: &Bindings,
    params: &PropertyMap,
) -> EngineResult<PropertyMap> {
    let mut out = eval_pattern_props(props, env, params)?;
    out.retain(|_, v| !v.is_null());
    Ok(out)
}

/// Apply `var.prop = expr` updates against whatever records the
/// environment has bound. Referencing an unbound variable is a
/// SemanticError; the updated record is re-bound so later items see it.
fn apply_set_items(
    ctx: &ExecContext<'_>,
    env: &mut Bindings,
    sets: &[SetItem],
) -> EngineResult<()> {
    for item in sets {
        let value = eval_expr(&item.value, env, &ctx.params)?;
        let mut patch = PropertyMap::new();
        patch.insert(item.prop.clone(), value);
        match env.get(&item.var) {
            Some(Value::Node(node)) => {
                let updated = ctx.store.update_node_properties(&node.id, patch)?;
                env.insert(item.var.clone(), Value::Node(Box::new(updated)));
            }
            Some(Value::Rel(rel)) => {
                let updated = ctx.store.update_relationship_properties(&rel.id, patch)?;
                env.insert(item.var.clone(), Value::Rel(Box::new(updated)));
            }
            _ => {
                return Err(EngineError::semantic(format!(
                    "SET references unbound variable '{}'",
                    item.var
                )))
            }
        }
    }
    Ok(())
}

// Shared tail: an optional RETURN projected over prepared environments.
enum WriteTail<'a> {
    Rows(ReturnShaper<'a>),
    Silent,
}

impl<'a> WriteTail<'a> {
    fn once(ctx: &ExecContext<'a>, ret: Option<ReturnClause>, env: Bindings) -> WriteTail<'a> {
        match ret {
            Some(ret) => WriteTail::Rows(ReturnShaper::new(
                ctx.clone(),
                ret,
                Box::new(OnceBinds::new(env)),
                ShaperOpts::default(),
            )),
            None => WriteTail::Silent,
        }
    }

    fn many(ctx: &ExecContext<'a>, ret: Option<ReturnClause>, envs: Vec<Bindings>) -> WriteTail<'a> {
        match ret {
            Some(ret) => WriteTail::Rows(ReturnShaper::new(
                ctx.clone(),
                ret,
                Box::new(VecBinds::new(envs)),
                ShaperOpts::default(),
            )),
            None => WriteTail::Silent,
        }
    }

    fn next_pair(&mut self) -> EngineResult<Option<(Row, Bindings)>> {
        match self {
            WriteTail::Rows(shaper) => shaper.next_pair(),
            WriteTail::Silent => Ok(None),
        }
    }

    fn carry_env(&self) -> Option<Bindings> {
        match self {
            WriteTail::Rows(shaper) => shaper.carry_env(),
            WriteTail::Silent => None,
        }
    }
}

pub(crate) struct CreateStream<'a> {
    ctx: ExecContext<'a>,
    node: NodePattern,
    set: Vec<SetItem>,
    ret: Option<ReturnClause>,
    base: Bindings,
    tail: Option<WriteTail<'a>>,
    env_after: Option<Bindings>,
}

impl<'a> CreateStream<'a> {
    pub(crate) fn new(
        ctx: ExecContext<'a>,
        node: NodePattern,
        set: Vec<SetItem>,
        ret: Option<ReturnClause>,
        base: Bindings,
    ) -> Self {
        CreateStream { ctx, node, set, ret, base, tail: None, env_after: None }
    }

    fn open(&mut self) -> EngineResult<()> {
        let props = props_for_write(&self.node.props, &self.base, &self.ctx.params)?;
        let created = self.ctx.store.create_node(&self.node.labels, props)?;
        debug!(target: "cyphera::exec", id = %created.id, "CREATE node");
        let mut env = self.base.clone();
        if let Some(var) = &self.node.var {
            env.insert(var.clone(), Value::Node(Box::new(created)));
        }
        apply_set_items(&self.ctx, &mut env, &self.set)?;
        self.env_after = Some(env.clone());
        self.tail = Some(WriteTail::once(&self.ctx, self.ret.take(), env));
        Ok(())
    }
}

impl<'a> RowStream for CreateStream<'a> {
    fn next_pair(&mut self) -> EngineResult<Option<(Row, Bindings)>> {
        if self.tail.is_none() {
            self.open()?;
        }
        self.tail.as_mut().expect("opened above").next_pair()
    }

    fn carry_env(&self) -> Option<Bindings> {
        self.tail
            .as_ref()
            .and_then(|t| t.carry_env())
            .or_else(|| self.env_after.clone())
    }
}

/// Resolve a relationship endpoint: an already-bound variable is used
/// as-is, an unbound pattern creates (and binds) a fresh node.
fn resolve_endpoint(
    ctx: &ExecContext<'_>,
    pattern: &NodePattern,
    env: &mut Bindings,
) -> EngineResult<NodeRecord> {
    if let Some(var) = &pattern.var {
        match env.get(var) {
            Some(Value::Node(node)) => return Ok((**node).clone()),
            Some(_) => {
                return Err(EngineError::semantic(format!(
                    "variable '{}' is not bound to a node",
                    var
                )))
            }
            None => {}
        }
    }
    let props = props_for_write(&pattern.props, env, &ctx.params)?;
    let created = ctx.store.create_node(&pattern.labels, props)?;
    if let Some(var) = &pattern.var {
        env.insert(var.clone(), Value::Node(Box::new(created.clone())));
    }
    Ok(created)
}

fn required_type(rel: &RelPattern) -> EngineResult<String> {
    rel.rel_type
        .clone()
        .ok_or_else(|| EngineError::semantic("relationship pattern requires a type"))
}

pub(crate) struct CreateRelStream<'a> {
    ctx: ExecContext<'a>,
    start: NodePattern,
    rel: RelPattern,
    end: NodePattern,
    set: Vec<SetItem>,
    ret: Option<ReturnClause>,
    base: Bindings,
    tail: Option<WriteTail<'a>>,
    env_after: Option<Bindings>,
}

impl<'a> CreateRelStream<'a> {
    pub(crate) fn new(
        ctx: ExecContext<'a>,
        start: NodePattern,
        rel: RelPattern,
        end: NodePattern,
        set: Vec<SetItem>,
        ret: Option<ReturnClause>,
        base: Bindings,
    ) -> Self {
        CreateRelStream { ctx, start, rel, end, set, ret, base, tail: None, env_after: None }
    }

    fn open(&mut self) -> EngineResult<()> {
        let rel_type = required_type(&self.rel)?;
        let mut env = self.base.clone();
        let start = resolve_endpoint(&self.ctx, &self.start, &mut env)?;
        let end = resolve_endpoint(&self.ctx, &self.end, &mut env)?;
        let props = props_for_write(&self.rel.props, &env, &self.ctx.params)?;
        let created = self.ctx.store.create_relationship(&rel_type, &start.id, &end.id, props)?;
        debug!(target: "cyphera::exec", id = %created.id, rel_type, "CREATE relationship");
        if let Some(var) = &self.rel.var {
            env.insert(var.clone(), Value::Rel(Box::new(created)));
        }
        apply_set_items(&self.ctx, &mut env, &self.set)?;
        self.env_after = Some(env.clone());
        self.tail = Some(WriteTail::once(&self.ctx, self.ret.take(), env));
        Ok(())
    }
}

impl<'a> RowStream for CreateRelStream<'a> {
    fn next_pair(&mut self) -> EngineResult<Option<(Row, Bindings)>> {
        if self.tail.is_none() {
            self.open()?;
        }
        self.tail.as_mut().expect("opened above").next_pair()
    }

    fn carry_env(&self) -> Option<Bindings> {
        self.tail
            .as_ref()
            .and_then(|t| t.carry_env())
            .or_else(|| self.env_after.clone())
    }
}

pub(crate) struct MergeStream<'a> {
    ctx: ExecContext<'a>,
    node: NodePattern,
    on_create: Vec<SetItem>,
    on_match: Vec<SetItem>,
    ret: Option<ReturnClause>,
    base: Bindings,
    tail: Option<WriteTail<'a>>,
    env_after: Option<Bindings>,
}

impl<'a> MergeStream<'a> {
    pub(crate) fn new(
        ctx: ExecContext<'a>,
        node: NodePattern,
        on_create: Vec<SetItem>,
        on_match: Vec<SetItem>,
        ret: Option<ReturnClause>,
        base: Bindings,
    ) -> Self {
        MergeStream { ctx, node, on_create, on_match, ret, base, tail: None, env_after: None }
    }

    fn open(&mut self) -> EngineResult<()> {
        let props = props_for_write(&self.node.props, &self.base, &self.ctx.params)?;
        let found = self.ctx.store.find_node(&self.node.labels, &props)?;
        let matched = found.is_some();
        let record = match found {
            Some(node) => node,
            None => self.ctx.store.create_node(&self.node.labels, props)?,
        };
        debug!(target: "cyphera::exec", id = %record.id, matched, "MERGE node");
        let mut env = self.base.clone();
        if let Some(var) = &self.node.var {
            env.insert(var.clone(), Value::Node(Box::new(record)));
        }
        let sets = if matched { &self.on_match } else { &self.on_create };
        apply_set_items(&self.ctx, &mut env, sets)?;
        self.env_after = Some(env.clone());
        self.tail = Some(WriteTail::once(&self.ctx, self.ret.take(), env));
        Ok(())
    }
}

impl<'a> RowStream for MergeStream<'a> {
    fn next_pair(&mut self) -> EngineResult<Option<(Row, Bindings)>> {
        if self.tail.is_none() {
            self.open()?;
        }
        self.tail.as_mut().expect("opened above").next_pair()
    }

    fn carry_env(&self) -> Option<Bindings> {
        self.tail
            .as_ref()
            .and_then(|t| t.carry_env())
            .or_else(|| self.env_after.clone())
    }
}

pub(crate) struct MergeRelStream<'a> {
    ctx: ExecContext<'a>,
    start: NodePattern,
    rel: RelPattern,
    end: NodePattern,
    on_create: Vec<SetItem>,
    on_match: Vec<SetItem>,
    ret: Option<ReturnClause>,
    base: Bindings,
    tail: Option<WriteTail<'a>>,
    env_after: Option<Bindings>,
}

impl<'a> MergeRelStream<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        ctx: ExecContext<'a>,
        start: NodePattern,
        rel: RelPattern,
        end: NodePattern,
        on_create: Vec<SetItem>,
        on_match: Vec<SetItem>,
        ret: Option<ReturnClause>,
        base: Bindings,
    ) -> Self {
        MergeRelStream {
            ctx,
            start,
            rel,
            end,
            on_create,
            on_match,
            ret,
            base,
            tail: None,
            env_after: None,
        }
    }

    // MERGE on a relationship requires both endpoints already bound; the
    // match predicate is (type, start id, end id).
    fn bound_endpoint(&self, pattern: &NodePattern) -> EngineResult<NodeRecord> {
        let var = pattern.var.as_ref().ok_or_else(|| {
            EngineError::semantic("MERGE relationship endpoints must be named variables")
        })?;
        match self.base.get(var) {
            Some(Value::Node(node)) => Ok((**node).clone()),
            _ => Err(EngineError::semantic(format!(
                "MERGE relationship endpoint '{}' is not bound to a node",
                var
            ))),
        }
    }

    fn open(&mut self) -> EngineResult<()> {
        let rel_type = required_type(&self.rel)?;
        let start = self.bound_endpoint(&self.start)?;
        let end = self.bound_endpoint(&self.end)?;

        let mut existing = None;
        for rel in self.ctx.store.scan_relationships()? {
            let rel = rel?;
            if rel.rel_type == rel_type && rel.start == start.id && rel.end == end.id {
                existing = Some(rel);
                break;
            }
        }
        let matched = existing.is_some();
        let record = match existing {
            Some(rel) => rel,
            None => {
                let props = props_for_write(&self.rel.props, &self.base, &self.ctx.params)?;
                self.ctx.store.create_relationship(&rel_type, &start.id, &end.id, props)?
            }
        };
        debug!(target: "cyphera::exec", id = %record.id, matched, "MERGE relationship");
        let mut env = self.base.clone();
        if let Some(var) = &self.rel.var {
            env.insert(var.clone(), Value::Rel(Box::new(record)));
        }
        let sets = if matched { &self.on_match } else { &self.on_create };
        apply_set_items(&self.ctx, &mut env, sets)?;
        self.env_after = Some(env.clone());
        self.tail = Some(WriteTail::once(&self.ctx, self.ret.take(), env));
        Ok(())
    }
}

impl<'a> RowStream for MergeRelStream<'a> {
    fn next_pair(&mut self) -> EngineResult<Option<(Row, Bindings)>> {
        if self.tail.is_none() {
            self.open()?;
        }
        self.tail.as_mut().expect("opened above").next_pair()
    }

    fn carry_env(&self) -> Option<Bindings> {
        self.tail
            .as_ref()
            .and_then(|t| t.carry_env())
            .or_else(|| self.env_after.clone())
    }
}

/// MATCH ... DELETE: the first record satisfying pattern and WHERE is
/// deleted. Node deletion cascades to incident relationships through the
/// storage contract.
pub(crate) struct DeleteStream<'a> {
    ctx: ExecContext<'a>,
    target: MatchTarget,
    where_clause: Option<WhereClause>,
    delete_var: String,
    base: Bindings,
    done: bool,
}

impl<'a> DeleteStream<'a> {
    pub(crate) fn new(
        ctx: ExecContext<'a>,
        target: MatchTarget,
        where_clause: Option<WhereClause>,
        delete_var: String,
        base: Bindings,
    ) -> Self {
        DeleteStream { ctx, target, where_clause, delete_var, base, done: false }
    }

    fn run(&mut self) -> EngineResult<()> {
        match &self.target {
            MatchTarget::Node(pattern) => {
                if pattern.var.as_deref() != Some(self.delete_var.as_str()) {
                    return Err(EngineError::semantic(format!(
                        "DELETE variable '{}' is not the matched pattern variable",
                        self.delete_var
                    )));
                }
                let candidates = collect_pattern_nodes(&self.ctx, pattern, &self.base)?;
                for node in candidates {
                    let mut env = self.base.clone();
                    env.insert(self.delete_var.clone(), Value::Node(Box::new(node.clone())));
                    if where_passes(&self.where_clause, &env, &self.ctx.params)? {
                        debug!(target: "cyphera::exec", id = %node.id, "DELETE node");
                        self.ctx.store.delete_node(&node.id)?;
                        break;
                    }
                }
            }
            MatchTarget::Rel(pattern) => {
                if pattern.var.as_deref() != Some(self.delete_var.as_str()) {
                    return Err(EngineError::semantic(format!(
                        "DELETE variable '{}' is not the matched pattern variable",
                        self.delete_var
                    )));
                }
                let wanted = eval_pattern_props(&pattern.props, &self.base, &self.ctx.params)?;
                for rel in self.ctx.store.scan_relationships()? {
                    let rel = rel?;
                    if !rel_matches(&rel, pattern, &wanted) {
                        continue;
                    }
                    let mut env = self.base.clone();
                    env.insert(self.delete_var.clone(), Value::Rel(Box::new(rel.clone())));
                    if where_passes(&self.where_clause, &env, &self.ctx.params)? {
                        debug!(target: "cyphera::exec", id = %rel.id, "DELETE relationship");
                        self.ctx.store.delete_relationship(&rel.id)?;
                        break;
                    }
                }
            }
        }
        Ok(())
    }
}

impl<'a> RowStream for DeleteStream<'a> {
    fn next_pair(&mut self) -> EngineResult<Option<(Row, Bindings)>> {
        if !self.done {
            self.done = true;
            self.run()?;
        }
        Ok(None)
    }
}

/// MATCH ... SET: every matching node is updated in storage order; RETURN,
/// when present, yields each updated record.
pub(crate) struct SetStream<'a> {
    ctx: ExecContext<'a>,
    pattern: NodePattern,
    where_clause: Option<WhereClause>,
    sets: Vec<SetItem>,
    ret: Option<ReturnClause>,
    base: Bindings,
    tail: Option<WriteTail<'a>>,
    env_after: Option<Bindings>,
}

impl<'a> SetStream<'a> {
    pub(crate) fn new(
        ctx: ExecContext<'a>,
        pattern: NodePattern,
        where_clause: Option<WhereClause>,
        sets: Vec<SetItem>,
        ret: Option<ReturnClause>,
        base: Bindings,
    ) -> Self {
        SetStream { ctx, pattern, where_clause, sets, ret, base, tail: None, env_after: None }
    }

    fn open(&mut self) -> EngineResult<()> {
        let candidates = collect_pattern_nodes(&self.ctx, &self.pattern, &self.base)?;
        let mut updated_envs = Vec::new();
        for node in candidates {
            let mut env = self.base.clone();
            if let Some(var) = &self.pattern.var {
                env.insert(var.clone(), Value::Node(Box::new(node)));
            }
            if !where_passes(&self.where_clause, &env, &self.ctx.params)? {
                continue;
            }
            apply_set_items(&self.ctx, &mut env, &self.sets)?;
            updated_envs.push(env);
        }
        debug!(target: "cyphera::exec", updated = updated_envs.len(), "SET");
        self.env_after = updated_envs.last().cloned();
        self.tail = Some(WriteTail::many(&self.ctx, self.ret.take(), updated_envs));
        Ok(())
    }
}

impl<'a> RowStream for SetStream<'a> {
    fn next_pair(&mut self) -> EngineResult<Option<(Row, Bindings)>> {
        if self.tail.is_none() {
            self.open()?;
        }
        self.tail.as_mut().expect("opened above").next_pair()
    }

    fn carry_env(&self) -> Option<Bindings> {
        self.tail
            .as_ref()
            .and_then(|t| t.carry_env())
            .or_else(|| self.env_after.clone())
    }
}
