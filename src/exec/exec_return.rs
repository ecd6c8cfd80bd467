//! RETURN shaping: projection with alias inference, aggregation hand-off,
//! DISTINCT, ORDER BY, SKIP/LIMIT, and the OPTIONAL null-preserving row.
//! Plain projections stream row-at-a-time; aggregation and ORDER BY
//! materialize on first poll, exactly where the semantics force it.

use std::collections::{HashSet, VecDeque};

use crate::ast::{Expression, ReturnClause, ReturnItem};
use crate::error::{EngineError, EngineResult};
use crate::eval::{eval_expr, Bindings};
use crate::exec::exec_agg::AggTable;
use crate::exec::{BoxBinds, ExecContext, Row, RowStream};
use crate::value::{sort_cmp, PropertyMap, Value};

#[derive(Default)]
pub(crate) struct ShaperOpts {
    pub optional: bool,
    /// Variables the pattern would have bound; used to shape the OPTIONAL
    /// null row and RETURN * when nothing matched.
    pub pattern_vars: Vec<String>,
}

enum State {
    Fresh,
    Streaming,
    Buffered(VecDeque<(Row, Bindings)>),
    Done,
}

pub(crate) struct ReturnShaper<'a> {
    ctx: ExecContext<'a>,
    ret: ReturnClause,
    source: BoxBinds<'a>,
    opts: ShaperOpts,
    state: State,
    last: Option<Bindings>,
    produced: usize,
    to_skip: i64,
    remaining: Option<i64>,
    seen: HashSet<String>,
}

impl<'a> ReturnShaper<'a> {
    pub(crate) fn new(
        ctx: ExecContext<'a>,
        ret: ReturnClause,
        source: BoxBinds<'a>,
        opts: ShaperOpts,
    ) -> Self {
        ReturnShaper {
            ctx,
            ret,
            source,
            opts,
            state: State::Fresh,
            last: None,
            produced: 0,
            to_skip: 0,
            remaining: None,
            seen: HashSet::new(),
        }
    }

    fn open(&mut self) -> EngineResult<()> {
        self.to_skip = resolve_count(&self.ret.skip, &self.ctx.params, "SKIP")?.unwrap_or(0);
        self.remaining = resolve_count(&self.ret.limit, &self.ctx.params, "LIMIT")?;
        if self.ret.has_aggregate() || !self.ret.order_by.is_empty() {
            let rows = self.materialize()?;
            self.state = State::Buffered(rows);
        } else {
            self.state = State::Streaming;
        }
        Ok(())
    }

    fn materialize(&mut self) -> EngineResult<VecDeque<(Row, Bindings)>> {
        let mut rows: Vec<(Row, Bindings)> = Vec::new();
        if self.ret.has_aggregate() {
            let mut table = AggTable::new(self.ret.items.clone());
            while let Some(env) = self.source.next_bindings()? {
                table.feed(&env, &self.ctx.params)?;
            }
            rows = table.finalize(&self.ctx.params)?;
        } else {
            while let Some(env) = self.source.next_bindings()? {
                let row = project_row(&self.ret.items, &env, &self.ctx.params)?;
                rows.push((row, env));
            }
            if rows.is_empty() && self.opts.optional {
                rows.push(null_row(&self.ret, &self.opts.pattern_vars));
            }
        }

        if self.ret.distinct {
            let mut kept = Vec::with_capacity(rows.len());
            let mut seen = HashSet::new();
            for (row, env) in rows {
                if seen.insert(row.dedup_key()) {
                    kept.push((row, env));
                }
            }
            rows = kept;
        }

        sort_rows(&mut rows, &self.ret.order_by, &self.ctx.params)?;

        let mut queue: VecDeque<(Row, Bindings)> = rows.into();
        for _ in 0..self.to_skip {
            if queue.pop_front().is_none() {
                break;
            }
        }
        if let Some(limit) = self.remaining {
            queue.truncate(limit.max(0) as usize);
        }
        Ok(queue)
    }

    fn next_streaming(&mut self) -> EngineResult<Option<(Row, Bindings)>> {
        loop {
            if self.remaining == Some(0) {
                self.state = State::Done;
                return Ok(None);
            }
            let env = match self.source.next_bindings()? {
                Some(env) => env,
                None => {
                    self.state = State::Done;
                    if self.produced == 0 && self.opts.optional {
                        let (row, env) = null_row(&self.ret, &self.opts.pattern_vars);
                        self.produced += 1;
                        self.last = Some(env.clone());
                        return Ok(Some((row, env)));
                    }
                    return Ok(None);
                }
            };
            let row = project_row(&self.ret.items, &env, &self.ctx.params)?;
            if self.ret.distinct && !self.seen.insert(row.dedup_key()) {
                continue;
            }
            if self.to_skip > 0 {
                self.to_skip -= 1;
                continue;
            }
            if let Some(remaining) = self.remaining.as_mut() {
                *remaining -= 1;
            }
            self.produced += 1;
            self.last = Some(env.clone());
            return Ok(Some((row, env)));
        }
    }
}

impl<'a> RowStream for ReturnShaper<'a> {
    fn next_pair(&mut self) -> EngineResult<Option<(Row, Bindings)>> {
        if matches!(self.state, State::Fresh) {
            self.open()?;
        }
        match &mut self.state {
            State::Streaming => self.next_streaming(),
            State::Buffered(queue) => match queue.pop_front() {
                Some((row, env)) => {
                    self.produced += 1;
                    self.last = Some(env.clone());
                    Ok(Some((row, env)))
                }
                None => {
                    self.state = State::Done;
                    Ok(None)
                }
            },
            State::Done => Ok(None),
            State::Fresh => unreachable!("opened above"),
        }
    }

    fn carry_env(&self) -> Option<Bindings> {
        self.last.clone()
    }
}

/// Output alias for a RETURN item: explicit AS, then variable name,
/// property name, `id`/`labels` for those functions, then the positional
/// `value` / `valueN` fallback.
pub(crate) fn alias_for(item: &ReturnItem, idx: usize, multi: bool) -> String {
    if let Some(alias) = &item.alias {
        return alias.clone();
    }
    match &item.expr {
        Expression::Variable(v) => v.clone(),
        Expression::Property(_, prop) => prop.clone(),
        Expression::Id(_) => "id".to_string(),
        Expression::Labels(_) => "labels".to_string(),
        _ => {
            if multi {
                format!("value{}", idx)
            } else {
                "value".to_string()
            }
        }
    }
}

/// Project one environment into a row. `RETURN *` expands every bound
/// variable under its own name at its position.
pub(crate) fn project_row(
    items: &[ReturnItem],
    env: &Bindings,
    params: &PropertyMap,
) -> EngineResult<Row> {
    let multi = items.len() > 1;
    let mut row = Row::default();
    for (idx, item) in items.iter().enumerate() {
        if matches!(item.expr, Expression::All) {
            for (name, value) in env.iter() {
                row.push(name.clone(), value.clone());
            }
            continue;
        }
        let value = eval_expr(&item.expr, env, params)?;
        row.push(alias_for(item, idx, multi), value);
    }
    Ok(row)
}

// The OPTIONAL zero-match row: every output alias bound to Null.
fn null_row(ret: &ReturnClause, pattern_vars: &[String]) -> (Row, Bindings) {
    let multi = ret.items.len() > 1;
    let mut row = Row::default();
    let mut env = Bindings::new();
    for var in pattern_vars {
        env.insert(var.clone(), Value::Null);
    }
    for (idx, item) in ret.items.iter().enumerate() {
        if matches!(item.expr, Expression::All) {
            for var in pattern_vars {
                row.push(var.clone(), Value::Null);
            }
            continue;
        }
        row.push(alias_for(item, idx, multi), Value::Null);
    }
    (row, env)
}

/// Stable sort over materialized rows. Sort keys evaluate against the row's
/// environment extended with its output aliases, so both `ORDER BY name`
/// (an alias) and `ORDER BY n.prop` work. Null sorts after non-null in
/// ascending order; DESC reverses the whole comparator.
pub(crate) fn sort_rows(
    rows: &mut Vec<(Row, Bindings)>,
    order_by: &[(Expression, bool)],
    params: &PropertyMap,
) -> EngineResult<()> {
    if order_by.is_empty() {
        return Ok(());
    }
    let mut decorated: Vec<(Vec<Value>, (Row, Bindings))> = Vec::with_capacity(rows.len());
    for (row, env) in rows.drain(..) {
        let mut sort_env = env.clone();
        for (alias, value) in row.iter() {
            sort_env.insert(alias.to_string(), value.clone());
        }
        let mut keys = Vec::with_capacity(order_by.len());
        for (expr, _) in order_by {
            keys.push(eval_expr(expr, &sort_env, params)?);
        }
        decorated.push((keys, (row, env)));
    }
    decorated.sort_by(|(a, _), (b, _)| {
        for (i, (_, ascending)) in order_by.iter().enumerate() {
            let ord = sort_cmp(&a[i], &b[i]);
            let ord = if *ascending { ord } else { ord.reverse() };
            if ord != std::cmp::Ordering::Equal {
                return ord;
            }
        }
        std::cmp::Ordering::Equal
    });
    rows.extend(decorated.into_iter().map(|(_, pair)| pair));
    Ok(())
}

/// SKIP/LIMIT operands must resolve to non-negative integers.
pub(crate) fn resolve_count(
    expr: &Option<Expression>,
    params: &PropertyMap,
    what: &str,
) -> EngineResult<Option<i64>> {
    match expr {
        None => Ok(None),
        Some(expr) => {
            let value = eval_expr(expr, &Bindings::new(), params)?;
            match value.as_int() {
                Some(n) if n >= 0 => Ok(Some(n)),
                _ => Err(EngineError::evaluation(format!(
                    "{} requires a non-negative integer, got {}",
                    what, value
                ))),
            }
        }
    }
}
