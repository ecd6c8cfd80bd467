//! Aggregation driver.
//! Rows group by the tuple of non-aggregator RETURN items, serialized with
//! the canonical value keys. Each group holds one accumulator per aggregate
//! call site (pre-order within the item expression), so arithmetic over
//! aggregators like `SUM(x) + 1` finalizes by re-walking the expression
//! with the computed values substituted in call-site order.

use std::collections::{HashMap, HashSet};

use crate::ast::{AggFunc, Expression, ReturnItem};
use crate::error::EngineResult;
use crate::eval::{arith_value, eval_expr, length_value, neg_value, Bindings};
use crate::exec::exec_return::alias_for;
use crate::exec::Row;
use crate::value::{canonical_key, cmp_values, PropertyMap, Value};

#[derive(Clone)]
struct AggCall {
    func: AggFunc,
    distinct: bool,
    arg: Option<Expression>,
}

struct AggAcc {
    func: AggFunc,
    distinct: bool,
    seen: HashSet<String>,
    count: i64,
    sum: Value,
    avg_sum: f64,
    list: Vec<Value>,
    best: Value,
}

impl AggAcc {
    fn new(call: &AggCall) -> Self {
        AggAcc {
            func: call.func,
            distinct: call.distinct,
            seen: HashSet::new(),
            count: 0,
            sum: Value::Int(0),
            avg_sum: 0.0,
            list: Vec::new(),
            best: Value::Null,
        }
    }

    fn update(&mut self, value: Option<Value>) {
        // count(*) has no argument and counts every row.
        let value = match value {
            None => {
                self.count += 1;
                return;
            }
            Some(v) => v,
        };
        if value.is_null() {
            return;
        }
        if self.distinct && !self.seen.insert(canonical_key(&value)) {
            return;
        }
        match self.func {
            AggFunc::Count => self.count += 1,
            AggFunc::Sum => {
                if value.as_number().is_some() {
                    self.sum = arith_value(&self.sum, crate::ast::ArithOp::Add, &value);
                }
            }
            AggFunc::Avg => {
                if let Some(n) = value.as_number() {
                    self.avg_sum += n;
                    self.count += 1;
                }
            }
            AggFunc::Min => {
                if self.best.is_null() || cmp_values(&value, &self.best).map(|o| o.is_lt()).unwrap_or(false) {
                    self.best = value;
                }
            }
            AggFunc::Max => {
                if self.best.is_null() || cmp_values(&value, &self.best).map(|o| o.is_gt()).unwrap_or(false) {
                    self.best = value;
                }
            }
            AggFunc::Collect => self.list.push(value),
        }
    }

    fn finish(&self) -> Value {
        match self.func {
            AggFunc::Count => Value::Int(self.count),
            AggFunc::Sum => self.sum.clone(),
            AggFunc::Min | AggFunc::Max => self.best.clone(),
            AggFunc::Avg => {
                if self.count == 0 {
                    Value::Null
                } else {
                    Value::Float(self.avg_sum / self.count as f64)
                }
            }
            AggFunc::Collect => Value::List(self.list.clone()),
        }
    }
}

struct Group {
    key_values: Vec<Value>,
    env0: Bindings,
    accs: Vec<Vec<AggAcc>>,
}

pub(crate) struct AggTable {
    items: Vec<ReturnItem>,
    item_calls: Vec<Vec<AggCall>>,
    index: HashMap<String, usize>,
    groups: Vec<Group>,
}

impl AggTable {
    pub(crate) fn new(items: Vec<ReturnItem>) -> Self {
        let item_calls = items
            .iter()
            .map(|item| {
                let mut calls = Vec::new();
                collect_calls(&item.expr, &mut calls);
                calls
            })
            .collect();
        AggTable { items, item_calls, index: HashMap::new(), groups: Vec::new() }
    }

    pub(crate) fn feed(&mut self, env: &Bindings, params: &PropertyMap) -> EngineResult<()> {
        let mut key_values = Vec::new();
        let mut key = String::new();
        for (item, calls) in self.items.iter().zip(&self.item_calls) {
            if calls.is_empty() {
                let v = eval_expr(&item.expr, env, params)?;
                key.push_str(&canonical_key(&v));
                key.push('|');
                key_values.push(v);
            }
        }

        let group_idx = match self.index.get(&key) {
            Some(idx) => *idx,
            None => {
                let accs = self
                    .item_calls
                    .iter()
                    .map(|calls| calls.iter().map(AggAcc::new).collect())
                    .collect();
                self.groups.push(Group { key_values, env0: env.clone(), accs });
                let idx = self.groups.len() - 1;
                self.index.insert(key, idx);
                idx
            }
        };

        let group = &mut self.groups[group_idx];
        for (i, calls) in self.item_calls.iter().enumerate() {
            for (j, call) in calls.iter().enumerate() {
                let value = match &call.arg {
                    Some(arg) => Some(eval_expr(arg, env, params)?),
                    None => None,
                };
                group.accs[i][j].update(value);
            }
        }
        Ok(())
    }

    /// Finalize groups into rows (alias env attached). With no input and an
    /// all-aggregator item list, one synthetic group materializes from the
    /// initial accumulator state.
    pub(crate) fn finalize(mut self, params: &PropertyMap) -> EngineResult<Vec<(Row, Bindings)>> {
        let all_aggregate = self.item_calls.iter().all(|calls| !calls.is_empty());
        if self.groups.is_empty() && all_aggregate {
            let accs = self
                .item_calls
                .iter()
                .map(|calls| calls.iter().map(AggAcc::new).collect())
                .collect();
            self.groups.push(Group { key_values: Vec::new(), env0: Bindings::new(), accs });
        }

        let multi = self.items.len() > 1;
        let mut out = Vec::with_capacity(self.groups.len());
        for group in &self.groups {
            let mut row = Row::default();
            let mut key_cursor = 0usize;
            for (i, item) in self.items.iter().enumerate() {
                let value = if self.item_calls[i].is_empty() {
                    let v = group.key_values[key_cursor].clone();
                    key_cursor += 1;
                    v
                } else {
                    let finals: Vec<Value> =
                        group.accs[i].iter().map(AggAcc::finish).collect();
                    let mut cursor = 0usize;
                    eval_with_finals(&item.expr, &finals, &mut cursor, &group.env0, params)?
                };
                row.push(alias_for(item, i, multi), value);
            }
            // The row env carries the group's first bindings plus the output
            // aliases, so ORDER BY can reference either.
            let mut env = group.env0.clone();
            for (alias, value) in row.iter() {
                env.insert(alias.to_string(), value.clone());
            }
            out.push((row, env));
        }
        Ok(out)
    }
}

// Pre-order collection of aggregate call sites; eval_with_finals walks the
// same order, so the cursor pairs them back up.
fn collect_calls(expr: &Expression, out: &mut Vec<AggCall>) {
    match expr {
        Expression::Aggregate { func, distinct, arg } => {
            out.push(AggCall {
                func: *func,
                distinct: *distinct,
                arg: arg.as_deref().cloned(),
            });
        }
        Expression::Arith { left, right, .. } => {
            collect_calls(left, out);
            collect_calls(right, out);
        }
        Expression::Neg(inner) | Expression::Length(inner) => collect_calls(inner, out),
        Expression::ListLiteral(items) => {
            for item in items {
                collect_calls(item, out);
            }
        }
        _ => {}
    }
}

fn eval_with_finals(
    expr: &Expression,
    finals: &[Value],
    cursor: &mut usize,
    env: &Bindings,
    params: &PropertyMap,
) -> EngineResult<Value> {
    match expr {
        Expression::Aggregate { .. } => {
            let value = finals[*cursor].clone();
            *cursor += 1;
            Ok(value)
        }
        Expression::Arith { left, op, right } => {
            let l = eval_with_finals(left, finals, cursor, env, params)?;
            let r = eval_with_finals(right, finals, cursor, env, params)?;
            Ok(arith_value(&l, *op, &r))
        }
        Expression::Neg(inner) => Ok(neg_value(eval_with_finals(inner, finals, cursor, env, params)?)),
        Expression::Length(inner) => {
            Ok(length_value(eval_with_finals(inner, finals, cursor, env, params)?))
        }
        Expression::ListLiteral(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(eval_with_finals(item, finals, cursor, env, params)?);
            }
            Ok(Value::List(out))
        }
        other => eval_expr(other, env, params),
    }
}
