//! UNWIND and FOREACH: list iteration with projected output (UNWIND) or
//! fully executed, discarded bodies (FOREACH).

use crate::ast::{Expression, ReturnClause, Statement};
use crate::error::EngineResult;
use crate::eval::{eval_expr, Bindings};
use crate::exec::exec_common::VecBinds;
use crate::exec::exec_return::{ReturnShaper, ShaperOpts};
use crate::exec::{statement_stream, BoxRows, ExecContext, Row, RowStream};
use crate::value::Value;

/// Evaluate the list expression once; anything but a list iterates zero
/// times.
fn list_elements(
    list: &Expression,
    env: &Bindings,
    ctx: &ExecContext<'_>,
) -> EngineResult<Vec<Value>> {
    match eval_expr(list, env, &ctx.params)? {
        Value::List(items) => Ok(items),
        _ => Ok(Vec::new()),
    }
}

pub(crate) struct UnwindStream<'a> {
    ctx: ExecContext<'a>,
    list: Expression,
    var: String,
    ret: ReturnClause,
    base: Bindings,
    inner: Option<ReturnShaper<'a>>,
}

impl<'a> UnwindStream<'a> {
    pub(crate) fn new(
        ctx: ExecContext<'a>,
        list: Expression,
        var: String,
        ret: ReturnClause,
        base: Bindings,
    ) -> Self {
        UnwindStream { ctx, list, var, ret, base, inner: None }
    }
}

impl<'a> RowStream for UnwindStream<'a> {
    fn next_pair(&mut self) -> EngineResult<Option<(Row, Bindings)>> {
        if self.inner.is_none() {
            let elements = list_elements(&self.list, &self.base, &self.ctx)?;
            let envs: Vec<Bindings> = elements
                .into_iter()
                .map(|element| {
                    let mut env = self.base.clone();
                    env.insert(self.var.clone(), element);
                    env
                })
                .collect();
            self.inner = Some(ReturnShaper::new(
                self.ctx.clone(),
                self.ret.clone(),
                Box::new(VecBinds::new(envs)),
                ShaperOpts::default(),
            ));
        }
        self.inner.as_mut().expect("opened above").next_pair()
    }

    fn carry_env(&self) -> Option<Bindings> {
        self.inner.as_ref().and_then(|inner| inner.carry_env())
    }
}

/// FOREACH has no output: each element's body runs to completion and its
/// rows are discarded; store side effects remain visible to later
/// statements.
pub(crate) struct ForeachStream<'a> {
    ctx: ExecContext<'a>,
    var: String,
    list: Expression,
    body: Statement,
    base: Bindings,
    done: bool,
}

impl<'a> ForeachStream<'a> {
    pub(crate) fn new(
        ctx: ExecContext<'a>,
        var: String,
        list: Expression,
        body: Statement,
        base: Bindings,
    ) -> Self {
        ForeachStream { ctx, var, list, body, base, done: false }
    }
}

impl<'a> RowStream for ForeachStream<'a> {
    fn next_pair(&mut self) -> EngineResult<Option<(Row, Bindings)>> {
        if self.done {
            return Ok(None);
        }
        self.done = true;
        let elements = list_elements(&self.list, &self.base, &self.ctx)?;
        for element in elements {
            let mut env = self.base.clone();
            env.insert(self.var.clone(), element);
            let mut body: BoxRows<'a> =
                statement_stream(self.ctx.clone(), self.body.clone(), env)?;
            while body.next_pair()?.is_some() {}
        }
        Ok(None)
    }
}
