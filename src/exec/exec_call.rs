//! CALL subqueries: the inner script runs in a local environment seeded
//! from the outer one. Non-final inner statements merge their last-observed
//! bindings forward (last row wins); every row of the final inner statement
//! extends the outer environment and drives the outer RETURN once, through
//! the ordinary shaping layer so aggregation over subquery rows works.

use crate::ast::{ReturnClause, Statement};
use crate::error::EngineResult;
use crate::eval::Bindings;
use crate::exec::exec_common::VecBinds;
use crate::exec::exec_return::{ReturnShaper, ShaperOpts};
use crate::exec::{statement_stream, ExecContext, Row, RowStream};

pub(crate) struct CallStream<'a> {
    ctx: ExecContext<'a>,
    subquery: Option<Vec<Statement>>,
    ret: ReturnClause,
    base: Bindings,
    inner: Option<ReturnShaper<'a>>,
}

impl<'a> CallStream<'a> {
    pub(crate) fn new(
        ctx: ExecContext<'a>,
        subquery: Vec<Statement>,
        ret: ReturnClause,
        base: Bindings,
    ) -> Self {
        CallStream { ctx, subquery: Some(subquery), ret, base, inner: None }
    }

    fn open(&mut self) -> EngineResult<()> {
        let mut statements = self.subquery.take().expect("opened once");
        let last = statements.pop().expect("parser guarantees a non-empty body");

        let mut local = self.base.clone();
        for stmt in statements {
            let mut stream = statement_stream(self.ctx.clone(), stmt, local.clone())?;
            while stream.next_pair()?.is_some() {}
            if let Some(carried) = stream.carry_env() {
                for (name, value) in carried {
                    local.insert(name, value);
                }
            }
        }

        let mut envs = Vec::new();
        let mut stream = statement_stream(self.ctx.clone(), last, local.clone())?;
        while let Some((_, env)) = stream.next_pair()? {
            let mut outer = local.clone();
            for (name, value) in env {
                outer.insert(name, value);
            }
            envs.push(outer);
        }

        self.inner = Some(ReturnShaper::new(
            self.ctx.clone(),
            self.ret.clone(),
            Box::new(VecBinds::new(envs)),
            ShaperOpts::default(),
        ));
        Ok(())
    }
}

impl<'a> RowStream for CallStream<'a> {
    fn next_pair(&mut self) -> EngineResult<Option<(Row, Bindings)>> {
        if self.inner.is_none() {
            self.open()?;
        }
        self.inner.as_mut().expect("opened above").next_pair()
    }

    fn carry_env(&self) -> Option<Bindings> {
        self.inner.as_ref().and_then(|inner| inner.carry_env())
    }
}
