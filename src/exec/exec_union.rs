//! UNION / UNION ALL: left rows precede right rows; without ALL the
//! combined set deduplicates by serialized row. ORDER/SKIP/LIMIT written on
//! the final arm were lifted by the parser and apply to the whole union.

use std::collections::{HashSet, VecDeque};

use crate::ast::{Expression, Statement};
use crate::error::EngineResult;
use crate::eval::Bindings;
use crate::exec::exec_return::{resolve_count, sort_rows};
use crate::exec::{statement_stream, ExecContext, Row, RowStream};

pub(crate) struct UnionStream<'a> {
    ctx: ExecContext<'a>,
    arms: Option<(Statement, Statement)>,
    all: bool,
    order_by: Vec<(Expression, bool)>,
    skip: Option<Expression>,
    limit: Option<Expression>,
    base: Bindings,
    queue: Option<VecDeque<(Row, Bindings)>>,
    last: Option<Bindings>,
}

impl<'a> UnionStream<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        ctx: ExecContext<'a>,
        left: Statement,
        right: Statement,
        all: bool,
        order_by: Vec<(Expression, bool)>,
        skip: Option<Expression>,
        limit: Option<Expression>,
        base: Bindings,
    ) -> Self {
        UnionStream {
            ctx,
            arms: Some((left, right)),
            all,
            order_by,
            skip,
            limit,
            base,
            queue: None,
            last: None,
        }
    }

    fn open(&mut self) -> EngineResult<()> {
        let (left, right) = self.arms.take().expect("opened once");
        let mut rows: Vec<(Row, Bindings)> = Vec::new();
        for stmt in [left, right] {
            let mut stream = statement_stream(self.ctx.clone(), stmt, self.base.clone())?;
            while let Some(pair) = stream.next_pair()? {
                rows.push(pair);
            }
        }

        if !self.all {
            let mut seen = HashSet::new();
            rows.retain(|(row, _)| seen.insert(row.dedup_key()));
        }

        sort_rows(&mut rows, &self.order_by, &self.ctx.params)?;

        let mut queue: VecDeque<(Row, Bindings)> = rows.into();
        let to_skip = resolve_count(&self.skip, &self.ctx.params, "SKIP")?.unwrap_or(0);
        for _ in 0..to_skip {
            if queue.pop_front().is_none() {
                break;
            }
        }
        if let Some(limit) = resolve_count(&self.limit, &self.ctx.params, "LIMIT")? {
            queue.truncate(limit as usize);
        }
        self.queue = Some(queue);
        Ok(())
    }
}

impl<'a> RowStream for UnionStream<'a> {
    fn next_pair(&mut self) -> EngineResult<Option<(Row, Bindings)>> {
        if self.queue.is_none() {
            self.open()?;
        }
        let pair = self.queue.as_mut().expect("opened above").pop_front();
        if let Some((_, env)) = &pair {
            self.last = Some(env.clone());
        }
        Ok(pair)
    }

    fn carry_env(&self) -> Option<Bindings> {
        self.last.clone()
    }
}
