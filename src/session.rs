//! Session driver.
//! `Engine::run` hands back a lazy `Rows` cursor without touching the
//! query text; tokenizing, parsing, the transaction bracket, and execution
//! all happen on the first poll, so even a syntax error surfaces through
//! the stream. The driver threads one shared environment across the
//! statement list (last-observed bindings), opens a transaction when any
//! statement writes, commits on success, and rolls back on any failure or
//! when the cursor is dropped mid-stream.

use std::collections::VecDeque;
use std::sync::Arc;

use tracing::debug;

use crate::ast::Statement;
use crate::error::{EngineError, EngineResult};
use crate::eval::Bindings;
use crate::exec::{statement_stream, BoxRows, ExecContext, Row};
use crate::parser::parse_script;
use crate::storage::GraphStore;
use crate::value::PropertyMap;

/// Engine facade over one storage adapter. Each `run` call owns its parser
/// state, environment, and operator tree; the adapter is shared but only
/// ever called sequentially from the cursor being polled.
pub struct Engine<'s> {
    store: &'s dyn GraphStore,
}

impl<'s> Engine<'s> {
    pub fn new(store: &'s dyn GraphStore) -> Self {
        Engine { store }
    }

    /// Run a script with no parameters.
    pub fn run(&self, script: &str) -> Rows<'s> {
        self.run_with_params(script, PropertyMap::new())
    }

    /// Run a script with named `$parameters`.
    pub fn run_with_params(&self, script: &str, params: PropertyMap) -> Rows<'s> {
        Rows {
            store: self.store,
            script: script.to_string(),
            params: Arc::new(params),
            phase: Phase::Idle,
            env: Bindings::new(),
            tx: TxState::None,
            total: 0,
            executed: 0,
        }
    }
}

enum Phase<'s> {
    Idle,
    Executing { queue: VecDeque<Statement>, current: Option<BoxRows<'s>> },
    Finished,
    Failed,
}

#[derive(PartialEq)]
enum TxState {
    None,
    Open,
}

/// Lazy row stream over a whole script: statement i's rows precede
/// statement i+1's. Dropping the cursor before exhaustion rolls back an
/// open transaction.
pub struct Rows<'s> {
    store: &'s dyn GraphStore,
    script: String,
    params: Arc<PropertyMap>,
    phase: Phase<'s>,
    env: Bindings,
    tx: TxState,
    total: usize,
    executed: usize,
}

impl<'s> Rows<'s> {
    /// Drain the stream, failing on the first error.
    pub fn collect_rows(&mut self) -> EngineResult<Vec<Row>> {
        let mut out = Vec::new();
        for row in self {
            out.push(row?);
        }
        Ok(out)
    }

    fn ctx(&self) -> ExecContext<'s> {
        ExecContext { store: self.store, params: Arc::clone(&self.params) }
    }

    fn start(&mut self) -> EngineResult<()> {
        let statements = parse_script(&self.script)?;
        let writes = statements.iter().any(Statement::writes);
        if writes {
            match self.store.begin_transaction() {
                Ok(()) => self.tx = TxState::Open,
                // No transactional capability: run the script bare.
                Err(EngineError::FeatureUnsupported { .. }) => self.tx = TxState::None,
                Err(EngineError::Transaction { message }) => {
                    return Err(EngineError::Transaction { message });
                }
                Err(other) => return Err(EngineError::transaction(other.to_string())),
            }
        }
        debug!(
            target: "cyphera::session",
            statements = statements.len(),
            writes,
            tx = self.tx == TxState::Open,
            "script started"
        );
        self.total = statements.len();
        self.phase = Phase::Executing { queue: statements.into(), current: None };
        Ok(())
    }

    fn finish(&mut self) -> EngineResult<()> {
        if self.tx == TxState::Open {
            self.tx = TxState::None;
            if let Err(commit_err) = self.store.commit() {
                // Best-effort rollback before surfacing the commit failure.
                let _ = self.store.rollback();
                return Err(EngineError::transaction(commit_err.to_string()));
            }
        }
        debug!(target: "cyphera::session", executed = self.executed, "script finished");
        Ok(())
    }

    fn fail(&mut self, err: EngineError) -> EngineError {
        if self.tx == TxState::Open {
            self.tx = TxState::None;
            let _ = self.store.rollback();
        }
        self.phase = Phase::Failed;
        err
    }

    fn advance(&mut self) -> EngineResult<Option<Row>> {
        loop {
            match self.phase {
                Phase::Idle => {
                    if let Err(e) = self.start() {
                        return Err(self.fail(e));
                    }
                    continue;
                }
                Phase::Finished | Phase::Failed => return Ok(None),
                Phase::Executing { .. } => {}
            }

            let needs_stream = match &self.phase {
                Phase::Executing { current, .. } => current.is_none(),
                _ => unreachable!("handled above"),
            };
            if needs_stream {
                let next_stmt = match &mut self.phase {
                    Phase::Executing { queue, .. } => queue.pop_front(),
                    _ => unreachable!("handled above"),
                };
                match next_stmt {
                    Some(stmt) => {
                        self.executed += 1;
                        debug!(
                            target: "cyphera::session",
                            statement = self.executed,
                            of = self.total,
                            "executing"
                        );
                        let ctx = self.ctx();
                        let stream = match statement_stream(ctx, stmt, self.env.clone()) {
                            Ok(s) => s,
                            Err(e) => return Err(self.fail(e)),
                        };
                        if let Phase::Executing { current, .. } = &mut self.phase {
                            *current = Some(stream);
                        }
                        continue;
                    }
                    None => {
                        match self.finish() {
                            Ok(()) => {
                                self.phase = Phase::Finished;
                                return Ok(None);
                            }
                            Err(e) => {
                                self.phase = Phase::Failed;
                                return Err(e);
                            }
                        }
                    }
                }
            }

            let polled = match &mut self.phase {
                Phase::Executing { current, .. } => {
                    current.as_mut().expect("checked above").next_pair()
                }
                _ => unreachable!("handled above"),
            };
            match polled {
                Ok(Some((row, _env))) => return Ok(Some(row)),
                Ok(None) => {
                    // Carry the statement's last-observed bindings into the
                    // shared environment before the next statement starts.
                    let carried = match &self.phase {
                        Phase::Executing { current, .. } => {
                            current.as_ref().and_then(|s| s.carry_env())
                        }
                        _ => unreachable!("handled above"),
                    };
                    if let Some(carried) = carried {
                        for (name, value) in carried {
                            self.env.insert(name, value);
                        }
                    }
                    if let Phase::Executing { current, .. } = &mut self.phase {
                        *current = None;
                    }
                }
                Err(e) => return Err(self.fail(e)),
            }
        }
    }
}

impl<'s> Iterator for Rows<'s> {
    type Item = EngineResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => None,
            Err(e) => Some(Err(e)),
        }
    }
}

impl<'s> Drop for Rows<'s> {
    fn drop(&mut self) {
        // Abandoned mid-script: the write scope must not leak.
        if self.tx == TxState::Open {
            let _ = self.store.rollback();
        }
    }
}
