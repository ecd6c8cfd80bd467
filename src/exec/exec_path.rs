//! Variable-length path matching (`p = (a)-[*]->(b)`).
//! Breadth-first search from each start candidate over the scanned
//! relationship set, edges considered in storage iteration order. Cycles
//! are prevented by the visited-node set along the current path prefix;
//! only the first path per (start, end) pair is kept, which under BFS is a
//! shortest one.

use std::collections::{HashSet, VecDeque};

use crate::ast::{NodePattern, RelDir, RelPattern, WhereClause};
use crate::error::EngineResult;
use crate::eval::Bindings;
use crate::exec::exec_common::{
    collect_pattern_nodes, eval_pattern_props, node_matches, rel_matches, where_passes,
};
use crate::exec::{BindStream, ExecContext};
use crate::value::{canonical_key, PathRecord, RelRecord, Value};

pub(crate) struct VarLengthBinds<'a> {
    ctx: ExecContext<'a>,
    path_var: String,
    start: NodePattern,
    rel: RelPattern,
    end: NodePattern,
    where_clause: Option<WhereClause>,
    base: Bindings,
    results: Option<VecDeque<Bindings>>,
}

impl<'a> VarLengthBinds<'a> {
    pub(crate) fn new(
        ctx: ExecContext<'a>,
        path_var: String,
        start: NodePattern,
        rel: RelPattern,
        end: NodePattern,
        where_clause: Option<WhereClause>,
        base: Bindings,
    ) -> Self {
        VarLengthBinds { ctx, path_var, start, rel, end, where_clause, base, results: None }
    }

    fn search(&mut self) -> EngineResult<VecDeque<Bindings>> {
        let starts = collect_pattern_nodes(&self.ctx, &self.start, &self.base)?;
        let rel_props = eval_pattern_props(&self.rel.props, &self.base, &self.ctx.params)?;
        let end_props = eval_pattern_props(&self.end.props, &self.base, &self.ctx.params)?;
        let mut rels: Vec<RelRecord> = Vec::new();
        for rel in self.ctx.store.scan_relationships()? {
            let rel = rel?;
            if rel_matches(&rel, &self.rel, &rel_props) {
                rels.push(rel);
            }
        }

        let mut out = VecDeque::new();
        let mut reached: HashSet<(String, String)> = HashSet::new();

        for start in starts {
            let start_key = canonical_key(&start.id);
            let mut queue: VecDeque<PathRecord> = VecDeque::new();
            queue.push_back(PathRecord::start(start.clone()));

            while let Some(path) = queue.pop_front() {
                let tail = path.end_node().clone();

                if !path.is_empty() && node_matches(&tail, &self.end, &end_props) {
                    let pair = (start_key.clone(), canonical_key(&tail.id));
                    if reached.insert(pair) {
                        let mut env = self.base.clone();
                        if let Some(var) = &self.start.var {
                            env.insert(var.clone(), Value::Node(Box::new(start.clone())));
                        }
                        if let Some(var) = &self.end.var {
                            env.insert(var.clone(), Value::Node(Box::new(tail.clone())));
                        }
                        if let Some(var) = &self.rel.var {
                            let hops: Vec<Value> = path
                                .steps
                                .iter()
                                .map(|s| Value::Rel(Box::new(s.rel.clone())))
                                .collect();
                            env.insert(var.clone(), Value::List(hops));
                        }
                        env.insert(self.path_var.clone(), Value::Path(path.clone()));
                        if where_passes(&self.where_clause, &env, &self.ctx.params)? {
                            out.push_back(env);
                        }
                    }
                }

                for rel in &rels {
                    let (traversed, reversed) = match self.rel.dir {
                        RelDir::Out => (rel.start == tail.id, false),
                        RelDir::In => (rel.end == tail.id, true),
                        RelDir::Either => {
                            if rel.start == tail.id {
                                (true, false)
                            } else if rel.end == tail.id {
                                (true, true)
                            } else {
                                (false, false)
                            }
                        }
                    };
                    if !traversed {
                        continue;
                    }
                    let neighbor_id = if reversed { &rel.start } else { &rel.end };
                    // No revisits along the current path prefix.
                    if path.nodes.iter().any(|n| n.id == *neighbor_id) {
                        continue;
                    }
                    let neighbor = match self.ctx.store.get_node_by_id(neighbor_id)? {
                        Some(node) => node,
                        None => continue,
                    };
                    let mut extended = path.clone();
                    extended.push_hop(rel.clone(), reversed, neighbor);
                    queue.push_back(extended);
                }
            }
        }
        Ok(out)
    }
}

impl<'a> BindStream for VarLengthBinds<'a> {
    fn next_bindings(&mut self) -> EngineResult<Option<Bindings>> {
        if self.results.is_none() {
            let results = self.search()?;
            self.results = Some(results);
        }
        Ok(self.results.as_mut().expect("searched above").pop_front())
    }
}
