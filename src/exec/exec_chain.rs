//! Multi-hop chain matching.
//! Depth-first expansion over a frame stack: each frame holds the forked
//! environment, the node reached, and the incremental path when the chain
//! carries a path variable. Relationship and neighbor variables enter the
//! environment at each hop; WHERE is evaluated once all bindings exist.

use crate::ast::{NodePattern, RelDir, RelPattern, WhereClause};
use crate::error::EngineResult;
use crate::eval::Bindings;
use crate::exec::exec_common::{
    collect_pattern_nodes, eval_pattern_props, node_matches, rel_matches, where_passes,
};
use crate::exec::{BindStream, ExecContext};
use crate::value::{NodeRecord, PathRecord, RelRecord, Value};

struct Frame {
    env: Bindings,
    node: NodeRecord,
    path: Option<PathRecord>,
    hop: usize,
}

pub(crate) struct ChainBinds<'a> {
    ctx: ExecContext<'a>,
    path_var: Option<String>,
    start: NodePattern,
    hops: Vec<(RelPattern, NodePattern)>,
    where_clause: Option<WhereClause>,
    base: Bindings,
    stack: Vec<Frame>,
    opened: bool,
    // Relationship set is scanned once per statement and reused per hop.
    rels: Vec<RelRecord>,
}

impl<'a> ChainBinds<'a> {
    pub(crate) fn new(
        ctx: ExecContext<'a>,
        path_var: Option<String>,
        start: NodePattern,
        hops: Vec<(RelPattern, NodePattern)>,
        where_clause: Option<WhereClause>,
        base: Bindings,
    ) -> Self {
        ChainBinds {
            ctx,
            path_var,
            start,
            hops,
            where_clause,
            base,
            stack: Vec::new(),
            opened: false,
            rels: Vec::new(),
        }
    }

    fn open(&mut self) -> EngineResult<()> {
        self.opened = true;
        let starts = collect_pattern_nodes(&self.ctx, &self.start, &self.base)?;
        for rel in self.ctx.store.scan_relationships()? {
            self.rels.push(rel?);
        }
        // Stack pops reverse the order, so push reversed to keep storage
        // order on output.
        for node in starts.into_iter().rev() {
            let mut env = self.base.clone();
            if let Some(var) = &self.start.var {
                env.insert(var.clone(), Value::Node(Box::new(node.clone())));
            }
            let path = self.path_var.as_ref().map(|_| PathRecord::start(node.clone()));
            self.stack.push(Frame { env, node, path, hop: 0 });
        }
        Ok(())
    }

    fn expand(&mut self, frame: Frame) -> EngineResult<()> {
        let (rel_pattern, node_pattern) = &self.hops[frame.hop];
        let rel_props = eval_pattern_props(&rel_pattern.props, &frame.env, &self.ctx.params)?;
        let node_props = eval_pattern_props(&node_pattern.props, &frame.env, &self.ctx.params)?;

        let mut children = Vec::new();
        for rel in &self.rels {
            let (traversed, reversed) = match rel_pattern.dir {
                RelDir::Out => (rel.start == frame.node.id, false),
                RelDir::In => (rel.end == frame.node.id, true),
                RelDir::Either => {
                    if rel.start == frame.node.id {
                        (true, false)
                    } else if rel.end == frame.node.id {
                        (true, true)
                    } else {
                        (false, false)
                    }
                }
            };
            if !traversed || !rel_matches(rel, rel_pattern, &rel_props) {
                continue;
            }
            let neighbor_id = if reversed { &rel.start } else { &rel.end };
            let neighbor = match self.ctx.store.get_node_by_id(neighbor_id)? {
                Some(node) => node,
                None => continue,
            };
            if !node_matches(&neighbor, node_pattern, &node_props) {
                continue;
            }
            // Fork the environment for this branch.
            let mut env = frame.env.clone();
            if let Some(var) = &rel_pattern.var {
                env.insert(var.clone(), Value::Rel(Box::new(rel.clone())));
            }
            if let Some(var) = &node_pattern.var {
                env.insert(var.clone(), Value::Node(Box::new(neighbor.clone())));
            }
            let path = frame.path.clone().map(|mut p| {
                p.push_hop(rel.clone(), reversed, neighbor.clone());
                p
            });
            children.push(Frame { env, node: neighbor, path, hop: frame.hop + 1 });
        }
        for child in children.into_iter().rev() {
            self.stack.push(child);
        }
        Ok(())
    }
}

impl<'a> BindStream for ChainBinds<'a> {
    fn next_bindings(&mut self) -> EngineResult<Option<Bindings>> {
        if !self.opened {
            self.open()?;
        }
        while let Some(frame) = self.stack.pop() {
            if frame.hop == self.hops.len() {
                let mut env = frame.env;
                if let (Some(var), Some(path)) = (&self.path_var, frame.path) {
                    env.insert(var.clone(), Value::Path(path));
                }
                if where_passes(&self.where_clause, &env, &self.ctx.params)? {
                    return Ok(Some(env));
                }
                continue;
            }
            self.expand(frame)?;
        }
        Ok(None)
    }
}
