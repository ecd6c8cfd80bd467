//! In-memory reference adapter.
//! `MemoryGraph` implements every optional capability of the storage
//! interface: id allocation, label and property storage, single-column
//! indexes, cascade-deleting node removal, exact-match lookup, and a
//! snapshot-based transaction bracket. The inner state sits behind an
//! `Arc<Mutex<..>>` so a graph handle can be cloned and shared; the engine
//! itself only ever calls in sequentially.
//!
//! Records live in insertion order, which is the scan order the engine's
//! ordering guarantees are anchored to.

use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::storage::{GraphStore, IndexDef, NodeScan, RecordIter};
use crate::value::{eq_values, NodeRecord, PropertyMap, RelRecord, Value};

#[derive(Clone, Default)]
pub struct MemoryGraph {
    inner: Arc<Mutex<GraphInner>>,
}

#[derive(Clone, Default)]
struct GraphInner {
    nodes: Vec<NodeRecord>,
    rels: Vec<RelRecord>,
    next_id: i64,
    indexes: Vec<IndexDef>,
    snapshot: Option<Box<Snapshot>>,
}

#[derive(Clone)]
struct Snapshot {
    nodes: Vec<NodeRecord>,
    rels: Vec<RelRecord>,
    next_id: i64,
}

impl MemoryGraph {
    pub fn new() -> Self {
        MemoryGraph::default()
    }

    /// Declare a single-column index. Purely advisory: it changes the access
    /// path the engine picks, never the result set.
    pub fn create_index<S: Into<String>>(&self, label: Option<S>, property: S) {
        let def = IndexDef { label: label.map(Into::into), property: property.into() };
        let mut g = self.inner.lock();
        if !g.indexes.contains(&def) {
            g.indexes.push(def);
        }
    }

    /// Seed a node under a caller-chosen id. Fails if the id is taken.
    pub fn insert_node_with_id<I, S>(
        &self,
        id: Value,
        labels: I,
        properties: PropertyMap,
    ) -> EngineResult<NodeRecord>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut g = self.inner.lock();
        if g.nodes.iter().any(|n| n.id == id) {
            return Err(EngineError::storage(format!("node id {} already exists", id)));
        }
        let node = NodeRecord::new(id, labels, properties);
        g.nodes.push(node.clone());
        Ok(node)
    }

    /// Seed a relationship under a caller-chosen id; endpoints must exist.
    pub fn insert_rel_with_id<S: Into<String>>(
        &self,
        id: Value,
        rel_type: S,
        start: Value,
        end: Value,
        properties: PropertyMap,
    ) -> EngineResult<RelRecord> {
        let mut g = self.inner.lock();
        if g.rels.iter().any(|r| r.id == id) {
            return Err(EngineError::storage(format!("relationship id {} already exists", id)));
        }
        if !g.nodes.iter().any(|n| n.id == start) || !g.nodes.iter().any(|n| n.id == end) {
            return Err(EngineError::storage("relationship endpoint does not exist"));
        }
        let rel = RelRecord { id, rel_type: rel_type.into(), start, end, properties };
        g.rels.push(rel.clone());
        Ok(rel)
    }

    pub fn node_count(&self) -> usize {
        self.inner.lock().nodes.len()
    }

    pub fn rel_count(&self) -> usize {
        self.inner.lock().rels.len()
    }

    fn alloc_id(g: &mut GraphInner) -> Value {
        loop {
            g.next_id += 1;
            let candidate = Value::Int(g.next_id);
            let taken = g.nodes.iter().any(|n| n.id == candidate)
                || g.rels.iter().any(|r| r.id == candidate);
            if !taken {
                return candidate;
            }
        }
    }
}

fn props_match(record: &PropertyMap, wanted: &PropertyMap) -> bool {
    wanted.iter().all(|(k, v)| record.get(k) == Some(v))
}

impl GraphStore for MemoryGraph {
    fn get_node_by_id(&self, id: &Value) -> EngineResult<Option<NodeRecord>> {
        Ok(self.inner.lock().nodes.iter().find(|n| n.id == *id).cloned())
    }

    fn scan_nodes(&self, scan: &NodeScan) -> EngineResult<RecordIter<'_, NodeRecord>> {
        let g = self.inner.lock();
        let matched: Vec<NodeRecord> = g
            .nodes
            .iter()
            .filter(|n| scan.labels.iter().all(|l| n.has_label(l)))
            .cloned()
            .collect();
        Ok(Box::new(matched.into_iter().map(Ok)))
    }

    fn create_node(&self, labels: &[String], properties: PropertyMap) -> EngineResult<NodeRecord> {
        let mut g = self.inner.lock();
        let id = Self::alloc_id(&mut g);
        let node = NodeRecord::new(id, labels.iter().cloned(), properties);
        debug!(target: "cyphera::storage", id = %node.id, "create_node");
        g.nodes.push(node.clone());
        Ok(node)
    }

    fn delete_node(&self, id: &Value) -> EngineResult<()> {
        let mut g = self.inner.lock();
        let before_rels = g.rels.len();
        g.nodes.retain(|n| n.id != *id);
        // Cascade: drop every incident relationship with the node.
        g.rels.retain(|r| r.start != *id && r.end != *id);
        debug!(
            target: "cyphera::storage",
            id = %id,
            cascaded = before_rels - g.rels.len(),
            "delete_node"
        );
        Ok(())
    }

    fn update_node_properties(&self, id: &Value, patch: PropertyMap) -> EngineResult<NodeRecord> {
        let mut g = self.inner.lock();
        let node = g
            .nodes
            .iter_mut()
            .find(|n| n.id == *id)
            .ok_or_else(|| EngineError::storage(format!("no node with id {}", id)))?;
        for (key, value) in patch {
            if value.is_null() {
                node.properties.remove(&key);
            } else {
                node.properties.insert(key, value);
            }
        }
        Ok(node.clone())
    }

    fn find_node(&self, labels: &[String], properties: &PropertyMap) -> EngineResult<Option<NodeRecord>> {
        let g = self.inner.lock();
        Ok(g.nodes
            .iter()
            .find(|n| labels.iter().all(|l| n.has_label(l)) && props_match(&n.properties, properties))
            .cloned())
    }

    fn index_lookup(
        &self,
        label: Option<&str>,
        property: &str,
        value: &Value,
    ) -> EngineResult<RecordIter<'_, NodeRecord>> {
        let g = self.inner.lock();
        // Same equality the engine's scan filter uses, so a probe and a
        // scan always agree on the result set.
        let matched: Vec<NodeRecord> = g
            .nodes
            .iter()
            .filter(|n| label.map(|l| n.has_label(l)).unwrap_or(true))
            .filter(|n| {
                n.properties
                    .get(property)
                    .map(|have| eq_values(have, value) == Some(true))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        debug!(target: "cyphera::storage", property, hits = matched.len(), "index_lookup");
        Ok(Box::new(matched.into_iter().map(Ok)))
    }

    fn list_indexes(&self) -> EngineResult<Vec<IndexDef>> {
        Ok(self.inner.lock().indexes.clone())
    }

    fn get_relationship_by_id(&self, id: &Value) -> EngineResult<Option<RelRecord>> {
        Ok(self.inner.lock().rels.iter().find(|r| r.id == *id).cloned())
    }

    fn scan_relationships(&self) -> EngineResult<RecordIter<'_, RelRecord>> {
        let g = self.inner.lock();
        let matched: Vec<RelRecord> = g.rels.clone();
        Ok(Box::new(matched.into_iter().map(Ok)))
    }

    fn create_relationship(
        &self,
        rel_type: &str,
        start: &Value,
        end: &Value,
        properties: PropertyMap,
    ) -> EngineResult<RelRecord> {
        let mut g = self.inner.lock();
        if !g.nodes.iter().any(|n| n.id == *start) || !g.nodes.iter().any(|n| n.id == *end) {
            return Err(EngineError::storage("relationship endpoint does not exist"));
        }
        let id = Self::alloc_id(&mut g);
        let rel = RelRecord {
            id,
            rel_type: rel_type.to_string(),
            start: start.clone(),
            end: end.clone(),
            properties,
        };
        debug!(target: "cyphera::storage", id = %rel.id, rel_type, "create_relationship");
        g.rels.push(rel.clone());
        Ok(rel)
    }

    fn delete_relationship(&self, id: &Value) -> EngineResult<()> {
        let mut g = self.inner.lock();
        g.rels.retain(|r| r.id != *id);
        Ok(())
    }

    fn update_relationship_properties(&self, id: &Value, patch: PropertyMap) -> EngineResult<RelRecord> {
        let mut g = self.inner.lock();
        let rel = g
            .rels
            .iter_mut()
            .find(|r| r.id == *id)
            .ok_or_else(|| EngineError::storage(format!("no relationship with id {}", id)))?;
        for (key, value) in patch {
            if value.is_null() {
                rel.properties.remove(&key);
            } else {
                rel.properties.insert(key, value);
            }
        }
        Ok(rel.clone())
    }

    fn begin_transaction(&self) -> EngineResult<()> {
        let mut g = self.inner.lock();
        if g.snapshot.is_some() {
            return Err(EngineError::transaction("transaction already open"));
        }
        let snap = Snapshot { nodes: g.nodes.clone(), rels: g.rels.clone(), next_id: g.next_id };
        g.snapshot = Some(Box::new(snap));
        debug!(target: "cyphera::storage", "begin_transaction");
        Ok(())
    }

    fn commit(&self) -> EngineResult<()> {
        let mut g = self.inner.lock();
        if g.snapshot.take().is_none() {
            return Err(EngineError::transaction("no open transaction to commit"));
        }
        debug!(target: "cyphera::storage", "commit");
        Ok(())
    }

    fn rollback(&self) -> EngineResult<()> {
        let mut g = self.inner.lock();
        match g.snapshot.take() {
            Some(snap) => {
                g.nodes = snap.nodes;
                g.rels = snap.rels;
                g.next_id = snap.next_id;
                debug!(target: "cyphera::storage", "rollback");
                Ok(())
            }
            None => Err(EngineError::transaction("no open transaction to roll back")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn props(entries: &[(&str, Value)]) -> PropertyMap {
        entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn seeded() -> MemoryGraph {
        let g = MemoryGraph::new();
        g.insert_node_with_id(Value::Int(1), ["Person"], props(&[("name", Value::Str("Alice".into()))]))
            .unwrap();
        g.insert_node_with_id(Value::Int(2), ["Person"], props(&[("name", Value::Str("Bob".into()))]))
            .unwrap();
        g.insert_rel_with_id(Value::Int(10), "KNOWS", Value::Int(1), Value::Int(2), PropertyMap::new())
            .unwrap();
        g
    }

    #[test]
    fn scan_filters_by_all_labels() {
        let g = seeded();
        g.insert_node_with_id(Value::Int(3), ["Person", "Actor"], PropertyMap::new()).unwrap();
        let all: Vec<_> = g.scan_nodes(&NodeScan::any()).unwrap().collect::<Result<_, _>>().unwrap();
        assert_eq!(all.len(), 3);
        let both: Vec<_> = g
            .scan_nodes(&NodeScan::with_labels(["Person", "Actor"]))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].id, Value::Int(3));
    }

    #[test]
    fn delete_node_cascades_to_relationships() {
        let g = seeded();
        assert_eq!(g.rel_count(), 1);
        g.delete_node(&Value::Int(1)).unwrap();
        assert_eq!(g.node_count(), 1);
        assert_eq!(g.rel_count(), 0);
    }

    #[test]
    fn update_with_null_removes_the_property() {
        let g = seeded();
        let updated = g
            .update_node_properties(&Value::Int(1), props(&[("name", Value::Null), ("age", Value::Int(9))]))
            .unwrap();
        assert!(!updated.properties.contains_key("name"));
        assert_eq!(updated.properties.get("age"), Some(&Value::Int(9)));
    }

    #[test]
    fn allocated_ids_skip_seeded_ones() {
        let g = seeded();
        let created = g.create_node(&["Tmp".to_string()], PropertyMap::new()).unwrap();
        assert_ne!(created.id, Value::Int(1));
        assert_ne!(created.id, Value::Int(2));
    }

    #[test]
    fn transaction_rollback_restores_state() {
        let g = seeded();
        g.begin_transaction().unwrap();
        g.create_node(&["Tmp".to_string()], PropertyMap::new()).unwrap();
        g.delete_node(&Value::Int(1)).unwrap();
        g.rollback().unwrap();
        assert_eq!(g.node_count(), 2);
        assert_eq!(g.rel_count(), 1);
        assert!(g.get_node_by_id(&Value::Int(1)).unwrap().is_some());
    }

    #[test]
    fn commit_without_begin_is_an_error() {
        let g = seeded();
        assert!(matches!(g.commit(), Err(EngineError::Transaction { .. })));
    }

    #[test]
    fn index_lookup_matches_scan_results() {
        let g = seeded();
        g.create_index(Some("Person"), "name");
        let hits: Vec<_> = g
            .index_lookup(Some("Person"), "name", &Value::Str("Alice".into()))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, Value::Int(1));
    }

    #[test]
    fn index_lookup_equality_crosses_int_and_float() {
        let g = seeded();
        g.insert_node_with_id(Value::Int(4), ["Movie"], props(&[("released", Value::Float(1999.0))]))
            .unwrap();
        g.create_index(Some("Movie"), "released");
        // A probe with the integer form finds the float-stored property,
        // exactly as a plain scan through the engine's filter would.
        let hits: Vec<_> = g
            .index_lookup(Some("Movie"), "released", &Value::Int(1999))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, Value::Int(4));
    }
}
