//!
//! cyphera storage capability interface
//! -----------------------------------
//! The engine sees every backing store through this trait. Two operations
//! are required (`get_node_by_id`, `scan_nodes`); everything else is an
//! optional capability whose default body answers
//! `FeatureUnsupported("adapter does not support <op>")`, which the engine
//! surfaces unchanged when a statement needs the missing operation.
//!
//! Scan operations hand back lazy iterators that may fail mid-iteration
//! with a storage error; the engine propagates those verbatim. Mutation
//! visibility follows the adapter's own transaction semantics: reads issued
//! later in a script observe earlier pending writes.

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::value::{NodeRecord, PropertyMap, RelRecord, Value};

pub mod memory;

/// Constraint set for a node scan: all listed labels must be present.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeScan {
    pub labels: Vec<String>,
}

impl NodeScan {
    /// Scan every node.
    pub fn any() -> Self {
        NodeScan::default()
    }

    pub fn with_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NodeScan { labels: labels.into_iter().map(Into::into).collect() }
    }
}

/// A single-column index the adapter maintains. `label: None` indexes the
/// property across all labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDef {
    pub label: Option<String>,
    pub property: String,
}

/// Lazy record stream; items may fail individually mid-iteration.
pub type RecordIter<'a, T> = Box<dyn Iterator<Item = EngineResult<T>> + 'a>;

pub trait GraphStore {
    // Required capabilities.

    fn get_node_by_id(&self, id: &Value) -> EngineResult<Option<NodeRecord>>;

    fn scan_nodes(&self, scan: &NodeScan) -> EngineResult<RecordIter<'_, NodeRecord>>;

    // Optional write capabilities.

    fn create_node(&self, _labels: &[String], _properties: PropertyMap) -> EngineResult<NodeRecord> {
        Err(EngineError::unsupported("create_node"))
    }

    /// MUST cascade: all relationships incident to the node go with it.
    fn delete_node(&self, _id: &Value) -> EngineResult<()> {
        Err(EngineError::unsupported("delete_node"))
    }

    /// Apply `patch` over the node's properties; a Null value removes the
    /// property. Returns the updated record.
    fn update_node_properties(&self, _id: &Value, _patch: PropertyMap) -> EngineResult<NodeRecord> {
        Err(EngineError::unsupported("update_node_properties"))
    }

    /// Exact-match lookup used by MERGE: all labels present and every given
    /// property strictly equal.
    fn find_node(&self, _labels: &[String], _properties: &PropertyMap) -> EngineResult<Option<NodeRecord>> {
        Err(EngineError::unsupported("find_node"))
    }

    // Optional index capabilities.

    fn index_lookup(
        &self,
        _label: Option<&str>,
        _property: &str,
        _value: &Value,
    ) -> EngineResult<RecordIter<'_, NodeRecord>> {
        Err(EngineError::unsupported("index_lookup"))
    }

    fn list_indexes(&self) -> EngineResult<Vec<IndexDef>> {
        Ok(Vec::new())
    }

    // Optional relationship capabilities.

    fn get_relationship_by_id(&self, _id: &Value) -> EngineResult<Option<RelRecord>> {
        Err(EngineError::unsupported("get_relationship_by_id"))
    }

    fn scan_relationships(&self) -> EngineResult<RecordIter<'_, RelRecord>> {
        Err(EngineError::unsupported("scan_relationships"))
    }

    fn create_relationship(
        &self,
        _rel_type: &str,
        _start: &Value,
        _end: &Value,
        _properties: PropertyMap,
    ) -> EngineResult<RelRecord> {
        Err(EngineError::unsupported("create_relationship"))
    }

    fn delete_relationship(&self, _id: &Value) -> EngineResult<()> {
        Err(EngineError::unsupported("delete_relationship"))
    }

    fn update_relationship_properties(
        &self,
        _id: &Value,
        _patch: PropertyMap,
    ) -> EngineResult<RelRecord> {
        Err(EngineError::unsupported("update_relationship_properties"))
    }

    // Optional transaction bracket. The session driver downgrades an
    // unsupported begin to a non-transactional run; any other failure in
    // the bracket is a TransactionError.

    fn begin_transaction(&self) -> EngineResult<()> {
        Err(EngineError::unsupported("begin_transaction"))
    }

    fn commit(&self) -> EngineResult<()> {
        Err(EngineError::unsupported("commit"))
    }

    fn rollback(&self) -> EngineResult<()> {
        Err(EngineError::unsupported("rollback"))
    }
}
