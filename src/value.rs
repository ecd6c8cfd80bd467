//! Value model for the engine.
//! Everything a query can bind, compare, or return is a `Value`: scalars,
//! lists, maps, and the three graph record kinds. Graph records carry their
//! store-assigned id; equality and key serialization use that id for records
//! and deep equality for everything else. Record ids are compared strictly,
//! an integer id never equals a string id.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Property bag for nodes and relationships. BTreeMap keeps iteration
/// deterministic, which the canonical key serialization relies on.
pub type PropertyMap = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: Value,
    pub labels: BTreeSet<String>,
    pub properties: PropertyMap,
}

impl NodeRecord {
    pub fn new<I, S>(id: Value, labels: I, properties: PropertyMap) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        NodeRecord { id, labels: labels.into_iter().map(Into::into).collect(), properties }
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelRecord {
    pub id: Value,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub start: Value,
    pub end: Value,
    pub properties: PropertyMap,
}

/// One hop of a path. `reversed` is the traversal-direction flag: true when
/// the path walked the relationship from its end node to its start node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathStep {
    pub rel: RelRecord,
    pub reversed: bool,
}

/// Alternating node/relationship sequence with k >= 0 hops.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PathRecord {
    pub nodes: Vec<NodeRecord>,
    pub steps: Vec<PathStep>,
}

impl PathRecord {
    pub fn start(node: NodeRecord) -> Self {
        PathRecord { nodes: vec![node], steps: Vec::new() }
    }

    /// Relationship count, the Cypher length() of a path.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn push_hop(&mut self, rel: RelRecord, reversed: bool, node: NodeRecord) {
        self.steps.push(PathStep { rel, reversed });
        self.nodes.push(node);
    }

    pub fn end_node(&self) -> &NodeRecord {
        self.nodes.last().expect("path always holds at least its start node")
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(PropertyMap),
    Node(Box<NodeRecord>),
    Rel(Box<RelRecord>),
    Path(PathRecord),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Integer coercion for SKIP/LIMIT operands. Whole floats are accepted.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            _ => None,
        }
    }

    /// Build a Value from a JSON document; this is how parameter maps come in.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.iter().map(|(k, v)| (k.clone(), Value::from_json(v))).collect(),
            ),
        }
    }

    /// Render to JSON. Graph records become objects with id/labels/properties
    /// (plus type/start/end for relationships); paths become node/rel arrays.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::json;
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => json!(b),
            Value::Int(n) => json!(n),
            Value::Float(f) => json!(f),
            Value::Str(s) => json!(s),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            Value::Node(n) => json!({
                "id": n.id.to_json(),
                "labels": n.labels.iter().collect::<Vec<_>>(),
                "properties": Value::Map(n.properties.clone()).to_json(),
            }),
            Value::Rel(r) => json!({
                "id": r.id.to_json(),
                "type": r.rel_type,
                "start": r.start.to_json(),
                "end": r.end.to_json(),
                "properties": Value::Map(r.properties.clone()).to_json(),
            }),
            Value::Path(p) => json!({
                "nodes": p.nodes.iter().map(|n| Value::Node(Box::new(n.clone())).to_json()).collect::<Vec<_>>(),
                "rels": p.steps.iter().map(|s| Value::Rel(Box::new(s.rel.clone())).to_json()).collect::<Vec<_>>(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Str(s) => write!(f, "{}", s),
            other => write!(f, "{}", other.to_json()),
        }
    }
}

/// Equality with null propagation: None when either side is Null (or a NaN
/// comparison), otherwise the strict three-valued answer. Records compare by
/// kind and id; lists and maps element-wise with propagation.
pub fn eq_values(a: &Value, b: &Value) -> Option<bool> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Node(x), Value::Node(y)) => id_eq(&x.id, &y.id),
        (Value::Rel(x), Value::Rel(y)) => id_eq(&x.id, &y.id),
        (Value::Bool(x), Value::Bool(y)) => Some(x == y),
        (Value::Str(x), Value::Str(y)) => Some(x == y),
        (Value::Int(x), Value::Int(y)) => Some(x == y),
        (Value::Int(_), Value::Float(_)) | (Value::Float(_), Value::Int(_)) | (Value::Float(_), Value::Float(_)) => {
            let (x, y) = (a.as_number().unwrap(), b.as_number().unwrap());
            if x.is_nan() || y.is_nan() {
                None
            } else {
                Some(x == y)
            }
        }
        (Value::List(x), Value::List(y)) => {
            if x.len() != y.len() {
                return Some(false);
            }
            let mut unknown = false;
            for (xi, yi) in x.iter().zip(y.iter()) {
                match eq_values(xi, yi) {
                    Some(false) => return Some(false),
                    Some(true) => {}
                    None => unknown = true,
                }
            }
            if unknown {
                None
            } else {
                Some(true)
            }
        }
        (Value::Map(x), Value::Map(y)) => {
            if x.len() != y.len() || x.keys().ne(y.keys()) {
                return Some(false);
            }
            let mut unknown = false;
            for (k, xv) in x.iter() {
                match eq_values(xv, &y[k]) {
                    Some(false) => return Some(false),
                    Some(true) => {}
                    None => unknown = true,
                }
            }
            if unknown {
                None
            } else {
                Some(true)
            }
        }
        _ => Some(false),
    }
}

// Strict id equality: no numeric/string coercion between stores that use
// mixed id types.
fn id_eq(a: &Value, b: &Value) -> Option<bool> {
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => Some(x == y),
        (Value::Str(x), Value::Str(y)) => Some(x == y),
        _ => Some(false),
    }
}

/// Ordering for comparison operators: None when either side is Null, the
/// types are incompatible, or a NaN is involved (IEEE).
pub fn cmp_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, _) | (_, Value::Null) => None,
        (Value::Str(x), Value::Str(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => {
            let (x, y) = (a.as_number()?, b.as_number()?);
            x.partial_cmp(&y)
        }
    }
}

// Rank used by the total sort order; Null is handled before ranking.
fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 8,
        Value::Bool(_) => 0,
        Value::Int(_) | Value::Float(_) => 1,
        Value::Str(_) => 2,
        Value::List(_) => 3,
        Value::Map(_) => 4,
        Value::Node(_) => 5,
        Value::Rel(_) => 6,
        Value::Path(_) => 7,
    }
}

/// Total order for ORDER BY: within-type natural order, across types a fixed
/// rank, Null after all non-null values (in ascending order). DESC reverses
/// the whole comparator.
pub fn sort_cmp(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        _ => {
            let (ra, rb) = (type_rank(a), type_rank(b));
            if ra != rb {
                return ra.cmp(&rb);
            }
            match (a, b) {
                (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
                (Value::Str(x), Value::Str(y)) => x.cmp(y),
                (Value::List(x), Value::List(y)) => {
                    for (xi, yi) in x.iter().zip(y.iter()) {
                        let c = sort_cmp(xi, yi);
                        if c != Ordering::Equal {
                            return c;
                        }
                    }
                    x.len().cmp(&y.len())
                }
                _ if matches!(a, Value::Int(_) | Value::Float(_)) => {
                    let (x, y) = (a.as_number().unwrap(), b.as_number().unwrap());
                    x.partial_cmp(&y).unwrap_or_else(|| {
                        // NaN sorts after ordinary numbers, before Null.
                        match (x.is_nan(), y.is_nan()) {
                            (true, true) => Ordering::Equal,
                            (true, false) => Ordering::Greater,
                            (false, true) => Ordering::Less,
                            (false, false) => Ordering::Equal,
                        }
                    })
                }
                // Remaining record-ish kinds order by canonical key, which is
                // id-based and therefore stable.
                _ => canonical_key(a).cmp(&canonical_key(b)),
            }
        }
    }
}

/// Deterministic serialization used for DISTINCT rows, group keys, and
/// DISTINCT aggregator seen-sets. Graph records key by id; scalar values by
/// a JSON-like rendering with sorted map keys.
pub fn canonical_key(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => format!("b:{}", b),
        Value::Int(n) => format!("i:{}", n),
        Value::Float(f) => {
            // Keep 2.0 and the integer 2 distinct keys but render floats
            // canonically so 2.50 and 2.5 collide.
            format!("f:{}", f)
        }
        Value::Str(s) => format!("s:{}", serde_json::to_string(s).unwrap_or_default()),
        Value::List(items) => {
            let inner: Vec<String> = items.iter().map(canonical_key).collect();
            format!("[{}]", inner.join(","))
        }
        Value::Map(map) => {
            let inner: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}:{}", k, canonical_key(v)))
                .collect();
            format!("{{{}}}", inner.join(","))
        }
        Value::Node(n) => format!("node:{}", canonical_key(&n.id)),
        Value::Rel(r) => format!("rel:{}", canonical_key(&r.id)),
        Value::Path(p) => {
            let inner: Vec<String> = p
                .nodes
                .iter()
                .map(|n| canonical_key(&n.id))
                .chain(p.steps.iter().map(|s| canonical_key(&s.rel.id)))
                .collect();
            format!("path:[{}]", inner.join(","))
        }
    }
}
