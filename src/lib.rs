//! cyphera: an embeddable query engine for a pragmatic Cypher subset.
//!
//! A script goes text -> tokens -> statement tree(s) -> pull-based operator
//! tree -> lazy row stream. The backing store plugs in behind the
//! [`storage::GraphStore`] capability trait, so any data source that can
//! present itself as a labeled property graph works; an in-memory reference
//! adapter ships in [`storage::memory`].
//!
//! ```no_run
//! use cyphera::{Engine, MemoryGraph};
//!
//! let store = MemoryGraph::new();
//! let engine = Engine::new(&store);
//! let mut rows = engine.run("CREATE (n:Person {name: 'Ada'}) RETURN n.name AS name");
//! for row in &mut rows {
//!     println!("{}", row.unwrap().to_json());
//! }
//! ```

pub mod ast;
pub mod error;
mod eval;
pub mod exec;
pub mod lexer;
pub mod parser;
mod planner;
pub mod session;
pub mod storage;
pub mod value;

pub use eval::Bindings;

pub use error::{EngineError, EngineResult};
pub use exec::Row;
pub use session::{Engine, Rows};
pub use storage::memory::MemoryGraph;
pub use storage::{GraphStore, IndexDef, NodeScan};
pub use value::{NodeRecord, PathRecord, PropertyMap, RelRecord, Value};
