//! Access-path selection for node patterns.
//! One rule, no costing: when the pattern carries a label and exactly one
//! of its literal property equalities matches a single-column index the
//! adapter reports, probe that index and filter the rest afterwards;
//! otherwise fall back to a label scan. Enabling an index never changes
//! results, only the access path.

use tracing::debug;

use crate::ast::{Expression, NodePattern};
use crate::error::EngineResult;
use crate::storage::{GraphStore, NodeScan};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum AccessPath {
    Scan(NodeScan),
    IndexProbe {
        label: Option<String>,
        property: String,
        /// Evaluated against env/params right before the probe.
        value: Expression,
    },
}

pub(crate) fn node_access_path(
    store: &dyn GraphStore,
    pattern: &NodePattern,
) -> EngineResult<AccessPath> {
    if !pattern.labels.is_empty() && !pattern.props.is_empty() {
        let indexes = store.list_indexes()?;
        let mut probe = None;
        let mut candidates = 0usize;
        for (prop, expr) in &pattern.props {
            for def in &indexes {
                let label_matches = match &def.label {
                    Some(label) => pattern.labels.iter().any(|l| l == label),
                    None => true,
                };
                if label_matches && def.property == *prop {
                    candidates += 1;
                    if probe.is_none() {
                        probe = Some(AccessPath::IndexProbe {
                            label: def.label.clone(),
                            property: prop.clone(),
                            value: expr.clone(),
                        });
                    }
                    break;
                }
            }
        }
        // The rule fires on a single usable equality; with several, the
        // first one wins (rule-driven, not cost-based).
        if let Some(path) = probe {
            debug!(
                target: "cyphera::plan",
                candidates,
                "index probe chosen for pattern on {:?}",
                pattern.labels
            );
            return Ok(path);
        }
    }
    Ok(AccessPath::Scan(NodeScan::with_labels(pattern.labels.iter().cloned())))
}
