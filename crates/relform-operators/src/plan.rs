//! Operator planning surfaces: `Replay` capability and `PlanNode` summaries.
//!
//! These are lightweight; they describe a constructed operator tree without
//! touching any rows.

use serde::{Deserialize, Serialize};

/// Whether an operator's `rows()` can be started again after a full drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Replay {
    /// Every call to `rows()` yields the same relation.
    Replayable,
    /// The underlying source can be consumed once; wrap in `Buffered` before
    /// iterating it repeatedly.
    SinglePass,
}

/// One node of an explained operator tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanNode {
    pub operator: String,
    pub relation: String,
    pub columns: Vec<String>,
    pub replay: Replay,
    pub children: Vec<PlanNode>,
}

impl PlanNode {
    /// Number of nodes in this subtree.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(PlanNode::size).sum::<usize>()
    }

    /// Render as pretty JSON for logs and debugging.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
