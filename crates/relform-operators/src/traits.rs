//! Operator trait + common interfaces.
//!
//! Every operator does two things:
//! 1. derives its output `RelationDescription` once, in its constructor, from
//!    its children's descriptions and its own parameters; and
//! 2. produces its rows lazily through `rows()`, one `Row` per pull.
//!
//! Construction either succeeds with a wholly valid operator or fails with
//! `OpError::Usage` before any row exists. Data problems surface as `Err`
//! items in the row stream and end the iteration.

use std::borrow::Cow;
use std::fmt;

use relform_core::prelude::{RelationDescription, Row, Scalar};
use thiserror::Error;

use crate::plan::{PlanNode, Replay};

/// Lazy, pull-based sequence of rows.
pub type RowStream<'a> = Box<dyn Iterator<Item = Result<Row, OpError>> + 'a>;

/// Owned operator handle; parents exclusively own their children.
pub type BoxedOperator = Box<dyn PhysicalOperator>;

/// Ordered `(new_name, old_name)` pairs.
pub type RenameMap = Vec<(String, String)>;

#[derive(Debug, Error)]
pub enum OpError {
    #[error("usage error: {0}")]
    Usage(String),

    #[error("row is missing attribute '{attribute}'")]
    MissingAttribute { attribute: String },

    #[error("data error: {0}")]
    Data(String),

    #[error("the '{0}' operator cannot be iterated")]
    NotIterable(&'static str),

    #[error(transparent)]
    Core(#[from] relform_core::Error),
}

/// Trait that all operators must implement.
///
/// Invariants:
/// - `description()` is computed at construction and never changes.
/// - `rows()` may be called any number of times; each call re-executes the
///   non-caching part of the chain below this operator.
pub trait PhysicalOperator: fmt::Debug {
    /// Human-readable operator name (stable).
    fn name(&self) -> &'static str;

    /// Schema of the relation this operator computes. Pass-through operators
    /// return their child's description.
    fn description(&self) -> &RelationDescription;

    /// Start a fresh iteration over the computed relation.
    fn rows(&self) -> Result<RowStream<'_>, OpError>;

    /// Direct inputs of this operator, left to right.
    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        Vec::new()
    }

    /// Whether `rows()` can be called again after a full drain. Operators that
    /// recompute from their children inherit the weakest child capability.
    fn replay(&self) -> Replay {
        if self
            .children()
            .iter()
            .all(|c| c.replay() == Replay::Replayable)
        {
            Replay::Replayable
        } else {
            Replay::SinglePass
        }
    }

    /// Serializable summary of the operator tree rooted here.
    fn explain(&self) -> PlanNode {
        PlanNode {
            operator: self.name().to_string(),
            relation: self.description().table_name.clone(),
            columns: self
                .description()
                .column_definitions
                .iter()
                .map(|c| c.name.clone())
                .collect(),
            replay: self.replay(),
            children: self.children().iter().map(|c| c.explain()).collect(),
        }
    }
}

/// Look up `name` in `row`, failing with `MissingAttribute`.
pub fn attribute<'r>(row: &'r Row, name: &str) -> Result<&'r Scalar, OpError> {
    row.get(name).ok_or_else(|| OpError::MissingAttribute {
        attribute: name.to_string(),
    })
}

/// Rename attributes of `row` according to `renames`.
///
/// Returns the row as-is when there is nothing to rename and `always_copy` is
/// false. Otherwise builds a new row where `result[new] = row[old]` for each
/// pair, the old name is gone, and every other attribute is kept in place. An
/// old name with several new names fans out at its original position.
pub fn rename_row<'r>(
    row: &'r Row,
    renames: &[(String, String)],
    always_copy: bool,
) -> Result<Cow<'r, Row>, OpError> {
    if renames.is_empty() {
        return Ok(if always_copy {
            Cow::Owned(row.clone())
        } else {
            Cow::Borrowed(row)
        });
    }

    if let Some((_, old)) = renames.iter().find(|(_, old)| !row.contains(old)) {
        return Err(OpError::MissingAttribute {
            attribute: old.clone(),
        });
    }

    let mut out = Row::with_capacity(row.len() + renames.len());
    for (name, value) in row.iter() {
        let mut renamed = false;
        for (new, old) in renames {
            if old == name {
                out.set(new.clone(), value.clone());
                renamed = true;
            }
        }
        // A surviving attribute that is also a rename target is overwritten
        // by the renamed value.
        if !renamed && !renames.iter().any(|(new, _)| new == name) {
            out.set(name, value.clone());
        }
    }
    Ok(Cow::Owned(out))
}
