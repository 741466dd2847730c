//! Supplementary operators: buffering, bare metadata, and references to
//! already computed relations.

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use relform_core::prelude::{RelationDescription, Row};

use crate::plan::Replay;
use crate::traits::{BoxedOperator, OpError, PhysicalOperator, RowStream};

/// Caches the rows of its child.
///
/// The first iteration pulls from the child and records every row it hands
/// out. Once anything is recorded, later iterations replay the recorded rows
/// without touching the child. Only a single consumer may iterate at a time.
#[derive(Debug)]
pub struct Buffered {
    child: BoxedOperator,
    buffer: RefCell<Vec<Row>>,
}

impl Buffered {
    pub fn new(child: BoxedOperator) -> Self {
        Self {
            child,
            buffer: RefCell::new(Vec::new()),
        }
    }

    /// Number of rows recorded so far.
    pub fn buffered_len(&self) -> usize {
        self.buffer.borrow().len()
    }
}

struct BufferingIter<'a> {
    inner: RowStream<'a>,
    buffer: &'a RefCell<Vec<Row>>,
}

impl Iterator for BufferingIter<'_> {
    type Item = Result<Row, OpError>;

    fn next(&mut self) -> Option<Self::Item> {
        let item = self.inner.next()?;
        if let Ok(row) = &item {
            self.buffer.borrow_mut().push(row.clone());
        }
        Some(item)
    }
}

impl PhysicalOperator for Buffered {
    fn name(&self) -> &'static str {
        "buffered"
    }

    fn description(&self) -> &RelationDescription {
        self.child.description()
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        if !self.buffer.borrow().is_empty() {
            let cached = self.buffer.borrow().clone();
            return Ok(Box::new(cached.into_iter().map(Ok)));
        }
        Ok(Box::new(BufferingIter {
            inner: self.child.rows()?,
            buffer: &self.buffer,
        }))
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        vec![self.child.as_ref()]
    }

    fn replay(&self) -> Replay {
        Replay::Replayable
    }
}

/// Wrap `op` in `Buffered` unless it can already be replayed.
pub fn ensure_replayable(op: BoxedOperator) -> BoxedOperator {
    match op.replay() {
        Replay::Replayable => op,
        Replay::SinglePass => {
            tracing::debug!(operator = op.name(), "buffering single-pass input");
            Box::new(Buffered::new(op))
        }
    }
}

/// Carries a description and nothing else. Used to hand an existing
/// relation's schema to operators that never read its rows (e.g. `Alter`).
#[derive(Debug, Clone)]
pub struct Metadata {
    description: RelationDescription,
}

impl Metadata {
    pub fn new(description: RelationDescription) -> Self {
        Self { description }
    }
}

impl PhysicalOperator for Metadata {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn description(&self) -> &RelationDescription {
        &self.description
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        Err(OpError::NotIterable(self.name()))
    }
}

/// A relation that has already been computed and can describe and fetch
/// itself, e.g. a temporary variable held by the caller.
pub trait ComputedRelation: fmt::Debug {
    fn describe(&self) -> RelationDescription;

    fn fetch(&self) -> Result<RowStream<'_>, OpError>;

    fn replay(&self) -> Replay {
        Replay::Replayable
    }
}

/// References a computed relation.
#[derive(Debug)]
pub struct TempVarRef {
    description: RelationDescription,
    relation: Arc<dyn ComputedRelation>,
}

impl TempVarRef {
    pub fn new(relation: Arc<dyn ComputedRelation>) -> Self {
        Self {
            description: relation.describe(),
            relation,
        }
    }
}

impl PhysicalOperator for TempVarRef {
    fn name(&self) -> &'static str {
        "temp_var_ref"
    }

    fn description(&self) -> &RelationDescription {
        &self.description
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        self.relation.fetch()
    }

    fn replay(&self) -> Replay {
        self.relation.replay()
    }
}
