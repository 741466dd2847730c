//! Union: all rows of the first child, then all rows of the second.
//!
//! The children are expected to be column-compatible; this is not checked.
//! The output carries the first child's description.

use relform_core::prelude::RelationDescription;

use crate::traits::{BoxedOperator, OpError, PhysicalOperator, RowStream};

#[derive(Debug)]
pub struct Union {
    first: BoxedOperator,
    second: BoxedOperator,
}

impl Union {
    pub fn new(first: BoxedOperator, second: BoxedOperator) -> Self {
        Self { first, second }
    }
}

impl PhysicalOperator for Union {
    fn name(&self) -> &'static str {
        "union"
    }

    fn description(&self) -> &RelationDescription {
        self.first.description()
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        let first = self.first.rows()?;
        // The second child starts only when the first is exhausted.
        let second = std::iter::once(()).flat_map(move |_| match self.second.rows() {
            Ok(rows) => rows,
            Err(e) => Box::new(std::iter::once(Err(e))) as RowStream<'_>,
        });
        Ok(Box::new(first.chain(second)))
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        vec![self.first.as_ref(), self.second.as_ref()]
    }
}
