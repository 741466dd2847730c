use relform_core::prelude::{RelationDescription, Row};

use super::{join_shape, JoinShape};
use crate::support::ensure_replayable;
use crate::traits::{rename_row, BoxedOperator, OpError, PhysicalOperator, RowStream};

/// Full nested-loop cross product. The right child is iterated once per left
/// row, so a single-pass right child is buffered on construction.
#[derive(Debug)]
pub struct CrossJoin {
    left: BoxedOperator,
    right: BoxedOperator,
    shape: JoinShape,
}

impl CrossJoin {
    pub fn new(left: BoxedOperator, right: BoxedOperator) -> Self {
        let right = ensure_replayable(right);
        let shape = join_shape(left.description(), right.description());
        Self { left, right, shape }
    }

    /// Every pairing of one left row with the right child's rows.
    fn pair_with_right(&self, item: Result<Row, OpError>) -> RowStream<'_> {
        let left_row = match item.and_then(|row| {
            let renamed = rename_row(&row, &self.shape.left_renames, true)?.into_owned();
            Ok(renamed)
        }) {
            Ok(row) => row,
            Err(e) => return Box::new(std::iter::once(Err(e))),
        };
        match self.right.rows() {
            Ok(right) => Box::new(right.map(move |item| -> Result<Row, OpError> {
                let right_row = item?;
                let mut row = left_row.clone();
                row.extend(rename_row(&right_row, &self.shape.right_renames, false)?.into_owned());
                Ok(row)
            })),
            Err(e) => Box::new(std::iter::once(Err(e))),
        }
    }
}

impl PhysicalOperator for CrossJoin {
    fn name(&self) -> &'static str {
        "cross_join"
    }

    fn description(&self) -> &RelationDescription {
        &self.shape.description
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        let left = self.left.rows()?;
        Ok(Box::new(left.flat_map(move |item| self.pair_with_right(item))))
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        vec![self.left.as_ref(), self.right.as_ref()]
    }
}
