//! HashDistinct: emits the first row seen for each distinct value tuple of the
//! distinguishing attributes.
//!
//! Tuples compare the way `Select`'s `=` does: numbers match across widths,
//! so `1` and `1.0` are the same value.
//!
//! The seen-set lives for one iteration and grows with the number of distinct
//! tuples; there is no eviction.

use std::collections::HashSet;

use relform_core::hash::{hash_scalars, Hash256};
use relform_core::prelude::{RelationDescription, Row};

use crate::traits::{attribute, BoxedOperator, OpError, PhysicalOperator, RowStream};

#[derive(Debug)]
pub struct HashDistinct {
    child: BoxedOperator,
    distinct_on: Vec<String>,
}

impl HashDistinct {
    pub fn new(child: BoxedOperator, attributes: Vec<String>) -> Result<Self, OpError> {
        let desc = child.description();
        if let Some(missing) = attributes.iter().find(|a| !desc.has_column(a)) {
            return Err(OpError::Usage(format!(
                "distinct on unknown attribute '{}' of relation '{}'",
                missing, desc.table_name
            )));
        }
        Ok(Self {
            child,
            distinct_on: attributes,
        })
    }

    fn tuple_digest(&self, row: &Row) -> Result<Hash256, OpError> {
        let values = self
            .distinct_on
            .iter()
            .map(|a| attribute(row, a))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(hash_scalars(values))
    }
}

impl PhysicalOperator for HashDistinct {
    fn name(&self) -> &'static str {
        "hash_distinct"
    }

    fn description(&self) -> &RelationDescription {
        self.child.description()
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        let input = self.child.rows()?;
        let mut seen: HashSet<Hash256> = HashSet::new();
        Ok(Box::new(input.filter_map(move |item| {
            let row = match item {
                Ok(row) => row,
                Err(e) => return Some(Err(e)),
            };
            match self.tuple_digest(&row) {
                Ok(digest) => seen.insert(digest).then_some(Ok(row)),
                Err(e) => Some(Err(e)),
            }
        })))
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        vec![self.child.as_ref()]
    }
}
