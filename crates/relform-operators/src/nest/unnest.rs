use std::fmt;
use std::sync::Arc;

use relform_core::naming::computed_relation_name;
use relform_core::prelude::{RelationDescription, Row, Scalar};

use crate::traits::{attribute, BoxedOperator, OpError, PhysicalOperator, RowStream};

/// Expands one value into zero or more atoms.
pub type UnnestFn = Arc<dyn Fn(&Scalar) -> Vec<Scalar> + Send + Sync>;

/// List values yield their elements, null yields nothing, anything else
/// yields itself.
pub fn atoms_of_list(value: &Scalar) -> Vec<Scalar> {
    match value {
        Scalar::Null => Vec::new(),
        Scalar::List(items) => items.clone(),
        other => vec![other.clone()],
    }
}

/// Splits text on `delimiter`, trimming whitespace and skipping empty pieces.
/// Non-text values behave as in [`atoms_of_list`].
pub fn split_text(delimiter: &str) -> UnnestFn {
    let delimiter = delimiter.to_string();
    Arc::new(move |value: &Scalar| match value {
        Scalar::Str(s) => s
            .split(delimiter.as_str())
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .map(Scalar::from)
            .collect(),
        other => atoms_of_list(other),
    })
}

/// Replaces `row[attribute]` by each atom of `unnest_fn(row[attribute])`,
/// yielding one copy of the row per atom.
///
/// Keys are dropped since uniqueness does not survive the expansion, as are
/// foreign keys over the unnested column.
pub struct Unnest {
    child: BoxedOperator,
    attribute: String,
    unnest_fn: UnnestFn,
    description: RelationDescription,
}

impl Unnest {
    pub fn new(
        child: BoxedOperator,
        attribute: impl Into<String>,
        unnest_fn: UnnestFn,
    ) -> Result<Self, OpError> {
        let attribute = attribute.into();
        let source = child.description();
        if !source.has_column(&attribute) {
            return Err(OpError::Usage(format!(
                "cannot unnest unknown column '{}' of relation '{}'",
                attribute, source.table_name
            )));
        }

        let mut description = source.clone();
        description.table_name =
            computed_relation_name(&source.table_name, &(source, "unnest", &attribute))?;
        description.keys.clear();
        description
            .foreign_keys
            .retain(|fk| !fk.column_names().contains(&attribute.as_str()));
        tracing::debug!(relation = %description.table_name, %attribute, "unnest");

        Ok(Self {
            child,
            attribute,
            unnest_fn,
            description,
        })
    }

    fn expand(&self, row: Row) -> Result<Vec<Row>, OpError> {
        let atoms = (self.unnest_fn)(attribute(&row, &self.attribute)?);
        Ok(atoms
            .into_iter()
            .map(|atom| {
                let mut copy = row.clone();
                copy.set(self.attribute.as_str(), atom);
                copy
            })
            .collect())
    }
}

impl fmt::Debug for Unnest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Unnest")
            .field("child", &self.child)
            .field("attribute", &self.attribute)
            .field("relation", &self.description.table_name)
            .finish_non_exhaustive()
    }
}

impl PhysicalOperator for Unnest {
    fn name(&self) -> &'static str {
        "unnest"
    }

    fn description(&self) -> &RelationDescription {
        &self.description
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        let input = self.child.rows()?;
        Ok(Box::new(input.flat_map(move |item| {
            match item.and_then(|row| self.expand(row)) {
                Ok(rows) => rows.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            }
        })))
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        vec![self.child.as_ref()]
    }
}
