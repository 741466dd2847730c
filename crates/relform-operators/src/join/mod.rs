//! Join operators: a plain nested-loop cross product and a nested-loop
//! similarity join built on the same output shape.
//!
//! Both sides' columns are concatenated, left first. A column name present on
//! both sides is renamed on both sides to `<relation>:<column>`. The composed
//! name is not checked against columns that already carry it, so a relation
//! that already has a `t:c` column can still produce a duplicate.

mod cross;
mod similarity;

pub use cross::CrossJoin;
pub use similarity::NestedLoopsSimilarityJoin;

use std::collections::HashSet;

use relform_core::prelude::RelationDescription;

use crate::traits::RenameMap;

/// Output description plus the per-side renames that realize it on rows.
#[derive(Debug, Clone)]
pub(crate) struct JoinShape {
    pub description: RelationDescription,
    pub left_renames: RenameMap,
    pub right_renames: RenameMap,
}

pub(crate) fn join_shape(left: &RelationDescription, right: &RelationDescription) -> JoinShape {
    let left_names: HashSet<&str> = left.column_names().into_iter().collect();
    let conflicts: HashSet<&str> = right
        .column_names()
        .into_iter()
        .filter(|name| left_names.contains(name))
        .collect();
    if !conflicts.is_empty() {
        tracing::debug!(?conflicts, "conflicting column names in join");
    }

    let mut columns = Vec::with_capacity(left.column_definitions.len() + right.column_definitions.len());
    let mut left_renames = RenameMap::new();
    let mut right_renames = RenameMap::new();
    for (side, renames) in [(left, &mut left_renames), (right, &mut right_renames)] {
        for col in &side.column_definitions {
            let mut col = col.clone();
            if conflicts.contains(col.name.as_str()) {
                let qualified = format!("{}:{}", side.table_name, col.name);
                renames.push((qualified.clone(), std::mem::replace(&mut col.name, qualified)));
            }
            columns.push(col);
        }
    }
    tracing::debug!(?left_renames, ?right_renames, "join renames");

    JoinShape {
        description: RelationDescription::new(
            format!("{}_{}", left.table_name, right.table_name),
            columns,
        ),
        left_renames,
        right_renames,
    }
}
