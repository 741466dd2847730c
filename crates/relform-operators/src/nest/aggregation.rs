use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use relform_core::hash::{hash_scalars, Hash256};
use relform_core::naming::computed_relation_name;
use relform_core::prelude::{RelationDescription, Row, Scalar, SimilarityFn};

use crate::traits::{attribute, BoxedOperator, OpError, PhysicalOperator, RowStream};

/// Maps a grouping value to a coarser bucket. Accepted and kept, not yet
/// consulted when forming groups.
pub type GroupingFn = Arc<dyn Fn(&Scalar) -> Scalar + Send + Sync>;

/// Groups rows whose grouping values are similar.
///
/// All child rows are read into memory. Rows are then visited in child order;
/// each visited row claims, under its own grouping value, every row not yet
/// claimed whose grouping value scores below `1.0` against it. The first
/// claimant wins even when a later row would score better.
///
/// With a nesting attribute each group yields
/// `{grouping: value, nesting: [distinct nested values...]}`. Without one it
/// yields the last row it claimed, verbatim.
pub struct NestedLoopsSimilarityAggregation {
    child: BoxedOperator,
    grouping: String,
    nesting: Option<String>,
    similarity_fn: SimilarityFn,
    grouping_fn: Option<GroupingFn>,
    description: RelationDescription,
}

struct Group {
    key: Scalar,
    /// Index of the row kept for this group when there is no nesting.
    row: usize,
    nested: Vec<Scalar>,
    nested_seen: HashSet<Hash256>,
}

impl NestedLoopsSimilarityAggregation {
    pub fn new(
        child: BoxedOperator,
        grouping: Vec<String>,
        nesting: Vec<String>,
        similarity_fn: SimilarityFn,
        grouping_fn: Option<GroupingFn>,
    ) -> Result<Self, OpError> {
        let [grouping] = <[String; 1]>::try_from(grouping).map_err(|g| {
            OpError::Usage(format!("exactly one grouping attribute required, got {}", g.len()))
        })?;
        if nesting.len() > 1 {
            return Err(OpError::Usage(format!(
                "at most one nesting attribute allowed, got {}",
                nesting.len()
            )));
        }
        let nesting = nesting.into_iter().next();

        let source = child.description();
        let mut columns = Vec::with_capacity(2);
        for (name, nested) in std::iter::once((&grouping, false)).chain(nesting.iter().map(|n| (n, true))) {
            let mut col = source.column(name).cloned().ok_or_else(|| {
                OpError::Usage(format!(
                    "cannot aggregate on unknown column '{}' of relation '{}'",
                    name, source.table_name
                ))
            })?;
            if nested {
                col.column_type = col.column_type.array_of();
                col.default = None;
            }
            columns.push(col);
        }
        let table_name = computed_relation_name(
            &source.table_name,
            &(source, "aggregate", &grouping, &nesting),
        )?;
        let description = RelationDescription::new(table_name, columns);
        tracing::debug!(relation = %description.table_name, %grouping, ?nesting, "similarity aggregation");

        Ok(Self {
            child,
            grouping,
            nesting,
            similarity_fn,
            grouping_fn,
            description,
        })
    }

    fn aggregate(&self) -> Result<Vec<Row>, OpError> {
        let rows = self.child.rows()?.collect::<Result<Vec<Row>, _>>()?;
        let keys = rows
            .iter()
            .map(|row| attribute(row, &self.grouping))
            .collect::<Result<Vec<_>, _>>()?;

        let mut claimed = vec![false; rows.len()];
        let mut groups: Vec<Group> = Vec::new();
        let mut group_of_key: HashMap<Hash256, usize> = HashMap::new();
        for &key in &keys {
            for (i, &candidate) in keys.iter().enumerate() {
                if claimed[i] || (self.similarity_fn)(key, candidate) >= 1.0 {
                    continue;
                }
                claimed[i] = true;
                let slot = *group_of_key.entry(hash_scalars([key])).or_insert_with(|| {
                    groups.push(Group {
                        key: key.clone(),
                        row: i,
                        nested: Vec::new(),
                        nested_seen: HashSet::new(),
                    });
                    groups.len() - 1
                });
                let group = &mut groups[slot];
                match &self.nesting {
                    Some(nesting) => {
                        let value = attribute(&rows[i], nesting)?;
                        if group.nested_seen.insert(hash_scalars([value])) {
                            group.nested.push(value.clone());
                        }
                    }
                    None => group.row = i,
                }
            }
        }
        tracing::debug!(rows = rows.len(), groups = groups.len(), "aggregated");

        Ok(groups
            .into_iter()
            .map(|group| match &self.nesting {
                Some(nesting) => Row::from_pairs([
                    (self.grouping.as_str(), group.key),
                    (nesting.as_str(), Scalar::List(group.nested)),
                ]),
                None => rows[group.row].clone(),
            })
            .collect())
    }
}

impl fmt::Debug for NestedLoopsSimilarityAggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NestedLoopsSimilarityAggregation")
            .field("child", &self.child)
            .field("grouping", &self.grouping)
            .field("nesting", &self.nesting)
            .field("grouping_fn", &self.grouping_fn.is_some())
            .field("relation", &self.description.table_name)
            .finish_non_exhaustive()
    }
}

impl PhysicalOperator for NestedLoopsSimilarityAggregation {
    fn name(&self) -> &'static str {
        "similarity_aggregation"
    }

    fn description(&self) -> &RelationDescription {
        &self.description
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        // Grouping runs on the first pull.
        Ok(Box::new(
            std::iter::once_with(move || self.aggregate()).flat_map(|result| match result {
                Ok(rows) => rows.into_iter().map(Ok).collect::<Vec<_>>(),
                Err(e) => vec![Err(e)],
            }),
        ))
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        vec![self.child.as_ref()]
    }
}
