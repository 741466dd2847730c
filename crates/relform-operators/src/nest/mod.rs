//! Grouping operators: `Unnest` expands one row into many, and
//! `NestedLoopsSimilarityAggregation` folds similar rows into groups.
//!
//! Both produce computed relations named `<child table>:<digest>`, where the
//! digest covers the child description and the operator parameters.

mod aggregation;
mod unnest;

pub use aggregation::{GroupingFn, NestedLoopsSimilarityAggregation};
pub use unnest::{atoms_of_list, split_text, Unnest, UnnestFn};
