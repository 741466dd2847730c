#![forbid(unsafe_code)]
//! relform-operators: schema-aware physical operators.
//!
//! Design intent:
//! - Each operator derives its output `RelationDescription` once, when it is
//!   built, and yields rows lazily, one per pull.
//! - Construction fails fast with `OpError::Usage`; data problems arrive as
//!   `Err` items in the row stream.
//! - Everything is single-threaded and synchronous. The only state an operator
//!   keeps across pulls is an explicit cache (distinct set, buffer, similarity
//!   row caches).

pub mod plan;
pub mod support;
pub mod traits;

pub mod distinct;
pub mod project;
pub mod rename;
pub mod scan;
pub mod select;
pub mod union;

pub mod join;
pub mod mutation;
pub mod nest;

pub use distinct::HashDistinct;
pub use join::{CrossJoin, NestedLoopsSimilarityJoin};
pub use mutation::{Alter, Assign, Create, MutationTarget};
pub use nest::{NestedLoopsSimilarityAggregation, Unnest};
pub use plan::{PlanNode, Replay};
pub use project::Project;
pub use rename::Rename;
pub use scan::JsonScan;
pub use select::Select;
pub use support::{ensure_replayable, Buffered, ComputedRelation, Metadata, TempVarRef};
pub use traits::{rename_row, BoxedOperator, OpError, PhysicalOperator, RowStream};
pub use union::Union;
