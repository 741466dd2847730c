//! Convenient re-exports for downstream crates.

pub use crate::config::EngineConfig;
pub use crate::error::{Error, Result};
pub use crate::formula::{
    Comparison, ComparisonOp, Formula, IntrospectionFn, Projection, ProjectionItem, Similar,
    SimilarityFn,
};
pub use crate::schema::{
    ColumnDef, ColumnRef, ColumnType, ConstraintName, Document, FKeyDef, KeyDef,
    RelationDescription, COMPUTED_RELATION_PLACEHOLDER,
};
pub use crate::types::{Row, Scalar};
