//! Project operator: keeps, aliases, drops and adds columns.
//!
//! The projection is resolved once (see [`resolve`]) into the input columns to
//! read, the alias map, and the output description. Each input row is then
//! narrowed to those columns and renamed through the alias map, so output rows
//! line up with the description column for column.

pub mod resolve;

use relform_core::config::EngineConfig;
use relform_core::prelude::{Projection, RelationDescription, Row, Scalar};

use crate::traits::{attribute, rename_row, BoxedOperator, OpError, PhysicalOperator, RowStream};

pub use resolve::{resolve_projection, ResolvedProjection};

#[derive(Debug)]
pub struct Project {
    child: BoxedOperator,
    resolved: ResolvedProjection,
    /// Values for added columns, taken from their definitions' defaults.
    added_values: Vec<(String, Scalar)>,
}

impl Project {
    pub fn new(child: BoxedOperator, projection: Projection) -> Result<Self, OpError> {
        Self::with_config(child, projection, &EngineConfig::default())
    }

    pub fn with_config(
        child: BoxedOperator,
        projection: Projection,
        cfg: &EngineConfig,
    ) -> Result<Self, OpError> {
        cfg.validate()?;
        tracing::debug!(relation = %child.description().table_name, "projecting from child relation");
        let resolved = resolve_projection(child.description(), &projection, cfg)?;
        let added_values = resolved
            .additions
            .iter()
            .map(|col| {
                let value = col
                    .default
                    .as_ref()
                    .map(Scalar::from_json)
                    .unwrap_or(Scalar::Null);
                (col.name.clone(), value)
            })
            .collect();
        Ok(Self {
            child,
            resolved,
            added_values,
        })
    }

    pub fn resolved(&self) -> &ResolvedProjection {
        &self.resolved
    }

    fn project_row(&self, row: &Row) -> Result<Row, OpError> {
        let mut picked = Row::with_capacity(self.resolved.originals.len());
        for name in &self.resolved.originals {
            picked.set(name.clone(), attribute(row, name)?.clone());
        }
        let mut out = rename_row(&picked, &self.resolved.aliases, false)?.into_owned();
        for (name, value) in &self.added_values {
            out.set(name.clone(), value.clone());
        }
        Ok(out)
    }
}

impl PhysicalOperator for Project {
    fn name(&self) -> &'static str {
        "project"
    }

    fn description(&self) -> &RelationDescription {
        &self.resolved.description
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        let input = self.child.rows()?;
        Ok(Box::new(
            input.map(move |item| item.and_then(|row| self.project_row(&row))),
        ))
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        vec![self.child.as_ref()]
    }
}
