//! Rename operator: a projection that only renames.
//!
//! Column order is the child's; a column renamed more than once fans out into
//! one column per new name at its original position.

use relform_core::config::EngineConfig;
use relform_core::prelude::{Projection, ProjectionItem, RelationDescription};

use crate::project::Project;
use crate::traits::{BoxedOperator, OpError, PhysicalOperator, RowStream};

#[derive(Debug)]
pub struct Rename {
    inner: Project,
}

impl Rename {
    /// `renames` holds `(old_name, new_name)` pairs.
    pub fn new(child: BoxedOperator, renames: Vec<(String, String)>) -> Result<Self, OpError> {
        Self::with_config(child, renames, &EngineConfig::default())
    }

    pub fn with_config(
        child: BoxedOperator,
        renames: Vec<(String, String)>,
        cfg: &EngineConfig,
    ) -> Result<Self, OpError> {
        let desc = child.description();
        if let Some((old, _)) = renames.iter().find(|(old, _)| !desc.has_column(old)) {
            return Err(OpError::Usage(format!(
                "cannot rename unknown column '{}' of relation '{}'",
                old, desc.table_name
            )));
        }

        let mut items = Vec::with_capacity(desc.column_definitions.len() + renames.len());
        for col in &desc.column_definitions {
            let mut renamed = renames.iter().filter(|(old, _)| *old == col.name).peekable();
            if renamed.peek().is_none() {
                items.push(ProjectionItem::attr(col.name.clone()));
            } else {
                items.extend(renamed.map(|(old, new)| ProjectionItem::alias(old.clone(), new.clone())));
            }
        }

        Ok(Self {
            inner: Project::with_config(child, Projection::new(items), cfg)?,
        })
    }

    /// Build from alias items; anything other than `AttributeAlias` is a usage error.
    pub fn from_items(child: BoxedOperator, items: Vec<ProjectionItem>) -> Result<Self, OpError> {
        let renames = items
            .into_iter()
            .map(|item| match item {
                ProjectionItem::AttributeAlias { name, alias } => Ok((name, alias)),
                other => Err(OpError::Usage(format!(
                    "rename accepts only aliases, got '{}'",
                    other.kind()
                ))),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(child, renames)
    }
}

impl PhysicalOperator for Rename {
    fn name(&self) -> &'static str {
        "rename"
    }

    fn description(&self) -> &RelationDescription {
        self.inner.description()
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        self.inner.rows()
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        self.inner.children()
    }
}
