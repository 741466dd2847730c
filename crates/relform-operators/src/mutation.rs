//! Mutation markers: Assign, Create, Alter, Drop.
//!
//! These sit at the root of a plan and carry where the computed relation is
//! headed. They name the relation, finalize constraint names templated with
//! the computed-relation token, and pass the child's rows through untouched.
//! Executing the mutation is left to whoever consumes the plan.

use relform_core::config::EngineConfig;
use relform_core::naming::finalize_constraint_name;
use relform_core::prelude::{ConstraintName, Projection, RelationDescription};

use crate::traits::{BoxedOperator, OpError, PhysicalOperator, RowStream};

/// Destination metadata shared by every mutation marker.
pub trait MutationTarget: PhysicalOperator {
    fn schema_name(&self) -> &str;
    fn table_name(&self) -> &str;
}

/// Names the child relation `schema_name:table_name`.
#[derive(Debug)]
pub struct Assign {
    child: BoxedOperator,
    description: RelationDescription,
}

impl Assign {
    pub fn new(
        child: BoxedOperator,
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Result<Self, OpError> {
        Self::with_config(child, schema_name, table_name, &EngineConfig::default())
    }

    pub fn with_config(
        child: BoxedOperator,
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        cfg: &EngineConfig,
    ) -> Result<Self, OpError> {
        cfg.validate()?;
        let (schema_name, table_name) = (schema_name.into(), table_name.into());
        let mut description = child.description().clone();

        let finalize = |names: &mut Vec<ConstraintName>| {
            if let Some(first) = names.first() {
                *names = vec![finalize_constraint_name(
                    first,
                    &schema_name,
                    &table_name,
                    cfg.max_identifier_len,
                )];
            }
        };
        description.keys.iter_mut().for_each(|k| finalize(&mut k.names));
        description
            .foreign_keys
            .iter_mut()
            .for_each(|fk| finalize(&mut fk.names));

        tracing::debug!(
            from = %description.table_name,
            schema = %schema_name,
            table = %table_name,
            "assigning relation"
        );
        description.schema_name = schema_name;
        description.table_name = table_name;
        Ok(Self { child, description })
    }

    pub fn child(&self) -> &dyn PhysicalOperator {
        self.child.as_ref()
    }
}

impl PhysicalOperator for Assign {
    fn name(&self) -> &'static str {
        "assign"
    }

    fn description(&self) -> &RelationDescription {
        &self.description
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        self.child.rows()
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        vec![self.child.as_ref()]
    }
}

impl MutationTarget for Assign {
    fn schema_name(&self) -> &str {
        &self.description.schema_name
    }

    fn table_name(&self) -> &str {
        &self.description.table_name
    }
}

/// Marks the named relation for creation.
#[derive(Debug)]
pub struct Create(Assign);

/// Marks the named relation for removal.
#[derive(Debug)]
pub struct Drop(Assign);

impl Create {
    pub fn new(
        child: BoxedOperator,
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Result<Self, OpError> {
        Assign::new(child, schema_name, table_name).map(Self)
    }

    pub fn with_config(
        child: BoxedOperator,
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        cfg: &EngineConfig,
    ) -> Result<Self, OpError> {
        Assign::with_config(child, schema_name, table_name, cfg).map(Self)
    }
}

impl Drop {
    pub fn new(
        child: BoxedOperator,
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
    ) -> Result<Self, OpError> {
        Assign::new(child, schema_name, table_name).map(Self)
    }

    pub fn with_config(
        child: BoxedOperator,
        schema_name: impl Into<String>,
        table_name: impl Into<String>,
        cfg: &EngineConfig,
    ) -> Result<Self, OpError> {
        Assign::with_config(child, schema_name, table_name, cfg).map(Self)
    }
}

/// Marks `src_schema_name:src_table_name` for alteration into the assigned
/// destination. The projection says what changes, in the `Project` grammar,
/// including the drop-columns form that `Project` itself refuses.
#[derive(Debug)]
pub struct Alter {
    assign: Assign,
    src_schema_name: String,
    src_table_name: String,
    projection: Projection,
}

impl Alter {
    pub fn new(
        child: BoxedOperator,
        src_schema_name: impl Into<String>,
        src_table_name: impl Into<String>,
        dst_schema_name: impl Into<String>,
        dst_table_name: impl Into<String>,
        projection: Projection,
    ) -> Result<Self, OpError> {
        Self::with_config(
            child,
            src_schema_name,
            src_table_name,
            dst_schema_name,
            dst_table_name,
            projection,
            &EngineConfig::default(),
        )
    }

    pub fn with_config(
        child: BoxedOperator,
        src_schema_name: impl Into<String>,
        src_table_name: impl Into<String>,
        dst_schema_name: impl Into<String>,
        dst_table_name: impl Into<String>,
        projection: Projection,
        cfg: &EngineConfig,
    ) -> Result<Self, OpError> {
        Ok(Self {
            assign: Assign::with_config(child, dst_schema_name, dst_table_name, cfg)?,
            src_schema_name: src_schema_name.into(),
            src_table_name: src_table_name.into(),
            projection,
        })
    }

    pub fn src_schema_name(&self) -> &str {
        &self.src_schema_name
    }

    pub fn src_table_name(&self) -> &str {
        &self.src_table_name
    }

    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    /// Columns to drop when the projection is the drop-columns form.
    pub fn dropped_columns(&self) -> Option<Vec<&str>> {
        self.projection.dropped_columns()
    }
}

impl PhysicalOperator for Create {
    fn name(&self) -> &'static str {
        "create"
    }

    fn description(&self) -> &RelationDescription {
        self.0.description()
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        self.0.rows()
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        self.0.children()
    }
}

impl PhysicalOperator for Drop {
    fn name(&self) -> &'static str {
        "drop"
    }

    fn description(&self) -> &RelationDescription {
        self.0.description()
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        self.0.rows()
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        self.0.children()
    }
}

impl PhysicalOperator for Alter {
    fn name(&self) -> &'static str {
        "alter"
    }

    fn description(&self) -> &RelationDescription {
        self.assign.description()
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        self.assign.rows()
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        self.assign.children()
    }
}

impl MutationTarget for Create {
    fn schema_name(&self) -> &str {
        self.0.schema_name()
    }

    fn table_name(&self) -> &str {
        self.0.table_name()
    }
}

impl MutationTarget for Drop {
    fn schema_name(&self) -> &str {
        self.0.schema_name()
    }

    fn table_name(&self) -> &str {
        self.0.table_name()
    }
}

impl MutationTarget for Alter {
    fn schema_name(&self) -> &str {
        self.assign.schema_name()
    }

    fn table_name(&self) -> &str {
        self.assign.table_name()
    }
}
