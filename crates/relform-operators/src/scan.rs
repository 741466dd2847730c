//! In-memory JSON scan: the leaf used to feed payloads into a plan.

use relform_core::prelude::{ColumnDef, RelationDescription, Row};

use crate::traits::{OpError, PhysicalOperator, RowStream};

/// Scans an in-memory payload of JSON objects.
#[derive(Debug, Clone)]
pub struct JsonScan {
    description: RelationDescription,
    rows: Vec<Row>,
}

impl JsonScan {
    /// Scan `rows`, inferring a computed relation from them: one column per
    /// attribute name in first-seen order, typed by its first non-null value.
    pub fn new(rows: Vec<Row>) -> Self {
        let mut columns: Vec<ColumnDef> = Vec::new();
        // whether the column's type came from a non-null value
        let mut typed: Vec<bool> = Vec::new();
        for row in &rows {
            for (name, value) in row.iter() {
                match columns.iter().position(|c| c.name == name) {
                    Some(idx) => {
                        if !typed[idx] && !value.is_null() {
                            columns[idx].column_type = value.column_type();
                            typed[idx] = true;
                        }
                    }
                    None => {
                        columns.push(ColumnDef::new(name, value.column_type()));
                        typed.push(!value.is_null());
                    }
                }
            }
        }
        Self {
            description: RelationDescription::computed(columns),
            rows,
        }
    }

    /// Scan `rows` under an explicit description.
    pub fn with_description(description: RelationDescription, rows: Vec<Row>) -> Result<Self, OpError> {
        description.validate()?;
        Ok(Self { description, rows })
    }

    /// Scan a JSON array of objects.
    pub fn from_json(payload: &serde_json::Value) -> Result<Self, OpError> {
        let items = payload
            .as_array()
            .ok_or_else(|| OpError::Usage("JSON scan payload must be an array".into()))?;
        let rows = items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_object()
                    .map(Row::from_json_object)
                    .ok_or_else(|| OpError::Usage(format!("payload item {} is not an object", i)))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(rows))
    }

    pub fn from_json_str(payload: &str) -> Result<Self, OpError> {
        let value: serde_json::Value =
            serde_json::from_str(payload).map_err(|e| OpError::Usage(e.to_string()))?;
        Self::from_json(&value)
    }
}

impl PhysicalOperator for JsonScan {
    fn name(&self) -> &'static str {
        "json_scan"
    }

    fn description(&self) -> &RelationDescription {
        &self.description
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        Ok(Box::new(self.rows.iter().cloned().map(Ok)))
    }
}
