//! Select operator: keeps the rows that satisfy a formula.
//!
//! A formula is a single comparison `attr OP literal` (OP ∈ {=, !=, <, <=, >, >=})
//! or a conjunction/disjunction of such comparisons. An empty comparison set
//! admits every row.

use std::cmp::Ordering;

use relform_core::prelude::{Comparison, ComparisonOp, Formula, RelationDescription, Row};

use crate::traits::{attribute, BoxedOperator, OpError, PhysicalOperator, RowStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Connector {
    All,
    Any,
}

#[derive(Debug)]
pub struct Select {
    child: BoxedOperator,
    comparisons: Vec<Comparison>,
    connector: Connector,
}

impl Select {
    pub fn new(child: BoxedOperator, formula: Formula) -> Result<Self, OpError> {
        tracing::debug!(?formula, "select formula");
        let (comparisons, connector) = match formula {
            Formula::Comparison(c) => (vec![c], Connector::All),
            Formula::Conjunction(cs) => (cs, Connector::All),
            Formula::Disjunction(cs) => (cs, Connector::Any),
        };

        let desc = child.description();
        if let Some(c) = comparisons.iter().find(|c| !desc.has_column(&c.operand1)) {
            return Err(OpError::Usage(format!(
                "select on unknown attribute '{}' of relation '{}'",
                c.operand1, desc.table_name
            )));
        }

        Ok(Self {
            child,
            comparisons,
            connector,
        })
    }

    fn matches(&self, row: &Row) -> Result<bool, OpError> {
        if self.comparisons.is_empty() {
            return Ok(true);
        }
        // Short-circuits like the connectors themselves; a data error in a
        // comparison that is never reached does not surface.
        for c in &self.comparisons {
            let hit = eval_comparison(row, c)?;
            match (self.connector, hit) {
                (Connector::All, false) => return Ok(false),
                (Connector::Any, true) => return Ok(true),
                _ => {}
            }
        }
        Ok(self.connector == Connector::All)
    }
}

impl PhysicalOperator for Select {
    fn name(&self) -> &'static str {
        "select"
    }

    fn description(&self) -> &RelationDescription {
        self.child.description()
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        let input = self.child.rows()?;
        Ok(Box::new(input.filter_map(move |item| match item {
            Ok(row) => match self.matches(&row) {
                Ok(true) => Some(Ok(row)),
                Ok(false) => None,
                Err(e) => Some(Err(e)),
            },
            Err(e) => Some(Err(e)),
        })))
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        vec![self.child.as_ref()]
    }
}

/// Evaluate `row[operand1] OP operand2`.
///
/// Equality compares numbers across widths and treats nulls as ordinary
/// values. Orderings involving a null are false; orderings between
/// incompatible kinds are a data error.
pub fn eval_comparison(row: &Row, comparison: &Comparison) -> Result<bool, OpError> {
    let value = attribute(row, &comparison.operand1)?;
    let literal = &comparison.operand2;
    tracing::trace!(%value, op = %comparison.operator, %literal, "eval");

    let ordered = |accept: fn(Ordering) -> bool| -> Result<bool, OpError> {
        match value.try_cmp(literal) {
            Some(ord) => Ok(accept(ord)),
            None if value.is_null() || literal.is_null() => Ok(false),
            None => Err(OpError::Data(format!(
                "cannot compare {} {} {}",
                value, comparison.operator, literal
            ))),
        }
    };

    match comparison.operator {
        ComparisonOp::Eq => Ok(value.loose_eq(literal)),
        ComparisonOp::Ne => Ok(!value.loose_eq(literal)),
        ComparisonOp::Lt => ordered(|o| o == Ordering::Less),
        ComparisonOp::Le => ordered(|o| o != Ordering::Greater),
        ComparisonOp::Gt => ordered(|o| o == Ordering::Greater),
        ComparisonOp::Ge => ordered(|o| o != Ordering::Less),
    }
}
