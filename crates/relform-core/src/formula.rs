//! Predicate and projection grammar consumed by the operators.
//!
//! The parser that produces these values lives outside this workspace; only
//! the shapes are defined here. Every kind is a closed enum variant so an
//! operator that forgets one fails to compile rather than failing at runtime.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::schema::RelationDescription;
use crate::types::Scalar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
        }
    }
}

impl FromStr for ComparisonOp {
    type Err = Error;

    /// Accepts both symbolic (`<=`) and mnemonic (`le`) spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "=" | "==" | "eq" => Ok(ComparisonOp::Eq),
            "!=" | "<>" | "ne" => Ok(ComparisonOp::Ne),
            "<" | "lt" => Ok(ComparisonOp::Lt),
            "<=" | "le" => Ok(ComparisonOp::Le),
            ">" | "gt" => Ok(ComparisonOp::Gt),
            ">=" | "ge" => Ok(ComparisonOp::Ge),
            other => Err(Error::Document(format!("unknown comparison operator '{}'", other))),
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// `row[operand1] <operator> operand2`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub operand1: String,
    pub operator: ComparisonOp,
    pub operand2: Scalar,
}

impl Comparison {
    pub fn new(operand1: impl Into<String>, operator: ComparisonOp, operand2: impl Into<Scalar>) -> Self {
        Self {
            operand1: operand1.into(),
            operator,
            operand2: operand2.into(),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.operand1, self.operator, self.operand2)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Formula {
    Comparison(Comparison),
    Conjunction(Vec<Comparison>),
    Disjunction(Vec<Comparison>),
}

/// Similarity metric: `0.0` means identical, `1.0` means unrelated.
pub type SimilarityFn = Arc<dyn Fn(&Scalar, &Scalar) -> f64 + Send + Sync>;

/// Similarity join condition: `left[attribute] ~ right[domain] | right[synonyms]*`.
#[derive(Clone)]
pub struct Similar {
    pub attribute: String,
    pub domain: String,
    pub synonyms: String,
    pub similarity_fn: SimilarityFn,
}

impl Similar {
    pub fn new<F>(
        attribute: impl Into<String>,
        domain: impl Into<String>,
        synonyms: impl Into<String>,
        similarity_fn: F,
    ) -> Self
    where
        F: Fn(&Scalar, &Scalar) -> f64 + Send + Sync + 'static,
    {
        Self {
            attribute: attribute.into(),
            domain: domain.into(),
            synonyms: synonyms.into(),
            similarity_fn: Arc::new(similarity_fn),
        }
    }
}

impl fmt::Debug for Similar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Similar")
            .field("attribute", &self.attribute)
            .field("domain", &self.domain)
            .field("synonyms", &self.synonyms)
            .finish_non_exhaustive()
    }
}

/// Derives a list of column names from a concrete relation description.
#[derive(Clone)]
pub struct IntrospectionFn {
    name: String,
    f: Arc<dyn Fn(&RelationDescription) -> Vec<String> + Send + Sync>,
}

impl IntrospectionFn {
    pub fn new<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&RelationDescription) -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            f: Arc::new(f),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, desc: &RelationDescription) -> Vec<String> {
        (self.f)(desc)
    }
}

impl fmt::Debug for IntrospectionFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IntrospectionFn({})", self.name)
    }
}

#[derive(Debug, Clone)]
pub enum ProjectionItem {
    /// Every column of the input.
    AllAttributes,
    /// A column by its bare name.
    Attribute(String),
    /// Copy `name` under `alias`. One column may carry several aliases.
    AttributeAlias { name: String, alias: String },
    /// Exclude `name` from an otherwise selected set.
    AttributeDrop { name: String },
    /// Remove `name`; only meaningful in the drop-columns shorthand.
    AttributeRemoval { name: String },
    /// Add a column given its raw JSON definition.
    AttributeAdd { definition: String },
    /// Columns computed from the input's schema.
    IntrospectionFunction(IntrospectionFn),
    /// Similarity condition; valid in joins, not in projections.
    Similar(Similar),
}

impl ProjectionItem {
    pub fn attr(name: impl Into<String>) -> Self {
        ProjectionItem::Attribute(name.into())
    }

    pub fn alias(name: impl Into<String>, alias: impl Into<String>) -> Self {
        ProjectionItem::AttributeAlias {
            name: name.into(),
            alias: alias.into(),
        }
    }

    pub fn drop(name: impl Into<String>) -> Self {
        ProjectionItem::AttributeDrop { name: name.into() }
    }

    pub fn removal(name: impl Into<String>) -> Self {
        ProjectionItem::AttributeRemoval { name: name.into() }
    }

    pub fn add(definition: impl Into<String>) -> Self {
        ProjectionItem::AttributeAdd {
            definition: definition.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ProjectionItem::AllAttributes => "AllAttributes",
            ProjectionItem::Attribute(_) => "Attribute",
            ProjectionItem::AttributeAlias { .. } => "AttributeAlias",
            ProjectionItem::AttributeDrop { .. } => "AttributeDrop",
            ProjectionItem::AttributeRemoval { .. } => "AttributeRemoval",
            ProjectionItem::AttributeAdd { .. } => "AttributeAdd",
            ProjectionItem::IntrospectionFunction(_) => "IntrospectionFunction",
            ProjectionItem::Similar(_) => "Similar",
        }
    }
}

impl From<&str> for ProjectionItem {
    fn from(name: &str) -> Self {
        ProjectionItem::Attribute(name.to_string())
    }
}

/// Ordered list of projection items.
#[derive(Debug, Clone, Default)]
pub struct Projection(pub Vec<ProjectionItem>);

impl Projection {
    pub fn new(items: Vec<ProjectionItem>) -> Self {
        Self(items)
    }

    pub fn items(&self) -> &[ProjectionItem] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Columns named by the drop-columns shorthand (`AllAttributes` followed
    /// only by one or more `AttributeRemoval`s), or `None` for any other shape.
    pub fn dropped_columns(&self) -> Option<Vec<&str>> {
        let (first, rest) = self.0.split_first()?;
        if !matches!(first, ProjectionItem::AllAttributes) || rest.is_empty() {
            return None;
        }
        rest.iter()
            .map(|item| match item {
                ProjectionItem::AttributeRemoval { name } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl<I: Into<ProjectionItem>> FromIterator<I> for Projection {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        Projection(iter.into_iter().map(Into::into).collect())
    }
}
