//! Scalar values and ephemeral rows.
//!
//! A `Row` is an ordered name → value mapping produced on demand by an
//! operator. It has no identity; consumers clone or drop it as they please.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::ColumnType;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Null,
    Bool(bool),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    Bin(Vec<u8>),
    List(Vec<Scalar>),
}

impl Scalar {
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Catalog type that would hold this value. Nulls default to `text`.
    pub fn column_type(&self) -> ColumnType {
        match self {
            Scalar::Null | Scalar::Str(_) => ColumnType::text(),
            Scalar::Bool(_) => ColumnType::new("boolean"),
            Scalar::I32(_) => ColumnType::new("int4"),
            Scalar::I64(_) => ColumnType::new("int8"),
            Scalar::F32(_) => ColumnType::new("float4"),
            Scalar::F64(_) => ColumnType::new("float8"),
            Scalar::Bin(_) => ColumnType::new("bytea"),
            Scalar::List(items) => items
                .iter()
                .find(|v| !v.is_null())
                .map(|v| v.column_type())
                .unwrap_or_else(ColumnType::text)
                .array_of(),
        }
    }

    pub fn from_json(value: &serde_json::Value) -> Self {
        use serde_json::Value as J;
        match value {
            J::Null => Scalar::Null,
            J::Bool(b) => Scalar::Bool(*b),
            J::Number(n) => match n.as_i64() {
                Some(i) => Scalar::I64(i),
                None => Scalar::F64(n.as_f64().unwrap_or(f64::NAN)),
            },
            J::String(s) => Scalar::Str(s.clone()),
            J::Array(items) => Scalar::List(items.iter().map(Scalar::from_json).collect()),
            // Nested objects are carried as their JSON text.
            J::Object(_) => Scalar::Str(value.to_string()),
        }
    }

    /// Value equality that compares numbers across widths (`I32(1) == F64(1.0)`).
    pub fn loose_eq(&self, other: &Scalar) -> bool {
        match (self.numeric(), other.numeric()) {
            (Some(a), Some(b)) => a.cmp_with(&b) == Some(Ordering::Equal),
            _ => match (self, other) {
                (Scalar::List(a), Scalar::List(b)) => {
                    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
                }
                _ => self == other,
            },
        }
    }

    /// Ordering between comparable values; `None` when either side is null or
    /// the two values are of incompatible kinds.
    pub fn try_cmp(&self, other: &Scalar) -> Option<Ordering> {
        use Scalar::*;
        if let (Some(a), Some(b)) = (self.numeric(), other.numeric()) {
            return a.cmp_with(&b);
        }
        match (self, other) {
            (Bool(x), Bool(y)) => Some(x.cmp(y)),
            (Str(x), Str(y)) => Some(x.cmp(y)),
            (Bin(x), Bin(y)) => Some(x.cmp(y)),
            (List(x), List(y)) => {
                for (a, b) in x.iter().zip(y.iter()) {
                    match a.try_cmp(b)? {
                        Ordering::Equal => continue,
                        other => return Some(other),
                    }
                }
                Some(x.len().cmp(&y.len()))
            }
            _ => None,
        }
    }

    fn numeric(&self) -> Option<Numeric> {
        match self {
            Scalar::I32(i) => Some(Numeric::Int(*i as i64)),
            Scalar::I64(i) => Some(Numeric::Int(*i)),
            Scalar::F32(f) => Some(Numeric::Float(*f as f64)),
            Scalar::F64(f) => Some(Numeric::Float(*f)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    fn cmp_with(&self, other: &Numeric) -> Option<Ordering> {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => Some(a.cmp(b)),
            (Numeric::Int(a), Numeric::Float(b)) => (*a as f64).partial_cmp(b),
            (Numeric::Float(a), Numeric::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Numeric::Float(a), Numeric::Float(b)) => a.partial_cmp(b),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "null"),
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::I32(i) => write!(f, "{}", i),
            Scalar::I64(i) => write!(f, "{}", i),
            Scalar::F32(x) => write!(f, "{}", x),
            Scalar::F64(x) => write!(f, "{}", x),
            Scalar::Str(s) => write!(f, "'{}'", s),
            Scalar::Bin(b) => write!(f, "<{} bytes>", b.len()),
            Scalar::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Str(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Str(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::I64(i)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

/// Ordered mapping of column name to value.
///
/// Field order is the order columns were inserted; operators rebuild rows in
/// the column order of their description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    fields: Vec<(String, Scalar)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(n: usize) -> Self {
        Self {
            fields: Vec::with_capacity(n),
        }
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<Scalar>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut row = Row::new();
        for (k, v) in pairs {
            row.set(k, v.into());
        }
        row
    }

    /// Build a row from a JSON object, keeping the object's key order.
    pub fn from_json_object(obj: &serde_json::Map<String, serde_json::Value>) -> Self {
        obj.iter()
            .map(|(k, v)| (k.clone(), Scalar::from_json(v)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Insert or overwrite `name`; an overwritten field keeps its position.
    pub fn set(&mut self, name: impl Into<String>, value: Scalar) {
        let name = name.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Scalar> {
        let idx = self.fields.iter().position(|(k, _)| k == name)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Merge `other` into this row; colliding names take `other`'s value.
    pub fn extend(&mut self, other: Row) {
        for (k, v) in other.fields {
            self.set(k, v);
        }
    }
}

impl FromIterator<(String, Scalar)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, Scalar)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.set(k, v);
        }
        row
    }
}

impl IntoIterator for Row {
    type Item = (String, Scalar);
    type IntoIter = std::vec::IntoIter<(String, Scalar)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
