//! Deterministic, length-bounded names for constraints and computed relations.
//!
//! Constraint names have the shape `<relation>_<col>_<col>..._<suffix>`. The
//! `_<suffix>` tail always survives clipping so a name still says whether it
//! belongs to a key or a foreign key.

use serde::Serialize;

use crate::error::Result;
use crate::hash::hash_serde;
use crate::schema::{ConstraintName, COMPUTED_RELATION_PLACEHOLDER};

pub const KEY_SUFFIX: &str = "key";
pub const FKEY_SUFFIX: &str = "fkey";

fn clip_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Build `<table_name>_<columns...>_<suffix>` clipped to `max_len` characters.
pub fn constraint_name<S: AsRef<str>>(
    table_name: &str,
    columns: &[S],
    suffix: &str,
    max_len: usize,
) -> String {
    let cols: Vec<&str> = columns.iter().map(|c| c.as_ref()).collect();
    let base = format!("{}_{}", table_name, cols.join("_"));
    let budget = max_len.saturating_sub(suffix.chars().count() + 1);
    format!("{}_{}", clip_chars(&base, budget), suffix)
}

/// Substitute the computed-relation token with `table_name`, re-home the name
/// in `schema_name`, and re-clip so the result stays within `max_len`.
pub fn finalize_constraint_name(
    name: &ConstraintName,
    schema_name: &str,
    table_name: &str,
    max_len: usize,
) -> ConstraintName {
    let replaced = name.name().replace(COMPUTED_RELATION_PLACEHOLDER, table_name);
    if replaced.chars().count() <= max_len {
        return ConstraintName::new(schema_name, replaced);
    }
    let clipped = match replaced.rsplit_once('_') {
        Some((head, suffix)) if !suffix.is_empty() && suffix.len() < max_len => {
            let budget = max_len - suffix.chars().count() - 1;
            format!("{}_{}", clip_chars(head, budget), suffix)
        }
        _ => clip_chars(&replaced, max_len).to_string(),
    };
    ConstraintName::new(schema_name, clipped)
}

/// Name for a relation computed from `base_table`: `<base_table>:<16 hex>`,
/// where the digits digest `params` (typically the child description plus the
/// operator's own arguments). Same inputs, same name.
pub fn computed_relation_name<T: Serialize>(base_table: &str, params: &T) -> Result<String> {
    let digest = hash_serde(params)?;
    Ok(format!("{}:{}", base_table, &digest.to_hex()[..16]))
}
