#![forbid(unsafe_code)]
//! relform-core: the value-level vocabulary shared by every operator.
//!
//! - `schema`: relation descriptions (columns, keys, foreign keys, metadata).
//! - `types`: scalar values and ephemeral rows.
//! - `formula`: the predicate/projection grammar consumed by the operators.
//! - `naming`: deterministic, length-bounded constraint and relation names.
//! - `config`: naming policy knobs.
//!
//! Nothing in here iterates data; that lives in `relform-operators`.

pub mod config;
pub mod error;
pub mod formula;
pub mod hash;
pub mod naming;
pub mod prelude;
pub mod schema;
pub mod types;

pub use error::{Error, Result};
