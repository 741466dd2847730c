#![forbid(unsafe_code)]
//! relform: relational transformation operators over schema descriptions.
//!
//! Re-exports the workspace crates under one roof.

pub use relform_core;
pub use relform_operators;
