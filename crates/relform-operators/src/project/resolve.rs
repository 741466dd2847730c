//! Projection resolution: turns an ordered list of projection items into the
//! immutable maps and output schema a `Project` operator runs on.
//!
//! Resolution is a pure function of the input description, the projection and
//! the naming config. Nothing here touches rows.

use std::collections::HashSet;

use relform_core::config::EngineConfig;
use relform_core::naming::{constraint_name, FKEY_SUFFIX, KEY_SUFFIX};
use relform_core::prelude::{
    ColumnDef, ColumnRef, ColumnType, ConstraintName, FKeyDef, Projection, ProjectionItem,
    RelationDescription, COMPUTED_RELATION_PLACEHOLDER,
};

use crate::traits::{OpError, RenameMap};

/// Everything `Project` needs, computed once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedProjection {
    /// Input columns read from each row, in input column order.
    pub originals: Vec<String>,
    /// Input columns that survive under their own name.
    pub kept: Vec<String>,
    /// `(alias, source)` pairs. A source may appear under several aliases.
    pub aliases: RenameMap,
    /// Columns added from raw definitions; they carry no input values.
    pub additions: Vec<ColumnDef>,
    /// Output schema.
    pub description: RelationDescription,
}

impl ResolvedProjection {
    /// Aliases of `source` in the order they were requested.
    pub fn aliases_of<'a>(&'a self, source: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.aliases
            .iter()
            .filter(move |(_, s)| s == source)
            .map(|(a, _)| a.as_str())
    }

    /// Output name carried by an input column's first appearance, if any.
    fn output_name_of<'a>(&'a self, source: &'a str) -> Option<&'a str> {
        if self.kept.iter().any(|k| k == source) {
            return Some(source);
        }
        self.aliases_of(source).next()
    }
}

fn unknown_column(desc: &RelationDescription, name: &str) -> OpError {
    OpError::Usage(format!(
        "projection references unknown column '{}' of relation '{}'",
        name, desc.table_name
    ))
}

/// Resolve `projection` against `desc`.
///
/// An empty projection means every attribute. The drop-columns shorthand is
/// rejected: only the materializer of an `Alter` interprets it.
pub fn resolve_projection(
    desc: &RelationDescription,
    projection: &Projection,
    cfg: &EngineConfig,
) -> Result<ResolvedProjection, OpError> {
    if projection.dropped_columns().is_some() {
        return Err(OpError::Usage(
            "the drop-columns projection is only valid as an alter projection".into(),
        ));
    }
    let default_items = [ProjectionItem::AllAttributes];
    let items = if projection.is_empty() {
        &default_items[..]
    } else {
        projection.items()
    };

    let mut requested: HashSet<String> = HashSet::new();
    let mut aliases: RenameMap = Vec::new();
    let mut removals: HashSet<String> = HashSet::new();
    let mut additions: Vec<ColumnDef> = Vec::new();
    let mut fkey_defs: Vec<FKeyDef> = Vec::new();

    for item in items {
        match item {
            ProjectionItem::AllAttributes => {
                tracing::debug!("projecting all attributes");
                requested.extend(desc.column_definitions.iter().map(|c| c.name.clone()));
            }
            ProjectionItem::Attribute(name) => {
                tracing::debug!(%name, "projecting attribute by name");
                if !desc.has_column(name) {
                    return Err(unknown_column(desc, name));
                }
                requested.insert(name.clone());
            }
            ProjectionItem::IntrospectionFunction(f) => {
                tracing::debug!(function = f.name(), "projecting introspected attributes");
                if desc.is_computed() {
                    return Err(OpError::Usage(format!(
                        "introspection function '{}' requires a materialized relation",
                        f.name()
                    )));
                }
                let attrs = f.call(desc);
                if let Some(missing) = attrs.iter().find(|a| !desc.has_column(a)) {
                    return Err(unknown_column(desc, missing));
                }
                let pk_cols = attrs.clone();
                let mut fk_cols = attrs.clone();
                let rid = cfg.row_id_column.as_str();
                if attrs.iter().any(|a| a == rid) {
                    // The system identifier travels under a table-qualified alias.
                    let renamed = format!("{}_{}", desc.table_name, rid);
                    if aliases.iter().any(|(alias, _)| *alias == renamed) {
                        return Err(OpError::Usage(format!(
                            "duplicate system identifier '{}'",
                            renamed
                        )));
                    }
                    aliases.push((renamed.clone(), rid.to_string()));
                    for c in fk_cols.iter_mut().filter(|c| c.as_str() == rid) {
                        *c = renamed.clone();
                    }
                }
                requested.extend(attrs.into_iter().filter(|a| a != rid));
                fkey_defs.push(FKeyDef::define(
                    &fk_cols,
                    &desc.schema_name,
                    &desc.table_name,
                    &pk_cols,
                    Some("CASCADE"),
                    vec![ConstraintName::new(
                        desc.schema_name.clone(),
                        constraint_name(
                            COMPUTED_RELATION_PLACEHOLDER,
                            &fk_cols,
                            FKEY_SUFFIX,
                            cfg.max_identifier_len,
                        ),
                    )],
                ));
            }
            ProjectionItem::AttributeAlias { name, alias } => {
                tracing::debug!(%name, %alias, "projecting aliased attribute");
                if !desc.has_column(name) {
                    return Err(unknown_column(desc, name));
                }
                if aliases.iter().any(|(a, _)| a == alias) {
                    return Err(OpError::Usage(format!("alias '{}' used more than once", alias)));
                }
                aliases.push((alias.clone(), name.clone()));
            }
            ProjectionItem::AttributeDrop { name } => {
                tracing::debug!(%name, "projection drops attribute");
                removals.insert(name.clone());
            }
            ProjectionItem::AttributeAdd { definition } => {
                let col: ColumnDef = serde_json::from_str(definition).map_err(|e| {
                    OpError::Usage(format!("malformed column definition {}: {}", definition, e))
                })?;
                tracing::debug!(name = %col.name, "projection adds attribute");
                additions.push(col);
            }
            ProjectionItem::AttributeRemoval { .. } | ProjectionItem::Similar(_) => {
                return Err(OpError::Usage(format!(
                    "unsupported projection item '{}'",
                    item.kind()
                )));
            }
        }
    }
    tracing::debug!(?aliases, "alias to source columns");

    // Output columns: verbatim originals and alias clones in input order, then
    // additions.
    let mut originals = Vec::new();
    let mut kept = Vec::new();
    let mut col_defs = Vec::new();
    for col in &desc.column_definitions {
        let is_aliased = aliases.iter().any(|(_, s)| *s == col.name);
        if is_aliased {
            originals.push(col.name.clone());
            for (alias, _) in aliases.iter().filter(|(_, s)| *s == col.name) {
                let mut clone = col.clone();
                if col.name == cfg.row_id_column {
                    clone.column_type = ColumnType::text();
                    clone.default = None;
                }
                clone.name = alias.clone();
                col_defs.push(clone);
            }
        } else if requested.contains(&col.name) && !removals.contains(&col.name) {
            originals.push(col.name.clone());
            kept.push(col.name.clone());
            col_defs.push(col.clone());
        }
    }
    col_defs.extend(additions.iter().cloned());

    let mut resolved = ResolvedProjection {
        originals,
        kept,
        aliases,
        additions,
        description: RelationDescription::computed(col_defs).with_schema_name(desc.schema_name.clone()),
    };

    // Carry keys whose columns all survive, renamed onto their aliases.
    let mut key_defs = Vec::new();
    for key in &desc.keys {
        let revised: Option<Vec<String>> = key
            .unique_columns
            .iter()
            .map(|c| resolved.output_name_of(c).map(|s| s.to_string()))
            .collect();
        match revised {
            Some(cols) => {
                let name = ConstraintName::new(
                    desc.schema_name.clone(),
                    constraint_name(COMPUTED_RELATION_PLACEHOLDER, &cols, KEY_SUFFIX, cfg.max_identifier_len),
                );
                tracing::debug!(old = ?key.names, new = ?name, "carrying key");
                let mut carried = key.clone();
                carried.unique_columns = cols;
                carried.names = vec![name];
                key_defs.push(carried);
            }
            None => tracing::debug!(names = ?key.names, "dropping key"),
        }
    }

    for fkey in &desc.foreign_keys {
        let revised: Option<Vec<String>> = fkey
            .column_names()
            .into_iter()
            .map(|c| resolved.output_name_of(c).map(|s| s.to_string()))
            .collect();
        match revised {
            Some(cols) => {
                let name = ConstraintName::new(
                    desc.schema_name.clone(),
                    constraint_name(COMPUTED_RELATION_PLACEHOLDER, &cols, FKEY_SUFFIX, cfg.max_identifier_len),
                );
                tracing::debug!(old = ?fkey.names, new = ?name, "carrying foreign key");
                let mut carried = fkey.clone();
                carried.foreign_key_columns = cols.iter().map(ColumnRef::local).collect();
                carried.names = vec![name];
                fkey_defs.push(carried);
            }
            None => tracing::debug!(names = ?fkey.names, "dropping foreign key"),
        }
    }

    resolved.description.keys = key_defs;
    resolved.description.foreign_keys = fkey_defs;
    resolved.description.comment = desc.comment.clone();
    resolved.description.acls = desc.acls.clone();
    resolved.description.acl_bindings = desc.acl_bindings.clone();
    resolved.description.annotations = desc.annotations.clone();
    resolved
        .description
        .validate()
        .map_err(|e| OpError::Usage(e.to_string()))?;

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use relform_core::prelude::{IntrospectionFn, KeyDef};

    use super::*;

    fn source() -> RelationDescription {
        let mut desc = RelationDescription::new(
            "dataset",
            vec![
                ColumnDef::new("RID", ColumnType::new("ermrest_rid")).with_nullok(false),
                ColumnDef::new("accession", ColumnType::text()),
                ColumnDef::new("title", ColumnType::text()),
                ColumnDef::new("project", ColumnType::new("int8")),
            ],
        )
        .with_schema_name("isa");
        desc.column_definitions[0].default = Some(serde_json::json!("rid-default"));
        desc.keys.push(KeyDef::new(
            vec!["RID".into()],
            vec![ConstraintName::new("isa", "dataset_RID_key")],
        ));
        desc.keys.push(KeyDef::new(
            vec!["accession".into()],
            vec![ConstraintName::new("isa", "dataset_accession_key")],
        ));
        desc.foreign_keys.push(FKeyDef::define(
            &["project".to_string()],
            "isa",
            "project",
            &["id".to_string()],
            None,
            vec![ConstraintName::new("isa", "dataset_project_fkey")],
        ));
        desc
    }

    fn resolve(items: Vec<ProjectionItem>) -> Result<ResolvedProjection, OpError> {
        resolve_projection(&source(), &Projection::new(items), &EngineConfig::default())
    }

    #[test]
    fn test_empty_projection_keeps_everything() {
        let r = resolve(vec![]).unwrap();
        assert_eq!(
            r.description.column_names(),
            vec!["RID", "accession", "title", "project"]
        );
        assert_eq!(r.description.keys.len(), 2);
        assert_eq!(r.description.foreign_keys.len(), 1);
        assert!(r.description.is_computed());
    }

    #[test]
    fn test_keys_follow_aliases_and_get_templated_names() {
        let r = resolve(vec![
            ProjectionItem::alias("accession", "acc"),
            ProjectionItem::attr("title"),
        ])
        .unwrap();
        assert_eq!(r.description.column_names(), vec!["acc", "title"]);
        assert_eq!(r.description.keys.len(), 1);
        let key = &r.description.keys[0];
        assert_eq!(key.unique_columns, vec!["acc".to_string()]);
        assert_eq!(
            key.names,
            vec![ConstraintName::new("isa", "{__computed_relation__}_acc_key")]
        );
        // the project fkey lost its column
        assert!(r.description.foreign_keys.is_empty());
    }

    #[test]
    fn test_aliased_rid_becomes_plain_text() {
        let r = resolve(vec![ProjectionItem::alias("RID", "dataset_id")]).unwrap();
        let col = r.description.column("dataset_id").unwrap();
        assert_eq!(col.column_type, ColumnType::text());
        assert_eq!(col.default, None);
        assert!(!col.nullok);
    }

    #[test]
    fn test_drop_removes_from_all_attributes() {
        let r = resolve(vec![
            ProjectionItem::AllAttributes,
            ProjectionItem::drop("title"),
        ])
        .unwrap();
        assert_eq!(r.kept, vec!["RID", "accession", "project"]);
    }

    #[test]
    fn test_additions_come_last() {
        let r = resolve(vec![
            ProjectionItem::add(r#"{"name": "notes", "type": {"typename": "markdown"}}"#),
            ProjectionItem::attr("title"),
        ])
        .unwrap();
        assert_eq!(r.description.column_names(), vec!["title", "notes"]);
        assert_eq!(r.additions.len(), 1);
    }

    #[test]
    fn test_introspection_adds_fkey_to_source_and_qualifies_rid() {
        let introspect = IntrospectionFn::new("rid_and_accession", |_d: &RelationDescription| {
            vec!["RID".to_string(), "accession".to_string()]
        });
        let r = resolve(vec![ProjectionItem::IntrospectionFunction(introspect)]).unwrap();
        assert_eq!(r.description.column_names(), vec!["dataset_RID", "accession"]);

        let fkey = r
            .description
            .foreign_keys
            .iter()
            .find(|f| f.on_update.as_deref() == Some("CASCADE"))
            .unwrap();
        assert_eq!(fkey.column_names(), vec!["dataset_RID", "accession"]);
        assert_eq!(
            fkey.referenced_columns[0],
            ColumnRef::qualified("isa", "dataset", "RID")
        );
        assert_eq!(
            fkey.names[0].name(),
            "{__computed_relation__}_dataset_RID_accession_fkey"
        );
        // the RID key survives under the qualified alias
        assert!(r
            .description
            .keys
            .iter()
            .any(|k| k.unique_columns == vec!["dataset_RID".to_string()]));
    }

    #[test]
    fn test_introspection_twice_on_rid_is_rejected() {
        let f = IntrospectionFn::new("rid", |_d: &RelationDescription| vec!["RID".to_string()]);
        let err = resolve(vec![
            ProjectionItem::IntrospectionFunction(f.clone()),
            ProjectionItem::IntrospectionFunction(f),
        ])
        .unwrap_err();
        assert!(matches!(err, OpError::Usage(msg) if msg.contains("duplicate system identifier")));
    }

    #[test]
    fn test_introspection_on_computed_relation_is_rejected() {
        let computed = RelationDescription::computed(vec![ColumnDef::new("a", ColumnType::text())]);
        let f = IntrospectionFn::new("all", |d: &RelationDescription| {
            d.column_names().iter().map(|s| s.to_string()).collect()
        });
        let err = resolve_projection(
            &computed,
            &Projection::new(vec![ProjectionItem::IntrospectionFunction(f)]),
            &EngineConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, OpError::Usage(_)));
    }

    #[test]
    fn test_malformed_items_are_usage_errors() {
        assert!(matches!(
            resolve(vec![ProjectionItem::attr("nope")]),
            Err(OpError::Usage(_))
        ));
        assert!(matches!(
            resolve(vec![ProjectionItem::add("{not json")]),
            Err(OpError::Usage(_))
        ));
        assert!(matches!(
            resolve(vec![ProjectionItem::AllAttributes, ProjectionItem::removal("title")]),
            Err(OpError::Usage(_))
        ));
        assert!(matches!(
            resolve(vec![
                ProjectionItem::alias("title", "t"),
                ProjectionItem::alias("accession", "t")
            ]),
            Err(OpError::Usage(_))
        ));
        // alias colliding with a kept column breaks name uniqueness
        assert!(matches!(
            resolve(vec![
                ProjectionItem::attr("title"),
                ProjectionItem::alias("accession", "title")
            ]),
            Err(OpError::Usage(_))
        ));
    }
}
