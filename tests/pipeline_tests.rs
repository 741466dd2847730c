//! End-to-end pipelines over single relations: select, project, rename,
//! distinct, union.


use std::collections::HashSet;

use relform_core::hash::hash_scalars;
use relform_core::prelude::{
    Comparison, ComparisonOp, Formula, IntrospectionFn, Projection, ProjectionItem, Row, Scalar,
};
use relform_operators::{
    HashDistinct, OpError, PhysicalOperator, Project, Rename, Select, Union,
};
use test_data_gen::{collect, generated, hello_world, named_scan};

#[test]
fn test_select_with_no_comparisons_passes_everything() {
    let child = generated("items", 5, 2);
    let expected_desc = child.description().clone();
    let expected_rows = collect(child.as_ref());

    let select = Select::new(child, Formula::Conjunction(vec![])).unwrap();
    assert_eq!(select.description(), &expected_desc);
    assert_eq!(collect(&select), expected_rows);
}

#[test]
fn test_select_then_project() {
    let select = Select::new(
        generated("items", 10, 3),
        Formula::Disjunction(vec![
            Comparison::new("id", ComparisonOp::Lt, 2i64),
            Comparison::new("group", ComparisonOp::Eq, "g2"),
        ]),
    )
    .unwrap();
    let project = Project::new(Box::new(select), ["id"].into_iter().collect()).unwrap();
    let ids: Vec<Scalar> = collect(&project)
        .iter()
        .map(|r| r.get("id").cloned().unwrap())
        .collect();
    assert_eq!(
        ids,
        [0i64, 1, 2, 5, 8].iter().map(|i| Scalar::I64(*i)).collect::<Vec<_>>()
    );
}

#[test]
fn test_project_single_attribute_scenario() {
    let project = Project::new(hello_world(), ["property_1"].into_iter().collect()).unwrap();
    assert_eq!(project.description().column_names(), vec!["property_1"]);
    assert_eq!(
        collect(&project),
        vec![
            Row::from_pairs([("property_1", "hello")]),
            Row::from_pairs([("property_1", "world")]),
        ]
    );
}

#[test]
fn test_project_alias_fan_out_scenario() {
    let project = Project::new(
        hello_world(),
        Projection::new(vec![
            ProjectionItem::alias("property_1", "name"),
            ProjectionItem::alias("property_1", "synonyms"),
        ]),
    )
    .unwrap();
    let columns: HashSet<&str> = project.description().column_names().into_iter().collect();
    assert_eq!(columns, HashSet::from(["name", "synonyms"]));

    let rows = collect(&project);
    assert_eq!(rows[0], Row::from_pairs([("name", "hello"), ("synonyms", "hello")]));
    assert!(rows.iter().all(|r| !r.contains("RID") && !r.contains("property_1")));
}

#[test]
fn test_project_all_attributes_preserves_shape() {
    let child = generated("items", 7, 3);
    let columns: Vec<String> = child
        .description()
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();
    let project = Project::new(child, Projection::new(vec![ProjectionItem::AllAttributes])).unwrap();
    assert_eq!(project.description().column_names(), columns);
    assert_eq!(collect(&project).len(), 7);
}

#[test]
fn test_introspection_aliases_row_id_and_links_back() {
    let rid_and_first = IntrospectionFn::new("rid_and_first", |desc| {
        vec!["RID".to_string(), desc.column_definitions[1].name.clone()]
    });
    let project = Project::new(
        hello_world(),
        Projection::new(vec![ProjectionItem::IntrospectionFunction(rid_and_first)]),
    )
    .unwrap();
    let desc = project.description();
    assert_eq!(desc.column_names(), vec!["hello_world_RID", "property_1"]);
    assert_eq!(desc.foreign_keys.len(), 1);
    assert_eq!(desc.foreign_keys[0].on_update.as_deref(), Some("CASCADE"));
    assert_eq!(
        collect(&project)[1],
        Row::from_pairs([
            ("hello_world_RID", Scalar::I64(2)),
            ("property_1", Scalar::from("world")),
        ])
    );

    // A computed relation has no concrete schema to introspect.
    let computed = Project::new(hello_world(), Projection::default()).unwrap();
    let err = Project::new(
        Box::new(computed),
        Projection::new(vec![ProjectionItem::IntrospectionFunction(IntrospectionFn::new(
            "all",
            |d| d.column_names().into_iter().map(String::from).collect(),
        ))]),
    )
    .unwrap_err();
    assert!(matches!(err, OpError::Usage(_)));
}

#[test]
fn test_rename_keeps_child_order_and_values() {
    let rename = Rename::new(hello_world(), vec![("property_1".into(), "greeting".into())]).unwrap();
    assert_eq!(rename.description().column_names(), vec!["RID", "greeting"]);
    assert_eq!(
        collect(&rename)[0],
        Row::from_pairs([("RID", Scalar::I64(1)), ("greeting", Scalar::from("hello"))])
    );
}

#[test]
fn test_hash_distinct_emits_first_occurrences() {
    let child = generated("items", 12, 4);
    let child_rows = collect(child.as_ref());
    let distinct = HashDistinct::new(child, vec!["group".into()]).unwrap();
    let rows = collect(&distinct);

    assert!(rows.len() <= child_rows.len());
    let digests: HashSet<_> = rows
        .iter()
        .map(|r| hash_scalars([r.get("group").unwrap()]))
        .collect();
    assert_eq!(digests.len(), rows.len());
    assert_eq!(rows, child_rows[..4].to_vec());
}

#[test]
fn test_hash_distinct_agrees_with_select_equality() {
    let payload = serde_json::json!([
        {"n": 1, "a": 1},
        {"n": 2, "a": 1.0},
        {"n": 3, "a": 1.5}
    ]);
    let select = Select::new(
        named_scan("mixed", payload.clone()),
        Formula::Comparison(Comparison::new("a", ComparisonOp::Eq, 1i64)),
    )
    .unwrap();
    assert_eq!(collect(&select).len(), 2);

    let distinct = HashDistinct::new(named_scan("mixed", payload), vec!["a".into()]).unwrap();
    let ns: Vec<Scalar> = collect(&distinct)
        .iter()
        .map(|r| r.get("n").cloned().unwrap())
        .collect();
    assert_eq!(ns, vec![Scalar::I64(1), Scalar::I64(3)]);
}

#[test]
fn test_union_is_left_then_right() {
    let left = generated("a", 3, 1);
    let right = generated("b", 4, 2);
    let (l_rows, r_rows) = (collect(left.as_ref()), collect(right.as_ref()));
    let union = Union::new(left, right);
    let rows = collect(&union);
    assert_eq!(rows.len(), l_rows.len() + r_rows.len());
    assert_eq!(rows[..3], l_rows[..]);
    assert_eq!(rows[3..], r_rows[..]);
}

#[test]
fn test_missing_attribute_stops_the_stream() {
    let child = named_scan(
        "sparse",
        serde_json::json!([{"a": 1, "b": 2}, {"a": 3}]),
    );
    let select = Select::new(
        child,
        Formula::Comparison(Comparison::new("b", ComparisonOp::Ge, 0i64)),
    )
    .unwrap();
    let mut rows = select.rows().unwrap();
    assert!(rows.next().unwrap().is_ok());
    assert!(matches!(
        rows.next(),
        Some(Err(OpError::MissingAttribute { .. }))
    ));
}

#[test]
fn test_explain_reports_the_tree() {
    let project = Project::new(
        Box::new(Select::new(hello_world(), Formula::Conjunction(vec![])).unwrap()),
        ["RID"].into_iter().collect(),
    )
    .unwrap();
    let plan = project.explain();
    assert_eq!(plan.operator, "project");
    assert_eq!(plan.size(), 3);
    assert_eq!(plan.children[0].operator, "select");
    assert!(plan.to_json_pretty().unwrap().contains("\"json_scan\""));
}
