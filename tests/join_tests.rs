//! Joins and grouping across relations.


use std::sync::Arc;

use relform_core::prelude::{Row, Scalar, Similar};
use relform_operators::nest::split_text;
use relform_operators::{
    CrossJoin, NestedLoopsSimilarityAggregation, NestedLoopsSimilarityJoin, PhysicalOperator,
    Replay, Unnest,
};
use test_data_gen::{collect, exact_match, generated, named_scan, same_text};

#[test]
fn test_cross_join_counts_and_renames() {
    let left = generated("l", 4, 2);
    let right = generated("r", 3, 3);
    let join = CrossJoin::new(left, right);

    let columns = join.description().column_names();
    for side in ["l", "r"] {
        for col in ["id", "group", "label"] {
            assert!(columns.contains(&format!("{}:{}", side, col).as_str()));
        }
    }
    assert!(!columns.contains(&"id"));
    assert_eq!(join.description().table_name, "l_r");
    assert_eq!(collect(&join).len(), 12);
}

#[test]
fn test_cross_join_can_be_iterated_twice() {
    let join = CrossJoin::new(generated("l", 2, 1), generated("r", 2, 1));
    assert_eq!(join.replay(), Replay::Replayable);
    assert_eq!(collect(&join), collect(&join));
}

#[test]
fn test_similarity_join_exact_matching() {
    let terms = named_scan(
        "terms",
        serde_json::json!([{"term": "apple"}, {"term": "pear"}, {"term": "plum"}]),
    );
    let vocab = named_scan(
        "vocab",
        serde_json::json!([
            {"name": "apple", "synonyms": ["malus"]},
            {"name": "prune", "synonyms": ["plum", "dried plum"]}
        ]),
    );
    let join = NestedLoopsSimilarityJoin::new(
        terms,
        vocab,
        Similar::new("term", "name", "synonyms", exact_match),
    )
    .unwrap();
    let rows = collect(&join);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("name"), Some(&Scalar::from("apple")));
    assert_eq!(rows[1].get("term"), Some(&Scalar::from("plum")));
    assert_eq!(rows[1].get("name"), Some(&Scalar::from("prune")));
}

#[test]
fn test_unnest_then_aggregate_round_trip() {
    let enhancers = named_scan(
        "enhancer",
        serde_json::json!([
            {"id": 1, "genes": "BRCA1,tp53"},
            {"id": 2, "genes": "TP53"},
            {"id": 3, "genes": "egfr, BRCA1"}
        ]),
    );
    let unnest = Unnest::new(enhancers, "genes", split_text(",")).unwrap();
    assert_eq!(collect(&unnest).len(), 5);

    let agg = NestedLoopsSimilarityAggregation::new(
        Box::new(unnest),
        vec!["genes".into()],
        vec!["id".into()],
        Arc::new(same_text),
        None,
    )
    .unwrap();
    assert_eq!(agg.description().column_definitions[1].column_type.typename, "int8[]");

    let rows = collect(&agg);
    let ints = |v: &[i64]| Scalar::List(v.iter().map(|i| Scalar::I64(*i)).collect());
    assert_eq!(
        rows,
        vec![
            Row::from_pairs([("genes", Scalar::from("BRCA1")), ("id", ints(&[1, 3]))]),
            Row::from_pairs([("genes", Scalar::from("tp53")), ("id", ints(&[1, 2]))]),
            Row::from_pairs([("genes", Scalar::from("egfr")), ("id", ints(&[3]))]),
        ]
    );
}
