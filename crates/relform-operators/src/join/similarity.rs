use relform_core::prelude::{RelationDescription, Row, Scalar, Similar};

use super::{join_shape, JoinShape};
use crate::traits::{attribute, rename_row, BoxedOperator, OpError, PhysicalOperator, RowStream};

/// Joins each left row to its most similar right row.
///
/// The right rows are read once per iteration, when the first left row
/// arrives, and held in memory. For every
/// left row, `left[attribute]` is scored against each right row's domain value
/// and then its synonyms; the lowest score wins, earlier candidates winning
/// ties. An exact match (`0.0`) ends the scan for that left row. Left rows
/// whose best score is not below `1.0` produce nothing.
#[derive(Debug)]
pub struct NestedLoopsSimilarityJoin {
    left: BoxedOperator,
    right: BoxedOperator,
    shape: JoinShape,
    condition: Similar,
}

impl NestedLoopsSimilarityJoin {
    pub fn new(left: BoxedOperator, right: BoxedOperator, condition: Similar) -> Result<Self, OpError> {
        let (l, r) = (left.description(), right.description());
        if !l.has_column(&condition.attribute) {
            return Err(OpError::Usage(format!(
                "similarity target '{}' is not a column of '{}'",
                condition.attribute, l.table_name
            )));
        }
        let right_columns = std::iter::once(&condition.domain)
            .chain((!condition.synonyms.is_empty()).then_some(&condition.synonyms));
        for col in right_columns {
            if !r.has_column(col) {
                return Err(OpError::Usage(format!(
                    "similarity column '{}' is not a column of '{}'",
                    col, r.table_name
                )));
            }
        }

        let shape = join_shape(l, r);
        tracing::debug!(?condition, relation = %shape.description.table_name, "similarity join");
        Ok(Self {
            left,
            right,
            shape,
            condition,
        })
    }

    fn synonyms_of<'r>(&self, row: &'r Row) -> Result<&'r [Scalar], OpError> {
        if self.condition.synonyms.is_empty() {
            return Ok(&[]);
        }
        match attribute(row, &self.condition.synonyms)? {
            Scalar::Null => Ok(&[]),
            Scalar::List(items) => Ok(items),
            other => Err(OpError::Data(format!(
                "synonyms attribute '{}' holds a non-list value: {}",
                self.condition.synonyms, other
            ))),
        }
    }

    fn best_match<'r>(&self, left_row: &Row, right_rows: &'r [Row]) -> Result<Option<&'r Row>, OpError> {
        let target = attribute(left_row, &self.condition.attribute)?;
        let mut best_score = 1.0;
        let mut best_row = None;

        'rows: for right_row in right_rows {
            let domain = attribute(right_row, &self.condition.domain)?;
            for term in std::iter::once(domain).chain(self.synonyms_of(right_row)?) {
                let score = (self.condition.similarity_fn)(target, term);
                tracing::trace!(%target, %term, score, "similarity");
                if score < best_score {
                    best_score = score;
                    best_row = Some(right_row);
                    if score == 0.0 {
                        break 'rows;
                    }
                }
            }
        }
        Ok(best_row)
    }

    fn join_row(&self, left_row: Row, right_rows: &[Row]) -> Result<Option<Row>, OpError> {
        let Some(right_row) = self.best_match(&left_row, right_rows)? else {
            return Ok(None);
        };
        let mut row = rename_row(&left_row, &self.shape.left_renames, true)?.into_owned();
        row.extend(rename_row(right_row, &self.shape.right_renames, true)?.into_owned());
        Ok(Some(row))
    }
}

impl PhysicalOperator for NestedLoopsSimilarityJoin {
    fn name(&self) -> &'static str {
        "similarity_join"
    }

    fn description(&self) -> &RelationDescription {
        &self.shape.description
    }

    fn rows(&self) -> Result<RowStream<'_>, OpError> {
        let left = self.left.rows()?;
        let mut right_rows: Option<Vec<Row>> = None;
        Ok(Box::new(left.filter_map(move |item| {
            item.and_then(|row| {
                if right_rows.is_none() {
                    let cached = self.right.rows()?.collect::<Result<Vec<Row>, _>>()?;
                    tracing::debug!(rows = cached.len(), "cached right side of similarity join");
                    right_rows = Some(cached);
                }
                self.join_row(row, right_rows.as_deref().unwrap_or_default())
            })
            .transpose()
        })))
    }

    fn children(&self) -> Vec<&dyn PhysicalOperator> {
        vec![self.left.as_ref(), self.right.as_ref()]
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::scan::JsonScan;

    fn named_scan(name: &str, json: &str) -> BoxedOperator {
        let scan = JsonScan::from_json_str(json).unwrap();
        let mut desc = scan.description().clone();
        desc.table_name = name.to_string();
        let rows: Vec<Row> = scan.rows().unwrap().map(|r| r.unwrap()).collect();
        Box::new(JsonScan::with_description(desc, rows).unwrap())
    }

    fn exact(a: &Scalar, b: &Scalar) -> f64 {
        if a.loose_eq(b) {
            0.0
        } else {
            1.0
        }
    }

    fn vocabulary() -> BoxedOperator {
        named_scan(
            "vocab",
            r#"[
                {"name": "heart", "synonyms": ["cardiac", "cor"]},
                {"name": "liver", "synonyms": null},
                {"name": "kidney", "synonyms": ["renal"]}
            ]"#,
        )
    }

    fn terms() -> BoxedOperator {
        named_scan(
            "terms",
            r#"[{"term": "liver"}, {"term": "renal"}, {"term": "lung"}]"#,
        )
    }

    fn names(rows: &[Row]) -> Vec<(String, String)> {
        rows.iter()
            .map(|r| {
                (
                    r.get("term").and_then(Scalar::as_str).unwrap().to_string(),
                    r.get("name").and_then(Scalar::as_str).unwrap().to_string(),
                )
            })
            .collect()
    }

    #[test]
    fn test_exact_matches_pair_and_misses_drop() {
        let join = NestedLoopsSimilarityJoin::new(
            terms(),
            vocabulary(),
            Similar::new("term", "name", "synonyms", exact),
        )
        .unwrap();
        assert_eq!(
            join.description().column_names(),
            vec!["term", "name", "synonyms"]
        );
        let rows: Vec<Row> = join.rows().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(
            names(&rows),
            vec![
                ("liver".to_string(), "liver".to_string()),
                ("renal".to_string(), "kidney".to_string()),
            ]
        );
    }

    #[test]
    fn test_lowest_score_wins_and_ties_keep_first() {
        // Scores by name: heart 0.5, liver 0.3, kidney 0.3.
        let score = |_: &Scalar, b: &Scalar| match b.as_str() {
            Some("liver") | Some("kidney") => 0.3,
            _ => 0.5,
        };
        let join = NestedLoopsSimilarityJoin::new(
            named_scan("terms", r#"[{"term": "x"}]"#),
            vocabulary(),
            Similar::new("term", "name", "", score),
        )
        .unwrap();
        let rows: Vec<Row> = join.rows().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(names(&rows), vec![("x".to_string(), "liver".to_string())]);
    }

    fn counted_exact() -> (Similar, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let condition = Similar::new("term", "name", "synonyms", move |a: &Scalar, b: &Scalar| {
            counter.fetch_add(1, Ordering::SeqCst);
            exact(a, b)
        });
        (condition, calls)
    }

    #[test]
    fn test_exact_match_stops_scanning() {
        let (condition, calls) = counted_exact();
        let join = NestedLoopsSimilarityJoin::new(
            named_scan("terms", r#"[{"term": "a"}]"#),
            named_scan(
                "vocab",
                r#"[
                    {"name": "a", "synonyms": ["z"]},
                    {"name": "b", "synonyms": null},
                    {"name": "c", "synonyms": null}
                ]"#,
            ),
            condition,
        )
        .unwrap();
        assert_eq!(join.rows().unwrap().count(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_exact_synonym_match_skips_remaining_rows() {
        let (condition, calls) = counted_exact();
        let join = NestedLoopsSimilarityJoin::new(
            named_scan("terms", r#"[{"term": "a"}]"#),
            named_scan(
                "vocab",
                r#"[
                    {"name": "q", "synonyms": ["a", "a2"]},
                    {"name": "a", "synonyms": null}
                ]"#,
            ),
            condition,
        )
        .unwrap();
        let rows: Vec<Row> = join.rows().unwrap().map(|r| r.unwrap()).collect();
        assert_eq!(names(&rows), vec![("a".to_string(), "q".to_string())]);
        // domain "q", then synonym "a"
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_colliding_columns_are_qualified() {
        let join = NestedLoopsSimilarityJoin::new(
            named_scan("l", r#"[{"name": "liver"}]"#),
            vocabulary(),
            Similar::new("name", "name", "synonyms", exact),
        )
        .unwrap();
        assert_eq!(
            join.description().column_names(),
            vec!["l:name", "vocab:name", "synonyms"]
        );
        let row = join.rows().unwrap().next().unwrap().unwrap();
        assert_eq!(row.get("l:name"), Some(&Scalar::Str("liver".into())));
        assert_eq!(row.get("vocab:name"), Some(&Scalar::Str("liver".into())));
    }

    #[test]
    fn test_unknown_columns_rejected() {
        let err = NestedLoopsSimilarityJoin::new(
            terms(),
            vocabulary(),
            Similar::new("term", "nope", "synonyms", exact),
        )
        .unwrap_err();
        assert!(matches!(err, OpError::Usage(_)));
    }

    #[test]
    fn test_non_list_synonyms_is_data_error() {
        let join = NestedLoopsSimilarityJoin::new(
            terms(),
            named_scan("vocab", r#"[{"name": "a", "synonyms": "b"}]"#),
            Similar::new("term", "name", "synonyms", exact),
        )
        .unwrap();
        let first = join.rows().unwrap().next().unwrap();
        assert!(matches!(first, Err(OpError::Data(_))));
    }
}
