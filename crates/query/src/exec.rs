//! In-process execution of a [`ListQuery`] over JSON documents.

use core::cmp::Ordering;

use serde_json::{Map, Value};

use crate::filter::parse_date;
use crate::plan::{ListQuery, Projection, SortDirection, SortKey};
use crate::schema::{FieldKind, FieldSchema};

pub(crate) fn run(query: &ListQuery, docs: Vec<Value>, schema: &FieldSchema) -> Vec<Value> {
    let mut docs: Vec<Value> = docs
        .into_iter()
        .filter(|doc| query.filters.iter().all(|f| f.matches(doc)))
        .collect();

    docs.sort_by(|a, b| compare_docs(a, b, &query.sort));

    let docs: Vec<Value> = match query.page {
        Some(page) => docs
            .into_iter()
            .skip(page.skip())
            .take(page.limit as usize)
            .collect(),
        None => docs,
    };

    docs.into_iter()
        .map(|doc| project(doc, &query.projection, schema))
        .collect()
}

fn compare_docs(a: &Value, b: &Value, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = compare_field(key.kind, a.get(&key.field), b.get(&key.field));
        let ord = match key.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    // ids are time-ordered, so ties fall back to creation order
    let id = |doc: &Value| doc.get("id").and_then(Value::as_str).map(str::to_owned);
    id(a).cmp(&id(b))
}

fn sort_scalar(value: Option<&Value>) -> Option<&Value> {
    match value {
        Some(Value::Array(items)) => items.first(),
        Some(Value::Null) | None => None,
        other => other,
    }
}

/// Missing values sort before present ones.
fn compare_field(kind: FieldKind, a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (sort_scalar(a), sort_scalar(b)) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => match kind {
            FieldKind::Number => x
                .as_f64()
                .partial_cmp(&y.as_f64())
                .unwrap_or(Ordering::Equal),
            FieldKind::Date => x
                .as_str()
                .and_then(parse_date)
                .cmp(&y.as_str().and_then(parse_date)),
            FieldKind::Bool => x.as_bool().cmp(&y.as_bool()),
            FieldKind::Text | FieldKind::Id | FieldKind::Opaque => x.as_str().cmp(&y.as_str()),
        },
    }
}

fn project(mut doc: Value, projection: &Projection, schema: &FieldSchema) -> Value {
    schema.redact(&mut doc);
    let Value::Object(mut map) = doc else {
        return doc;
    };

    match projection {
        Projection::Default => Value::Object(map),
        Projection::Include(fields) => {
            let mut out = Map::new();
            if let Some(id) = map.remove("id") {
                out.insert("id".to_string(), id);
            }
            for field in fields {
                if let Some(value) = map.remove(field.as_str()) {
                    out.insert(field.clone(), value);
                }
            }
            Value::Object(out)
        }
        Projection::Exclude(fields) => {
            for field in fields {
                if field != "id" {
                    map.remove(field.as_str());
                }
            }
            Value::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use proptest::prelude::*;
    use serde_json::json;

    use crate::plan::ListQuery;
    use crate::schema::{Field, FieldSchema};

    static SCHEMA: FieldSchema = FieldSchema::new(
        &[
            Field::text("name"),
            Field::number("price"),
            Field::text("difficulty"),
            Field::date("createdAt"),
        ],
        &["secretNotes"],
    );

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn catalog() -> Vec<serde_json::Value> {
        vec![
            json!({ "id": "01", "name": "Forest Hiker", "price": 397, "difficulty": "easy", "createdAt": "2024-01-01T00:00:00Z", "secretNotes": "x" }),
            json!({ "id": "02", "name": "Sea Explorer", "price": 497, "difficulty": "medium", "createdAt": "2024-02-01T00:00:00Z" }),
            json!({ "id": "03", "name": "Park Camper", "price": 997, "difficulty": "easy", "createdAt": "2024-03-01T00:00:00.5Z" }),
            json!({ "id": "04", "name": "City Wanderer", "price": 1197, "difficulty": "easy", "createdAt": "2024-03-01T00:00:00Z" }),
            json!({ "id": "05", "name": "Snow Adventurer", "price": 997, "difficulty": "difficult", "createdAt": "2024-04-01T00:00:00Z" }),
        ]
    }

    fn run(pairs: &[(&str, &str)]) -> Vec<serde_json::Value> {
        ListQuery::parse(&params(pairs), &SCHEMA).unwrap().execute(catalog(), &SCHEMA)
    }

    fn names(docs: &[serde_json::Value]) -> Vec<&str> {
        docs.iter().map(|d| d["name"].as_str().unwrap()).collect()
    }

    #[test]
    fn filter_sort_paginate_project() {
        let docs = run(&[
            ("difficulty", "easy"),
            ("sort", "price"),
            ("limit", "2"),
            ("page", "1"),
            ("fields", "name,price"),
        ]);
        assert_eq!(
            docs,
            vec![
                json!({ "id": "01", "name": "Forest Hiker", "price": 397 }),
                json!({ "id": "03", "name": "Park Camper", "price": 997 }),
            ]
        );
    }

    #[test]
    fn default_order_is_newest_first_with_fractional_seconds() {
        let docs = run(&[]);
        assert_eq!(
            names(&docs),
            vec!["Snow Adventurer", "Park Camper", "City Wanderer", "Sea Explorer", "Forest Hiker"]
        );
    }

    #[test]
    fn secondary_sort_key_breaks_ties() {
        let docs = run(&[("sort", "-price,name")]);
        assert_eq!(
            names(&docs),
            vec!["City Wanderer", "Park Camper", "Snow Adventurer", "Sea Explorer", "Forest Hiker"]
        );
    }

    #[test]
    fn sorting_happens_before_pagination() {
        let docs = run(&[("sort", "-price"), ("page", "2"), ("limit", "2")]);
        assert_eq!(names(&docs), vec!["Snow Adventurer", "Sea Explorer"]);
    }

    #[test]
    fn hidden_fields_never_survive_projection() {
        let docs = run(&[("fields", "-price")]);
        assert!(docs.iter().all(|d| d.get("secretNotes").is_none()));
        assert!(docs.iter().all(|d| d.get("price").is_none() && d.get("id").is_some()));
    }

    #[test]
    fn page_past_the_end_is_empty() {
        assert!(run(&[("page", "9"), ("limit", "2")]).is_empty());
    }

    fn doc_strategy() -> impl Strategy<Value = serde_json::Value> {
        (0u32..10_000, "[a-z]{1,6}").prop_map(|(price, name)| json!({ "price": price, "name": name }))
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn gte_filter_only_returns_matching_documents(
            docs in prop::collection::vec(doc_strategy(), 0..40),
            floor in 0u32..10_000,
        ) {
            let expected = docs.iter().filter(|d| d["price"].as_u64().unwrap() >= floor as u64).count();
            let q = ListQuery::parse(&params(&[("price[gte]", &floor.to_string())]), &SCHEMA).unwrap();
            let out = q.execute(docs, &SCHEMA);
            prop_assert_eq!(out.len(), expected);
            prop_assert!(out.iter().all(|d| d["price"].as_u64().unwrap() >= floor as u64));
        }

        #[test]
        fn descending_sort_is_non_increasing(docs in prop::collection::vec(doc_strategy(), 0..40)) {
            let q = ListQuery::parse(&params(&[("sort", "-price")]), &SCHEMA).unwrap();
            let out = q.execute(docs, &SCHEMA);
            prop_assert!(out.windows(2).all(|w| w[0]["price"].as_u64() >= w[1]["price"].as_u64()));
        }

        #[test]
        fn pages_partition_the_sorted_result(
            docs in prop::collection::vec(doc_strategy(), 0..40),
            limit in 1u32..7,
        ) {
            let all = ListQuery::parse(&params(&[("sort", "price,name")]), &SCHEMA).unwrap().execute(docs.clone(), &SCHEMA);
            let mut stitched = Vec::new();
            let mut page = 1u32;
            loop {
                let q = ListQuery::parse(
                    &params(&[("sort", "price,name"), ("page", &page.to_string()), ("limit", &limit.to_string())]),
                    &SCHEMA,
                ).unwrap();
                let chunk = q.execute(docs.clone(), &SCHEMA);
                prop_assert!(chunk.len() <= limit as usize);
                if chunk.is_empty() { break; }
                stitched.extend(chunk);
                page += 1;
            }
            prop_assert_eq!(stitched, all);
        }
    }
}
