//! Parsing a query string into list directives.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::QueryError;
use crate::exec;
use crate::filter::Filter;
use crate::schema::{FieldKind, FieldSchema};

/// Parameters that control listing rather than filter documents.
pub const RESERVED_PARAMS: [&str; 4] = ["page", "sort", "limit", "fields"];

const DEFAULT_SORT_FIELD: &str = "createdAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub limit: u32,
}

impl Page {
    pub fn skip(&self) -> usize {
        (self.page as usize - 1) * self.limit as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: String,
    pub kind: FieldKind,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
    /// Everything except hidden fields.
    #[default]
    Default,
    /// Only these fields, plus `id`.
    Include(Vec<String>),
    /// Everything except these fields.
    Exclude(Vec<String>),
}

/// Filter, pagination, sort and projection directives for one list request.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub page: Option<Page>,
    pub sort: Vec<SortKey>,
    pub projection: Projection,
}

impl ListQuery {
    /// Interpret raw query parameters against `schema`.
    ///
    /// Stages are built in filter, paginate, sort, project order.
    pub fn parse(params: &HashMap<String, String>, schema: &FieldSchema) -> Result<Self, QueryError> {
        let mut keys: Vec<&String> = params
            .keys()
            .filter(|k| !RESERVED_PARAMS.contains(&k.as_str()))
            .collect();
        keys.sort();
        let filters = keys
            .into_iter()
            .map(|key| Filter::parse(key, &params[key], schema))
            .collect::<Result<Vec<_>, _>>()?;

        let page = parse_page(params.get("page"), params.get("limit"))?;

        let sort = match params.get("sort").map(|s| s.trim()).filter(|s| !s.is_empty()) {
            Some(raw) => parse_sort(raw, schema)?,
            None => default_sort(schema),
        };

        let projection = match params.get("fields") {
            Some(raw) => parse_projection(raw, schema)?,
            None => Projection::Default,
        };

        Ok(Self {
            filters,
            page,
            sort,
            projection,
        })
    }

    /// A query with no client parameters: every document, newest first.
    pub fn unfiltered(schema: &FieldSchema) -> Self {
        Self {
            filters: Vec::new(),
            page: None,
            sort: default_sort(schema),
            projection: Projection::Default,
        }
    }

    /// Add a server-side scope filter (parent resource, visibility, ...).
    pub fn and(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Run the directives over `docs`: filter, sort, paginate, project.
    pub fn execute(&self, docs: Vec<Value>, schema: &FieldSchema) -> Vec<Value> {
        exec::run(self, docs, schema)
    }
}

fn parse_positive(param: &'static str, raw: &str) -> Result<u32, QueryError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| QueryError::InvalidPagination {
            param,
            value: raw.to_string(),
        })
}

fn parse_page(page: Option<&String>, limit: Option<&String>) -> Result<Option<Page>, QueryError> {
    let page = page.map(|raw| parse_positive("page", raw)).transpose()?;
    let limit = limit.map(|raw| parse_positive("limit", raw)).transpose()?;
    Ok(match (page, limit) {
        (Some(page), Some(limit)) => Some(Page { page, limit }),
        _ => None,
    })
}

fn parse_sort(raw: &str, schema: &FieldSchema) -> Result<Vec<SortKey>, QueryError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|token| {
            let (name, direction) = match token.strip_prefix('-') {
                Some(name) => (name, SortDirection::Desc),
                None => (token, SortDirection::Asc),
            };
            let field = schema
                .field(name)
                .ok_or_else(|| QueryError::UnknownField(name.to_string()))?;
            if !field.kind.is_queryable() {
                return Err(QueryError::NotQueryable(name.to_string()));
            }
            Ok(SortKey {
                field: name.to_string(),
                kind: field.kind,
                direction,
            })
        })
        .collect()
}

fn default_sort(schema: &FieldSchema) -> Vec<SortKey> {
    schema
        .field(DEFAULT_SORT_FIELD)
        .map(|field| SortKey {
            field: field.name.to_string(),
            kind: field.kind,
            direction: SortDirection::Desc,
        })
        .into_iter()
        .collect()
}

fn parse_projection(raw: &str, schema: &FieldSchema) -> Result<Projection, QueryError> {
    let tokens: Vec<&str> = raw.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
    if tokens.is_empty() {
        return Ok(Projection::Default);
    }

    let excluded = tokens.iter().filter(|t| t.starts_with('-')).count();
    if excluded != 0 && excluded != tokens.len() {
        return Err(QueryError::MixedProjection);
    }

    let names = tokens
        .iter()
        .map(|t| t.trim_start_matches('-'))
        .map(|name| {
            if name == "id" || schema.field(name).is_some() {
                Ok(name.to_string())
            } else {
                Err(QueryError::UnknownField(name.to_string()))
            }
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(if excluded == 0 {
        Projection::Include(names)
    } else {
        Projection::Exclude(names)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{ComparisonOp, FilterValue};
    use crate::schema::Field;

    static SCHEMA: FieldSchema = FieldSchema::new(
        &[
            Field::text("name"),
            Field::number("price"),
            Field::text("difficulty"),
            Field::date("createdAt"),
            Field::opaque("images"),
        ],
        &["password"],
    );

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn reserved_params_are_not_filters() {
        let q = ListQuery::parse(
            &params(&[("page", "2"), ("limit", "3"), ("sort", "price"), ("fields", "name"), ("difficulty", "easy")]),
            &SCHEMA,
        )
        .unwrap();
        assert_eq!(q.filters.len(), 1);
        assert_eq!(q.filters[0].value, FilterValue::Text("easy".into()));
        assert_eq!(q.page, Some(Page { page: 2, limit: 3 }));
        assert_eq!(q.page.unwrap().skip(), 3);
    }

    #[test]
    fn pagination_needs_both_page_and_limit() {
        let q = ListQuery::parse(&params(&[("limit", "5")]), &SCHEMA).unwrap();
        assert_eq!(q.page, None);
        let q = ListQuery::parse(&params(&[("page", "5")]), &SCHEMA).unwrap();
        assert_eq!(q.page, None);
        assert!(ListQuery::parse(&params(&[("page", "0"), ("limit", "5")]), &SCHEMA).is_err());
    }

    #[test]
    fn default_sort_is_newest_first() {
        let q = ListQuery::parse(&HashMap::new(), &SCHEMA).unwrap();
        assert_eq!(q.sort.len(), 1);
        assert_eq!(q.sort[0].field, "createdAt");
        assert_eq!(q.sort[0].direction, SortDirection::Desc);
    }

    #[test]
    fn sort_keys_keep_order_and_direction() {
        let q = ListQuery::parse(&params(&[("sort", "-price, name")]), &SCHEMA).unwrap();
        let keys: Vec<_> = q.sort.iter().map(|k| (k.field.as_str(), k.direction)).collect();
        assert_eq!(keys, vec![("price", SortDirection::Desc), ("name", SortDirection::Asc)]);
        assert!(ListQuery::parse(&params(&[("sort", "images")]), &SCHEMA).is_err());
        assert!(ListQuery::parse(&params(&[("sort", "password")]), &SCHEMA).is_err());
    }

    #[test]
    fn projection_forms() {
        let q = ListQuery::parse(&params(&[("fields", "name,price")]), &SCHEMA).unwrap();
        assert_eq!(q.projection, Projection::Include(vec!["name".into(), "price".into()]));
        let q = ListQuery::parse(&params(&[("fields", "-images")]), &SCHEMA).unwrap();
        assert_eq!(q.projection, Projection::Exclude(vec!["images".into()]));
        assert_eq!(
            ListQuery::parse(&params(&[("fields", "name,-images")]), &SCHEMA),
            Err(QueryError::MixedProjection)
        );
        assert_eq!(
            ListQuery::parse(&params(&[("fields", "password")]), &SCHEMA),
            Err(QueryError::UnknownField("password".into()))
        );
    }

    #[test]
    fn scope_filters_are_appended() {
        let q = ListQuery::unfiltered(&SCHEMA).and(Filter::ne("difficulty", FilterValue::Text("hard".into())));
        assert_eq!(q.filters[0].op, ComparisonOp::Ne);
    }
}
