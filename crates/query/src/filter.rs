//! Typed filter predicates.

use core::cmp::Ordering;

use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::error::QueryError;
use crate::schema::{FieldKind, FieldSchema};

/// Comparison operators. Only `gt`, `gte`, `lt` and `lte` can be spelled in a
/// query string; `Ne` exists for server-side scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl ComparisonOp {
    pub fn from_param(word: &str) -> Option<Self> {
        match word {
            "gt" => Some(Self::Gt),
            "gte" => Some(Self::Gte),
            "lt" => Some(Self::Lt),
            "lte" => Some(Self::Lte),
            _ => None,
        }
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Self::Gt | Self::Gte | Self::Lt | Self::Lte)
    }

    fn accepts(&self, ord: Ordering) -> bool {
        match self {
            Self::Eq => ord == Ordering::Equal,
            Self::Ne => ord != Ordering::Equal,
            Self::Gt => ord == Ordering::Greater,
            Self::Gte => ord != Ordering::Less,
            Self::Lt => ord == Ordering::Less,
            Self::Lte => ord != Ordering::Greater,
        }
    }
}

/// A filter operand, already typed by the field's kind.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Number(f64),
    Text(String),
    Bool(bool),
    Date(DateTime<Utc>),
    Id(Uuid),
}

impl FilterValue {
    pub fn parse(kind: FieldKind, field: &str, raw: &str) -> Result<Self, QueryError> {
        let invalid = || QueryError::InvalidValue {
            field: field.to_string(),
            value: raw.to_string(),
            expected: kind.describe(),
        };

        match kind {
            FieldKind::Number => raw
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite())
                .map(Self::Number)
                .ok_or_else(invalid),
            FieldKind::Text => Ok(Self::Text(raw.to_string())),
            FieldKind::Bool => match raw {
                "true" => Ok(Self::Bool(true)),
                "false" => Ok(Self::Bool(false)),
                _ => Err(invalid()),
            },
            FieldKind::Date => parse_date(raw).map(Self::Date).ok_or_else(invalid),
            FieldKind::Id => Uuid::parse_str(raw).map(Self::Id).map_err(|_| invalid()),
            FieldKind::Opaque => Err(QueryError::NotQueryable(field.to_string())),
        }
    }

    /// Order a stored scalar relative to this operand. `None` when the stored
    /// value has a different type.
    fn compare(&self, stored: &Value) -> Option<Ordering> {
        match self {
            Self::Number(n) => stored.as_f64()?.partial_cmp(n),
            Self::Text(s) => Some(stored.as_str()?.cmp(s.as_str())),
            Self::Bool(b) => Some(stored.as_bool()?.cmp(b)),
            Self::Date(d) => Some(parse_date(stored.as_str()?)?.cmp(d)),
            Self::Id(id) => Some(Uuid::parse_str(stored.as_str()?).ok()?.cmp(id)),
        }
    }
}

/// Parse an RFC 3339 timestamp, or a bare `YYYY-MM-DD` date at midnight UTC.
pub(crate) fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// One predicate over a top-level document field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: ComparisonOp,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: ComparisonOp, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn eq(field: impl Into<String>, value: FilterValue) -> Self {
        Self::new(field, ComparisonOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: FilterValue) -> Self {
        Self::new(field, ComparisonOp::Ne, value)
    }

    /// Parse one query parameter: `price=10`, `price[gte]=10`.
    pub fn parse(key: &str, raw: &str, schema: &FieldSchema) -> Result<Self, QueryError> {
        let (name, op) = match key.split_once('[') {
            Some((name, rest)) => {
                let word = rest.strip_suffix(']').unwrap_or(rest);
                let op = ComparisonOp::from_param(word).ok_or_else(|| {
                    QueryError::UnsupportedOperator {
                        field: name.to_string(),
                        operator: word.to_string(),
                    }
                })?;
                (name, op)
            }
            None => (key, ComparisonOp::Eq),
        };

        let field = schema
            .field(name)
            .ok_or_else(|| QueryError::UnknownField(name.to_string()))?;
        if !field.kind.is_queryable() {
            return Err(QueryError::NotQueryable(name.to_string()));
        }
        if op.is_range() && !field.kind.is_ordered() {
            return Err(QueryError::UnsupportedOperator {
                field: name.to_string(),
                operator: format!("{op:?}").to_lowercase(),
            });
        }

        let value = FilterValue::parse(field.kind, name, raw)?;
        Ok(Self::new(name, op, value))
    }

    /// Array fields match when any element matches (all elements for `Ne`).
    pub fn matches(&self, doc: &Value) -> bool {
        match doc.get(&self.field) {
            None | Some(Value::Null) => self.op == ComparisonOp::Ne,
            Some(Value::Array(items)) if self.op == ComparisonOp::Ne => {
                items.iter().all(|item| self.test(item))
            }
            Some(Value::Array(items)) => items.iter().any(|item| self.test(item)),
            Some(scalar) => self.test(scalar),
        }
    }

    fn test(&self, stored: &Value) -> bool {
        match self.value.compare(stored) {
            Some(ord) => self.op.accepts(ord),
            None => self.op == ComparisonOp::Ne,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use serde_json::json;

    static SCHEMA: FieldSchema = FieldSchema::new(
        &[
            Field::number("price"),
            Field::text("difficulty"),
            Field::boolean("secret"),
            Field::date("startDates"),
            Field::id("tour"),
            Field::opaque("images"),
        ],
        &[],
    );

    #[test]
    fn plain_key_is_equality() {
        let f = Filter::parse("difficulty", "easy", &SCHEMA).unwrap();
        assert_eq!(f.op, ComparisonOp::Eq);
        assert!(f.matches(&json!({ "difficulty": "easy" })));
        assert!(!f.matches(&json!({ "difficulty": "medium" })));
    }

    #[test]
    fn bracketed_operator_compares_numbers() {
        let f = Filter::parse("price[gte]", "100", &SCHEMA).unwrap();
        assert!(f.matches(&json!({ "price": 100 })));
        assert!(f.matches(&json!({ "price": 250.5 })));
        assert!(!f.matches(&json!({ "price": 99.99 })));
        assert!(!f.matches(&json!({})));
    }

    #[test]
    fn rejects_unknown_fields_and_operators() {
        assert_eq!(
            Filter::parse("password", "x", &SCHEMA),
            Err(QueryError::UnknownField("password".into()))
        );
        assert!(matches!(
            Filter::parse("price[regex]", "1", &SCHEMA),
            Err(QueryError::UnsupportedOperator { .. })
        ));
        assert!(matches!(
            Filter::parse("secret[gt]", "true", &SCHEMA),
            Err(QueryError::UnsupportedOperator { .. })
        ));
        assert_eq!(
            Filter::parse("images", "a.jpg", &SCHEMA),
            Err(QueryError::NotQueryable("images".into()))
        );
    }

    #[test]
    fn operand_must_match_field_kind() {
        assert!(matches!(
            Filter::parse("price", "cheap", &SCHEMA),
            Err(QueryError::InvalidValue { .. })
        ));
        assert!(Filter::parse("tour", "not-a-uuid", &SCHEMA).is_err());
    }

    #[test]
    fn array_fields_match_any_element() {
        let f = Filter::parse("startDates[gte]", "2025-06-01", &SCHEMA).unwrap();
        let doc = json!({ "startDates": ["2025-01-10T09:00:00Z", "2025-07-01T09:00:00Z"] });
        assert!(f.matches(&doc));
        let f = Filter::parse("startDates[gte]", "2026-01-01", &SCHEMA).unwrap();
        assert!(!f.matches(&doc));
    }

    #[test]
    fn not_equal_scope_keeps_missing_and_different_values() {
        let f = Filter::ne("secret", FilterValue::Bool(true));
        assert!(f.matches(&json!({ "secret": false })));
        assert!(f.matches(&json!({})));
        assert!(!f.matches(&json!({ "secret": true })));
    }

    #[test]
    fn id_filter_compares_uuids() {
        let id = Uuid::now_v7();
        let f = Filter::parse("tour", &id.to_string(), &SCHEMA).unwrap();
        assert!(f.matches(&json!({ "tour": id.to_string() })));
        assert!(!f.matches(&json!({ "tour": Uuid::now_v7().to_string() })));
    }
}
