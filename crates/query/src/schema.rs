//! Per-resource field allow-lists.

use serde_json::Value;

/// How a field's values are typed, compared and ordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    Text,
    Bool,
    /// RFC 3339 timestamps (dates without a time are accepted in filters).
    Date,
    /// Document identifiers.
    Id,
    /// Selectable but never filtered or sorted on (nested objects, image lists).
    Opaque,
}

impl FieldKind {
    pub fn is_queryable(&self) -> bool {
        !matches!(self, Self::Opaque)
    }

    /// Whether range operators (`gt`, `gte`, `lt`, `lte`) make sense.
    pub fn is_ordered(&self) -> bool {
        matches!(self, Self::Number | Self::Date | Self::Text)
    }

    pub fn describe(&self) -> &'static str {
        match self {
            Self::Number => "a number",
            Self::Text => "text",
            Self::Bool => "true or false",
            Self::Date => "a date",
            Self::Id => "an identifier",
            Self::Opaque => "a document",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn number(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Number }
    }

    pub const fn text(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Text }
    }

    pub const fn boolean(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Bool }
    }

    pub const fn date(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Date }
    }

    pub const fn id(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Id }
    }

    pub const fn opaque(name: &'static str) -> Self {
        Self { name, kind: FieldKind::Opaque }
    }
}

/// The fields a client may filter, sort and select on, plus the stored fields
/// that must never leave the server.
#[derive(Debug)]
pub struct FieldSchema {
    fields: &'static [Field],
    hidden: &'static [&'static str],
}

impl FieldSchema {
    pub const fn new(fields: &'static [Field], hidden: &'static [&'static str]) -> Self {
        Self { fields, hidden }
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn fields(&self) -> &[Field] {
        self.fields
    }

    /// Remove hidden fields from a document in place.
    pub fn redact(&self, doc: &mut Value) {
        if let Value::Object(map) = doc {
            for name in self.hidden {
                map.remove(*name);
            }
        }
    }
}
