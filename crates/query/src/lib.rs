//! `tourbook-query`: turns HTTP query parameters into list directives.
//!
//! A [`ListQuery`] is parsed against a per-resource [`FieldSchema`] allow-list
//! and then executed over JSON documents:
//!
//! - filters: `field=value` and `field[gte|gt|lte|lt]=value`
//! - pagination: `page` + `limit` (both required)
//! - sorting: `sort=-price,name`, default newest first
//! - projection: `fields=name,price` or `fields=-description`
//!
//! Execution always filters, then sorts, then paginates, then projects.

pub mod error;
pub mod exec;
pub mod filter;
pub mod plan;
pub mod schema;

pub use error::QueryError;
pub use filter::{ComparisonOp, Filter, FilterValue};
pub use plan::{ListQuery, Page, Projection, SortDirection, SortKey};
pub use schema::{Field, FieldKind, FieldSchema};
