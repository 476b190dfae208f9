//! HTTP API: configuration, routing, middleware and page rendering.

pub mod app;
pub mod config;
pub mod context;
pub mod middleware;
