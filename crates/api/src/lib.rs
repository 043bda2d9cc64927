//! HTTP adapter: request context, route guards, token endpoints.

pub mod app;
pub mod authz;
pub mod config;
pub mod middleware;
