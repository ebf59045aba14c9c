//! HTTP API surface.

pub mod auth;
pub mod routes;
pub mod tasks;
