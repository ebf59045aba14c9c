//! # Task Service
//!
//! HTTP API for personal task management.
//!
//! Authenticated users create, read, update, delete, and paginate their own
//! tasks. Requests carry a bearer token issued by the external user service;
//! the token is verified here with a shared secret, and every repository
//! operation is scoped to the verified caller, so one user can never see or
//! touch another user's tasks.
//!
//! ## Request flow
//! 1. `Authorization: Bearer <jwt>` verified by the auth middleware
//! 2. Payload validated into a sanitized field set
//! 3. Owner-scoped repository operation inside a single transaction
//! 4. JSON response (or a structured error at whichever stage failed)
//!
//! ## Modules
//! - `api`: HTTP routes, JWT auth middleware, task handlers
//! - `store`: SQLite-backed task repository
//! - `validate`: payload validation for create/update
//! - `metrics`: request counters exported at `/metrics`

pub mod api;
pub mod config;
pub mod error;
pub mod metrics;
pub mod store;
pub mod task;
pub mod validate;

pub use config::Config;
