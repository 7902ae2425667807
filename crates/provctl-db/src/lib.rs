//! provctl database: SurrealDB connection management, schema
//! migrations, and the resource and audit event stores.
//!
//! This crate provides:
//! - Connecting and migrating ([`connect`], [`DbConfig`])
//! - Schema migrations ([`run_migrations`])
//! - A keyed upsert store per resource kind ([`SurrealResourceStore`])
//! - The audit event store ([`SurrealAuditEventRepository`])

mod connection;
mod error;
pub mod repository;
mod schema;

pub use connection::{DbConfig, connect};
pub use error::DbError;
pub use repository::{StoreOptions, SurrealAuditEventRepository, SurrealResourceStore};
pub use schema::run_migrations;
