//! SurrealDB repository implementations.

mod audit_event;
mod resource;

pub use audit_event::SurrealAuditEventRepository;
pub use resource::{StoreOptions, SurrealResourceStore};
