//! provctl core: domain models, errors, and the collaborator traits the
//! audited-mutation gateway is written against.

pub mod authz;
pub mod error;
pub mod models;
pub mod repository;

pub use authz::Authorizer;
pub use error::{ProvError, ProvResult};
