//! provctl API: the audited-mutation gateway and its HTTP boundary.

pub mod audit;
pub mod classify;
pub mod form;
pub mod gateway;
pub mod http;

pub use audit::{AuditSession, Auditor};
pub use classify::{Failure, Reply, ResultCode, classify};
pub use form::{BindError, FormInput};
pub use gateway::{EventGateway, EventQuery, ResourceGateway};
pub use http::{ApiState, Caller, router};
