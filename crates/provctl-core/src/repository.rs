//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Implementations own their own
//! concurrency control: uniqueness of resource names and single
//! finishing of audit events are enforced by the store, not by callers.

use uuid::Uuid;

use crate::error::ProvResult;
use crate::models::audit::{AuditEvent, CreateAuditEvent};
use crate::models::resource::{Resource, ResourceKind};

/// Pagination parameters for list queries.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub offset: u64,
    pub limit: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 50,
        }
    }
}

/// A paginated result set.
#[derive(Debug, Clone)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

// ---------------------------------------------------------------------------
// Managed resources
// ---------------------------------------------------------------------------

pub trait ResourceStore<R: Resource>: Send + Sync {
    /// Create or fully replace the descriptor keyed by its name.
    fn save(&self, resource: R) -> impl Future<Output = ProvResult<()>> + Send;
    /// Every stored descriptor, ordered by name. An empty store yields an
    /// empty vector, not an error.
    fn list_all(&self) -> impl Future<Output = ProvResult<Vec<R>>> + Send;
    /// Fails with [`ProvError::NotFound`](crate::error::ProvError::NotFound)
    /// when no descriptor has this name.
    fn delete(&self, name: &str) -> impl Future<Output = ProvResult<()>> + Send;
}

// ---------------------------------------------------------------------------
// Audit events
// ---------------------------------------------------------------------------

/// Query filters for audit events.
#[derive(Debug, Clone, Default)]
pub struct AuditEventFilter {
    pub target_kind: Option<ResourceKind>,
    pub target_value: Option<String>,
    pub kind: Option<String>,
    pub running: Option<bool>,
}

pub trait AuditEventRepository: Send + Sync {
    /// Open a running event. Fails with a conflict while another running
    /// event holds the same target.
    fn open(&self, input: CreateAuditEvent)
    -> impl Future<Output = ProvResult<AuditEvent>> + Send;
    /// Finish a running event with its outcome and release its target.
    /// Finishing an event twice is a conflict.
    fn finish(
        &self,
        id: Uuid,
        error: Option<String>,
    ) -> impl Future<Output = ProvResult<AuditEvent>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = ProvResult<AuditEvent>> + Send;
    /// Newest first.
    fn list(
        &self,
        filter: AuditEventFilter,
        pagination: Pagination,
    ) -> impl Future<Output = ProvResult<PaginatedResult<AuditEvent>>> + Send;
}
