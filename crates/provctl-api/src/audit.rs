//! Audit sessions: one audit event spanning one state-changing operation.
//!
//! An event is opened after authorization and before the side effect,
//! then finished exactly once with the outcome the caller sees.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use provctl_core::error::{ProvError, ProvResult};
use provctl_core::models::audit::CreateAuditEvent;
use provctl_core::repository::AuditEventRepository;
use tokio::runtime::Handle;
use tracing::{debug, error, warn};
use uuid::Uuid;

const ABANDONED: &str = "operation abandoned before completion";
const PANICKED: &str = "operation panicked";

/// The error recorded and surfaced for a panicked operation.
pub(crate) fn panic_error(payload: &(dyn Any + Send)) -> ProvError {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".into());
    ProvError::Internal(format!("{PANICKED}: {message}"))
}

/// Opens audit sessions against an event store.
pub struct Auditor<E> {
    events: Arc<E>,
}

impl<E> Clone for Auditor<E> {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
        }
    }
}

impl<E: AuditEventRepository + 'static> Auditor<E> {
    pub fn new(events: Arc<E>) -> Self {
        Self { events }
    }

    pub async fn open(&self, input: CreateAuditEvent) -> ProvResult<AuditSession<E>> {
        let event = self.events.open(input).await?;
        debug!(
            event_id = %event.id,
            target = %event.target.value,
            kind = %event.kind,
            "Audit session opened"
        );
        Ok(AuditSession {
            event_id: event.id,
            events: Arc::clone(&self.events),
            closed: false,
        })
    }

    /// Run `op` inside an audit session.
    ///
    /// The session is finished with `op`'s outcome on return. A panic is
    /// recorded and then resumed; cancellation is left to the session's
    /// `Drop`. Nothing runs when the session cannot be opened.
    pub async fn audited<T, F>(&self, input: CreateAuditEvent, op: F) -> ProvResult<T>
    where
        F: Future<Output = ProvResult<T>> + Send,
    {
        let session = self.open(input).await?;
        match AssertUnwindSafe(op).catch_unwind().await {
            Ok(result) => {
                session
                    .close(result.as_ref().err().map(ToString::to_string))
                    .await;
                result
            }
            Err(payload) => {
                session
                    .close(Some(panic_error(&*payload).to_string()))
                    .await;
                std::panic::resume_unwind(payload)
            }
        }
    }
}

/// A running audit event.
///
/// Finished by [`close`](Self::close). If dropped while still open the
/// event is finished in the background on the current tokio runtime.
pub struct AuditSession<E: AuditEventRepository + 'static> {
    event_id: Uuid,
    events: Arc<E>,
    closed: bool,
}

impl<E: AuditEventRepository + 'static> AuditSession<E> {
    /// Finish the event with `error` (`None` for success).
    ///
    /// A failure here is logged, not returned: the operation it records
    /// has already happened.
    pub async fn close(mut self, error: Option<String>) {
        self.closed = true;
        let failed = error.is_some();
        match self.events.finish(self.event_id, error).await {
            Ok(_) => debug!(event_id = %self.event_id, failed, "Audit session closed"),
            Err(e) => error!(
                event_id = %self.event_id,
                error = %e,
                "Failed to close audit event"
            ),
        }
    }
}

impl<E: AuditEventRepository + 'static> Drop for AuditSession<E> {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        let reason = if std::thread::panicking() {
            PANICKED
        } else {
            ABANDONED
        };
        let event_id = self.event_id;
        let Ok(handle) = Handle::try_current() else {
            error!(event_id = %event_id, reason, "Audit event left open: no runtime");
            return;
        };
        warn!(event_id = %event_id, reason, "Closing abandoned audit session");
        let events = Arc::clone(&self.events);
        handle.spawn(async move {
            if let Err(e) = events.finish(event_id, Some(reason.to_string())).await {
                error!(event_id = %event_id, error = %e, "Failed to close audit event");
            }
        });
    }
}
