//! SurrealDB implementation of [`AuditEventRepository`].

use chrono::{DateTime, Utc};
use provctl_core::error::ProvResult;
use provctl_core::models::audit::{ActorType, AuditEvent, CreateAuditEvent, Owner, Target};
use provctl_core::models::resource::ResourceKind;
use provctl_core::repository::{
    AuditEventFilter, AuditEventRepository, PaginatedResult, Pagination,
};
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct AuditEventRow {
    record_id: String,
    target_kind: String,
    target_value: String,
    kind: String,
    owner_type: String,
    owner_name: String,
    custom_data: serde_json::Value,
    allowed: String,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
    running: bool,
    error: Option<String>,
}

impl AuditEventRow {
    fn try_into_event(self) -> Result<AuditEvent, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Decode(format!("invalid event UUID: {e}")))?;
        let kind = ResourceKind::parse(&self.target_kind)
            .ok_or_else(|| DbError::Decode(format!("invalid target kind: {}", self.target_kind)))?;
        let actor_type = ActorType::parse(&self.owner_type)
            .ok_or_else(|| DbError::Decode(format!("invalid owner type: {}", self.owner_type)))?;
        Ok(AuditEvent {
            id,
            target: Target {
                kind,
                value: self.target_value,
            },
            kind: self.kind,
            owner: Owner {
                actor_type,
                name: self.owner_name,
            },
            custom_data: self.custom_data,
            allowed: self.allowed,
            start_time: self.start_time,
            end_time: self.end_time,
            running: self.running,
            error: self.error,
        })
    }
}

/// The target of an event closed by `finish`.
#[derive(Debug, SurrealValue)]
struct FinishedRow {
    target_kind: String,
    target_value: String,
}

#[derive(Debug, SurrealValue)]
struct LockRow {
    event_id: String,
}

#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

fn lock_key(kind: &str, value: &str) -> String {
    format!("{kind}/{value}")
}

/// Errors SurrealDB reports when two transactions race for one lock record.
fn is_lock_race(message: &str) -> bool {
    message.contains("already exists")
        || message.contains("failed transaction")
        || message.contains("conflict")
}

/// SurrealDB implementation of the audit event repository.
///
/// A running event holds an `audit_lock` record for its target until it
/// is finished, so at most one audited operation runs per target.
#[derive(Clone)]
pub struct SurrealAuditEventRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealAuditEventRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }

    /// The event currently holding the lock on `key`, if any.
    async fn lock_holder(&self, key: &str) -> Result<Option<String>, DbError> {
        let mut held = self
            .db
            .query("SELECT event_id FROM type::record('audit_lock', $key)")
            .bind(("key", key.to_string()))
            .await?;
        let locks: Vec<LockRow> = held.take(0)?;
        Ok(locks.into_iter().next().map(|lock| lock.event_id))
    }
}

impl<C: Connection> AuditEventRepository for SurrealAuditEventRepository<C> {
    async fn open(&self, input: CreateAuditEvent) -> ProvResult<AuditEvent> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();
        let target_kind = input.target.kind;
        let target_value = input.target.value.clone();
        let key = lock_key(target_kind.as_str(), &target_value);

        // The lock CREATE fails when the target is busy, and the event
        // rolls back with it.
        let sent = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 CREATE type::record('audit_lock', $key) SET event_id = $id; \
                 CREATE type::record('audit_event', $id) SET \
                 target_kind = $target_kind, \
                 target_value = $target_value, \
                 kind = $kind, \
                 owner_type = $owner_type, \
                 owner_name = $owner_name, \
                 custom_data = $custom_data, \
                 allowed = $allowed, \
                 running = true; \
                 COMMIT TRANSACTION;",
            )
            .bind(("key", key.clone()))
            .bind(("id", id_str))
            .bind(("target_kind", target_kind.as_str()))
            .bind(("target_value", input.target.value))
            .bind(("kind", input.kind))
            .bind(("owner_type", input.owner.actor_type.as_str()))
            .bind(("owner_name", input.owner.name))
            .bind(("custom_data", input.custom_data))
            .bind(("allowed", input.allowed))
            .await;

        if let Err(e) = sent.and_then(|response| response.check()) {
            let message = e.to_string();
            let holder = self.lock_holder(&key).await?;
            return Err(match holder {
                Some(event_id) => DbError::Conflict(format!(
                    "event locked: {target_kind} {target_value} is busy with event {event_id}"
                )),
                // The winner of a race may already have finished.
                None if is_lock_race(&message) => DbError::Conflict(format!(
                    "event locked: {target_kind} {target_value} is busy"
                )),
                None => DbError::Query(message),
            }
            .into());
        }

        debug!(event_id = %id, "Audit event opened");

        self.get_by_id(id).await
    }

    async fn finish(&self, id: Uuid, error: Option<String>) -> ProvResult<AuditEvent> {
        let id_str = id.to_string();

        // Closing the event and releasing its lock commit together.
        let mut result = self
            .db
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE type::record('audit_event', $id) SET \
                 running = false, end_time = time::now(), error = $error \
                 WHERE running = true RETURN target_kind, target_value; \
                 DELETE audit_lock WHERE event_id = $id; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id_str))
            .bind(("error", error))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let finished: Vec<FinishedRow> = result.take(0).map_err(DbError::from)?;
        let Some(row) = finished.into_iter().next() else {
            // Either missing (NotFound) or already finished.
            self.get_by_id(id).await?;
            return Err(DbError::Conflict(format!("event {id} is already finished")).into());
        };

        debug!(
            event_id = %id,
            target = %lock_key(&row.target_kind, &row.target_value),
            "Audit event finished, lock released"
        );

        self.get_by_id(id).await
    }

    async fn get_by_id(&self, id: Uuid) -> ProvResult<AuditEvent> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT meta::id(id) AS record_id, * FROM type::record('audit_event', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<AuditEventRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "event".into(),
            name: id_str,
        })?;

        Ok(row.try_into_event()?)
    }

    async fn list(
        &self,
        filter: AuditEventFilter,
        pagination: Pagination,
    ) -> ProvResult<PaginatedResult<AuditEvent>> {
        let mut conditions = Vec::new();
        if filter.target_kind.is_some() {
            conditions.push("target_kind = $target_kind");
        }
        if filter.target_value.is_some() {
            conditions.push("target_value = $target_value");
        }
        if filter.kind.is_some() {
            conditions.push("kind = $kind");
        }
        if filter.running.is_some() {
            conditions.push("running = $running");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        // Statement 0 is the count, statement 1 the page.
        let query = format!(
            "SELECT count() AS total FROM audit_event{where_clause} GROUP ALL; \
             SELECT meta::id(id) AS record_id, * FROM audit_event{where_clause} \
             ORDER BY start_time DESC \
             LIMIT $limit START $offset;"
        );

        let mut builder = self
            .db
            .query(query)
            .bind(("limit", pagination.limit))
            .bind(("offset", pagination.offset));

        if let Some(kind) = filter.target_kind {
            builder = builder.bind(("target_kind", kind.as_str()));
        }
        if let Some(value) = filter.target_value {
            builder = builder.bind(("target_value", value));
        }
        if let Some(kind) = filter.kind {
            builder = builder.bind(("kind", kind));
        }
        if let Some(running) = filter.running {
            builder = builder.bind(("running", running));
        }

        let mut result = builder.await.map_err(DbError::from)?;

        let count_rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        let rows: Vec<AuditEventRow> = result.take(1).map_err(DbError::from)?;
        let items = rows
            .into_iter()
            .map(AuditEventRow::try_into_event)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(PaginatedResult {
            items,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }
}
