//! SurrealDB implementation of [`ResourceStore`] for any managed kind.

use std::marker::PhantomData;

use provctl_core::error::ProvResult;
use provctl_core::models::resource::Resource;
use provctl_core::repository::ResourceStore;
use serde::Deserialize;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;

use crate::error::DbError;

/// Store-level policy, passed in explicitly at construction.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StoreOptions {
    /// At most one descriptor per kind carries the default flag: saving a
    /// default descriptor clears the flag on every other one.
    pub exclusive_default: bool,
}

#[derive(Debug, SurrealValue)]
struct ResourceRow {
    name: String,
    spec: serde_json::Value,
}

impl ResourceRow {
    fn decode<R: Resource>(self) -> Result<R, DbError> {
        serde_json::from_value(self.spec)
            .map_err(|e| DbError::Decode(format!("{} {}: {e}", R::KIND, self.name)))
    }
}

/// SurrealDB-backed store for one resource kind, one table per kind.
///
/// The record key is the descriptor name, so saving is a keyed upsert and
/// uniqueness is enforced by the database.
#[derive(Clone)]
pub struct SurrealResourceStore<C: Connection, R: Resource> {
    db: Surreal<C>,
    options: StoreOptions,
    _kind: PhantomData<fn() -> R>,
}

impl<C: Connection, R: Resource> SurrealResourceStore<C, R> {
    pub fn new(db: Surreal<C>) -> Self {
        Self::with_options(db, StoreOptions::default())
    }

    pub fn with_options(db: Surreal<C>, options: StoreOptions) -> Self {
        Self {
            db,
            options,
            _kind: PhantomData,
        }
    }

    /// The descriptor called `name`.
    pub async fn get(&self, name: &str) -> ProvResult<R> {
        let mut result = self
            .db
            .query("SELECT name, spec FROM type::record($table, $name)")
            .bind(("table", R::KIND.as_str()))
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: R::KIND.to_string(),
            name: name.to_string(),
        })?;

        Ok(row.decode()?)
    }
}

impl<C: Connection, R: Resource> ResourceStore<R> for SurrealResourceStore<C, R> {
    async fn save(&self, resource: R) -> ProvResult<()> {
        let name = resource.name().to_string();
        let is_default = resource.is_default();
        let spec = serde_json::to_value(&resource)
            .map_err(|e| DbError::Decode(format!("{} {name}: {e}", R::KIND)))?;

        let upsert = "UPSERT type::record($table, $name) SET \
                      name = $name, spec = $spec, \
                      is_default = $is_default, \
                      updated_at = time::now();";

        let query = if self.options.exclusive_default && is_default {
            debug!(kind = %R::KIND, name = %name, "Demoting previous default");
            format!(
                "BEGIN TRANSACTION; \
                 UPDATE type::table($table) \
                 SET is_default = false, spec.default = false \
                 WHERE is_default = true AND name != $name; \
                 {upsert} \
                 COMMIT TRANSACTION;"
            )
        } else {
            upsert.to_string()
        };

        self.db
            .query(query)
            .bind(("table", R::KIND.as_str()))
            .bind(("name", name))
            .bind(("spec", spec))
            .bind(("is_default", is_default))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_all(&self) -> ProvResult<Vec<R>> {
        let mut result = self
            .db
            .query("SELECT name, spec FROM type::table($table) ORDER BY name ASC")
            .bind(("table", R::KIND.as_str()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;

        let items = rows
            .into_iter()
            .map(ResourceRow::decode)
            .collect::<Result<Vec<R>, DbError>>()?;

        Ok(items)
    }

    async fn delete(&self, name: &str) -> ProvResult<()> {
        let mut result = self
            .db
            .query("DELETE type::record($table, $name) RETURN BEFORE")
            .bind(("table", R::KIND.as_str()))
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let removed: Vec<ResourceRow> = result.take(0).map_err(DbError::from)?;
        if removed.is_empty() {
            return Err(DbError::NotFound {
                entity: R::KIND.to_string(),
                name: name.to_string(),
            }
            .into());
        }

        Ok(())
    }
}
