//! Opening the server's SurrealDB connection.

use serde::Deserialize;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema::run_migrations;

/// The `[database]` section of the server configuration.
///
/// Every field has a default so a local development server needs no
/// section at all.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Host and port of the SurrealDB WebSocket endpoint.
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials. Cluster and pool tables are created on first
    /// start, which needs schema rights.
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "provctl".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

/// Open a client whose schema is current.
///
/// The cluster, pool and audit tables are migrated before the client is
/// returned, so the stores built on it never see an older schema.
pub async fn connect(config: &DbConfig) -> Result<Surreal<Client>, DbError> {
    info!(
        url = %config.url,
        namespace = %config.namespace,
        database = %config.database,
        "Opening provisioner store"
    );

    let db = Surreal::new::<Ws>(&config.url).await?;
    db.signin(Root {
        username: config.username.clone(),
        password: config.password.clone(),
    })
    .await?;
    db.use_ns(&config.namespace)
        .use_db(&config.database)
        .await?;

    run_migrations(&db).await?;
    info!("Provisioner store ready");

    Ok(db)
}
