//! Integration tests for schema initialization using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::Mem;

async fn fresh_db() -> Surreal<surrealdb::engine::local::Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    db
}

#[tokio::test]
async fn schema_migration_applies_successfully() {
    let db = fresh_db().await;

    provctl_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("INFO FOR DB").await.unwrap();
    let info: Option<surrealdb_types::Value> = result.take(0).unwrap();
    let info = info.expect("INFO FOR DB should return a value");
    let info_str = format!("{:?}", info);

    assert!(info_str.contains("cluster"), "missing cluster table");
    assert!(info_str.contains("pool"), "missing pool table");
    assert!(info_str.contains("audit_event"), "missing audit_event table");
    assert!(info_str.contains("audit_lock"), "missing audit_lock table");
    assert!(info_str.contains("_migration"), "missing _migration table");
}

#[tokio::test]
async fn migration_is_idempotent() {
    let db = fresh_db().await;

    provctl_db::run_migrations(&db).await.unwrap();
    provctl_db::run_migrations(&db).await.unwrap();

    let mut result = db.query("SELECT * FROM _migration").await.unwrap();
    let records: Vec<surrealdb_types::Value> = result.take(0).unwrap();
    assert_eq!(records.len(), 2, "expected one record per migration");
}

#[tokio::test]
async fn empty_cluster_name_is_rejected() {
    let db = fresh_db().await;
    provctl_db::run_migrations(&db).await.unwrap();

    let result = db
        .query("CREATE cluster SET name = '', spec = {}")
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "empty name should be rejected");
}

#[tokio::test]
async fn audit_event_owner_type_is_constrained() {
    let db = fresh_db().await;
    provctl_db::run_migrations(&db).await.unwrap();

    let result = db
        .query(
            "CREATE audit_event SET \
             target_kind = 'cluster', target_value = 'c1', \
             kind = 'cluster.update', owner_type = 'Robot', \
             owner_name = 'r2', allowed = 'cluster.read.events'",
        )
        .await
        .unwrap()
        .check();

    assert!(result.is_err(), "unknown owner type should be rejected");
}
