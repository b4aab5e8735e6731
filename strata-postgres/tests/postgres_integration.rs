//! Round trip against a live PostgreSQL server.
//!
//! Runs only when `STRATA_TEST_DATABASE_URL` points at a disposable database.

use std::sync::Arc;

use strata_migrate::{
    IntrospectionConfig, MigrationConfig, MigrationEngine, MigrationError,
    MigrationHistoryRepository, introspect_schema,
};
use strata_postgres::{PgConfig, PgConnection, PgIntrospector, PgMigrationStore};
use strata_schema::{Column, ForeignKey, Index, Schema, Table};

async fn connect() -> Option<Arc<PgConnection>> {
    let url = std::env::var("STRATA_TEST_DATABASE_URL").ok()?;
    let config = PgConfig::from_url(url).unwrap();
    Some(Arc::new(PgConnection::connect(&config).await.unwrap()))
}

fn target() -> Schema {
    Schema::from_tables([
        Table::new("strata_it_users")
            .column(Column::new("id", "int").primary_key().auto_increment())
            .column(Column::new("email", "varchar").size(320).not_null().unique()),
        Table::new("strata_it_orders")
            .column(Column::new("id", "int").primary_key().auto_increment())
            .column(Column::new("user_id", "int").not_null())
            .column(Column::new("code", "varchar").size(32).not_null())
            .index(Index::new("uq_strata_it_orders_code", ["code"]).unique())
            .foreign_key(ForeignKey::new("user_id", "strata_it_users")),
    ])
    .unwrap()
}

#[tokio::test]
async fn test_generate_apply_introspect_rollback() {
    let Some(conn) = connect().await else {
        return;
    };
    conn.batch_execute(
        "DROP TABLE IF EXISTS strata_it_orders, strata_it_users, strata_it_migrations CASCADE",
    )
    .await
    .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let store = PgMigrationStore::with_table(conn.clone(), "strata_it_migrations");
    let engine = MigrationEngine::new(MigrationConfig::new().migrations_dir(dir.path()), store);
    engine.initialize().await.unwrap();

    let introspection = IntrospectionConfig::new().exclude_table("strata_it_migrations");
    let introspector = PgIntrospector::new(conn.clone());

    let before = introspect_schema(&introspector, &introspection).await.unwrap();
    engine
        .create_migration("create_orders", &before, &target())
        .await
        .unwrap();
    assert_eq!(engine.migrate().await.unwrap().migrations.len(), 1);

    let after = introspect_schema(&introspector, &introspection).await.unwrap();
    let plan = engine.plan(&after, &target());
    assert!(matches!(plan, Err(MigrationError::NoChanges)));

    engine.rollback(1).await.unwrap();
    assert!(engine.history().get_applied().await.unwrap().is_empty());
}
