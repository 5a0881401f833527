pub mod provision;
pub mod upsert;

use arrow::record_batch::RecordBatch;
use sqlx::{
    postgres::{PgConnectOptions, PgConnection},
    Connection,
};
use tracing::{debug, info, warn};

use crate::config::{DbConfig, ADMIN_DATABASE};
use crate::error::EtlError;
use crate::pipeline::Warehouse;

/// Open one connection to `database`.
pub async fn connect(options: &PgConnectOptions, database: &str) -> Result<PgConnection, EtlError> {
    let conn = PgConnection::connect_with(options)
        .await
        .map_err(|source| EtlError::Connection {
            database: database.to_string(),
            source,
        })?;
    debug!(database, "connected");
    Ok(conn)
}

/// Close a connection, whether or not the work done on it succeeded.
/// A failed close is logged; it never masks the work's own outcome.
pub async fn release(conn: PgConnection, database: &str) {
    match conn.close().await {
        Ok(()) => debug!(database, "connection closed"),
        Err(e) => warn!(database, error = %e, "closing connection failed"),
    }
}

/// PostgreSQL-backed [`Warehouse`]. Each call opens its own connection and
/// releases it before returning.
#[derive(Debug, Clone)]
pub struct PgWarehouse {
    config: DbConfig,
}

impl PgWarehouse {
    pub fn new(config: DbConfig) -> Self {
        Self { config }
    }
}

impl Warehouse for PgWarehouse {
    async fn provision(&mut self) -> Result<(), EtlError> {
        let db = &self.config.name;

        let mut admin = connect(&self.config.admin_options(), ADMIN_DATABASE).await?;
        let created = provision::ensure_database(&mut admin, db).await;
        release(admin, ADMIN_DATABASE).await;
        if created? {
            info!(database = %db, "database created");
        } else {
            info!(database = %db, "database already exists");
        }

        let mut conn = connect(&self.config.target_options(), db).await?;
        let outcome = async {
            provision::ensure_schema(&mut conn).await?;
            provision::ensure_table(&mut conn).await
        }
        .await;
        release(conn, db).await;
        outcome
    }

    async fn upsert(&mut self, batch: &RecordBatch) -> Result<u64, EtlError> {
        let db = &self.config.name;
        let mut conn = connect(&self.config.target_options(), db).await?;
        let outcome = upsert::upsert_batch(&mut conn, batch).await;
        release(conn, db).await;
        outcome
    }
}
