use sqlx::postgres::PgConnection;
use tracing::info;

use crate::error::EtlError;
use crate::process::columns::{qualified_table, TARGET_SCHEMA};

/// Quote an identifier for interpolation into DDL.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Create `name` unless it already exists. Must run on the administrative
/// database. Returns whether the database was created.
pub async fn ensure_database(admin: &mut PgConnection, name: &str) -> Result<bool, EtlError> {
    let step = |source: sqlx::Error| EtlError::Provisioning {
        step: "create database",
        source,
    };

    let exists: Option<i32> = sqlx::query_scalar("SELECT 1 FROM pg_database WHERE datname = $1")
        .bind(name)
        .fetch_optional(&mut *admin)
        .await
        .map_err(step)?;
    if exists.is_some() {
        return Ok(false);
    }

    // CREATE DATABASE cannot run inside a transaction or be parameterized
    let ddl = format!("CREATE DATABASE {}", quote_ident(name));
    sqlx::raw_sql(&ddl)
        .execute(&mut *admin)
        .await
        .map_err(step)?;
    Ok(true)
}

pub async fn ensure_schema(conn: &mut PgConnection) -> Result<(), EtlError> {
    let ddl = schema_ddl();
    sqlx::raw_sql(&ddl)
        .execute(&mut *conn)
        .await
        .map_err(|source| EtlError::Provisioning {
            step: "create schema",
            source,
        })?;
    info!(schema = TARGET_SCHEMA, "schema ensured");
    Ok(())
}

pub async fn ensure_table(conn: &mut PgConnection) -> Result<(), EtlError> {
    let ddl = table_ddl();
    sqlx::raw_sql(&ddl)
        .execute(&mut *conn)
        .await
        .map_err(|source| EtlError::Provisioning {
            step: "create table",
            source,
        })?;
    info!(table = %qualified_table(), "table ensured");
    Ok(())
}

fn schema_ddl() -> String {
    format!("CREATE SCHEMA IF NOT EXISTS {}", TARGET_SCHEMA)
}

fn table_ddl() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id INTEGER PRIMARY KEY,
            warehouse_block VARCHAR(50),
            mode_of_shipment VARCHAR(50),
            customer_care_calls INTEGER,
            customer_rating INTEGER CHECK (customer_rating BETWEEN 1 AND 5),
            cost_of_the_product INTEGER,
            prior_purchases INTEGER,
            product_importance VARCHAR(50),
            gender VARCHAR(50),
            discount_offered INTEGER,
            weight_in_gms INTEGER,
            reached_on_time INTEGER CHECK (reached_on_time IN (0, 1)),
            created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        )",
        qualified_table()
    )
}
