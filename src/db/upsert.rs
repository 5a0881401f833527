use arrow::{
    array::{Array, Int32Array, StringArray},
    error::ArrowError,
    record_batch::RecordBatch,
};
use sqlx::{postgres::PgConnection, Connection, Postgres, QueryBuilder};
use std::ops::Range;
use tracing::{debug, info};

use crate::error::EtlError;
use crate::process::columns::{qualified_table, PRIMARY_KEY};

/// PostgreSQL caps a single statement at this many bind parameters.
const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// Borrowed, downcast view of one batch column.
enum Cells<'a> {
    Int(&'a Int32Array),
    Text(&'a StringArray),
}

/// Rows that fit in one statement for a table of `columns` columns.
pub fn rows_per_statement(columns: usize) -> usize {
    (MAX_BIND_PARAMS / columns.max(1)).max(1)
}

/// Upsert every row of `batch`, overwriting existing rows with the same key.
///
/// Large batches are split only as far as the bind-parameter cap requires,
/// and every statement runs in one transaction: if any row is rejected,
/// nothing is committed. Returns the number of rows inserted or updated.
#[tracing::instrument(level = "info", skip_all, fields(rows = batch.num_rows()))]
pub async fn upsert_batch(conn: &mut PgConnection, batch: &RecordBatch) -> Result<u64, EtlError> {
    let rows = batch.num_rows();
    if rows == 0 {
        info!("no records to load");
        return Ok(0);
    }

    let names: Vec<&str> = batch
        .schema_ref()
        .fields()
        .iter()
        .map(|f| f.name().as_str())
        .collect();
    let cells = typed_columns(batch)?;
    let load_err = |source: sqlx::Error| EtlError::Load { rows, source };

    let mut affected = 0;
    let mut tx = conn.begin().await.map_err(load_err)?;
    for range in statement_ranges(rows, cells.len()) {
        let (start, end) = (range.start, range.end);
        let mut qb = build_upsert(&names, &cells, range);
        let result = qb.build().execute(&mut *tx).await.map_err(load_err)?;
        affected += result.rows_affected();
        debug!(start, end, "statement executed");
    }
    tx.commit().await.map_err(load_err)?;

    info!(rows, affected, "successfully loaded records");
    Ok(affected)
}

/// Row ranges for the statements of one load, in order, covering `0..rows`.
fn statement_ranges(rows: usize, columns: usize) -> impl Iterator<Item = Range<usize>> {
    let chunk = rows_per_statement(columns);
    (0..rows)
        .step_by(chunk)
        .map(move |start| start..(start + chunk).min(rows))
}

fn typed_columns(batch: &RecordBatch) -> Result<Vec<Cells<'_>>, EtlError> {
    batch
        .columns()
        .iter()
        .zip(batch.schema_ref().fields())
        .map(|(arr, field)| {
            if let Some(a) = arr.as_any().downcast_ref::<Int32Array>() {
                Ok(Cells::Int(a))
            } else if let Some(a) = arr.as_any().downcast_ref::<StringArray>() {
                Ok(Cells::Text(a))
            } else {
                Err(EtlError::Transform(ArrowError::InvalidArgumentError(format!(
                    "column `{}` has unsupported type {}",
                    field.name(),
                    field.data_type()
                ))))
            }
        })
        .collect()
}

fn build_upsert(
    names: &[&str],
    cells: &[Cells<'_>],
    rows: Range<usize>,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new(format!(
        "INSERT INTO {} ({}) ",
        qualified_table(),
        names.join(", ")
    ));

    qb.push_values(rows, |mut b, row| {
        for col in cells {
            match col {
                Cells::Int(a) => {
                    b.push_bind((!a.is_null(row)).then(|| a.value(row)));
                }
                Cells::Text(a) => {
                    b.push_bind((!a.is_null(row)).then(|| a.value(row).to_string()));
                }
            }
        }
    });

    let updates: Vec<String> = names
        .iter()
        .filter(|n| **n != PRIMARY_KEY)
        .map(|n| format!("{0} = EXCLUDED.{0}", n))
        .collect();
    qb.push(format!(
        " ON CONFLICT ({}) DO UPDATE SET {}",
        PRIMARY_KEY,
        updates.join(", ")
    ));
    qb
}
