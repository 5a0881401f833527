use crate::process::columns::{arrow_schema, ColumnDef, ColumnKind, KEY_COLUMN, SHIPMENT_COLUMNS};
use crate::process::raw_table::RawTable;
use crate::process::utils::{coerce_integer, present};
use arrow::{
    array::{ArrayRef, Int32Builder, StringBuilder},
    error::ArrowError,
    record_batch::RecordBatch,
};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, info, warn};

/// Typed batch ready for loading, plus what was dropped or coerced on the way.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub batch: RecordBatch,
    /// Earlier rows superseded by a later row with the same id.
    pub duplicates_dropped: usize,
    /// Rows whose id could not be coerced to an integer.
    pub keyless_dropped: usize,
    /// Integer cells that held a value but not a number.
    pub unparseable_cells: usize,
}

/// Rename, coerce and fill the raw rows into the target layout.
///
/// Never fails on cell contents: non-numeric integer cells become null (or the
/// column's fill value), missing text becomes null, and for repeated ids the
/// last row wins.
pub fn transform(table: &RawTable) -> Result<TransformOutput, ArrowError> {
    for h in &table.headers {
        if !SHIPMENT_COLUMNS.iter().any(|c| c.source == h.as_str()) {
            warn!(column = %h, "dropping unmapped column");
        }
    }

    let sources: Vec<Option<usize>> = SHIPMENT_COLUMNS
        .iter()
        .map(|c| table.column_index(c.source))
        .collect();

    let (kept, duplicates_dropped, keyless_dropped) = select_rows(table, sources[KEY_COLUMN]);

    let mut unparseable_cells = 0;
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(SHIPMENT_COLUMNS.len());
    for (col, source) in SHIPMENT_COLUMNS.iter().zip(&sources) {
        let cells = kept
            .iter()
            .map(|&r| source.and_then(|i| table.rows[r].get(i)).map(String::as_str));
        let array = match col.kind {
            ColumnKind::Integer => {
                let (array, bad) = integer_column(col, cells);
                unparseable_cells += bad;
                array
            }
            ColumnKind::Text => text_column(cells),
        };
        columns.push(array);
    }

    let batch = RecordBatch::try_new(Arc::new(arrow_schema()), columns)?;
    if duplicates_dropped > 0 {
        warn!(duplicates_dropped, "repeated ids collapsed, last row kept");
    }
    if keyless_dropped > 0 {
        warn!(keyless_dropped, "rows without a usable id dropped");
    }
    info!(
        rows = batch.num_rows(),
        unparseable_cells, "data transformation completed"
    );

    Ok(TransformOutput {
        batch,
        duplicates_dropped,
        keyless_dropped,
        unparseable_cells,
    })
}

/// Row indices to keep, in file order: the last row for each id.
fn select_rows(table: &RawTable, key_index: Option<usize>) -> (Vec<usize>, usize, usize) {
    let keys: Vec<Option<i32>> = table
        .rows
        .iter()
        .map(|row| key_index.and_then(|i| row.get(i)).and_then(|s| coerce_integer(s)))
        .collect();

    let mut last: HashMap<i32, usize> = HashMap::with_capacity(keys.len());
    for (row, key) in keys.iter().enumerate() {
        if let Some(k) = key {
            last.insert(*k, row);
        }
    }

    let keyless = keys.iter().filter(|k| k.is_none()).count();
    let kept: Vec<usize> = keys
        .iter()
        .enumerate()
        .filter(|(row, key)| matches!(key, Some(k) if last[k] == *row))
        .map(|(row, _)| row)
        .collect();
    let duplicates = table.len() - keyless - kept.len();
    debug!(kept = kept.len(), duplicates, keyless, "selected rows");

    (kept, duplicates, keyless)
}

fn integer_column<'a>(
    col: &ColumnDef,
    cells: impl Iterator<Item = Option<&'a str>>,
) -> (ArrayRef, usize) {
    let mut b = Int32Builder::new();
    let mut bad = 0;
    for cell in cells {
        let raw = cell.unwrap_or("");
        let v = coerce_integer(raw);
        if v.is_none() && present(raw).is_some() {
            bad += 1;
        }
        b.append_option(v.or(col.fill));
    }
    (Arc::new(b.finish()) as ArrayRef, bad)
}

fn text_column<'a>(cells: impl Iterator<Item = Option<&'a str>>) -> ArrayRef {
    let mut b = StringBuilder::new();
    for cell in cells {
        b.append_option(cell.and_then(present));
    }
    Arc::new(b.finish()) as ArrayRef
}
