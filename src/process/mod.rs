// src/process/mod.rs
pub mod columns;
pub mod convert;
pub mod raw_table;
pub mod utils;
pub mod validate;

use csv::ReaderBuilder;
use std::{collections::HashSet, path::Path};
use tracing::{debug, info};

use crate::error::EtlError;
pub use convert::{transform, TransformOutput};
pub use raw_table::RawTable;
pub use validate::validate;

/// Read a comma-delimited UTF-8 file with a header row into a [`RawTable`].
///
/// Purely structural: cells are kept verbatim. Fails when the file is
/// missing, not UTF-8, ragged, or its header has blank/duplicate names.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn extract_csv<P: AsRef<Path>>(path: P) -> Result<RawTable, EtlError> {
    let path = path.as_ref();
    let file_err = |source: csv::Error| EtlError::File {
        path: path.to_path_buf(),
        source,
    };
    let malformed = |reason: String| EtlError::MalformedFile {
        path: path.to_path_buf(),
        reason,
    };

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(file_err)?;

    let headers: Vec<String> = rdr
        .headers()
        .map_err(file_err)?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    if headers.is_empty() {
        return Err(malformed("no header row".into()));
    }
    let mut seen = HashSet::with_capacity(headers.len());
    for (i, h) in headers.iter().enumerate() {
        if h.is_empty() {
            return Err(malformed(format!("header column {} is blank", i + 1)));
        }
        if !seen.insert(h.as_str()) {
            return Err(malformed(format!("duplicate header `{}`", h)));
        }
    }

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(file_err)?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }
    debug!(columns = headers.len(), "parsed header");
    info!(rows = rows.len(), "extracted records");

    Ok(RawTable { headers, rows })
}
