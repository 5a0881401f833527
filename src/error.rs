//! Error taxonomy for the ETL run. Every variant is fatal for the run.

use std::{fmt, path::PathBuf};

use arrow::error::ArrowError;
use thiserror::Error;

/// How many individual validation failures are spelled out in the message.
const SHOWN_FAILURES: usize = 10;

#[derive(Error, Debug)]
pub enum EtlError {
    /// Missing or unusable connection parameter.
    #[error("configuration error: {0}")]
    Config(String),

    /// Datastore unreachable or authentication refused.
    #[error("connection to database `{database}` failed: {source}")]
    Connection {
        database: String,
        #[source]
        source: sqlx::Error,
    },

    /// DDL failure, e.g. insufficient privilege.
    #[error("provisioning step `{step}` failed: {source}")]
    Provisioning {
        step: &'static str,
        #[source]
        source: sqlx::Error,
    },

    /// Input file missing or not parseable as CSV.
    #[error("cannot read {}: {source}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Input file parsed but its header row is unusable.
    #[error("malformed input {}: {reason}", path.display())]
    MalformedFile { path: PathBuf, reason: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Assembling the typed batch failed.
    #[error("transform failed: {0}")]
    Transform(#[from] ArrowError),

    /// The upsert was rejected; nothing from the batch was committed.
    #[error("loading {rows} rows failed: {source}")]
    Load {
        rows: usize,
        #[source]
        source: sqlx::Error,
    },
}

/// One reason the batch was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    MissingColumn(String),
    InvalidValue {
        column: String,
        /// 1-based data record number (the header is not counted).
        record: usize,
        value: String,
        expected: String,
    },
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationFailure::MissingColumn(name) => write!(f, "missing column `{}`", name),
            ValidationFailure::InvalidValue {
                column,
                record,
                value,
                expected,
            } => write!(
                f,
                "record {}: `{}` = {:?}, expected {}",
                record, column, value, expected
            ),
        }
    }
}

/// Whole-batch rejection carrying every failure found.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub failures: Vec<ValidationFailure>,
}

impl ValidationError {
    pub fn missing_columns(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().filter_map(|f| match f {
            ValidationFailure::MissingColumn(name) => Some(name.as_str()),
            _ => None,
        })
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "validation failed with {} problem(s)", self.failures.len())?;
        for failure in self.failures.iter().take(SHOWN_FAILURES) {
            write!(f, "; {}", failure)?;
        }
        if self.failures.len() > SHOWN_FAILURES {
            write!(f, "; and {} more", self.failures.len() - SHOWN_FAILURES)?;
        }
        Ok(())
    }
}
