//! Fixed-order run: provision, extract, validate, transform, load.
//!
//! Any failing phase moves the run straight to [`Phase::Failed`]; there are
//! no retries and nothing after the failing phase executes.

use std::{fmt, path::PathBuf};

use arrow::record_batch::RecordBatch;
use thiserror::Error;
use tracing::{error, info};

use crate::error::EtlError;
use crate::process::{self, TransformOutput};

/// The datastore the pipeline provisions and loads into.
#[allow(async_fn_in_trait)]
pub trait Warehouse {
    /// Ensure database, schema and table exist. Idempotent.
    async fn provision(&mut self) -> Result<(), EtlError>;
    /// Insert-or-overwrite every row by primary key. Returns rows affected.
    async fn upsert(&mut self, batch: &RecordBatch) -> Result<u64, EtlError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Provision,
    Extract,
    Validate,
    Transform,
    Load,
    Done,
    Failed,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Provision => "provision",
            Phase::Extract => "extract",
            Phase::Validate => "validate",
            Phase::Transform => "transform",
            Phase::Load => "load",
            Phase::Done => "done",
            Phase::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The phase that failed and why.
#[derive(Error, Debug)]
#[error("ETL process failed during {phase}: {source}")]
pub struct PipelineFailure {
    pub phase: Phase,
    #[source]
    pub source: EtlError,
}

/// Counts from a successful run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunReport {
    pub extracted: usize,
    pub loaded: u64,
    pub duplicates_dropped: usize,
    pub keyless_dropped: usize,
}

pub struct Pipeline<W> {
    warehouse: W,
    input: PathBuf,
    phase: Phase,
}

impl<W: Warehouse> Pipeline<W> {
    pub fn new(warehouse: W, input: impl Into<PathBuf>) -> Self {
        Self {
            warehouse,
            input: input.into(),
            phase: Phase::Provision,
        }
    }

    /// Phase the pipeline is in, or finished in.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }

    pub async fn run(&mut self) -> Result<RunReport, PipelineFailure> {
        match self.run_phases().await {
            Ok(report) => {
                self.enter(Phase::Done);
                info!(?report, "ETL process completed successfully");
                Ok(report)
            }
            Err(source) => {
                let phase = self.phase;
                self.phase = Phase::Failed;
                error!(%phase, error = %source, "ETL process failed");
                Err(PipelineFailure { phase, source })
            }
        }
    }

    async fn run_phases(&mut self) -> Result<RunReport, EtlError> {
        self.enter(Phase::Provision);
        self.warehouse.provision().await?;

        self.enter(Phase::Extract);
        let raw = process::extract_csv(&self.input)?;
        info!(rows = raw.len(), "data extracted from CSV");

        self.enter(Phase::Validate);
        process::validate(&raw)?;

        self.enter(Phase::Transform);
        let TransformOutput {
            batch,
            duplicates_dropped,
            keyless_dropped,
            ..
        } = process::transform(&raw)?;

        self.enter(Phase::Load);
        let loaded = self.warehouse.upsert(&batch).await?;

        Ok(RunReport {
            extracted: raw.len(),
            loaded,
            duplicates_dropped,
            keyless_dropped,
        })
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        info!(%phase, "entering phase");
    }
}
