use anyhow::{Context, Result};
use chrono::Local;
use shipment_etl::{db::PgWarehouse, DbConfig, Pipeline};
use std::path::Path;
use tracing::{error, info};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Input file, read from the working directory.
const INPUT_CSV: &str = "shipments.csv";

/// Log to stderr and to a per-run `etl_log_<timestamp>.log` file.
/// The returned guard flushes the file writer when dropped.
fn init_logging(log_dir: &Path) -> Result<WorkerGuard> {
    let file_name = format!("etl_log_{}", Local::now().format("%Y%m%d_%H%M%S"));
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(&file_name)
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("creating log file {}.log", file_name))?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::registry()
        .with(env_filter())
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();
    Ok(guard)
}

/// `RUST_LOG` if set, else `info`.
fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    // `.env` may set RUST_LOG, so it is read before the filter is built.
    let dotenv_result = dotenv::dotenv();
    let _guard = init_logging(Path::new("."))?;
    info!("startup");

    // ─── 2) configuration ────────────────────────────────────────────
    if let Err(e) = dotenv_result {
        info!("no .env file loaded: {}", e);
    }
    let config = match DbConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "ETL process failed");
            return Err(e).context("reading database configuration");
        }
    };
    info!(host = %config.host, port = config.port, database = %config.name, "configuration loaded");

    // ─── 3) run ──────────────────────────────────────────────────────
    let mut pipeline = Pipeline::new(PgWarehouse::new(config), INPUT_CSV);
    let report = pipeline.run().await?;
    info!(
        loaded = report.loaded,
        extracted = report.extracted,
        "all done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn rust_log_from_dotenv_reaches_the_filter() -> Result<()> {
        let mut env_file = tempfile::NamedTempFile::new()?;
        writeln!(env_file, "RUST_LOG=shipment_etl=debug")?;
        std::env::remove_var("RUST_LOG");

        dotenv::from_path(env_file.path())?;
        let filter = env_filter();

        assert_eq!(filter.to_string(), "shipment_etl=debug");
        std::env::remove_var("RUST_LOG");
        Ok(())
    }
}
