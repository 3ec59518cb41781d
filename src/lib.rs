pub mod coverage;
pub mod db;
pub mod errors;
pub mod finder;
pub mod host;
pub mod models;
pub mod naming;
pub mod synchronizer;

pub use crate::coverage::build_coverage;
pub use crate::db::SqliteHost;
pub use crate::errors::{AppError, AppResult};
pub use crate::finder::{find_missing, FieldRequest, SyncPlan};
pub use crate::host::memory::InMemoryHost;
pub use crate::host::TableHost;
pub use crate::models::{
    CoverageReport, FieldHandle, FieldKind, FieldSpec, MetricCoverage, MetricRecord, MissingIdPolicy,
    RecordHandle, SelectChoice, SkippedRecord, SyncReport, SyncSettings, TableHandle, STATUS_CHOICES,
};
pub use crate::naming::{field_name, parse_field_name, FieldSuffix};
pub use crate::synchronizer::FieldSynchronizer;

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Sends JSON logs to a daily file under `{data_dir}/logs`. The level comes from
/// `RUST_LOG` and defaults to `info`. Meant to be called once by the embedding
/// application; later calls fail without replacing the installed subscriber.
pub fn init_tracing(data_dir: &Path) -> AppResult<()> {
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "metric-field-sync.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| AppError::Internal(error.to_string()))
}
