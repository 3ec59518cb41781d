use crate::coverage::build_coverage;
use crate::errors::{AppError, AppResult};
use crate::finder::SyncPlan;
use crate::host::TableHost;
use crate::models::{
    metric_id_from_cell, CoverageReport, FieldSpec, MetricRecord, MissingIdPolicy, SkippedRecord, SyncReport,
    SyncSettings, TableHandle,
};
use chrono::Utc;
use std::sync::Arc;

/// Creates the status and comments columns that the check-in table is missing
/// for the current metrics. Runs are additive and strictly sequential; callers
/// must not run two syncs against the same table at once.
pub struct FieldSynchronizer<H> {
    host: Arc<H>,
    settings: SyncSettings,
}

impl<H: TableHost> FieldSynchronizer<H> {
    pub fn new(host: Arc<H>, settings: SyncSettings) -> AppResult<Self> {
        settings.validate()?;
        Ok(Self { host, settings })
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// Resolves both configured tables through the host and syncs the target
    /// against every record of the metrics table.
    pub async fn sync_tables(&self) -> AppResult<SyncReport> {
        let metrics_table = self.host.table(&self.settings.metrics_table).await?;
        let target_table = self.host.table(&self.settings.target_table).await?;
        let records = self.load_metric_records(&metrics_table).await?;
        self.sync(&records, &target_table).await
    }

    pub async fn load_metric_records(&self, metrics_table: &TableHandle) -> AppResult<Vec<MetricRecord>> {
        let records = self.host.records(metrics_table).await?;
        let mut metrics = Vec::with_capacity(records.len());
        for record in records {
            let cell = self.host.cell_value(&record, &self.settings.id_column).await?;
            metrics.push(MetricRecord {
                id: metric_id_from_cell(cell.as_ref()),
                record_id: record.id,
                name: record.name,
            });
        }
        Ok(metrics)
    }

    pub async fn sync(&self, records: &[MetricRecord], target_table: &TableHandle) -> AppResult<SyncReport> {
        let started_at = Utc::now();
        let (metric_ids, skipped_records) = self.identified_metrics(records)?;

        let existing = self.host.field_names(target_table).await?;
        let plan = SyncPlan::build(&metric_ids, &existing);
        tracing::info!(
            target_table = %target_table.name,
            metrics = metric_ids.len(),
            existing_fields = existing.len(),
            missing_status = plan.missing_status.len(),
            missing_comments = plan.missing_comments.len(),
            "planned metric field sync"
        );

        let mut created_fields = Vec::new();
        for request in plan.requests(&metric_ids) {
            tracing::debug!(
                target_table = %target_table.name,
                field = %request.field_name,
                metric_id = %request.metric_id,
                "creating metric field"
            );
            let spec = FieldSpec::for_suffix(request.suffix);
            if let Err(error) = self.host.create_field(target_table, &request.field_name, spec).await {
                tracing::warn!(
                    target_table = %target_table.name,
                    field = %request.field_name,
                    created = created_fields.len(),
                    error = %error,
                    "metric field sync aborted"
                );
                return Err(AppError::SyncAborted {
                    field: request.field_name,
                    created: created_fields,
                    source: Box::new(error),
                });
            }
            created_fields.push(request.field_name);
        }

        tracing::info!(
            target_table = %target_table.name,
            created = created_fields.len(),
            skipped = skipped_records.len(),
            "metric field sync finished"
        );

        Ok(SyncReport {
            target_table: target_table.name.clone(),
            missing_status: plan.missing_status.len(),
            missing_comments: plan.missing_comments.len(),
            created_fields,
            skipped_records,
            started_at,
            finished_at: Utc::now(),
        })
    }

    /// Which metrics have their columns, from a fresh read of both tables.
    pub async fn coverage(&self) -> AppResult<CoverageReport> {
        let metrics_table = self.host.table(&self.settings.metrics_table).await?;
        let target_table = self.host.table(&self.settings.target_table).await?;
        let records = self.load_metric_records(&metrics_table).await?;
        let existing = self.host.field_names(&target_table).await?;
        Ok(build_coverage(&records, &existing))
    }

    fn identified_metrics<'r>(
        &self,
        records: &'r [MetricRecord],
    ) -> AppResult<(Vec<&'r str>, Vec<SkippedRecord>)> {
        let mut metric_ids = Vec::with_capacity(records.len());
        let mut skipped = Vec::new();

        for record in records {
            if let Some(metric_id) = record.metric_id() {
                metric_ids.push(metric_id);
                continue;
            }
            match self.settings.missing_id_policy {
                MissingIdPolicy::Fail => {
                    return Err(AppError::MissingIdentifier(format!(
                        "Metric '{}' ({}) has no value in column '{}'",
                        record.name, record.record_id, self.settings.id_column
                    )));
                }
                MissingIdPolicy::Skip => {
                    tracing::warn!(
                        record_id = %record.record_id,
                        metric = %record.name,
                        "skipping metric without an id"
                    );
                    skipped.push(SkippedRecord {
                        record_id: record.record_id.clone(),
                        name: record.name.clone(),
                        reason: format!("no value in column '{}'", self.settings.id_column),
                    });
                }
            }
        }

        Ok((metric_ids, skipped))
    }
}
