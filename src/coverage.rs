use crate::models::{CoverageReport, MetricCoverage, MetricRecord};
use crate::naming::{field_name, parse_field_name, FieldSuffix};
use std::collections::{BTreeSet, HashSet};

/// Per-metric "has status field" / "has comments field" flags, using the same
/// name match as the synchronizer. Per-metric columns whose id no longer
/// matches a metric are listed as orphaned; nothing acts on them.
pub fn build_coverage(records: &[MetricRecord], existing_field_names: &BTreeSet<String>) -> CoverageReport {
    let metrics = records
        .iter()
        .map(|record| {
            let metric_id = record.metric_id();
            let has = |suffix: FieldSuffix| {
                metric_id.is_some_and(|id| existing_field_names.contains(&field_name(id, suffix)))
            };
            MetricCoverage {
                record_id: record.record_id.clone(),
                name: record.name.clone(),
                metric_id: metric_id.map(ToString::to_string),
                has_status_field: has(FieldSuffix::Status),
                has_comments_field: has(FieldSuffix::Comments),
            }
        })
        .collect::<Vec<_>>();

    let known: HashSet<&str> = records.iter().filter_map(MetricRecord::metric_id).collect();
    let orphaned_fields = existing_field_names
        .iter()
        .filter(|name| matches!(parse_field_name(name), Some((metric_id, _)) if !known.contains(metric_id)))
        .cloned()
        .collect();

    CoverageReport {
        metrics,
        orphaned_fields,
    }
}
