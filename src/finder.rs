use crate::naming::{field_name, FieldSuffix};
use std::collections::{BTreeSet, HashSet};

/// Metric ids that have no `{id}{suffix}` column in `existing_field_names`.
///
/// Ids come back in order of first occurrence, each once. Ids are not checked
/// for well-formedness here.
pub fn find_missing<S: AsRef<str>>(
    metric_ids: &[S],
    existing_field_names: &BTreeSet<String>,
    suffix: FieldSuffix,
) -> Vec<String> {
    let mut seen = HashSet::new();
    metric_ids
        .iter()
        .map(AsRef::<str>::as_ref)
        .filter(|metric_id| seen.insert(*metric_id))
        .filter(|metric_id| !existing_field_names.contains(&field_name(metric_id, suffix)))
        .map(ToString::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRequest {
    pub metric_id: String,
    pub suffix: FieldSuffix,
    pub field_name: String,
}

/// Missing columns of one sync run, computed from a single snapshot of the
/// target table's field names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncPlan {
    pub missing_status: Vec<String>,
    pub missing_comments: Vec<String>,
}

impl SyncPlan {
    pub fn build<S: AsRef<str>>(metric_ids: &[S], existing_field_names: &BTreeSet<String>) -> Self {
        Self {
            missing_status: find_missing(metric_ids, existing_field_names, FieldSuffix::Status),
            missing_comments: find_missing(metric_ids, existing_field_names, FieldSuffix::Comments),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.missing_status.is_empty() && self.missing_comments.is_empty()
    }

    pub fn missing(&self, suffix: FieldSuffix) -> &[String] {
        match suffix {
            FieldSuffix::Status => &self.missing_status,
            FieldSuffix::Comments => &self.missing_comments,
        }
    }

    /// Creation requests in metric order, status before comments for the same
    /// metric. A repeated metric id produces its requests once.
    pub fn requests<S: AsRef<str>>(&self, metric_ids: &[S]) -> Vec<FieldRequest> {
        let status: HashSet<&str> = self.missing_status.iter().map(String::as_str).collect();
        let comments: HashSet<&str> = self.missing_comments.iter().map(String::as_str).collect();
        let mut emitted = HashSet::new();
        let mut requests = Vec::new();

        for metric_id in metric_ids.iter().map(AsRef::<str>::as_ref) {
            if !emitted.insert(metric_id) {
                continue;
            }
            for suffix in FieldSuffix::ALL {
                let missing = match suffix {
                    FieldSuffix::Status => &status,
                    FieldSuffix::Comments => &comments,
                };
                if missing.contains(metric_id) {
                    requests.push(FieldRequest {
                        metric_id: metric_id.to_string(),
                        suffix,
                        field_name: field_name(metric_id, suffix),
                    });
                }
            }
        }

        requests
    }
}
