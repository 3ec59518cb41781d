use crate::errors::{AppError, AppResult};
use crate::naming::FieldSuffix;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Choices of every status column, in display order, with their colors.
pub const STATUS_CHOICES: [(&str, &str); 3] = [
    ("Planting", "yellowDark1"),
    ("Growing", "greenBright"),
    ("Harvesting", "purpleDark1"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    SingleSelect,
    MultilineText,
}

impl FieldKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleSelect => "singleSelect",
            Self::MultilineText => "multilineText",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectChoice {
    pub name: String,
    pub color: String,
}

/// Kind of a column together with the options that kind takes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldSpec {
    SingleSelect { choices: Vec<SelectChoice> },
    MultilineText,
}

impl FieldSpec {
    pub fn kind(&self) -> FieldKind {
        match self {
            Self::SingleSelect { .. } => FieldKind::SingleSelect,
            Self::MultilineText => FieldKind::MultilineText,
        }
    }

    pub fn status() -> Self {
        Self::SingleSelect {
            choices: STATUS_CHOICES
                .iter()
                .map(|(name, color)| SelectChoice {
                    name: (*name).to_string(),
                    color: (*color).to_string(),
                })
                .collect(),
        }
    }

    pub fn comments() -> Self {
        Self::MultilineText
    }

    pub fn for_suffix(suffix: FieldSuffix) -> Self {
        match suffix {
            FieldSuffix::Status => Self::status(),
            FieldSuffix::Comments => Self::comments(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableHandle {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldHandle {
    pub id: String,
    pub table_id: String,
    pub name: String,
    pub spec: FieldSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordHandle {
    pub id: String,
    pub table_id: String,
    pub name: String,
}

/// One row of the metrics table as seen by the synchronizer. `record_id` is
/// the host storage key; `id` is the metric identifier read from the id column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricRecord {
    pub record_id: String,
    pub name: String,
    pub id: Option<String>,
}

impl MetricRecord {
    pub fn new(record_id: impl Into<String>, name: impl Into<String>, id: Option<&str>) -> Self {
        Self {
            record_id: record_id.into(),
            name: name.into(),
            id: id.map(ToString::to_string),
        }
    }

    /// The metric id, unless it is absent or blank.
    pub fn metric_id(&self) -> Option<&str> {
        self.id.as_deref().filter(|id| !id.trim().is_empty())
    }
}

/// Reads a metric id out of a raw cell value. Text is taken as-is and numbers
/// are rendered in decimal, whole floats without a fraction; anything else
/// counts as no id.
pub fn metric_id_from_cell(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(text) => Some(text.clone()),
        serde_json::Value::Number(number) => Some(render_number(number)),
        _ => None,
    }
}

fn render_number(number: &serde_json::Number) -> String {
    if let Some(integer) = number.as_i64() {
        return integer.to_string();
    }
    if let Some(integer) = number.as_u64() {
        return integer.to_string();
    }
    // f64 Display drops a zero fraction: 7.0 prints as "7".
    match number.as_f64() {
        Some(float) => float.to_string(),
        None => number.to_string(),
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingIdPolicy {
    /// Leave the record out of the run and report it.
    #[default]
    Skip,
    /// Refuse to start the run.
    Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
    pub metrics_table: String,
    pub target_table: String,
    pub id_column: String,
    pub missing_id_policy: MissingIdPolicy,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            metrics_table: "Metrics".to_string(),
            target_table: "Check-In Form".to_string(),
            id_column: "Id".to_string(),
            missing_id_policy: MissingIdPolicy::Skip,
        }
    }
}

impl SyncSettings {
    pub fn from_yaml_str(raw: &str) -> AppResult<Self> {
        let settings: Self = serde_yaml::from_str(raw)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> AppResult<()> {
        let named = [
            ("metricsTable", &self.metrics_table),
            ("targetTable", &self.target_table),
            ("idColumn", &self.id_column),
        ];
        for (key, value) in named {
            if value.trim().is_empty() {
                return Err(AppError::InvalidConfig(format!("{} cannot be empty", key)));
            }
        }
        if self.metrics_table == self.target_table {
            return Err(AppError::InvalidConfig(
                "metricsTable and targetTable must name different tables".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    pub record_id: String,
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub target_table: String,
    pub missing_status: usize,
    pub missing_comments: usize,
    pub created_fields: Vec<String>,
    pub skipped_records: Vec<SkippedRecord>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn is_noop(&self) -> bool {
        self.created_fields.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricCoverage {
    pub record_id: String,
    pub name: String,
    pub metric_id: Option<String>,
    pub has_status_field: bool,
    pub has_comments_field: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub metrics: Vec<MetricCoverage>,
    /// Per-metric columns whose metric id matches no current metric.
    pub orphaned_fields: Vec<String>,
}

impl CoverageReport {
    pub fn is_complete(&self) -> bool {
        self.metrics
            .iter()
            .filter(|metric| metric.metric_id.is_some())
            .all(|metric| metric.has_status_field && metric.has_comments_field)
    }

    pub fn metric_ids(&self) -> HashSet<&str> {
        self.metrics
            .iter()
            .filter_map(|metric| metric.metric_id.as_deref())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{
        metric_id_from_cell, FieldKind, FieldSpec, MetricRecord, MissingIdPolicy, SyncSettings,
    };
    use crate::naming::FieldSuffix;

    #[test]
    fn status_spec_has_fixed_choices_in_order() {
        let FieldSpec::SingleSelect { choices } = FieldSpec::for_suffix(FieldSuffix::Status) else {
            panic!("status fields are single select");
        };
        let names = choices.iter().map(|choice| choice.name.as_str()).collect::<Vec<_>>();
        assert_eq!(names, vec!["Planting", "Growing", "Harvesting"]);
        assert_eq!(choices[1].color, "greenBright");
    }

    #[test]
    fn comments_spec_is_plain_multiline_text() {
        let spec = FieldSpec::for_suffix(FieldSuffix::Comments);
        assert_eq!(spec, FieldSpec::MultilineText);
        assert_eq!(spec.kind(), FieldKind::MultilineText);
        assert_eq!(spec.kind().as_str(), "multilineText");
    }

    #[test]
    fn field_spec_serializes_with_type_tag() {
        let value = serde_json::to_value(FieldSpec::status()).expect("serialize spec");
        assert_eq!(value["type"], "singleSelect");
        assert_eq!(value["choices"][2]["color"], "purpleDark1");
    }

    #[test]
    fn blank_ids_count_as_missing() {
        assert_eq!(MetricRecord::new("rec1", "Revenue", Some("m1")).metric_id(), Some("m1"));
        assert_eq!(MetricRecord::new("rec2", "Churn", Some("  ")).metric_id(), None);
        assert_eq!(MetricRecord::new("rec3", "NPS", None).metric_id(), None);
    }

    #[test]
    fn reads_ids_from_text_and_number_cells() {
        assert_eq!(metric_id_from_cell(Some(&serde_json::json!("m1"))), Some("m1".to_string()));
        assert_eq!(metric_id_from_cell(Some(&serde_json::json!(42))), Some("42".to_string()));
        assert_eq!(metric_id_from_cell(Some(&serde_json::json!(7.0))), Some("7".to_string()));
        assert_eq!(metric_id_from_cell(Some(&serde_json::json!(2.5))), Some("2.5".to_string()));
        assert_eq!(metric_id_from_cell(Some(&serde_json::Value::Null)), None);
        assert_eq!(metric_id_from_cell(Some(&serde_json::json!(["m1"]))), None);
        assert_eq!(metric_id_from_cell(None), None);
    }

    #[test]
    fn settings_fill_defaults_from_partial_yaml() {
        let settings = SyncSettings::from_yaml_str("targetTable: Weekly Check-In\nmissingIdPolicy: fail\n")
            .expect("parse settings");
        assert_eq!(settings.metrics_table, "Metrics");
        assert_eq!(settings.target_table, "Weekly Check-In");
        assert_eq!(settings.id_column, "Id");
        assert_eq!(settings.missing_id_policy, MissingIdPolicy::Fail);
    }

    #[test]
    fn settings_reject_blank_and_identical_tables() {
        let err = SyncSettings::from_yaml_str("idColumn: ' '\n").expect_err("blank id column");
        assert_eq!(err.code(), "INVALID_CONFIG");

        let err = SyncSettings::from_yaml_str("metricsTable: Metrics\ntargetTable: Metrics\n")
            .expect_err("same table twice");
        assert!(err.to_string().contains("different tables"));

        let err = SyncSettings::from_yaml_str("missingIdPolicy: explode\n").expect_err("unknown policy");
        assert_eq!(err.code(), "INVALID_CONFIG");
    }
}
