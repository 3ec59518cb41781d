//! The `{metric id}{suffix}` naming convention that ties a metric to its
//! check-in columns. There is no stored link between the two tables; these two
//! functions are the only place the convention is spelled out.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FieldSuffix {
    Status,
    Comments,
}

impl FieldSuffix {
    /// Creation order within a single metric.
    pub const ALL: [FieldSuffix; 2] = [FieldSuffix::Status, FieldSuffix::Comments];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Status => "_status",
            Self::Comments => "_comments",
        }
    }
}

pub fn field_name(metric_id: &str, suffix: FieldSuffix) -> String {
    format!("{}{}", metric_id, suffix.as_str())
}

/// Splits a column name back into its metric id and suffix. Columns that do not
/// follow the convention, or that are a bare suffix, yield `None`.
pub fn parse_field_name(name: &str) -> Option<(&str, FieldSuffix)> {
    FieldSuffix::ALL.into_iter().find_map(|suffix| {
        name.strip_suffix(suffix.as_str())
            .filter(|metric_id| !metric_id.is_empty())
            .map(|metric_id| (metric_id, suffix))
    })
}

#[cfg(test)]
mod tests {
    use super::{field_name, parse_field_name, FieldSuffix};

    #[test]
    fn builds_suffixed_names() {
        assert_eq!(field_name("m1", FieldSuffix::Status), "m1_status");
        assert_eq!(field_name("m1", FieldSuffix::Comments), "m1_comments");
        assert_eq!(field_name("", FieldSuffix::Status), "_status");
    }

    #[test]
    fn parses_names_built_by_field_name() {
        for suffix in FieldSuffix::ALL {
            let name = field_name("revenue_q1", suffix);
            assert_eq!(parse_field_name(&name), Some(("revenue_q1", suffix)));
        }
    }

    #[test]
    fn ignores_unrelated_columns() {
        assert_eq!(parse_field_name("Name"), None);
        assert_eq!(parse_field_name("_status"), None);
        assert_eq!(parse_field_name("m1_Status"), None);
    }

    #[test]
    fn suffix_inside_id_is_kept_with_the_id() {
        assert_eq!(
            parse_field_name("a_status_comments"),
            Some(("a_status", FieldSuffix::Comments))
        );
    }
}
