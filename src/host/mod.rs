pub mod memory;

use crate::errors::AppResult;
use crate::models::{FieldHandle, FieldSpec, RecordHandle, TableHandle};
use std::collections::BTreeSet;
use std::future::Future;

/// Table storage of the platform the synchronizer runs inside.
///
/// `create_field` must fail with `AppError::DuplicateField` when the table
/// already has a column of that name rather than succeed silently.
pub trait TableHost: Send + Sync {
    fn table(&self, name: &str) -> impl Future<Output = AppResult<TableHandle>> + Send;

    /// Names of every column of `table` as committed right now.
    fn field_names(&self, table: &TableHandle) -> impl Future<Output = AppResult<BTreeSet<String>>> + Send;

    fn create_field(
        &self,
        table: &TableHandle,
        name: &str,
        spec: FieldSpec,
    ) -> impl Future<Output = AppResult<FieldHandle>> + Send;

    fn records(&self, table: &TableHandle) -> impl Future<Output = AppResult<Vec<RecordHandle>>> + Send;

    fn cell_value(
        &self,
        record: &RecordHandle,
        column: &str,
    ) -> impl Future<Output = AppResult<Option<serde_json::Value>>> + Send;
}
