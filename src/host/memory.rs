use super::TableHost;
use crate::errors::{AppError, AppResult};
use crate::models::{FieldHandle, FieldSpec, RecordHandle, TableHandle};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Debug)]
struct MemoryTable {
    handle: TableHandle,
    fields: Vec<FieldHandle>,
    records: Vec<RecordHandle>,
}

#[derive(Debug, Default)]
struct MemoryState {
    tables: Vec<MemoryTable>,
    cells: HashMap<String, BTreeMap<String, serde_json::Value>>,
    creation_calls: Vec<String>,
    injected_failures: HashMap<String, AppError>,
    racing_fields: HashSet<String>,
}

impl MemoryState {
    fn table(&self, table: &TableHandle) -> AppResult<&MemoryTable> {
        self.tables
            .iter()
            .find(|entry| entry.handle.id == table.id)
            .ok_or_else(|| AppError::NotFound(format!("Table '{}' does not exist", table.name)))
    }

    fn table_mut(&mut self, table: &TableHandle) -> AppResult<&mut MemoryTable> {
        self.tables
            .iter_mut()
            .find(|entry| entry.handle.id == table.id)
            .ok_or_else(|| AppError::NotFound(format!("Table '{}' does not exist", table.name)))
    }
}

/// Host kept entirely in process memory. Every `create_field` call is logged,
/// including calls that fail, and failures can be injected per field name.
#[derive(Clone, Default)]
pub struct InMemoryHost {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_table(&self, name: &str) -> TableHandle {
        let handle = TableHandle {
            id: format!("tbl{}", Uuid::new_v4().simple()),
            name: name.to_string(),
        };
        let mut state = self.state.lock().await;
        state.tables.push(MemoryTable {
            handle: handle.clone(),
            fields: Vec::new(),
            records: Vec::new(),
        });
        handle
    }

    /// Adds a column without going through `create_field`, so it is not logged.
    pub async fn add_field(&self, table: &TableHandle, name: &str, spec: FieldSpec) -> AppResult<FieldHandle> {
        let mut state = self.state.lock().await;
        insert_field(state.table_mut(table)?, name, spec)
    }

    pub async fn add_record(
        &self,
        table: &TableHandle,
        name: &str,
        cells: serde_json::Value,
    ) -> AppResult<RecordHandle> {
        let serde_json::Value::Object(cells) = cells else {
            return Err(AppError::Internal("record cells must be a JSON object".to_string()));
        };
        let record = RecordHandle {
            id: format!("rec{}", Uuid::new_v4().simple()),
            table_id: table.id.clone(),
            name: name.to_string(),
        };

        let mut state = self.state.lock().await;
        state.table_mut(table)?.records.push(record.clone());
        state.cells.insert(record.id.clone(), cells.into_iter().collect());
        Ok(record)
    }

    /// Makes the next `create_field` call for `field_name` fail with `error`.
    pub async fn fail_creation_of(&self, field_name: &str, error: AppError) {
        let mut state = self.state.lock().await;
        state.injected_failures.insert(field_name.to_string(), error);
    }

    /// Lets another writer add `field_name` just before the next `create_field`
    /// call for it lands, so that call hits a real duplicate.
    pub async fn race_creation_of(&self, field_name: &str) {
        let mut state = self.state.lock().await;
        state.racing_fields.insert(field_name.to_string());
    }

    pub async fn creation_calls(&self) -> Vec<String> {
        self.state.lock().await.creation_calls.clone()
    }

    pub async fn clear_creation_calls(&self) {
        self.state.lock().await.creation_calls.clear();
    }

    pub async fn fields(&self, table: &TableHandle) -> AppResult<Vec<FieldHandle>> {
        let state = self.state.lock().await;
        Ok(state.table(table)?.fields.clone())
    }
}

fn insert_field(table: &mut MemoryTable, name: &str, spec: FieldSpec) -> AppResult<FieldHandle> {
    let handle = &table.handle;
    if table.fields.iter().any(|field| field.name == name) {
        return Err(AppError::DuplicateField(format!(
            "Table '{}' already has a field named '{}'",
            handle.name, name
        )));
    }

    let field = FieldHandle {
        id: format!("fld{}", Uuid::new_v4().simple()),
        table_id: handle.id.clone(),
        name: name.to_string(),
        spec,
    };
    table.fields.push(field.clone());
    Ok(field)
}

impl TableHost for InMemoryHost {
    async fn table(&self, name: &str) -> AppResult<TableHandle> {
        let state = self.state.lock().await;
        state
            .tables
            .iter()
            .map(|entry| &entry.handle)
            .find(|handle| handle.name == name)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Table '{}' does not exist", name)))
    }

    async fn field_names(&self, table: &TableHandle) -> AppResult<BTreeSet<String>> {
        let state = self.state.lock().await;
        Ok(state
            .table(table)?
            .fields
            .iter()
            .map(|field| field.name.clone())
            .collect())
    }

    async fn create_field(&self, table: &TableHandle, name: &str, spec: FieldSpec) -> AppResult<FieldHandle> {
        let mut state = self.state.lock().await;
        state.creation_calls.push(name.to_string());
        if let Some(error) = state.injected_failures.remove(name) {
            return Err(error);
        }
        let racing = state.racing_fields.remove(name);
        let target = state.table_mut(table)?;
        if racing {
            insert_field(target, name, spec.clone())?;
        }
        insert_field(target, name, spec)
    }

    async fn records(&self, table: &TableHandle) -> AppResult<Vec<RecordHandle>> {
        let state = self.state.lock().await;
        Ok(state.table(table)?.records.clone())
    }

    async fn cell_value(&self, record: &RecordHandle, column: &str) -> AppResult<Option<serde_json::Value>> {
        let state = self.state.lock().await;
        let cells = state
            .cells
            .get(&record.id)
            .ok_or_else(|| AppError::NotFound(format!("Record '{}' does not exist", record.id)))?;
        Ok(cells.get(column).cloned())
    }
}
