use crate::errors::{AppError, AppResult};
use crate::host::TableHost;
use crate::models::{FieldHandle, FieldSpec, RecordHandle, TableHandle};
use chrono::Utc;
use rusqlite::{ffi, params, Connection, OptionalExtension};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Host whose tables, columns and cells live in a single SQLite file. Column
/// names are unique per table at the storage level as well as in
/// `create_field`.
#[derive(Debug)]
pub struct SqliteHost {
    conn: Mutex<Connection>,
    db_path: Option<PathBuf>,
}

impl SqliteHost {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;
        tracing::debug!(path = %path.display(), "opened sqlite table host");

        Ok(Self {
            conn: Mutex::new(conn),
            db_path: Some(path.to_path_buf()),
        })
    }

    pub fn open_in_memory() -> AppResult<Self> {
        let conn = Connection::open_in_memory().map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;
        Ok(Self {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    fn conn(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Internal("database mutex poisoned".to_string()))
    }

    /// Returns the table called `name`, creating it first if needed.
    pub fn ensure_table(&self, name: &str) -> AppResult<TableHandle> {
        let conn = self.conn()?;
        if let Some(existing) = find_table(&conn, name)? {
            return Ok(existing);
        }

        let handle = TableHandle {
            id: format!("tbl{}", Uuid::new_v4().simple()),
            name: name.to_string(),
        };
        conn.execute(
            "INSERT INTO host_tables (id, name, created_at) VALUES (?1, ?2, ?3)",
            params![handle.id, handle.name, Utc::now().to_rfc3339()],
        )?;
        Ok(handle)
    }

    pub fn insert_record(
        &self,
        table: &TableHandle,
        name: &str,
        cells: &serde_json::Value,
    ) -> AppResult<RecordHandle> {
        let Some(cells) = cells.as_object() else {
            return Err(AppError::Internal("record cells must be a JSON object".to_string()));
        };
        let record = RecordHandle {
            id: format!("rec{}", Uuid::new_v4().simple()),
            table_id: table.id.clone(),
            name: name.to_string(),
        };

        let mut conn = self.conn()?;
        require_table(&conn, table)?;
        let tx = conn.transaction()?;
        let position: i64 = tx.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM host_records WHERE table_id = ?1",
            [&table.id],
            |row| row.get(0),
        )?;
        tx.execute(
            "INSERT INTO host_records (id, table_id, name, position, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![record.id, record.table_id, record.name, position, Utc::now().to_rfc3339()],
        )?;
        for (column, value) in cells {
            tx.execute(
                "INSERT INTO host_cells (record_id, column_name, value_json) VALUES (?1, ?2, ?3)",
                params![record.id, column, serde_json::to_string(value)?],
            )?;
        }
        tx.commit()?;

        Ok(record)
    }

    pub fn fields(&self, table: &TableHandle) -> AppResult<Vec<FieldHandle>> {
        let conn = self.conn()?;
        require_table(&conn, table)?;
        let mut statement = conn.prepare(
            "SELECT id, table_id, name, spec_json FROM host_fields WHERE table_id = ?1 ORDER BY position ASC",
        )?;
        let rows = statement.query_map([&table.id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut result = Vec::new();
        for row in rows {
            let (id, table_id, name, spec_json) = row?;
            result.push(FieldHandle {
                id,
                table_id,
                name,
                spec: serde_json::from_str::<FieldSpec>(&spec_json)?,
            });
        }
        Ok(result)
    }

    fn insert_field(&self, table: &TableHandle, name: &str, spec: FieldSpec) -> AppResult<FieldHandle> {
        let conn = self.conn()?;
        require_table(&conn, table)?;
        let exists = conn
            .query_row(
                "SELECT 1 FROM host_fields WHERE table_id = ?1 AND name = ?2",
                params![table.id, name],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if exists {
            return Err(duplicate_field(table, name));
        }

        let field = FieldHandle {
            id: format!("fld{}", Uuid::new_v4().simple()),
            table_id: table.id.clone(),
            name: name.to_string(),
            spec,
        };
        let spec_json = serde_json::to_string(&field.spec)?;
        conn.execute(
            "INSERT INTO host_fields (id, table_id, name, kind, spec_json, position, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5,
                     (SELECT COALESCE(MAX(position), -1) + 1 FROM host_fields WHERE table_id = ?2), ?6)",
            params![
                field.id,
                field.table_id,
                field.name,
                field.spec.kind().as_str(),
                spec_json,
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|err| match err {
            rusqlite::Error::SqliteFailure(failure, _) if failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE => {
                duplicate_field(table, name)
            }
            other => AppError::HostUnavailable(other.to_string()),
        })?;

        Ok(field)
    }
}

fn find_table(conn: &Connection, name: &str) -> AppResult<Option<TableHandle>> {
    let handle = conn
        .query_row(
            "SELECT id, name FROM host_tables WHERE name = ?1",
            [name],
            |row| {
                Ok(TableHandle {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            },
        )
        .optional()?;
    Ok(handle)
}

fn require_table(conn: &Connection, table: &TableHandle) -> AppResult<()> {
    let exists = conn
        .query_row("SELECT 1 FROM host_tables WHERE id = ?1", [&table.id], |_| Ok(()))
        .optional()?
        .is_some();
    if !exists {
        return Err(AppError::NotFound(format!("Table '{}' does not exist", table.name)));
    }
    Ok(())
}

fn require_record(conn: &Connection, record: &RecordHandle) -> AppResult<()> {
    let exists = conn
        .query_row("SELECT 1 FROM host_records WHERE id = ?1", [&record.id], |_| Ok(()))
        .optional()?
        .is_some();
    if !exists {
        return Err(AppError::NotFound(format!("Record '{}' does not exist", record.id)));
    }
    Ok(())
}

fn duplicate_field(table: &TableHandle, name: &str) -> AppError {
    AppError::DuplicateField(format!(
        "Table '{}' already has a field named '{}'",
        table.name, name
    ))
}

impl TableHost for SqliteHost {
    async fn table(&self, name: &str) -> AppResult<TableHandle> {
        let conn = self.conn()?;
        find_table(&conn, name)?.ok_or_else(|| AppError::NotFound(format!("Table '{}' does not exist", name)))
    }

    async fn field_names(&self, table: &TableHandle) -> AppResult<BTreeSet<String>> {
        let conn = self.conn()?;
        require_table(&conn, table)?;
        let mut statement = conn.prepare("SELECT name FROM host_fields WHERE table_id = ?1")?;
        let rows = statement.query_map([&table.id], |row| row.get::<_, String>(0))?;
        let mut names = BTreeSet::new();
        for row in rows {
            names.insert(row?);
        }
        Ok(names)
    }

    async fn create_field(&self, table: &TableHandle, name: &str, spec: FieldSpec) -> AppResult<FieldHandle> {
        self.insert_field(table, name, spec)
    }

    async fn records(&self, table: &TableHandle) -> AppResult<Vec<RecordHandle>> {
        let conn = self.conn()?;
        require_table(&conn, table)?;
        let mut statement = conn.prepare(
            "SELECT id, table_id, name FROM host_records WHERE table_id = ?1 ORDER BY position ASC",
        )?;
        let rows = statement.query_map([&table.id], |row| {
            Ok(RecordHandle {
                id: row.get(0)?,
                table_id: row.get(1)?,
                name: row.get(2)?,
            })
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }

    async fn cell_value(&self, record: &RecordHandle, column: &str) -> AppResult<Option<serde_json::Value>> {
        let conn = self.conn()?;
        require_record(&conn, record)?;
        let raw = conn
            .query_row(
                "SELECT value_json FROM host_cells WHERE record_id = ?1 AND column_name = ?2",
                params![record.id, column],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str::<serde_json::Value>(&raw)?)),
            None => Ok(None),
        }
    }
}
