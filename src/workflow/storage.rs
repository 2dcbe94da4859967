/// SQLite persistence layer for workflow records
///
/// The store is the single source of truth for records. Both writes carry their
/// precondition inside the statement itself, so concurrent registrations race on
/// the database rather than on a read-then-write gap.

use crate::error::Result;
use crate::workflow::types::WorkflowRecord;
use async_trait::async_trait;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool},
    Row,
};
use std::path::Path;

/// Outcome of a conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precondition {
    Applied,
    /// `insert_new` found the id already taken
    AlreadyExists,
    /// `update_if_key_matches` found no row with that id and write key
    KeyMismatch,
}

/// Key-value store with single-key conditional writes
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert only if no record has this id
    async fn insert_new(&self, record: &WorkflowRecord) -> Result<Precondition>;

    /// Replace script, definition and input only if the stored write key matches
    async fn update_if_key_matches(&self, record: &WorkflowRecord) -> Result<Precondition>;

    /// Current state of a record, straight from the store
    async fn get(&self, id: &str) -> Result<Option<WorkflowRecord>>;
}

/// SQLite-backed record store
#[derive(Debug, Clone)]
pub struct SqliteRecordStore {
    pool: SqlitePool,
}

impl SqliteRecordStore {
    /// Create new storage instance over an existing pool
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the database file and ensure the schema exists
    pub async fn open(db_path: &Path) -> Result<Self> {
        tracing::info!("🗄️ Opening record store: {}", db_path.display());
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await?;
        let store = Self::new(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// Safe to call multiple times (uses IF NOT EXISTS).
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS workflow_records (
                id TEXT PRIMARY KEY,
                script TEXT NOT NULL,
                definition TEXT NOT NULL,
                input TEXT NOT NULL,
                write_key TEXT NOT NULL,
                created_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn insert_new(&self, record: &WorkflowRecord) -> Result<Precondition> {
        let result = sqlx::query(
            r#"
            INSERT INTO workflow_records (id, script, definition, input, write_key)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&record.id)
        .bind(&record.script)
        .bind(&record.definition)
        .bind(&record.input)
        .bind(&record.write_key)
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 1 {
            Precondition::Applied
        } else {
            Precondition::AlreadyExists
        })
    }

    async fn update_if_key_matches(&self, record: &WorkflowRecord) -> Result<Precondition> {
        let result = sqlx::query(
            r#"
            UPDATE workflow_records
            SET script = ?, definition = ?, input = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND write_key = ?
            "#,
        )
        .bind(&record.script)
        .bind(&record.definition)
        .bind(&record.input)
        .bind(&record.id)
        .bind(&record.write_key)
        .execute(&self.pool)
        .await?;

        Ok(if result.rows_affected() == 1 {
            Precondition::Applied
        } else {
            Precondition::KeyMismatch
        })
    }

    async fn get(&self, id: &str) -> Result<Option<WorkflowRecord>> {
        let row = sqlx::query(
            "SELECT id, script, definition, input, write_key FROM workflow_records WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| WorkflowRecord {
            id: row.get("id"),
            script: row.get("script"),
            definition: row.get("definition"),
            input: row.get("input"),
            write_key: row.get("write_key"),
        }))
    }
}
