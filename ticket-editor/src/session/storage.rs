//! redb-based local durable store for autosaves
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `autosaves` | `store_id:table_id` | `AutosaveRecord` (JSON) | Interrupted-session recovery |
//!
//! # Durability
//!
//! redb commits are persistent as soon as `commit()` returns, so an autosave
//! survives a terminal losing power mid-edit.

use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use shared::ticket::AutosaveRecord;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for autosaves: key = `store_id:table_id`, value = JSON-serialized AutosaveRecord
const AUTOSAVES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("autosaves");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Autosave storage backed by redb
#[derive(Clone)]
pub struct AutosaveStorage {
    db: Arc<Database>,
}

impl std::fmt::Debug for AutosaveStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutosaveStorage").finish_non_exhaustive()
    }
}

impl AutosaveStorage {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(AUTOSAVES_TABLE)?;
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Insert or replace the autosave of a table
    pub fn save(&self, record: &AutosaveRecord) -> StorageResult<()> {
        let bytes = serde_json::to_vec(record)?;
        let key = record.key();
        let txn = self.db.begin_write()?;
        {
            let mut table = txn.open_table(AUTOSAVES_TABLE)?;
            table.insert(key.as_str(), bytes.as_slice())?;
        }
        txn.commit()?;
        Ok(())
    }

    pub fn load(&self, key: &str) -> StorageResult<Option<AutosaveRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUTOSAVES_TABLE)?;
        match table.get(key)? {
            Some(value) => Ok(Some(serde_json::from_slice(value.value())?)),
            None => Ok(None),
        }
    }

    /// Delete an autosave, returns whether one existed
    pub fn remove(&self, key: &str) -> StorageResult<bool> {
        let txn = self.db.begin_write()?;
        let existed = {
            let mut table = txn.open_table(AUTOSAVES_TABLE)?;
            table.remove(key)?.is_some()
        };
        txn.commit()?;
        Ok(existed)
    }

    /// All autosaves (diagnostics)
    pub fn list(&self) -> StorageResult<Vec<AutosaveRecord>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUTOSAVES_TABLE)?;

        let mut records = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            records.push(serde_json::from_slice(value.value())?);
        }
        Ok(records)
    }

    pub fn count(&self) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(AUTOSAVES_TABLE)?;
        Ok(table.len()?)
    }
}
