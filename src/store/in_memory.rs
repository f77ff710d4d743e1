//! InMemoryStore - HashMap-backed projection store for testing and development.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use super::{Record, Store, Table, Transaction};
use crate::error::StoreError;
use crate::filter::{matches_all, FilterValue};

type Tables = HashMap<&'static str, Vec<Record>>;

/// A write recorded by a transaction, replayed against shared state on commit.
enum WriteOp {
    Insert(Table, Record),
    Update(Table, Record),
    Delete(Table, Vec<FilterValue>),
}

impl WriteOp {
    fn table(&self) -> Table {
        match self {
            WriteOp::Insert(table, _) | WriteOp::Update(table, _) | WriteOp::Delete(table, _) => {
                *table
            }
        }
    }

    fn apply(&self, rows: &mut Vec<Record>) -> Result<u64, StoreError> {
        match self {
            WriteOp::Insert(table, record) => {
                if rows.iter().any(|row| table.same_key(row, record)) {
                    return Err(StoreError::Constraint {
                        table: table.name.to_string(),
                        detail: format!("duplicate key {}", key_display(table, record)),
                    });
                }
                rows.push(record.clone());
                Ok(1)
            }
            WriteOp::Update(table, record) => {
                match rows.iter_mut().find(|row| table.same_key(row, record)) {
                    Some(row) => {
                        *row = record.clone();
                        Ok(1)
                    }
                    None => Ok(0),
                }
            }
            WriteOp::Delete(_, filters) => {
                let before = rows.len();
                rows.retain(|row| !matches_all(filters, row));
                Ok((before - rows.len()) as u64)
            }
        }
    }
}

fn key_display(table: &Table, record: &Record) -> String {
    let parts: Vec<String> = table
        .key
        .iter()
        .map(|field| {
            let value = record.get(*field).cloned().unwrap_or_default();
            format!("{}={}", field, value)
        })
        .collect();
    format!("({})", parts.join(", "))
}

/// In-memory projection store.
///
/// Tables are `Vec`s of records in insertion order. Clone-friendly via Arc;
/// clones share storage.
///
/// Each transaction works on private copies of the tables it touches, taken
/// on first use. Commit replays the transaction's writes against the current
/// shared tables under a write lock and publishes them all at once, or not at
/// all if a replayed write conflicts.
///
/// The first committer wins: a transaction that updates or deletes a row
/// another transaction changed after its copy was taken fails to commit.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed records of a table, in insertion order.
    pub fn rows(&self, table: &str) -> Result<Vec<Record>, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".into()))?;
        Ok(tables.get(table).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl Store for InMemoryStore {
    type Transaction = InMemoryTransaction;

    async fn begin(&self) -> Result<Self::Transaction, StoreError> {
        Ok(InMemoryTransaction {
            tables: Arc::clone(&self.tables),
            snapshots: HashMap::new(),
            working: HashMap::new(),
            log: Vec::new(),
        })
    }
}

/// A transaction against an [`InMemoryStore`].
///
/// Dropping it without committing discards its writes.
pub struct InMemoryTransaction {
    tables: Arc<RwLock<Tables>>,
    /// Committed rows as first read, per table.
    snapshots: Tables,
    working: Tables,
    log: Vec<WriteOp>,
}

impl InMemoryTransaction {
    fn working_rows(&mut self, table: Table) -> Result<&mut Vec<Record>, StoreError> {
        if !self.working.contains_key(table.name) {
            let tables = self
                .tables
                .read()
                .map_err(|_| StoreError::Backend("lock poisoned".into()))?;
            let snapshot = tables.get(table.name).cloned().unwrap_or_default();
            self.snapshots.insert(table.name, snapshot.clone());
            self.working.insert(table.name, snapshot);
        }
        Ok(self.working.entry(table.name).or_default())
    }

    /// Fails if a row `op` overwrites or deletes is no longer the row this
    /// transaction read.
    fn check_unchanged(&self, op: &WriteOp, committed: &Tables) -> Result<(), StoreError> {
        let (table, seen): (&Table, Vec<&Record>) = match op {
            WriteOp::Insert(..) => return Ok(()),
            WriteOp::Update(table, record) => (
                table,
                self.snapshot_rows(table)
                    .filter(|row| table.same_key(row, record))
                    .collect(),
            ),
            WriteOp::Delete(table, filters) => (
                table,
                self.snapshot_rows(table)
                    .filter(|row| matches_all(filters, row))
                    .collect(),
            ),
        };

        let current = committed.get(table.name).map(Vec::as_slice).unwrap_or_default();
        for row in seen {
            let now = current.iter().find(|candidate| table.same_key(candidate, row));
            if now != Some(row) {
                return Err(StoreError::Constraint {
                    table: table.name.to_string(),
                    detail: format!(
                        "row {} was changed by a concurrent commit",
                        key_display(table, row)
                    ),
                });
            }
        }
        Ok(())
    }

    fn snapshot_rows(&self, table: &Table) -> impl Iterator<Item = &Record> {
        self.snapshots.get(table.name).into_iter().flatten()
    }

    fn write(&mut self, op: WriteOp) -> Result<u64, StoreError> {
        let rows = self.working_rows(op.table())?;
        let affected = op.apply(rows)?;
        self.log.push(op);
        Ok(affected)
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn select(
        &mut self,
        table: Table,
        filters: &[FilterValue],
    ) -> Result<Vec<Record>, StoreError> {
        let rows = self.working_rows(table)?;
        Ok(rows
            .iter()
            .filter(|row| matches_all(filters, row))
            .cloned()
            .collect())
    }

    async fn insert(&mut self, table: Table, record: Record) -> Result<(), StoreError> {
        self.write(WriteOp::Insert(table, record))?;
        Ok(())
    }

    async fn update(&mut self, table: Table, record: Record) -> Result<u64, StoreError> {
        self.write(WriteOp::Update(table, record))
    }

    async fn delete(&mut self, table: Table, filters: &[FilterValue]) -> Result<u64, StoreError> {
        self.write(WriteOp::Delete(table, filters.to_vec()))
    }

    async fn commit(self) -> Result<(), StoreError> {
        if self.log.is_empty() {
            return Ok(());
        }

        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".into()))?;

        for op in &self.log {
            self.check_unchanged(op, &tables)?;
        }

        let mut staged: Tables = HashMap::new();
        for op in &self.log {
            let name = op.table().name;
            let rows = staged
                .entry(name)
                .or_insert_with(|| tables.get(name).cloned().unwrap_or_default());
            op.apply(rows)?;
        }

        tables.extend(staged);
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
