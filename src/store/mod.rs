//! Store - The relational collaborator behind projection providers.
//!
//! A [`Store`] hands out one [`Transaction`] per unit of work. Transactions
//! execute conjunctive-equality reads and deletes, single-record inserts and
//! key-resolved updates against a named table. How that maps onto SQL or any
//! other backend dialect is up to the implementation.
//!
//! ## Contract
//!
//! - `begin` acquires a connection and opens a transaction on it. Failure to
//!   connect is reported as [`StoreError::Unavailable`].
//! - Writes are visible to later reads on the same transaction and to nobody
//!   else until `commit`.
//! - Dropping a transaction without calling `commit` discards its writes and
//!   releases the connection.

#[cfg(feature = "in-memory")]
mod in_memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result, StoreError};
use crate::filter::FilterValue;
use crate::schema::Projection;

#[cfg(feature = "in-memory")]
pub use in_memory::{InMemoryStore, InMemoryTransaction};

/// One stored row: field name to value.
pub type Record = serde_json::Map<String, Value>;

/// The table a projection type lives in, with its identity key fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Table {
    pub name: &'static str,
    pub key: &'static [&'static str],
}

impl Table {
    pub fn of<P: Projection>() -> Self {
        Self {
            name: P::TABLE,
            key: P::KEY,
        }
    }

    /// Whether two records share the same identity key values.
    pub fn same_key(&self, a: &Record, b: &Record) -> bool {
        self.key.iter().all(|field| {
            a.get(*field).unwrap_or(&Value::Null) == b.get(*field).unwrap_or(&Value::Null)
        })
    }
}

pub(crate) fn to_record<P: Projection>(projection: &P) -> Result<Record> {
    match serde_json::to_value(projection)? {
        Value::Object(record) => Ok(record),
        other => Err(Error::Store(format!(
            "projection {} serialized to {} instead of a record",
            P::TABLE,
            other
        ))),
    }
}

pub(crate) fn from_record<P: Projection>(record: Record) -> Result<P> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

/// Acquires connections and opens transactions on them.
#[async_trait]
pub trait Store: Send + Sync {
    type Transaction: Transaction;

    async fn begin(&self) -> Result<Self::Transaction, StoreError>;
}

/// An open transaction bound to one connection.
#[async_trait]
pub trait Transaction: Send + 'static {
    /// Records in `table` matching every filter. No filters selects all.
    async fn select(
        &mut self,
        table: Table,
        filters: &[FilterValue],
    ) -> Result<Vec<Record>, StoreError>;

    /// Appends one record. Fails with [`StoreError::Constraint`] on a key conflict.
    async fn insert(&mut self, table: Table, record: Record) -> Result<(), StoreError>;

    /// Overwrites the record sharing `record`'s key. Returns the number of rows changed.
    async fn update(&mut self, table: Table, record: Record) -> Result<u64, StoreError>;

    /// Deletes every record matching every filter. Returns the number removed.
    async fn delete(&mut self, table: Table, filters: &[FilterValue]) -> Result<u64, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
