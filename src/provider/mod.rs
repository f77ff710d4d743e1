//! Projection providers - typed CRUD scoped to one unit of work.
//!
//! A provider is created by a [`ProviderFactory`] with a freshly opened
//! transaction. Reads and writes run inside that transaction and nothing is
//! visible to other units of work until [`UnitOfWork::commit`]. Dropping a
//! provider without committing rolls the transaction back.
//!
//! ## Example
//!
//! ```ignore
//! let factory = StoreProviderFactory::new(InMemoryStore::new());
//!
//! let mut provider = factory.create().await?;
//! provider.insert(&ItemPrice { id: 7, price: 100 }).await?;
//! provider.commit().await?;
//!
//! let mut provider = factory.create().await?;
//! let items: Vec<ItemPrice> = provider.read(&[FilterValue::new("id", 7)]).await?;
//! ```

mod factory;
mod store_provider;

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::filter::FilterValue;
use crate::schema::Projection;

pub use factory::{ProviderFactory, StoreProviderFactory};
pub use store_provider::StoreProvider;

/// Lifecycle of a unit of work. Only `Active` accepts operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Active,
    Committed,
    RolledBack,
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitState::Active => write!(f, "active"),
            UnitState::Committed => write!(f, "committed"),
            UnitState::RolledBack => write!(f, "rolled back"),
        }
    }
}

/// Owns one transaction: commit it once, or roll it back.
#[async_trait]
pub trait UnitOfWork: Send {
    /// Commits and releases the transaction. Fails with `InvalidState` once
    /// the unit is no longer active.
    async fn commit(&mut self) -> Result<()>;

    /// Rolls back and releases the transaction. Fails with `InvalidState`
    /// once the unit is no longer active.
    async fn rollback(&mut self) -> Result<()>;

    fn state(&self) -> UnitState;
}

/// Read/insert/update/remove for any projection type, inside one unit of work.
#[async_trait]
pub trait ProjectionProvider: UnitOfWork {
    /// Every record matching all filters. No filters returns every record.
    async fn read<P: Projection>(&mut self, filters: &[FilterValue]) -> Result<Vec<P>>;

    /// Appends a new record. Fails with `ConstraintViolation` on a key conflict.
    async fn insert<P: Projection>(&mut self, projection: &P) -> Result<()>;

    /// Overwrites the record with the same key. Existence is not checked
    /// beforehand; returns the number of records the store changed.
    async fn update<P: Projection>(&mut self, projection: &P) -> Result<u64>;

    /// Deletes every record matching all filters. Matching nothing is not an error.
    async fn remove<P: Projection>(&mut self, filters: &[FilterValue]) -> Result<u64>;
}
