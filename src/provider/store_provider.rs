use async_trait::async_trait;
use tracing::debug;

use super::{ProjectionProvider, UnitOfWork, UnitState};
use crate::error::{Error, Result};
use crate::filter::FilterValue;
use crate::schema::Projection;
use crate::store::{from_record, to_record, Table, Transaction};

/// A [`ProjectionProvider`] bound to one store transaction.
///
/// The transaction is released on commit, on rollback, or when the provider
/// is dropped. Dropping an active provider discards its writes.
pub struct StoreProvider<T: Transaction> {
    tx: Option<T>,
    state: UnitState,
}

impl<T: Transaction> StoreProvider<T> {
    pub fn new(tx: T) -> Self {
        Self {
            tx: Some(tx),
            state: UnitState::Active,
        }
    }

    fn active(&mut self) -> Result<&mut T> {
        match self.tx.as_mut() {
            Some(tx) => Ok(tx),
            None => Err(Error::InvalidState(match self.state {
                UnitState::Committed => "unit of work already committed",
                _ => "unit of work already rolled back",
            })),
        }
    }

    fn take(&mut self) -> Result<T> {
        self.active()?;
        self.tx
            .take()
            .ok_or(Error::InvalidState("unit of work already released"))
    }
}

impl<T: Transaction> Drop for StoreProvider<T> {
    fn drop(&mut self) {
        if self.tx.take().is_some() {
            debug!("unit of work dropped before commit, rolling back");
        }
    }
}

fn check_filters<P: Projection>(filters: &[FilterValue]) -> Result<()> {
    for filter in filters {
        P::require_field(filter.field())?;
    }
    Ok(())
}

#[async_trait]
impl<T: Transaction> UnitOfWork for StoreProvider<T> {
    async fn commit(&mut self) -> Result<()> {
        let tx = self.take()?;
        match tx.commit().await {
            Ok(()) => {
                self.state = UnitState::Committed;
                debug!("unit of work committed");
                Ok(())
            }
            Err(err) => {
                self.state = UnitState::RolledBack;
                Err(err.into())
            }
        }
    }

    async fn rollback(&mut self) -> Result<()> {
        let tx = self.take()?;
        self.state = UnitState::RolledBack;
        tx.rollback().await?;
        debug!("unit of work rolled back");
        Ok(())
    }

    fn state(&self) -> UnitState {
        self.state
    }
}

#[async_trait]
impl<T: Transaction> ProjectionProvider for StoreProvider<T> {
    async fn read<P: Projection>(&mut self, filters: &[FilterValue]) -> Result<Vec<P>> {
        check_filters::<P>(filters)?;
        let records = self.active()?.select(Table::of::<P>(), filters).await?;
        records.into_iter().map(from_record::<P>).collect()
    }

    async fn insert<P: Projection>(&mut self, projection: &P) -> Result<()> {
        let record = to_record(projection)?;
        self.active()?.insert(Table::of::<P>(), record).await?;
        Ok(())
    }

    async fn update<P: Projection>(&mut self, projection: &P) -> Result<u64> {
        let record = to_record(projection)?;
        Ok(self.active()?.update(Table::of::<P>(), record).await?)
    }

    async fn remove<P: Projection>(&mut self, filters: &[FilterValue]) -> Result<u64> {
        check_filters::<P>(filters)?;
        Ok(self.active()?.delete(Table::of::<P>(), filters).await?)
    }
}
