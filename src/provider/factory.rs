use async_trait::async_trait;
use tracing::debug;

use super::{ProjectionProvider, StoreProvider};
use crate::error::Result;
use crate::store::Store;

/// Creates a fresh provider, and so a fresh unit of work, per operation.
///
/// Implementations must be safe to call concurrently; every call yields an
/// independent provider.
#[async_trait]
pub trait ProviderFactory: Send + Sync {
    type Provider: ProjectionProvider;

    /// Fails with `StoreUnavailable` when no connection can be acquired.
    async fn create(&self) -> Result<Self::Provider>;
}

/// Opens one store transaction per provider.
#[derive(Clone)]
pub struct StoreProviderFactory<S> {
    store: S,
}

impl<S: Store> StoreProviderFactory<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S: Store> ProviderFactory for StoreProviderFactory<S> {
    type Provider = StoreProvider<S::Transaction>;

    async fn create(&self) -> Result<Self::Provider> {
        let tx = self.store.begin().await?;
        debug!("unit of work opened");
        Ok(StoreProvider::new(tx))
    }
}
