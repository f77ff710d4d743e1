//! MessageHandler - Applies messages to one projection type.
//!
//! One handler serves one projection type. Each message type it reacts to
//! either gets a mapping registered up front with [`MessageHandler::on`], or
//! supplies one per call with [`MessageHandler::handle_with`].
//!
//! Every handled message runs in its own unit of work:
//! descriptor built → provider acquired → operation executed → committed.
//! Any failure stops the sequence; the provider is dropped uncommitted and
//! its transaction rolls back.
//!
//! ## Example
//!
//! ```ignore
//! let handler = MessageHandler::<ItemPrice, _>::new(StoreProviderFactory::new(store))
//!     .on::<ItemListed, _>(|b| b.add_new().map("id").map("price"))?
//!     .on::<ItemRepriced, _>(|b| b.update().when_equal("id").map("price"))?
//!     .on::<ItemDelisted, _>(|b| b.remove().when_equal("id"))?;
//!
//! handler.handle(&ItemListed { id: 7, price: 100 }).await?;
//! ```

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::filter::FilterValue;
use crate::mapping::{IntoMapping, Mapping, OperationBuilder, OperationDescriptor, OperationKind};
use crate::provider::{ProjectionProvider, ProviderFactory, UnitOfWork};
use crate::schema::{Message, Projection};

/// Applies messages to projections of type `P` through providers from `F`.
pub struct MessageHandler<P, F> {
    factory: F,
    mappings: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    _projection: PhantomData<fn() -> P>,
}

impl<P: Projection, F: ProviderFactory> MessageHandler<P, F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            mappings: HashMap::new(),
            _projection: PhantomData,
        }
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Registers the mapping for message type `M`, validating it now.
    ///
    /// A later registration for the same message type replaces the earlier one.
    pub fn on<M: Message, B: IntoMapping<M, P>>(
        mut self,
        expression: impl FnOnce(OperationBuilder<M, P>) -> B,
    ) -> Result<Self> {
        let mapping = Mapping::<M, P>::build(expression)?;
        debug!(
            projection = P::TABLE,
            message = type_name::<M>(),
            kind = %mapping.kind(),
            "mapping registered"
        );
        self.mappings.insert(TypeId::of::<M>(), Box::new(mapping));
        Ok(self)
    }

    /// Whether a mapping is registered for message type `M`.
    pub fn handles<M: Message>(&self) -> bool {
        self.mappings.contains_key(&TypeId::of::<M>())
    }

    fn registered<M: Message>(&self) -> Result<&Mapping<M, P>> {
        self.mappings
            .get(&TypeId::of::<M>())
            .and_then(|mapping| mapping.downcast_ref::<Mapping<M, P>>())
            .ok_or(Error::UnregisteredMessage {
                message: type_name::<M>(),
                projection: P::TABLE,
            })
    }

    /// Applies `message` through its registered mapping.
    ///
    /// Returns the number of projection records written.
    #[tracing::instrument(skip_all, fields(projection = P::TABLE, message = type_name::<M>()))]
    pub async fn handle<M: Message>(&self, message: &M) -> Result<u64> {
        let descriptor = self
            .registered::<M>()
            .and_then(|mapping| mapping.bind(message))
            .inspect_err(|err| warn!(error = %err, "message rejected"))?;
        self.execute(descriptor).await
    }

    /// Applies `message` through a mapping declared for this call only.
    ///
    /// The expression is validated before any store interaction.
    #[tracing::instrument(skip_all, fields(projection = P::TABLE, message = type_name::<M>()))]
    pub async fn handle_with<M, B>(
        &self,
        message: &M,
        expression: impl FnOnce(OperationBuilder<M, P>) -> B,
    ) -> Result<u64>
    where
        M: Message,
        B: IntoMapping<M, P>,
    {
        let descriptor = Mapping::build(expression)
            .and_then(|mapping| mapping.bind(message))
            .inspect_err(|err| warn!(error = %err, "message rejected"))?;
        self.execute(descriptor).await
    }

    /// Runs one descriptor in a fresh unit of work and commits it.
    pub async fn execute(&self, descriptor: OperationDescriptor) -> Result<u64> {
        debug!(
            kind = %descriptor.kind(),
            filters = descriptor.filters().len(),
            assignments = descriptor.assignments().len(),
            "descriptor built"
        );

        self.run(&descriptor).await.inspect_err(|err| {
            warn!(kind = %descriptor.kind(), error = %err, "unit of work aborted")
        })
    }

    async fn run(&self, descriptor: &OperationDescriptor) -> Result<u64> {
        let mut provider = self.factory.create().await?;
        debug!("provider acquired");

        let written = match descriptor.kind() {
            OperationKind::AddNew => {
                let projection: P = descriptor.new_projection()?;
                provider.insert(&projection).await?;
                1
            }
            OperationKind::Update => {
                let current: Vec<P> = provider.read(descriptor.filters()).await?;
                let mut written = 0;
                for projection in current {
                    let updated = descriptor.apply_to(projection)?;
                    written += provider.update(&updated).await?;
                }
                written
            }
            OperationKind::Remove => provider.remove::<P>(descriptor.filters()).await?,
        };
        debug!(written, "operation executed");

        provider.commit().await?;
        Ok(written)
    }

    /// Reads committed projections matching every filter.
    pub async fn read(&self, filters: &[FilterValue]) -> Result<Vec<P>> {
        let mut provider = self.factory.create().await?;
        let projections = provider.read(filters).await?;
        provider.rollback().await?;
        Ok(projections)
    }
}
