//! Projection persistence for message-driven applications.
//!
//! Declare, per message type, whether it adds, updates or removes a
//! projection record and which message fields become filters and values.
//! The [`MessageHandler`] turns each message into one operation and runs it
//! inside its own transactional unit of work.
//!
//! ```ignore
//! use fluent_projections::{InMemoryStore, Message, MessageHandler, Projection, StoreProviderFactory};
//!
//! #[derive(Serialize, Message)]
//! struct ItemListed { id: i32 }
//!
//! #[derive(Serialize, Message)]
//! struct ItemRepriced { id: i32, price: i64 }
//!
//! #[derive(Clone, Default, Serialize, Deserialize, Projection)]
//! struct ItemPrice { id: i32, price: i64 }
//!
//! let handler = MessageHandler::<ItemPrice, _>::new(StoreProviderFactory::new(InMemoryStore::new()))
//!     .on::<ItemListed, _>(|b| b.add_new().map("id"))?
//!     .on::<ItemRepriced, _>(|b| b.update().when_equal("id").map("price"))?;
//!
//! handler.handle(&ItemListed { id: 7 }).await?;
//! handler.handle(&ItemRepriced { id: 7, price: 111 }).await?;
//! ```

extern crate self as fluent_projections;

mod error;
mod filter;
mod handler;
mod mapping;
mod provider;
mod schema;
mod store;

pub use error::{Error, Result, StoreError};
pub use filter::FilterValue;
pub use handler::MessageHandler;
pub use mapping::{
    AddNew, Assignment, FieldLink, IntoMapping, Mapping, OperationBuilder, OperationDescriptor,
    OperationKind, Remove, Update,
};
pub use provider::{
    ProjectionProvider, ProviderFactory, StoreProvider, StoreProviderFactory, UnitOfWork,
    UnitState,
};
pub use schema::{Field, Fields, Message, Projection};
pub use store::{Record, Store, Table, Transaction};

#[cfg(feature = "in-memory")]
pub use store::{InMemoryStore, InMemoryTransaction};

// Derive macros share their names with the traits they implement.
#[cfg(feature = "derive")]
pub use fluent_projections_macros::{Message, Projection};
