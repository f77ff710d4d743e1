//! Mapping DSL - Declare how one message type changes one projection type.
//!
//! A mapping is declared once per message type with a staged builder. The
//! builder only offers calls that are valid at its stage: the operation kind
//! comes first, `add_new` only maps fields, `remove` only filters, and
//! `update` does both.
//!
//! ## Example
//!
//! ```ignore
//! let mapping = Mapping::<ItemPriced, ItemPrice>::build(|b| {
//!     b.update().when_equal("id").map("price")
//! })?;
//!
//! let descriptor = mapping.bind(&ItemPriced { id: 7, price: 120 })?;
//! assert_eq!(descriptor.kind(), OperationKind::Update);
//! ```
//!
//! Field names are resolved against the message and projection schemas when
//! the mapping is built. Binding a message only copies values.

mod builder;

use std::fmt;
use std::marker::PhantomData;

use serde_json::Value;

use crate::error::{Error, Result};
use crate::filter::FilterValue;
use crate::schema::{Message, Projection};
use crate::store::{from_record, to_record};

pub use builder::{AddNew, OperationBuilder, Remove, Update};

/// The three canonical projection operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    AddNew,
    Update,
    Remove,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::AddNew => write!(f, "add_new"),
            OperationKind::Update => write!(f, "update"),
            OperationKind::Remove => write!(f, "remove"),
        }
    }
}

/// A message field linked to a projection field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLink {
    pub source: &'static str,
    pub target: &'static str,
}

/// A projection field set to a message value.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub field: &'static str,
    pub value: Value,
}

/// The resolved operation for one message: kind, filters and assignments.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    kind: OperationKind,
    filters: Vec<FilterValue>,
    assignments: Vec<Assignment>,
}

impl OperationDescriptor {
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn filters(&self) -> &[FilterValue] {
        &self.filters
    }

    pub fn assignments(&self) -> &[Assignment] {
        &self.assignments
    }

    /// A default projection with every assignment applied.
    pub fn new_projection<P: Projection>(&self) -> Result<P> {
        self.apply_to(P::default())
    }

    /// `projection` with every assignment applied; other fields are kept.
    pub fn apply_to<P: Projection>(&self, projection: P) -> Result<P> {
        let mut record = to_record(&projection)?;
        for assignment in &self.assignments {
            record.insert(assignment.field.to_string(), assignment.value.clone());
        }
        from_record(record)
    }
}

/// A validated mapping from message type `M` to projection type `P`.
pub struct Mapping<M, P> {
    kind: OperationKind,
    filters: Vec<FieldLink>,
    assignments: Vec<FieldLink>,
    _marker: PhantomData<fn(&M) -> P>,
}

impl<M, P> fmt::Debug for Mapping<M, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mapping")
            .field("kind", &self.kind)
            .field("filters", &self.filters)
            .field("assignments", &self.assignments)
            .finish()
    }
}

impl<M: Message, P: Projection> Mapping<M, P> {
    /// Evaluates a builder expression into a validated mapping.
    pub fn build<B>(expression: impl FnOnce(OperationBuilder<M, P>) -> B) -> Result<Self>
    where
        B: IntoMapping<M, P>,
    {
        expression(OperationBuilder::new()).into_mapping()
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn filters(&self) -> &[FieldLink] {
        &self.filters
    }

    pub fn assignments(&self) -> &[FieldLink] {
        &self.assignments
    }

    /// Copies the linked values out of `message`.
    ///
    /// Fails with `InvalidMapping` if a linked field is missing from the
    /// serialized message.
    pub fn bind(&self, message: &M) -> Result<OperationDescriptor> {
        let source = match serde_json::to_value(message)? {
            Value::Object(fields) => fields,
            other => {
                return Err(Error::InvalidMapping(format!(
                    "message {} serialized to {} instead of a record",
                    std::any::type_name::<M>(),
                    other
                )))
            }
        };
        let value_of = |link: &FieldLink| {
            source.get(link.source).cloned().ok_or_else(|| {
                Error::InvalidMapping(format!(
                    "message {} serialized without field `{}`",
                    std::any::type_name::<M>(),
                    link.source
                ))
            })
        };

        Ok(OperationDescriptor {
            kind: self.kind,
            filters: self
                .filters
                .iter()
                .map(|link| Ok(FilterValue::new(link.target, value_of(link)?)))
                .collect::<Result<_>>()?,
            assignments: self
                .assignments
                .iter()
                .map(|link| {
                    Ok(Assignment {
                        field: link.target,
                        value: value_of(link)?,
                    })
                })
                .collect::<Result<_>>()?,
        })
    }
}

/// The result of a builder expression, checked into a [`Mapping`].
pub trait IntoMapping<M, P> {
    fn into_mapping(self) -> Result<Mapping<M, P>>;
}

impl<M, P> IntoMapping<M, P> for Mapping<M, P> {
    fn into_mapping(self) -> Result<Mapping<M, P>> {
        Ok(self)
    }
}
