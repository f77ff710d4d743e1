//! Static field schemas for messages and projections.
//!
//! Mappings refer to fields by name. Each name is resolved against these
//! schemas once, when the mapping is built, so a typo or a type mismatch
//! surfaces at startup rather than on the first message.

use std::any::TypeId;
use std::fmt;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::{Error, Result};

/// A named, typed field of a message or projection.
#[derive(Clone, Copy)]
pub struct Field {
    name: &'static str,
    type_id: fn() -> TypeId,
    type_name: fn() -> &'static str,
}

impl Field {
    pub const fn of<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            name,
            type_id: TypeId::of::<T>,
            type_name: std::any::type_name::<T>,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        (self.type_id)()
    }

    pub fn type_name(&self) -> &'static str {
        (self.type_name)()
    }

    /// Whether a value of this field can be stored in `other`.
    pub fn is_assignable_to(&self, other: &Field) -> bool {
        self.type_id() == other.type_id()
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("type", &self.type_name())
            .finish()
    }
}

impl PartialEq for Field {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.type_id() == other.type_id()
    }
}

impl Eq for Field {}

/// Types with a static list of named fields.
///
/// Field names must match the serialized key of each field, which is the
/// default for `#[derive(Serialize)]` without renames.
pub trait Fields: Serialize + Send + Sync + 'static {
    const FIELDS: &'static [Field];

    fn field(name: &str) -> Option<&'static Field> {
        Self::FIELDS.iter().find(|field| field.name == name)
    }

    /// Resolves a field by name, failing with `UnknownField`.
    fn require_field(name: &str) -> Result<&'static Field> {
        Self::field(name).ok_or_else(|| Error::UnknownField {
            type_name: std::any::type_name::<Self>(),
            field: name.to_string(),
        })
    }
}

/// An inbound message that can drive projection operations.
pub trait Message: Fields {}

/// A read-model record stored one instance per row.
///
/// `TABLE` maps to a table in SQL, a collection in a document store, a key
/// prefix in a KV store. `KEY` lists the identity fields used to resolve
/// updates.
pub trait Projection: Fields + DeserializeOwned + Default + Clone {
    const TABLE: &'static str;
    const KEY: &'static [&'static str];

    fn is_key(name: &str) -> bool {
        Self::KEY.contains(&name)
    }
}
