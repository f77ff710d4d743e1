use thiserror::Error;

use crate::mapping::OperationKind;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while building mappings or applying them to a store.
///
/// Mapping errors (`InvalidMapping`, `UnknownField`, `FieldTypeMismatch`,
/// `MissingFilter`) are raised before any store interaction. The rest abort
/// the current unit of work without committing it.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid mapping: {0}")]
    InvalidMapping(String),

    #[error("unknown field `{field}` on {type_name}")]
    UnknownField {
        type_name: &'static str,
        field: String,
    },

    #[error(
        "field type mismatch: {message}.{source_field} is {source_type}, \
         {projection}.{target_field} is {target_type}"
    )]
    FieldTypeMismatch {
        message: &'static str,
        source_field: &'static str,
        source_type: &'static str,
        projection: &'static str,
        target_field: &'static str,
        target_type: &'static str,
    },

    #[error("{kind} mapping for {projection} requires at least one filter")]
    MissingFilter {
        kind: OperationKind,
        projection: &'static str,
    },

    #[error("no mapping registered for message {message} on {projection}")]
    UnregisteredMessage {
        message: &'static str,
        projection: &'static str,
    },

    #[error("constraint violation on {table}: {detail}")]
    ConstraintViolation { table: String, detail: String },

    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("invalid unit of work state: {0}")]
    InvalidState(&'static str),

    #[error("store error: {0}")]
    Store(String),

    #[error("projection serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Errors reported by [`Store`](crate::Store) implementations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No connection could be acquired.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// A key or constraint conflict.
    #[error("constraint violation on {table}: {detail}")]
    Constraint { table: String, detail: String },
    /// Any other backend failure.
    #[error("{0}")]
    Backend(String),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Error::StoreUnavailable(msg),
            StoreError::Constraint { table, detail } => {
                Error::ConstraintViolation { table, detail }
            }
            StoreError::Backend(msg) => Error::Store(msg),
        }
    }
}
