use std::marker::PhantomData;

use super::{FieldLink, IntoMapping, Mapping, OperationKind};
use crate::error::{Error, Result};
use crate::schema::{Message, Projection};

/// Entry stage: pick exactly one operation kind.
///
/// Returning this stage from a builder expression fails with
/// `InvalidMapping`, since no operation was selected.
pub struct OperationBuilder<M, P> {
    _marker: PhantomData<fn(&M) -> P>,
}

impl<M: Message, P: Projection> OperationBuilder<M, P> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }

    /// Insert a new projection built from mapped message fields.
    pub fn add_new(self) -> AddNew<M, P> {
        AddNew {
            draft: Draft::new(OperationKind::AddNew),
        }
    }

    /// Overwrite mapped fields on the projections matching the filters.
    pub fn update(self) -> Update<M, P> {
        Update {
            draft: Draft::new(OperationKind::Update),
        }
    }

    /// Delete the projections matching the filters.
    pub fn remove(self) -> Remove<M, P> {
        Remove {
            draft: Draft::new(OperationKind::Remove),
        }
    }
}

impl<M: Message, P: Projection> Default for OperationBuilder<M, P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message, P: Projection> IntoMapping<M, P> for OperationBuilder<M, P> {
    fn into_mapping(self) -> Result<Mapping<M, P>> {
        Err(Error::InvalidMapping(format!(
            "no operation selected for message {} on {}",
            std::any::type_name::<M>(),
            P::TABLE
        )))
    }
}

/// Links collected so far plus the first field error, reported on build.
struct Draft<M, P> {
    kind: OperationKind,
    filters: Vec<FieldLink>,
    assignments: Vec<FieldLink>,
    error: Option<Error>,
    _marker: PhantomData<fn(&M) -> P>,
}

impl<M: Message, P: Projection> Draft<M, P> {
    fn new(kind: OperationKind) -> Self {
        Self {
            kind,
            filters: Vec::new(),
            assignments: Vec::new(),
            error: None,
            _marker: PhantomData,
        }
    }

    fn resolve(source: &'static str, target: &'static str) -> Result<FieldLink> {
        let from = M::require_field(source)?;
        let to = P::require_field(target)?;
        if !from.is_assignable_to(to) {
            return Err(Error::FieldTypeMismatch {
                message: std::any::type_name::<M>(),
                source_field: source,
                source_type: from.type_name(),
                projection: P::TABLE,
                target_field: target,
                target_type: to.type_name(),
            });
        }
        Ok(FieldLink { source, target })
    }

    fn record(&mut self, link: Result<FieldLink>) -> Option<FieldLink> {
        if self.error.is_some() {
            return None;
        }
        link.map_err(|err| self.error = Some(err)).ok()
    }

    fn filter(mut self, source: &'static str, target: &'static str) -> Self {
        if let Some(link) = self.record(Self::resolve(source, target)) {
            self.filters.push(link);
        }
        self
    }

    fn assign(mut self, source: &'static str, target: &'static str) -> Self {
        if let Some(link) = self.record(Self::resolve(source, target)) {
            self.assignments.push(link);
        }
        self
    }

    fn finish(self) -> Result<Mapping<M, P>> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(Mapping {
            kind: self.kind,
            filters: self.filters,
            assignments: self.assignments,
            _marker: PhantomData,
        })
    }

    fn missing_filter(&self) -> Error {
        Error::MissingFilter {
            kind: self.kind,
            projection: P::TABLE,
        }
    }
}

/// `add_new` stage: map message fields onto the new projection.
pub struct AddNew<M, P> {
    draft: Draft<M, P>,
}

impl<M: Message, P: Projection> AddNew<M, P> {
    /// Copies a message field into the projection field of the same name.
    pub fn map(self, field: &'static str) -> Self {
        self.map_to(field, field)
    }

    pub fn map_to(self, message_field: &'static str, projection_field: &'static str) -> Self {
        Self {
            draft: self.draft.assign(message_field, projection_field),
        }
    }
}

impl<M: Message, P: Projection> IntoMapping<M, P> for AddNew<M, P> {
    fn into_mapping(self) -> Result<Mapping<M, P>> {
        let mapping = self.draft.finish()?;
        if mapping.assignments.is_empty() {
            return Err(Error::InvalidMapping(format!(
                "add_new on {} maps no fields",
                P::TABLE
            )));
        }
        Ok(mapping)
    }
}

/// `update` stage: filter the projections to change and map the new values.
pub struct Update<M, P> {
    draft: Draft<M, P>,
}

impl<M: Message, P: Projection> Update<M, P> {
    /// Only projections whose field equals the message field of the same name.
    pub fn when_equal(self, field: &'static str) -> Self {
        self.when_equal_to(field, field)
    }

    pub fn when_equal_to(self, message_field: &'static str, projection_field: &'static str) -> Self {
        Self {
            draft: self.draft.filter(message_field, projection_field),
        }
    }

    /// Overwrites a non-key projection field with the same-named message field.
    pub fn map(self, field: &'static str) -> Self {
        self.map_to(field, field)
    }

    pub fn map_to(mut self, message_field: &'static str, projection_field: &'static str) -> Self {
        if P::is_key(projection_field) {
            let err = Error::InvalidMapping(format!(
                "update on {} cannot overwrite key field `{}`",
                P::TABLE,
                projection_field
            ));
            self.draft.record(Err(err));
            return self;
        }
        Self {
            draft: self.draft.assign(message_field, projection_field),
        }
    }
}

impl<M: Message, P: Projection> IntoMapping<M, P> for Update<M, P> {
    fn into_mapping(self) -> Result<Mapping<M, P>> {
        let missing_filter = self.draft.missing_filter();
        let mapping = self.draft.finish()?;
        if mapping.filters.is_empty() {
            return Err(missing_filter);
        }
        if mapping.assignments.is_empty() {
            return Err(Error::InvalidMapping(format!(
                "update on {} maps no fields",
                P::TABLE
            )));
        }
        Ok(mapping)
    }
}

/// `remove` stage: filter the projections to delete.
pub struct Remove<M, P> {
    draft: Draft<M, P>,
}

impl<M: Message, P: Projection> Remove<M, P> {
    /// Only projections whose field equals the message field of the same name.
    pub fn when_equal(self, field: &'static str) -> Self {
        self.when_equal_to(field, field)
    }

    pub fn when_equal_to(self, message_field: &'static str, projection_field: &'static str) -> Self {
        Self {
            draft: self.draft.filter(message_field, projection_field),
        }
    }
}

impl<M: Message, P: Projection> IntoMapping<M, P> for Remove<M, P> {
    fn into_mapping(self) -> Result<Mapping<M, P>> {
        let missing_filter = self.draft.missing_filter();
        let mapping = self.draft.finish()?;
        if mapping.filters.is_empty() {
            return Err(missing_filter);
        }
        Ok(mapping)
    }
}
