//! Person persistence collaborator.
//!
//! The store owns the CPF unique index: insert and update check-and-write
//! under one lock, so concurrent writers racing on the same CPF see exactly one
//! success and a [`StoreError::DuplicateCpf`] for the rest.

use std::sync::Arc;

use roster_core::{FieldErrors, PersonId};
use roster_persons::{Person, PersonFields};

pub mod in_memory;

pub use in_memory::InMemoryPersonStore;

/// Message reported on the `cpf` field when the unique index rejects a write.
pub const DUPLICATE_CPF_MESSAGE: &str = "person with this cpf already exists.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("person not found: {0}")]
    NotFound(PersonId),
    #[error("cpf already registered: {0}")]
    DuplicateCpf(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    /// Field-level view of errors caused by the input, `None` for faults.
    pub fn as_field_errors(&self) -> Option<FieldErrors> {
        match self {
            StoreError::DuplicateCpf(_) => {
                let mut errors = FieldErrors::new();
                errors.add("cpf", DUPLICATE_CPF_MESSAGE);
                Some(errors)
            }
            _ => None,
        }
    }
}

/// Record storage with an atomic unique index on the CPF.
pub trait PersonStore: Send + Sync {
    /// Insert a new record; id and timestamps are assigned by the store.
    fn insert(&self, fields: PersonFields) -> Result<Person, StoreError>;

    fn get(&self, id: PersonId) -> Result<Option<Person>, StoreError>;

    /// Replace all attributes of an existing record.
    fn update(&self, id: PersonId, fields: PersonFields) -> Result<Person, StoreError>;

    fn delete(&self, id: PersonId) -> Result<(), StoreError>;

    /// All records in insertion order.
    fn list(&self) -> Result<Vec<Person>, StoreError>;

    /// Write counter; changes whenever any record is inserted, updated or
    /// deleted.
    fn revision(&self) -> u64;
}

impl<S> PersonStore for Arc<S>
where
    S: PersonStore + ?Sized,
{
    fn insert(&self, fields: PersonFields) -> Result<Person, StoreError> {
        (**self).insert(fields)
    }

    fn get(&self, id: PersonId) -> Result<Option<Person>, StoreError> {
        (**self).get(id)
    }

    fn update(&self, id: PersonId, fields: PersonFields) -> Result<Person, StoreError> {
        (**self).update(id, fields)
    }

    fn delete(&self, id: PersonId) -> Result<(), StoreError> {
        (**self).delete(id)
    }

    fn list(&self) -> Result<Vec<Person>, StoreError> {
        (**self).list()
    }

    fn revision(&self) -> u64 {
        (**self).revision()
    }
}
