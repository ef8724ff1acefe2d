//! In-memory person store for tests/dev.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Utc;

use roster_core::{Entity, PersonId};
use roster_persons::{Person, PersonFields};

use super::{PersonStore, StoreError};

#[derive(Debug, Default)]
struct Inner {
    /// Insertion sequence -> record.
    records: BTreeMap<u64, Person>,
    by_id: HashMap<PersonId, u64>,
    by_cpf: HashMap<String, PersonId>,
    next_seq: u64,
}

#[derive(Debug, Default)]
pub struct InMemoryPersonStore {
    inner: RwLock<Inner>,
    revision: AtomicU64,
}

impl InMemoryPersonStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Storage("person store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Storage("person store lock poisoned".to_string()))
    }

    fn bump(&self) {
        self.revision.fetch_add(1, Ordering::SeqCst);
    }
}

impl PersonStore for InMemoryPersonStore {
    fn insert(&self, fields: PersonFields) -> Result<Person, StoreError> {
        let mut inner = self.write()?;
        if inner.by_cpf.contains_key(fields.cpf.as_str()) {
            return Err(StoreError::DuplicateCpf(fields.cpf.to_string()));
        }

        let person = Person::new(PersonId::new(), fields, Utc::now());
        let id = *person.id();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner.by_cpf.insert(person.cpf.to_string(), id);
        inner.by_id.insert(id, seq);
        inner.records.insert(seq, person.clone());
        drop(inner);

        self.bump();
        Ok(person)
    }

    fn get(&self, id: PersonId) -> Result<Option<Person>, StoreError> {
        let inner = self.read()?;
        Ok(inner
            .by_id
            .get(&id)
            .and_then(|seq| inner.records.get(seq))
            .cloned())
    }

    fn update(&self, id: PersonId, fields: PersonFields) -> Result<Person, StoreError> {
        let mut inner = self.write()?;
        let seq = *inner.by_id.get(&id).ok_or(StoreError::NotFound(id))?;

        if let Some(owner) = inner.by_cpf.get(fields.cpf.as_str()) {
            if *owner != id {
                return Err(StoreError::DuplicateCpf(fields.cpf.to_string()));
            }
        }

        let Inner { records, by_cpf, .. } = &mut *inner;
        let person = records.get_mut(&seq).ok_or(StoreError::NotFound(id))?;
        if person.cpf != fields.cpf {
            by_cpf.remove(person.cpf.as_str());
            by_cpf.insert(fields.cpf.to_string(), id);
        }
        person.apply(fields, Utc::now());
        let updated = person.clone();
        drop(inner);

        self.bump();
        Ok(updated)
    }

    fn delete(&self, id: PersonId) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let seq = inner.by_id.remove(&id).ok_or(StoreError::NotFound(id))?;
        if let Some(person) = inner.records.remove(&seq) {
            inner.by_cpf.remove(person.cpf.as_str());
        }
        drop(inner);

        self.bump();
        Ok(())
    }

    fn list(&self) -> Result<Vec<Person>, StoreError> {
        Ok(self.read()?.records.values().cloned().collect())
    }

    fn revision(&self) -> u64 {
        self.revision.load(Ordering::SeqCst)
    }
}
