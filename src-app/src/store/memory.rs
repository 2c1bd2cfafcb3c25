// FICHIER : src-app/src/store/memory.rs

//! Moteur en mémoire, mêmes règles que le moteur fichier, avec injection
//! de pannes pour les tests (base hors ligne, insertions refusées).

use crate::store::{
    apply_set, ensure_unique, validate_collection_name, with_new_id, Document, DocumentStore,
    Filter, ID_FIELD,
};
use crate::utils::{async_trait, AppError, Result};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemCollection {
    docs: Vec<Document>,
    unique: Vec<String>,
}

#[derive(Debug, Default)]
struct MemState {
    collections: BTreeMap<String, MemCollection>,
    offline: bool,
    failing_inserts: HashSet<String>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simule une base injoignable : toutes les opérations échouent.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.offline = offline;
        }
    }

    /// Les insertions dans `collection` échouent avec une erreur de connexion.
    pub fn fail_inserts_into(&self, collection: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.failing_inserts.insert(collection.to_string());
        }
    }

    pub fn clear_faults(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.offline = false;
            state.failing_inserts.clear();
        }
    }

    fn online(&self) -> Result<MutexGuard<'_, MemState>> {
        let state = self
            .state
            .lock()
            .map_err(|_| AppError::connection("verrou du magasin empoisonné"))?;
        if state.offline {
            return Err(AppError::connection("magasin hors ligne (simulation)"));
        }
        Ok(state)
    }
}

fn position(coll: &MemCollection, id: &str) -> Option<usize> {
    coll.docs
        .iter()
        .position(|d| d.get(ID_FIELD).and_then(|v| v.as_str()) == Some(id))
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_collections(&self) -> Result<BTreeSet<String>> {
        let state = self.online()?;
        Ok(state.collections.keys().cloned().collect())
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        validate_collection_name(collection)?;
        let state = self.online()?;
        let Some(coll) = state.collections.get(collection) else {
            return Ok(Vec::new());
        };
        Ok(coll
            .docs
            .iter()
            .filter(|d| filter.matches(d))
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn find_one(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        validate_collection_name(collection)?;
        let state = self.online()?;
        Ok(state
            .collections
            .get(collection)
            .and_then(|c| position(c, id).map(|i| c.docs[i].clone())))
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<String> {
        validate_collection_name(collection)?;
        let mut state = self.online()?;
        if state.failing_inserts.contains(collection) {
            return Err(AppError::connection(format!(
                "insertion refusée dans '{}' (simulation)",
                collection
            )));
        }

        let coll = state.collections.entry(collection.to_string()).or_default();
        let (id, stored) = with_new_id(doc);
        ensure_unique(collection, &coll.unique, &stored, coll.docs.iter())?;
        coll.docs.push(stored);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, changes: Document) -> Result<u64> {
        validate_collection_name(collection)?;
        let mut state = self.online()?;
        let Some(coll) = state.collections.get_mut(collection) else {
            return Ok(0);
        };
        let Some(i) = position(coll, id) else {
            return Ok(0);
        };

        let mut updated = coll.docs[i].clone();
        if !apply_set(&mut updated, &changes) {
            return Ok(0);
        }
        ensure_unique(collection, &coll.unique, &updated, coll.docs.iter())?;
        coll.docs[i] = updated;
        Ok(1)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<u64> {
        validate_collection_name(collection)?;
        let mut state = self.online()?;
        let Some(coll) = state.collections.get_mut(collection) else {
            return Ok(0);
        };
        match position(coll, id) {
            Some(i) => {
                coll.docs.remove(i);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        validate_collection_name(collection)?;
        let mut state = self.online()?;
        state.collections.entry(collection.to_string()).or_default();
        Ok(())
    }

    async fn create_unique_index(&self, collection: &str, field: &str) -> Result<()> {
        validate_collection_name(collection)?;
        let mut state = self.online()?;
        let coll = state.collections.entry(collection.to_string()).or_default();
        if coll.unique.iter().any(|f| f == field) {
            return Ok(());
        }
        let fields = [field.to_string()];
        for (i, doc) in coll.docs.iter().enumerate() {
            ensure_unique(collection, &fields, doc, coll.docs[..i].iter())?;
        }
        coll.unique.push(field.to_string());
        Ok(())
    }
}
