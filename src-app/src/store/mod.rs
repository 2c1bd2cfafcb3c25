// FICHIER : src-app/src/store/mod.rs

//! Passerelle vers le magasin de documents.
//!
//! Le trait [`DocumentStore`] est la seule porte d'entrée des couches
//! supérieures (admin, sessions, CLI). Deux moteurs l'implémentent :
//! [`file::FileStore`] (un fichier JSON par document) et
//! [`memory::MemoryStore`] (en RAM, avec injection de pannes).

pub mod aggregate;
pub mod cache;
pub mod file;
pub mod filter;
pub mod memory;
pub mod seed;
pub mod worker;

use crate::utils::json::{self, Map, Value};
use crate::utils::{async_trait, AppError, Result, Uuid};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

pub use filter::Filter;

/// Document : mapping ordonné champ → valeur.
pub type Document = Map<String, Value>;

/// Champ identifiant, posé par le magasin et jamais modifié ensuite.
pub const ID_FIELD: &str = "_id";

pub const MEMBERSHIP_LEVELS: &str = "membershipLevels";
pub const MEMBERS: &str = "members";
pub const FACILITIES: &str = "facilities";
pub const BOOKINGS: &str = "bookings";
pub const USAGE_LOGS: &str = "usageLogs";
pub const NOTIFICATIONS: &str = "notifications";

/// Les six collections connues de l'interface.
pub const COLLECTIONS: [&str; 6] = [
    MEMBERSHIP_LEVELS,
    MEMBERS,
    FACILITIES,
    BOOKINGS,
    USAGE_LOGS,
    NOTIFICATIONS,
];

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_collections(&self) -> Result<BTreeSet<String>>;

    /// Documents filtrés, dans l'ordre naturel (ordre d'insertion), tronqués à `limit`.
    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Document>>;

    async fn find_one(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Insère un document et renvoie l'identifiant généré. Un `_id` fourni est ignoré.
    async fn insert(&self, collection: &str, doc: Document) -> Result<String>;

    /// Mise à jour partielle (`$set`) : 1 si le document a changé, 0 sinon.
    async fn update(&self, collection: &str, id: &str, changes: Document) -> Result<u64>;

    async fn delete(&self, collection: &str, id: &str) -> Result<u64>;

    async fn ensure_collection(&self, collection: &str) -> Result<()>;

    async fn create_unique_index(&self, collection: &str, field: &str) -> Result<()>;

    async fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        Ok(self.find(collection, filter, None).await?.len() as u64)
    }

    async fn aggregate(&self, collection: &str, pipeline: &[Value]) -> Result<Vec<Document>> {
        let docs = self.find(collection, &Filter::all(), None).await?;
        aggregate::run(docs, pipeline)
    }
}

// --- HELPERS COMMUNS AUX MOTEURS ---

fn collection_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("regex littérale valide"))
}

pub fn validate_collection_name(name: &str) -> Result<()> {
    if collection_name_re().is_match(name) {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Nom de collection invalide : '{}'",
            name
        )))
    }
}

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

pub fn document_id(doc: &Document) -> Option<&str> {
    doc.get(ID_FIELD).and_then(Value::as_str)
}

/// Convertit une valeur JSON en document (objet obligatoire).
pub fn into_document(value: Value) -> Result<Document> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(AppError::validation(format!(
            "Un document doit être un objet JSON, reçu : {}",
            json::type_name(&other)
        ))),
    }
}

/// Prépare un document à l'insertion : `_id` généré en tête, `_id` fourni ignoré.
pub fn with_new_id(doc: Document) -> (String, Document) {
    let id = new_id();
    let mut stored = Document::new();
    stored.insert(ID_FIELD.to_string(), Value::String(id.clone()));
    for (k, v) in doc {
        if k != ID_FIELD {
            stored.insert(k, v);
        }
    }
    (id, stored)
}

/// Applique un `$set` de premier niveau. Renvoie `true` si le document a changé.
pub fn apply_set(doc: &mut Document, changes: &Document) -> bool {
    let mut changed = false;
    for (k, v) in changes {
        if k == ID_FIELD {
            continue;
        }
        if doc.get(k) != Some(v) {
            doc.insert(k.clone(), v.clone());
            changed = true;
        }
    }
    changed
}

/// Vérifie les index uniques de `candidate` contre les autres documents.
/// Les valeurs absentes ou nulles ne sont pas contraintes.
pub fn ensure_unique<'a>(
    collection: &str,
    unique_fields: &[String],
    candidate: &Document,
    others: impl Iterator<Item = &'a Document>,
) -> Result<()> {
    if unique_fields.is_empty() {
        return Ok(());
    }
    let own_id = document_id(candidate);
    for other in others {
        if own_id.is_some() && document_id(other) == own_id {
            continue;
        }
        for field in unique_fields {
            match candidate.get(field) {
                None | Some(Value::Null) => continue,
                Some(value) if other.get(field) == Some(value) => {
                    return Err(AppError::DuplicateKey {
                        collection: collection.to_string(),
                        field: field.clone(),
                        value: value.to_string(),
                    });
                }
                _ => {}
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::json::json;

    fn doc(v: Value) -> Document {
        into_document(v).unwrap()
    }

    #[test]
    fn test_collection_names() {
        assert!(validate_collection_name("usageLogs").is_ok());
        assert!(validate_collection_name("my_col-2").is_ok());
        assert!(validate_collection_name("../etc").is_err());
        assert!(validate_collection_name("").is_err());
    }

    #[test]
    fn test_with_new_id_ignores_caller_id() {
        let (id, stored) = with_new_id(doc(json!({"_id": "mine", "name": "Gym A"})));
        assert_ne!(id, "mine");
        assert_eq!(document_id(&stored), Some(id.as_str()));
        assert_eq!(stored.keys().next().map(String::as_str), Some(ID_FIELD));
    }

    #[test]
    fn test_apply_set_keeps_other_fields_and_id() {
        let mut d = doc(json!({"_id": "1", "name": "Pool", "status": "open"}));
        let changed = apply_set(&mut d, &doc(json!({"_id": "2", "status": "closed"})));
        assert!(changed);
        assert_eq!(d["_id"], "1");
        assert_eq!(d["name"], "Pool");
        assert_eq!(d["status"], "closed");

        assert!(!apply_set(&mut d, &doc(json!({"status": "closed"}))));
    }

    #[test]
    fn test_ensure_unique() {
        let uniques = vec!["email".to_string()];
        let existing = [doc(json!({"_id": "1", "email": "a@b.c"}))];

        let dup = doc(json!({"email": "a@b.c"}));
        let res = ensure_unique("members", &uniques, &dup, existing.iter());
        assert!(matches!(res, Err(AppError::DuplicateKey { .. })));

        // Le document lui-même ne compte pas (mise à jour)
        let same = doc(json!({"_id": "1", "email": "a@b.c"}));
        assert!(ensure_unique("members", &uniques, &same, existing.iter()).is_ok());

        // Null n'est pas contraint
        let none = doc(json!({"email": null}));
        assert!(ensure_unique("members", &uniques, &none, existing.iter()).is_ok());
    }
}
