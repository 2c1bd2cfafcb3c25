// FICHIER : src-app/src/session/auth.rs

use crate::store::filter::Operator;
use crate::store::{Document, DocumentStore, Filter, MEMBERS};
use crate::utils::config::AdminConfig;
use crate::utils::{AppError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    Admin,
    Member(Document),
    Unauthorized,
}

/// Oriente une connexion vers l'espace admin ou membre.
///
/// Le nom est nettoyé des espaces ; le secret est comparé tel quel. Les
/// identifiants admin viennent de la configuration (nom insensible à la casse).
pub async fn authenticate(
    store: &dyn DocumentStore,
    admin: &AdminConfig,
    name: &str,
    secret: &str,
) -> Result<AuthOutcome> {
    let name = name.trim();
    if name.is_empty() || secret.is_empty() {
        return Err(AppError::validation(
            "Prénom et mot de passe sont obligatoires",
        ));
    }

    if name.to_lowercase() == admin.name.to_lowercase() && secret == admin.secret {
        tracing::info!("🔑 Connexion administrateur");
        return Ok(AuthOutcome::Admin);
    }

    let filter = Filter::eq("firstName", name).and("password", Operator::Eq, secret);
    match store.find(MEMBERS, &filter, Some(1)).await?.into_iter().next() {
        Some(member) => {
            tracing::info!("🔑 Connexion membre : {}", name);
            Ok(AuthOutcome::Member(member))
        }
        None => {
            tracing::warn!("⛔ Identifiants refusés pour '{}'", name);
            Ok(AuthOutcome::Unauthorized)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::into_document;
    use crate::store::memory::MemoryStore;
    use crate::utils::json::json;

    async fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert(
                MEMBERS,
                into_document(json!({"firstName": "Hesham", "password": "hesham123"})).unwrap(),
            )
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_auth_outcomes() {
        let store = store().await;
        let admin = AdminConfig::default();

        assert_eq!(
            authenticate(&store, &admin, "ADMIN", "admin123").await.unwrap(),
            AuthOutcome::Admin
        );
        assert_eq!(
            authenticate(&store, &admin, "admin", "wrong").await.unwrap(),
            AuthOutcome::Unauthorized
        );
        match authenticate(&store, &admin, " Hesham ", "hesham123").await.unwrap() {
            AuthOutcome::Member(doc) => assert_eq!(doc["firstName"], "Hesham"),
            other => panic!("membre attendu, reçu {:?}", other),
        }
        assert_eq!(
            authenticate(&store, &admin, "Hesham", "HESHAM123").await.unwrap(),
            AuthOutcome::Unauthorized
        );
    }

    #[tokio::test]
    async fn test_empty_credentials_rejected_before_store() {
        let store = MemoryStore::new();
        store.set_offline(true);
        let admin = AdminConfig::default();
        assert!(matches!(
            authenticate(&store, &admin, "  ", "x").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            authenticate(&store, &admin, "Hesham", "").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            authenticate(&store, &admin, "Hesham", "x").await,
            Err(AppError::Connection(_))
        ));
    }
}
