// FICHIER : src-app/src/utils/error.rs

use serde::Serialize;
use std::io;

// --- RE-EXPORTS ANYHOW (Pour la flexibilité du CLI) ---
pub use anyhow::{anyhow, Context};
// On renomme le Result de anyhow pour ne pas qu'il écrase le nôtre
pub use anyhow::Result as AnyResult;

/// Type de résultat standard pour Clubhouse.
pub type Result<T> = std::result::Result<T, AppError>;

/// Enumération centrale des erreurs de l'application.
///
/// Les quatre premières variantes forment la taxonomie vue par l'utilisateur
/// (base injoignable, doublon, saisie invalide, document disparu). Les
/// suivantes couvrent l'environnement (configuration, fichiers, JSON).
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Base de données injoignable : {0}")]
    Connection(String),

    #[error("Clé dupliquée dans '{collection}' : {field} = {value}")]
    DuplicateKey {
        collection: String,
        field: String,
        value: String,
    },

    #[error("Saisie invalide : {0}")]
    Validation(String),

    #[error("Introuvable : {0}")]
    NotFound(String),

    #[error("Erreur de configuration : {0}")]
    Config(String),

    #[error("Erreur d'entrée/sortie : {0}")]
    Io(#[from] io::Error),

    #[error("Erreur de sérialisation : {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Erreur Système : {0}")]
    System(#[from] anyhow::Error),
}

impl AppError {
    pub fn connection(err: impl std::fmt::Display) -> Self {
        AppError::Connection(err.to_string())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    /// Clé de message (voir `locales/*.json`) associée à la famille d'erreur.
    pub fn message_key(&self) -> &'static str {
        match self {
            AppError::Connection(_) => "ERR_DB_UNREACHABLE",
            AppError::DuplicateKey { .. } => "ERR_DUPLICATE_KEY",
            AppError::Validation(_) => "ERR_VALIDATION",
            AppError::NotFound(_) => "ERR_NOT_FOUND",
            AppError::Config(_) => "ERR_CONFIG",
            AppError::Io(_) | AppError::Serialization(_) | AppError::System(_) => "ERR_SYSTEM",
        }
    }
}

// Sérialisation en simple chaîne : n'importe quel front (shell, GUI) reçoit
// le message tel qu'affiché.
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

// Permet de faire : return Err("Mon erreur".into());
impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::System(anyhow::anyhow!(s))
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::System(anyhow::anyhow!(s.to_string()))
    }
}
