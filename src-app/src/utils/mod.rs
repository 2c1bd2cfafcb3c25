// FICHIER : src-app/src/utils/mod.rs

// =========================================================================
//  CLUBHOUSE UTILS - Foundation Layer
// =========================================================================

// --- 1. MODULES INTERNES ---

pub mod config;
pub mod env;
pub mod error;
pub mod i18n;
pub mod json;
pub mod logger;
pub mod macros;

// --- 2. FAÇADES SÉMANTIQUES ---
// Points d'entrée conseillés pour le code applicatif (store, admin, session, CLI).

/// **Core Foundation** : Types de base et Erreurs.
pub mod core {
    pub use super::error::{AppError, Result};
    pub use chrono::{DateTime, Utc};
    pub use uuid::Uuid;
}

/// **Data Abstraction** : Manipulation JSON.
pub mod data {
    pub use super::json::{
        from_value, json, merge, parse, parse_object, stringify, stringify_pretty, to_value, Map,
        Value,
    };
    pub use serde::{Deserialize, Serialize};
    pub use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
}

/// **Application Context** : Accès global Config/Log/Env/Messages.
pub mod context {
    pub use super::config::AppConfig;
    pub use super::env::{get, get_optional, get_or, is_enabled};
    pub use super::i18n::{init_i18n, t};
    pub use super::logger::init_logging;
}

/// **Le Prélude** : À utiliser via `use crate::utils::prelude::*;`
pub mod prelude {
    pub use super::context::AppConfig;
    pub use super::core::{AppError, Result, Utc, Uuid};
    pub use super::data::{json, Deserialize, Serialize, Value};
    pub use tracing::{debug, error, info, instrument, warn};
}

// =========================================================================
// 3. EXPORTS UTILITAIRES
// =========================================================================

// --> Config & Erreurs
pub use config::AppConfig;
pub use error::{AnyResult, AppError, Result};
pub use logger::init_logging;

// --> Domaine
pub use chrono::{DateTime, Utc};
pub use uuid::Uuid;

// --> Async Runtime & Sync
pub use std::sync::{Arc, Mutex, Once, OnceLock, RwLock};
pub use tokio::sync::{mpsc, oneshot};

// --> Macros externes
pub use async_trait::async_trait;
