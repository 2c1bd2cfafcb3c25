// FICHIER : src-app/src/utils/env.rs

use crate::utils::{AppError, Result};
use std::env;
use std::str::FromStr;

/// Récupère une variable d'environnement (Requis).
pub fn get(key: &str) -> Result<String> {
    env::var(key)
        .map_err(|_| AppError::Config(format!("Variable d'environnement manquante : {}", key)))
}

/// Récupère une variable d'environnement non vide (Optionnel).
pub fn get_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Récupère une variable d'environnement avec valeur par défaut.
pub fn get_or(key: &str, default: &str) -> String {
    get_optional(key).unwrap_or_else(|| default.to_string())
}

/// Récupère et parse une variable optionnelle (ex: CLUBHOUSE_MAX_ROWS=500).
/// Absente : `Ok(None)`. Présente mais illisible : erreur de configuration.
pub fn get_parsed<T: FromStr>(key: &str) -> Result<Option<T>> {
    match get_optional(key) {
        None => Ok(None),
        Some(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| AppError::Config(format!("Impossible de parser la variable : {}", key))),
    }
}

/// Indique si une feature flag est active (ex: "true", "1", "yes").
pub fn is_enabled(key: &str) -> bool {
    matches!(
        get_optional(key).map(|v| v.to_lowercase()).as_deref(),
        Some("true") | Some("1") | Some("yes") | Some("on")
    )
}
