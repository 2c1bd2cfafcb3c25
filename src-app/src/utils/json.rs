// FICHIER : src-app/src/utils/json.rs

use crate::utils::{AppError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

// --- RE-EXPORTS (Single Source of Truth pour le JSON) ---
pub use serde_json::{json, Map, Value};

/// Parse une chaîne JSON saisie par l'utilisateur en un type T.
/// L'erreur est une erreur de validation, avec un extrait du contenu.
pub fn parse<T: DeserializeOwned>(s: &str) -> Result<T> {
    serde_json::from_str(s).map_err(|e| {
        let snippet: String = s.chars().take(100).collect();
        AppError::Validation(format!("JSON invalide ({}) : {}", e, snippet))
    })
}

/// Parse une chaîne qui doit contenir un objet JSON.
pub fn parse_object(s: &str) -> Result<Map<String, Value>> {
    match parse::<Value>(s)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Validation(format!(
            "Un objet JSON est attendu, reçu : {}",
            type_name(&other)
        ))),
    }
}

/// Convertit un type T en chaîne JSON compacte.
pub fn stringify<T: Serialize>(v: &T) -> Result<String> {
    Ok(serde_json::to_string(v)?)
}

/// Convertit un type T en chaîne JSON formatée (pretty).
pub fn stringify_pretty<T: Serialize>(v: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(v)?)
}

/// Convertit un `serde_json::Value` en type T.
pub fn from_value<T: DeserializeOwned>(v: Value) -> Result<T> {
    Ok(serde_json::from_value(v)?)
}

/// Convertit un type T en `serde_json::Value`.
pub fn to_value<T: Serialize>(v: T) -> Result<Value> {
    Ok(serde_json::to_value(v)?)
}

/// Fusionne récursivement deux objets JSON (Deep Merge).
/// L'objet `b` écrase les valeurs de `a` en cas de conflit.
pub fn merge(a: &mut Value, b: Value) {
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            for (k, v) in b {
                merge(a.entry(k).or_insert(Value::Null), v);
            }
        }
        (a, b) => *a = b,
    }
}

pub fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
