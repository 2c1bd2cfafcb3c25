// FICHIER : src-app/src/admin/coercion.rs

//! Conversions entre valeurs de documents et texte saisi ou affiché.

use crate::utils::config::{DEFAULT_DETAIL_MAX_LEN, DEFAULT_DISPLAY_MAX_LEN};
use crate::utils::json::Value;

pub const ELLIPSIS: &str = "...";

/// Forme affichable d'une valeur, bornée à `max_len` caractères pour les
/// structures imbriquées. Les scalaires repassent à l'identique par
/// `from_input` ; une structure tronquée revient comme simple texte.
pub fn to_display(value: &Value, max_len: usize) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(_) | Value::Object(_) => truncate(&value.to_string(), max_len),
    }
}

/// `to_display` à la longueur de cellule par défaut.
pub fn to_cell(value: &Value) -> String {
    to_display(value, DEFAULT_DISPLAY_MAX_LEN)
}

/// `to_display` à la longueur du panneau de détail.
pub fn to_detail(value: &Value) -> String {
    to_display(value, DEFAULT_DETAIL_MAX_LEN)
}

/// Pré-remplissage d'un champ de formulaire : jamais tronqué.
pub fn to_edit(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let keep = max_len.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Interprète une saisie libre. Ordre des essais : booléen, entier,
/// flottant fini, JSON délimité par `[]`/`{}`, sinon le texte nettoyé.
pub fn from_input(raw: &str) -> Value {
    let text = raw.trim();
    if text.is_empty() {
        return Value::String(String::new());
    }
    if text.eq_ignore_ascii_case("true") {
        return Value::Bool(true);
    }
    if text.eq_ignore_ascii_case("false") {
        return Value::Bool(false);
    }
    if let Ok(i) = text.parse::<i64>() {
        return Value::from(i);
    }
    if let Some(n) = parse_finite(text) {
        return n;
    }
    if is_structured(text) {
        if let Ok(v) = serde_json::from_str::<Value>(text) {
            return v;
        }
    }
    Value::String(text.to_string())
}

/// Nombre (entier ou flottant fini) si le texte en est un.
pub fn parse_number(raw: &str) -> Option<Value> {
    let text = raw.trim();
    text.parse::<i64>()
        .ok()
        .map(Value::from)
        .or_else(|| parse_finite(text))
}

fn parse_finite(text: &str) -> Option<Value> {
    text.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(serde_json::Number::from_f64)
        .map(Value::Number)
}

fn is_structured(text: &str) -> bool {
    (text.starts_with('[') && text.ends_with(']')) || (text.starts_with('{') && text.ends_with('}'))
}
