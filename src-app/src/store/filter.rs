// FICHIER : src-app/src/store/filter.rs

//! Sous-langage de filtre : correspondance exacte et opérateurs
//! `$eq`, `$ne`, `$in`, `$gt`, `$gte`, `$lt`, `$lte` sur des chemins pointés.

use crate::store::Document;
use crate::utils::json::{Map, Value};
use crate::utils::{AppError, Result};
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Ne,
    In,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Operator {
    fn parse(token: &str) -> Result<Self> {
        match token {
            "$eq" => Ok(Operator::Eq),
            "$ne" => Ok(Operator::Ne),
            "$in" => Ok(Operator::In),
            "$gt" => Ok(Operator::Gt),
            "$gte" => Ok(Operator::Gte),
            "$lt" => Ok(Operator::Lt),
            "$lte" => Ok(Operator::Lte),
            other => Err(AppError::validation(format!(
                "Opérateur de filtre inconnu : {}",
                other
            ))),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "$eq",
            Operator::Ne => "$ne",
            Operator::In => "$in",
            Operator::Gt => "$gt",
            Operator::Gte => "$gte",
            Operator::Lt => "$lt",
            Operator::Lte => "$lte",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub path: String,
    pub op: Operator,
    pub value: Value,
}

/// Conjonction de conditions. Vide : tout correspond.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::all().and(path, Operator::Eq, value)
    }

    pub fn and(mut self, path: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            path: path.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// Lit un filtre JSON. `null` et `{}` correspondent à tout.
    pub fn parse(value: &Value) -> Result<Self> {
        let obj = match value {
            Value::Null => return Ok(Self::all()),
            Value::Object(obj) => obj,
            _ => {
                return Err(AppError::validation(
                    "Un filtre doit être un objet JSON".to_string(),
                ))
            }
        };

        let mut filter = Self::all();
        for (path, spec) in obj {
            if path.starts_with('$') {
                return Err(AppError::validation(format!(
                    "Opérateur non supporté au premier niveau : {}",
                    path
                )));
            }
            match spec {
                Value::Object(ops) if is_operator_map(ops) => {
                    for (token, operand) in ops {
                        let op = Operator::parse(token)?;
                        if op == Operator::In && !operand.is_array() {
                            return Err(AppError::validation(format!(
                                "$in attend une liste pour '{}'",
                                path
                            )));
                        }
                        filter = filter.and(path.clone(), op, operand.clone());
                    }
                }
                exact => filter = filter.and(path.clone(), Operator::Eq, exact.clone()),
            }
        }
        Ok(filter)
    }

    pub fn to_json(&self) -> Value {
        let mut out = Map::new();
        for c in &self.conditions {
            let entry = out
                .entry(c.path.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(ops) = entry {
                ops.insert(c.op.as_str().to_string(), c.value.clone());
            }
        }
        Value::Object(out)
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|c| c.matches(doc))
    }
}

fn is_operator_map(ops: &Map<String, Value>) -> bool {
    !ops.is_empty() && ops.keys().all(|k| k.starts_with('$'))
}

impl Condition {
    fn matches(&self, doc: &Document) -> bool {
        let actual = lookup(doc, &self.path);
        match self.op {
            Operator::Eq => equals_or_contains(actual, &self.value),
            Operator::Ne => !equals_or_contains(actual, &self.value),
            Operator::In => self
                .value
                .as_array()
                .map(|list| list.iter().any(|v| equals_or_contains(actual, v)))
                .unwrap_or(false),
            Operator::Gt => ordering(actual, &self.value) == Some(Ordering::Greater),
            Operator::Gte => matches!(
                ordering(actual, &self.value),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Operator::Lt => ordering(actual, &self.value) == Some(Ordering::Less),
            Operator::Lte => matches!(
                ordering(actual, &self.value),
                Some(Ordering::Less | Ordering::Equal)
            ),
        }
    }
}

/// Résout un chemin pointé (`payment.status`) dans un document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Value::Object(map) => map.get(part)?,
            Value::Array(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Égalité JSON, nombres comparés par valeur (1 == 1.0).
pub fn values_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

// Champ absent équivaut à null ; un tableau correspond s'il contient la valeur.
fn equals_or_contains(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(v) => values_equal(v, expected),
    }
}

fn ordering(actual: Option<&Value>, bound: &Value) -> Option<Ordering> {
    compare(actual?, bound)
}

/// Ordre entre valeurs du même type (nombres, chaînes, booléens).
/// Les horodatages RFC 3339 se comparent comme des chaînes.
pub fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

/// Ordre total pour les tris : null < booléens < nombres < chaînes < reste.
pub fn sort_order(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn rank(v: Option<&Value>) -> u8 {
        match v {
            None | Some(Value::Null) => 0,
            Some(Value::Bool(_)) => 1,
            Some(Value::Number(_)) => 2,
            Some(Value::String(_)) => 3,
            Some(Value::Array(_)) => 4,
            Some(Value::Object(_)) => 5,
        }
    }
    match (a, b) {
        (Some(x), Some(y)) => compare(x, y).unwrap_or_else(|| rank(a).cmp(&rank(b))),
        _ => rank(a).cmp(&rank(b)),
    }
}
