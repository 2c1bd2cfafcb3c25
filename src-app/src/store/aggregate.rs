// FICHIER : src-app/src/store/aggregate.rs

//! Pipeline d'agrégation : `$match`, `$group`, `$sort`, `$limit`.

use crate::store::filter::{self, Filter};
use crate::store::Document;
use crate::utils::json::{Map, Value};
use crate::utils::{AppError, Result};
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Group(GroupSpec),
    Sort(Vec<(String, bool)>),
    Limit(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupSpec {
    key: GroupKey,
    accumulators: Vec<(String, Accumulator)>,
}

#[derive(Debug, Clone, PartialEq)]
enum GroupKey {
    Field(String),
    Constant(Value),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AccKind {
    Sum,
    Avg,
    Min,
    Max,
}

#[derive(Debug, Clone, PartialEq)]
struct Accumulator {
    kind: AccKind,
    operand: Operand,
}

#[derive(Debug, Clone, PartialEq)]
enum Operand {
    Field(String),
    Literal(Value),
}

impl Operand {
    fn parse(v: &Value) -> Self {
        match v.as_str().and_then(|s| s.strip_prefix('$')) {
            Some(path) => Operand::Field(path.to_string()),
            None => Operand::Literal(v.clone()),
        }
    }

    fn eval<'a>(&'a self, doc: &'a Document) -> Option<&'a Value> {
        match self {
            Operand::Field(path) => filter::lookup(doc, path),
            Operand::Literal(v) => Some(v),
        }
    }
}

/// Analyse un pipeline JSON (liste d'étapes à une seule clé).
pub fn parse(pipeline: &[Value]) -> Result<Vec<Stage>> {
    pipeline.iter().map(parse_stage).collect()
}

fn parse_stage(raw: &Value) -> Result<Stage> {
    let obj = raw
        .as_object()
        .filter(|o| o.len() == 1)
        .ok_or_else(|| AppError::validation("Étape de pipeline invalide".to_string()))?;

    let (name, body) = match obj.iter().next() {
        Some(entry) => entry,
        None => return Err(AppError::validation("Étape de pipeline vide".to_string())),
    };

    match name.as_str() {
        "$match" => Ok(Stage::Match(Filter::parse(body)?)),
        "$group" => parse_group(body).map(Stage::Group),
        "$sort" => {
            let keys = body
                .as_object()
                .ok_or_else(|| AppError::validation("$sort attend un objet".to_string()))?;
            keys.iter()
                .map(|(field, dir)| match dir.as_i64() {
                    Some(1) => Ok((field.clone(), true)),
                    Some(-1) => Ok((field.clone(), false)),
                    _ => Err(AppError::validation(format!(
                        "$sort : direction invalide pour '{}'",
                        field
                    ))),
                })
                .collect::<Result<Vec<_>>>()
                .map(Stage::Sort)
        }
        "$limit" => body
            .as_u64()
            .map(|n| Stage::Limit(n as usize))
            .ok_or_else(|| AppError::validation("$limit attend un entier positif".to_string())),
        other => Err(AppError::validation(format!(
            "Étape de pipeline non supportée : {}",
            other
        ))),
    }
}

fn parse_group(body: &Value) -> Result<GroupSpec> {
    let obj = body
        .as_object()
        .ok_or_else(|| AppError::validation("$group attend un objet".to_string()))?;

    let key = match obj.get("_id") {
        None => {
            return Err(AppError::validation(
                "$group exige une clé _id".to_string(),
            ))
        }
        Some(v) => match Operand::parse(v) {
            Operand::Field(path) => GroupKey::Field(path),
            Operand::Literal(v) => GroupKey::Constant(v),
        },
    };

    let mut accumulators = Vec::new();
    for (out_field, spec) in obj.iter().filter(|(k, _)| k.as_str() != "_id") {
        let (op, operand) = spec
            .as_object()
            .filter(|o| o.len() == 1)
            .and_then(|o| o.iter().next())
            .ok_or_else(|| {
                AppError::validation(format!("Accumulateur invalide pour '{}'", out_field))
            })?;
        let kind = match op.as_str() {
            "$sum" => AccKind::Sum,
            "$avg" => AccKind::Avg,
            "$min" => AccKind::Min,
            "$max" => AccKind::Max,
            other => {
                return Err(AppError::validation(format!(
                    "Accumulateur non supporté : {}",
                    other
                )))
            }
        };
        accumulators.push((
            out_field.clone(),
            Accumulator {
                kind,
                operand: Operand::parse(operand),
            },
        ));
    }

    Ok(GroupSpec { key, accumulators })
}

/// Exécute un pipeline sur des documents déjà chargés.
pub fn run(docs: Vec<Document>, pipeline: &[Value]) -> Result<Vec<Document>> {
    let stages = parse(pipeline)?;
    Ok(execute(docs, &stages))
}

pub fn execute(mut docs: Vec<Document>, stages: &[Stage]) -> Vec<Document> {
    for stage in stages {
        docs = match stage {
            Stage::Match(f) => docs.into_iter().filter(|d| f.matches(d)).collect(),
            Stage::Group(spec) => group(&docs, spec),
            Stage::Sort(keys) => {
                // Tri stable : l'ordre d'entrée départage les égalités.
                docs.sort_by(|a, b| {
                    keys.iter()
                        .map(|(field, asc)| {
                            let o = filter::sort_order(
                                filter::lookup(a, field),
                                filter::lookup(b, field),
                            );
                            if *asc {
                                o
                            } else {
                                o.reverse()
                            }
                        })
                        .find(|o| *o != Ordering::Equal)
                        .unwrap_or(Ordering::Equal)
                });
                docs
            }
            Stage::Limit(n) => {
                docs.truncate(*n);
                docs
            }
        };
    }
    docs
}

#[derive(Default)]
struct AccState {
    sum: f64,
    all_integers: bool,
    count: usize,
    best: Option<Value>,
}

impl AccState {
    fn new() -> Self {
        Self {
            all_integers: true,
            ..Default::default()
        }
    }

    fn feed(&mut self, kind: AccKind, value: Option<&Value>) {
        match kind {
            AccKind::Sum | AccKind::Avg => {
                if let Some(n) = value.and_then(Value::as_f64) {
                    self.sum += n;
                    self.count += 1;
                    if !value.map(Value::is_i64).unwrap_or(false) {
                        self.all_integers = false;
                    }
                }
            }
            AccKind::Min | AccKind::Max => {
                let Some(v) = value.filter(|v| !v.is_null()) else {
                    return;
                };
                let replace = match &self.best {
                    None => true,
                    Some(best) => {
                        let o = filter::sort_order(Some(v), Some(best));
                        (kind == AccKind::Min && o == Ordering::Less)
                            || (kind == AccKind::Max && o == Ordering::Greater)
                    }
                };
                if replace {
                    self.best = Some(v.clone());
                }
            }
        }
    }

    fn finish(self, kind: AccKind) -> Value {
        match kind {
            AccKind::Sum if self.all_integers => Value::from(self.sum as i64),
            AccKind::Sum => Value::from(self.sum),
            AccKind::Avg if self.count == 0 => Value::Null,
            AccKind::Avg => Value::from(self.sum / self.count as f64),
            AccKind::Min | AccKind::Max => self.best.unwrap_or(Value::Null),
        }
    }
}

// Groupes dans l'ordre de première apparition de leur clé.
fn group(docs: &[Document], spec: &GroupSpec) -> Vec<Document> {
    let mut keys: Vec<Value> = Vec::new();
    let mut states: Vec<Vec<AccState>> = Vec::new();

    for doc in docs {
        let key = match &spec.key {
            GroupKey::Field(path) => filter::lookup(doc, path).cloned().unwrap_or(Value::Null),
            GroupKey::Constant(v) => v.clone(),
        };
        let slot = match keys.iter().position(|k| *k == key) {
            Some(i) => i,
            None => {
                keys.push(key);
                states.push(spec.accumulators.iter().map(|_| AccState::new()).collect());
                keys.len() - 1
            }
        };
        for ((_, acc), state) in spec.accumulators.iter().zip(states[slot].iter_mut()) {
            state.feed(acc.kind, acc.operand.eval(doc));
        }
    }

    keys.into_iter()
        .zip(states)
        .map(|(key, accs)| {
            let mut out = Map::new();
            out.insert("_id".to_string(), key);
            for ((name, acc), state) in spec.accumulators.iter().zip(accs) {
                out.insert(name.clone(), state.finish(acc.kind));
            }
            out
        })
        .collect()
}
