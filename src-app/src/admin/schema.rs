// FICHIER : src-app/src/admin/schema.rs

//! Registre versionné des champs par collection, et inférence de colonnes
//! à partir d'un échantillon quand le registre ne sait rien.

use crate::admin::coercion;
use crate::store::{Document, COLLECTIONS, ID_FIELD};
use crate::utils::{AppConfig, AppError, Result};
use include_dir::{include_dir, Dir};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// --- EMBARQUEMENT DES SCHÉMAS ---
static BUILTIN_SCHEMAS: Dir = include_dir!("$CARGO_MANIFEST_DIR/schemas/v1");

pub const SCHEMA_VERSION: u32 = 1;
pub const SCHEMA_SUFFIX: &str = ".schema.json";

/// Colonnes prioritaires quand la collection n'a pas de schéma.
pub const DEFAULT_PREFERRED: [&str; 10] = [
    "_id",
    "name",
    "firstName",
    "lastName",
    "email",
    "type",
    "status",
    "startTime",
    "endTime",
    "sentAt",
];

/// Nombre de documents de l'échantillon examinés pour un formulaire d'insertion.
pub const FORM_SAMPLE_SIZE: usize = 10;

const LONG_TEXT_NAMES: [&str; 4] = ["notes", "message", "maintenanceNote", "description"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FieldKind {
    Reference {
        target: String,
    },
    Composite {
        subfields: Vec<String>,
    },
    LongText,
    Timestamp,
    #[default]
    Plain,
}

impl FieldKind {
    /// Heuristique de repli pour un champ absent du registre.
    pub fn guess(field: &str) -> FieldKind {
        if let Some(target) = reference_target(field) {
            return FieldKind::Reference { target };
        }
        if LONG_TEXT_NAMES.contains(&field)
            || (field.ends_with('s') && field != "status" && field != "type")
        {
            return FieldKind::LongText;
        }
        if looks_like_timestamp(field) {
            return FieldKind::Timestamp;
        }
        FieldKind::Plain
    }
}

// `memberId` → members, `facilityId` → facilities, ...
fn reference_target(field: &str) -> Option<String> {
    let stem = field.strip_suffix("Id").filter(|s| !s.is_empty())?;
    let plural = match stem.strip_suffix('y') {
        Some(base) => format!("{}ies", base),
        None => format!("{}s", stem),
    };
    COLLECTIONS
        .iter()
        .find(|c| c.eq_ignore_ascii_case(&plural))
        .map(|c| c.to_string())
}

// `createdAt`, `sentAt`, `startTime`, `endDate`... Le suffixe `At` est
// sensible à la casse : `status` ou `format` restent des champs simples.
fn looks_like_timestamp(field: &str) -> bool {
    let lower = field.to_lowercase();
    lower.contains("date")
        || lower.contains("time")
        || field.ends_with("At")
        || lower.starts_with("start")
        || lower.starts_with("end")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSchema {
    pub collection: String,
    pub version: u32,
    #[serde(default)]
    pub preferred_columns: Vec<String>,
    #[serde(default)]
    pub label_fields: Vec<String>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl CollectionSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, CollectionSchema>,
}

impl SchemaRegistry {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Schémas embarqués dans le binaire.
    pub fn builtin() -> Result<Self> {
        let mut registry = Self::empty();
        for file in BUILTIN_SCHEMAS.files() {
            let name = file.path().display().to_string();
            if !name.ends_with(SCHEMA_SUFFIX) {
                continue;
            }
            let content = file.contents_utf8().ok_or_else(|| {
                AppError::Config(format!("Schéma embarqué non UTF-8 : {}", name))
            })?;
            let schema: CollectionSchema = serde_json::from_str(content).map_err(|e| {
                AppError::Config(format!("Schéma embarqué invalide {} : {}", name, e))
            })?;
            registry.insert(schema)?;
        }
        Ok(registry)
    }

    /// Schémas embarqués, remplacés collection par collection par ceux de `dir`.
    pub fn with_overrides(dir: &Path) -> Result<Self> {
        let mut registry = Self::builtin()?;
        if !dir.exists() {
            return Ok(registry);
        }
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_schema = path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| n.ends_with(SCHEMA_SUFFIX))
                .unwrap_or(false);
            if !is_schema {
                continue;
            }
            let parsed = fs::read_to_string(&path)
                .map_err(AppError::from)
                .and_then(|c| serde_json::from_str::<CollectionSchema>(&c).map_err(AppError::from));
            match parsed {
                Ok(schema) => {
                    tracing::info!("📐 Schéma surchargé : {} ({:?})", schema.collection, path);
                    if let Err(e) = registry.insert(schema) {
                        tracing::warn!("⚠️ Schéma ignoré {:?} : {}", path, e);
                    }
                }
                Err(e) => tracing::warn!("⚠️ Schéma illisible ignoré {:?} : {}", path, e),
            }
        }
        Ok(registry)
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::with_overrides(&config.schemas_dir())
    }

    pub fn insert(&mut self, schema: CollectionSchema) -> Result<()> {
        if schema.version != SCHEMA_VERSION {
            return Err(AppError::Config(format!(
                "Version de schéma non supportée pour {} : {}",
                schema.collection, schema.version
            )));
        }
        self.schemas.insert(schema.collection.clone(), schema);
        Ok(())
    }

    pub fn get(&self, collection: &str) -> Option<&CollectionSchema> {
        self.schemas.get(collection)
    }

    pub fn collections(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Type du champ : registre d'abord, heuristique sinon.
    pub fn field_kind(&self, collection: &str, field: &str) -> FieldKind {
        self.get(collection)
            .and_then(|s| s.field(field))
            .map(|f| f.kind.clone())
            .unwrap_or_else(|| FieldKind::guess(field))
    }

    pub fn is_required(&self, collection: &str, field: &str) -> bool {
        self.get(collection)
            .and_then(|s| s.field(field))
            .map(|f| f.required)
            .unwrap_or(false)
    }

    pub fn preferred_columns(&self, collection: &str) -> Vec<String> {
        match self.get(collection) {
            Some(s) if !s.preferred_columns.is_empty() => s.preferred_columns.clone(),
            _ => DEFAULT_PREFERRED.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Colonnes du tableau pour un échantillon de `collection`.
    pub fn columns(&self, collection: &str, sample: &[Document]) -> Vec<String> {
        let preferred = self.preferred_columns(collection);
        let refs: Vec<&str> = preferred.iter().map(String::as_str).collect();
        infer_columns(sample, &refs)
    }

    /// Libellé humain d'un document cible de référence ; l'identifiant à défaut.
    pub fn label_for(&self, target: &str, doc: &Document) -> String {
        let fields: Vec<&str> = match self.get(target) {
            Some(s) if !s.label_fields.is_empty() => {
                s.label_fields.iter().map(String::as_str).collect()
            }
            _ => vec!["name"],
        };
        let label = fields
            .iter()
            .filter_map(|f| doc.get(*f))
            .map(coercion::to_cell)
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let label = label.trim();
        if label.is_empty() {
            doc.get(ID_FIELD).map(coercion::to_cell).unwrap_or_default()
        } else {
            label.to_string()
        }
    }

    /// Champs d'un formulaire d'insertion : registre, puis champs découverts
    /// dans les premiers documents de l'échantillon. Jamais `_id`.
    pub fn form_fields(&self, collection: &str, sample: &[Document]) -> Vec<String> {
        let mut fields: Vec<String> = self
            .get(collection)
            .map(|s| s.fields.iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default();
        for doc in sample.iter().take(FORM_SAMPLE_SIZE) {
            for key in doc.keys() {
                if !fields.iter().any(|f| f == key) {
                    fields.push(key.clone());
                }
            }
        }
        fields.retain(|f| f != ID_FIELD);
        fields
    }
}

/// Colonnes préférées présentes dans l'échantillon (ordre préféré), puis les
/// autres champs dans l'ordre de première apparition. Chaque nom une seule fois.
pub fn infer_columns(sample: &[Document], preferred: &[&str]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for p in preferred {
        let present = sample.iter().any(|d| d.contains_key(*p));
        if present && !columns.iter().any(|c| c == p) {
            columns.push(p.to_string());
        }
    }
    for doc in sample {
        for key in doc.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}
