// FICHIER : src-app/src/admin/form.rs

//! Formulaires dynamiques : un widget par champ, choisi d'après le registre
//! (heuristique de nom en repli), puis réassemblage en document à la soumission.

use crate::admin::coercion;
use crate::admin::schema::{FieldKind, SchemaRegistry};
use crate::store::{Document, DocumentStore, Filter, ID_FIELD};
use crate::utils::json::{self, Map, Value};
use crate::utils::{AppError, Result};

pub const TIMESTAMP_PLACEHOLDER: &str = "ISO datetime (e.g. 2025-11-21T09:00:00)";
pub const MISSING_PREFIX: &str = "(missing)";
/// Sous-champ numérique des champs composites.
pub const AMOUNT_SUBFIELD: &str = "amount";

pub fn choose_label(target: &str) -> String {
    format!("-- choose {} --", target)
}

/// Option d'une liste de référence. `id == None` : l'option « non choisi ».
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefOption {
    pub label: String,
    pub id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    Select {
        target: String,
        options: Vec<RefOption>,
        selected: usize,
        required: bool,
    },
    Composite {
        inputs: Vec<(String, String)>,
    },
    MultiLine {
        text: String,
    },
    Line {
        text: String,
        placeholder: Option<String>,
    },
}

impl Widget {
    pub fn describe(&self) -> &'static str {
        match self {
            Widget::Select { .. } => "select",
            Widget::Composite { .. } => "composite",
            Widget::MultiLine { .. } => "multiline",
            Widget::Line { .. } => "line",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub widget: Widget,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormMode {
    Insert,
    Edit { id: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormModel {
    collection: String,
    mode: FormMode,
    fields: Vec<FormField>,
}

impl FormModel {
    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn mode(&self) -> &FormMode {
        &self.mode
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FormField> {
        self.fields.iter().find(|f| f.name == name)
    }

    fn widget_mut(&mut self, name: &str) -> Result<&mut Widget> {
        self.fields
            .iter_mut()
            .find(|f| f.name == name)
            .map(|f| &mut f.widget)
            .ok_or_else(|| AppError::validation(format!("Champ inconnu : {}", name)))
    }

    /// Saisie d'un champ texte (ligne ou multiligne).
    pub fn set_text(&mut self, name: &str, value: &str) -> Result<()> {
        match self.widget_mut(name)? {
            Widget::Line { text, .. } | Widget::MultiLine { text } => {
                *text = value.to_string();
                Ok(())
            }
            other => Err(AppError::validation(format!(
                "'{}' n'est pas un champ texte ({})",
                name,
                other.describe()
            ))),
        }
    }

    pub fn set_subfield(&mut self, name: &str, sub: &str, value: &str) -> Result<()> {
        match self.widget_mut(name)? {
            Widget::Composite { inputs } => match inputs.iter_mut().find(|(s, _)| s == sub) {
                Some((_, raw)) => {
                    *raw = value.to_string();
                    Ok(())
                }
                None => Err(AppError::validation(format!(
                    "Sous-champ inconnu : {}.{}",
                    name, sub
                ))),
            },
            other => Err(AppError::validation(format!(
                "'{}' n'est pas un champ composite ({})",
                name,
                other.describe()
            ))),
        }
    }

    /// Sélection par position dans la liste (0 = non choisi).
    pub fn choose(&mut self, name: &str, index: usize) -> Result<()> {
        match self.widget_mut(name)? {
            Widget::Select {
                options, selected, ..
            } => {
                if index >= options.len() {
                    return Err(AppError::validation(format!(
                        "Option {} hors limites pour '{}'",
                        index, name
                    )));
                }
                *selected = index;
                Ok(())
            }
            other => Err(AppError::validation(format!(
                "'{}' n'est pas une liste de sélection ({})",
                name,
                other.describe()
            ))),
        }
    }

    /// Sélection par identifiant de document cible.
    pub fn choose_id(&mut self, name: &str, id: &str) -> Result<()> {
        let index = match self.field(name).map(|f| &f.widget) {
            Some(Widget::Select { options, .. }) => options
                .iter()
                .position(|o| o.id.as_deref() == Some(id))
                .ok_or_else(|| {
                    AppError::validation(format!("'{}' : identifiant absent de la liste", name))
                })?,
            _ => {
                return Err(AppError::validation(format!(
                    "'{}' n'est pas une liste de sélection",
                    name
                )))
            }
        };
        self.choose(name, index)
    }

    /// Réassemble le document à soumettre. Une référence obligatoire non
    /// choisie est une erreur de validation (aucun appel au magasin).
    ///
    /// Les champs texte repassent par `from_input` : un texte numérique
    /// (`"01000000000"`) revient comme nombre, même sans modification.
    pub fn to_document(&self) -> Result<Document> {
        let mut doc = Document::new();
        for field in &self.fields {
            match &field.widget {
                Widget::Select {
                    options,
                    selected,
                    required,
                    target,
                } => {
                    let id = options.get(*selected).and_then(|o| o.id.clone());
                    if id.is_none() && *required {
                        return Err(AppError::validation(format!(
                            "Sélection obligatoire pour '{}' ({})",
                            field.name, target
                        )));
                    }
                    doc.insert(field.name.clone(), id.map(Value::String).unwrap_or(Value::Null));
                }
                Widget::Composite { inputs } => {
                    if let Some(obj) = assemble_composite(inputs) {
                        doc.insert(field.name.clone(), Value::Object(obj));
                    }
                }
                Widget::MultiLine { text } | Widget::Line { text, .. } => {
                    doc.insert(field.name.clone(), coercion::from_input(text));
                }
            }
        }
        doc.remove(ID_FIELD);
        Ok(doc)
    }
}

/// Sous-saisies non vides ; `None` si toutes sont vides.
pub fn assemble_composite(inputs: &[(String, String)]) -> Option<Map<String, Value>> {
    let mut obj = Map::new();
    for (sub, raw) in inputs {
        let raw = raw.trim();
        if raw.is_empty() {
            continue;
        }
        // Seul le montant est typé ; les autres sous-champs restent du texte
        let value = if sub == AMOUNT_SUBFIELD {
            coercion::parse_number(raw).unwrap_or_else(|| Value::String(raw.to_string()))
        } else {
            Value::String(raw.to_string())
        };
        obj.insert(sub.clone(), value);
    }
    (!obj.is_empty()).then_some(obj)
}

/// Saisie JSON brute quand aucun champ ne peut être déduit.
pub fn parse_raw_document(text: &str) -> Result<Document> {
    let mut doc = json::parse_object(text)?;
    doc.remove(ID_FIELD);
    Ok(doc)
}

// --- CONSTRUCTION ---

pub struct FormBuilder<'a> {
    store: &'a dyn DocumentStore,
    registry: &'a SchemaRegistry,
    lookup_limit: usize,
}

impl<'a> FormBuilder<'a> {
    pub fn new(
        store: &'a dyn DocumentStore,
        registry: &'a SchemaRegistry,
        lookup_limit: usize,
    ) -> Self {
        Self {
            store,
            registry,
            lookup_limit,
        }
    }

    /// Formulaire d'insertion. `None` : aucun champ déductible, saisie JSON brute.
    pub async fn insert_form(
        &self,
        collection: &str,
        sample: &[Document],
    ) -> Result<Option<FormModel>> {
        let names = self.registry.form_fields(collection, sample);
        if names.is_empty() {
            return Ok(None);
        }
        let mut fields = Vec::with_capacity(names.len());
        for name in names {
            fields.push(self.build_field(collection, &name, None).await?);
        }
        Ok(Some(FormModel {
            collection: collection.to_string(),
            mode: FormMode::Insert,
            fields,
        }))
    }

    /// Formulaire d'édition pré-rempli à partir du document courant.
    pub async fn edit_form(&self, collection: &str, doc: &Document) -> Result<FormModel> {
        let id = doc
            .get(ID_FIELD)
            .map(coercion::to_edit)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| AppError::validation("Document sans _id : édition impossible"))?;

        let mut fields = Vec::new();
        for (name, value) in doc.iter().filter(|(k, _)| k.as_str() != ID_FIELD) {
            fields.push(self.build_field(collection, name, Some(value)).await?);
        }
        Ok(FormModel {
            collection: collection.to_string(),
            mode: FormMode::Edit { id },
            fields,
        })
    }

    async fn build_field(
        &self,
        collection: &str,
        name: &str,
        current: Option<&Value>,
    ) -> Result<FormField> {
        let kind = self.registry.field_kind(collection, name);
        let widget = match kind {
            FieldKind::Reference { target } => {
                let mut options = self.reference_options(&target).await?;
                let selected = preselect(&mut options, current);
                Widget::Select {
                    required: self.registry.is_required(collection, name),
                    target,
                    options,
                    selected,
                }
            }
            // Valeur existante non structurée : édition en ligne simple
            FieldKind::Composite { .. }
                if current.map(|v| !v.is_null() && !v.is_object()).unwrap_or(false) =>
            {
                Widget::Line {
                    text: current.map(coercion::to_edit).unwrap_or_default(),
                    placeholder: None,
                }
            }
            FieldKind::Composite { subfields } => {
                let existing = current.and_then(Value::as_object);
                Widget::Composite {
                    inputs: subfields
                        .into_iter()
                        .map(|sub| {
                            let raw = existing
                                .and_then(|o| o.get(&sub))
                                .map(coercion::to_edit)
                                .unwrap_or_default();
                            (sub, raw)
                        })
                        .collect(),
                }
            }
            FieldKind::LongText => Widget::MultiLine {
                text: current.map(coercion::to_edit).unwrap_or_default(),
            },
            FieldKind::Timestamp => Widget::Line {
                text: current.map(coercion::to_edit).unwrap_or_default(),
                placeholder: Some(TIMESTAMP_PLACEHOLDER.to_string()),
            },
            FieldKind::Plain => Widget::Line {
                text: current.map(coercion::to_edit).unwrap_or_default(),
                placeholder: None,
            },
        };
        Ok(FormField {
            name: name.to_string(),
            widget,
        })
    }

    async fn reference_options(&self, target: &str) -> Result<Vec<RefOption>> {
        let docs = self
            .store
            .find(target, &Filter::all(), Some(self.lookup_limit))
            .await?;
        let mut options = Vec::with_capacity(docs.len() + 1);
        options.push(RefOption {
            label: choose_label(target),
            id: None,
        });
        for doc in &docs {
            let Some(id) = doc.get(ID_FIELD).map(coercion::to_edit) else {
                continue;
            };
            options.push(RefOption {
                label: self.registry.label_for(target, doc),
                id: Some(id),
            });
        }
        Ok(options)
    }
}

// Positionne la liste sur la valeur courante ; une valeur absente de la
// liste est conservée sous forme d'option « (missing) ».
fn preselect(options: &mut Vec<RefOption>, current: Option<&Value>) -> usize {
    let Some(id) = current.filter(|v| !v.is_null()).map(coercion::to_edit) else {
        return 0;
    };
    if let Some(i) = options.iter().position(|o| o.id.as_deref() == Some(id.as_str())) {
        return i;
    }
    options.push(RefOption {
        label: format!("{} {}", MISSING_PREFIX, id),
        id: Some(id),
    });
    options.len() - 1
}
