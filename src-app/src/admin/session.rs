// FICHIER : src-app/src/admin/session.rs

use crate::admin::browser::BrowserState;
use crate::admin::form::{self, FormBuilder, FormMode, FormModel};
use crate::admin::schema::SchemaRegistry;
use crate::store::{document_id, Document, DocumentStore};
use crate::utils::{AppConfig, AppError, Arc, Result};

/// Actions de l'administrateur. Les formulaires restent la propriété de
/// l'appelant : un échec de soumission ne les détruit pas.
#[derive(Debug, Clone, Copy)]
pub enum AdminCommand<'a> {
    Collections,
    Load(&'a str),
    Refresh,
    Filter(&'a str),
    Detail(usize),
    NewForm,
    EditForm(usize),
    Submit(&'a FormModel),
    SubmitRaw(&'a str),
    Delete(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AdminOutcome {
    Collections(Vec<String>),
    Loaded { collection: String, count: usize },
    Filtered(usize),
    Detail(Vec<(String, String)>),
    Form(FormModel),
    /// Aucun champ déductible : saisie JSON brute attendue.
    RawForm { collection: String },
    Inserted(String),
    Updated { id: String, changed: bool },
    Deleted(String),
}

pub struct AdminSession {
    store: Arc<dyn DocumentStore>,
    registry: Arc<SchemaRegistry>,
    browser: BrowserState,
    lookup_limit: usize,
}

impl AdminSession {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        registry: Arc<SchemaRegistry>,
        config: &AppConfig,
    ) -> Self {
        Self {
            store,
            registry,
            browser: BrowserState::from_config(config),
            lookup_limit: config.ui.lookup_limit,
        }
    }

    pub fn browser(&self) -> &BrowserState {
        &self.browser
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub async fn execute(&mut self, command: AdminCommand<'_>) -> Result<AdminOutcome> {
        tracing::debug!("🛠️ Commande admin : {:?}", command);
        match command {
            AdminCommand::Collections => {
                let names = self.store.list_collections().await?;
                Ok(AdminOutcome::Collections(names.into_iter().collect()))
            }
            AdminCommand::Load(collection) => self.load(collection).await,
            AdminCommand::Refresh => {
                let collection = self.current_collection()?;
                self.load(&collection).await
            }
            AdminCommand::Filter(query) => Ok(AdminOutcome::Filtered(self.browser.filter(query))),
            AdminCommand::Detail(row) => Ok(AdminOutcome::Detail(self.browser.detail(row)?)),
            AdminCommand::NewForm => {
                let collection = self.current_collection()?;
                let builder = FormBuilder::new(&*self.store, &self.registry, self.lookup_limit);
                match builder
                    .insert_form(&collection, self.browser.cache())
                    .await?
                {
                    Some(form) => Ok(AdminOutcome::Form(form)),
                    None => Ok(AdminOutcome::RawForm { collection }),
                }
            }
            AdminCommand::EditForm(row) => {
                let collection = self.current_collection()?;
                let doc = self.browser.select(row)?.clone();
                let builder = FormBuilder::new(&*self.store, &self.registry, self.lookup_limit);
                Ok(AdminOutcome::Form(builder.edit_form(&collection, &doc).await?))
            }
            AdminCommand::Submit(form) => {
                let doc = form.to_document()?;
                match form.mode() {
                    FormMode::Insert => self.insert(form.collection(), doc).await,
                    FormMode::Edit { id } => self.update(form.collection(), id, doc).await,
                }
            }
            AdminCommand::SubmitRaw(text) => {
                let collection = self.current_collection()?;
                let doc = form::parse_raw_document(text)?;
                self.insert(&collection, doc).await
            }
            AdminCommand::Delete(row) => self.delete(row).await,
        }
    }

    fn current_collection(&self) -> Result<String> {
        self.browser
            .collection()
            .map(str::to_string)
            .ok_or_else(|| AppError::validation("Aucune collection chargée"))
    }

    async fn load(&mut self, collection: &str) -> Result<AdminOutcome> {
        let count = self
            .browser
            .load(&*self.store, &self.registry, collection)
            .await?;
        Ok(AdminOutcome::Loaded {
            collection: collection.to_string(),
            count,
        })
    }

    async fn insert(&mut self, collection: &str, doc: Document) -> Result<AdminOutcome> {
        let id = self.store.insert(collection, doc).await?;
        tracing::info!("➕ {} : document {} inséré", collection, id);
        self.reload_quietly(collection).await;
        Ok(AdminOutcome::Inserted(id))
    }

    async fn update(&mut self, collection: &str, id: &str, doc: Document) -> Result<AdminOutcome> {
        let modified = self.store.update(collection, id, doc).await?;
        if modified == 0 && self.store.find_one(collection, id).await?.is_none() {
            return self.vanished(collection, id).await;
        }
        tracing::info!("✏️ {} : document {} mis à jour ({})", collection, id, modified);
        self.reload_quietly(collection).await;
        Ok(AdminOutcome::Updated {
            id: id.to_string(),
            changed: modified > 0,
        })
    }

    async fn delete(&mut self, row: usize) -> Result<AdminOutcome> {
        let collection = self.current_collection()?;
        let id = document_id(self.browser.select(row)?)
            .map(str::to_string)
            .ok_or_else(|| AppError::validation("Document sans _id : suppression impossible"))?;

        if self.store.delete(&collection, &id).await? == 0 {
            return self.vanished(&collection, &id).await;
        }
        tracing::info!("🗑️ {} : document {} supprimé", collection, id);
        self.reload_quietly(&collection).await;
        Ok(AdminOutcome::Deleted(id))
    }

    // Document disparu entre le chargement et l'action : on recharge la vue.
    async fn vanished(&mut self, collection: &str, id: &str) -> Result<AdminOutcome> {
        self.reload_quietly(collection).await;
        Err(AppError::not_found(format!("{}/{}", collection, id)))
    }

    async fn reload_quietly(&mut self, collection: &str) {
        if self.browser.collection() != Some(collection) {
            return;
        }
        if let Err(e) = self
            .browser
            .load(&*self.store, &self.registry, collection)
            .await
        {
            tracing::warn!("⚠️ Rechargement de {} impossible : {}", collection, e);
        }
    }
}
