// FICHIER : src-app/src/store/file.rs

//! Moteur fichier : un document = un fichier JSON.
//!
//! ```text
//! {data_root}/{database}/collections/{name}/{id}.json
//! {data_root}/{database}/collections/{name}/_meta.json   {"unique": [...], "items": [...]}
//! ```
//!
//! `items` conserve l'ordre d'insertion, qui est l'ordre naturel des lectures.

use crate::store::cache::Cache;
use crate::store::{
    apply_set, ensure_unique, validate_collection_name, with_new_id, Document, DocumentStore,
    Filter,
};
use crate::utils::json;
use crate::utils::{async_trait, AppConfig, AppError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

const META_FILE: &str = "_meta.json";

// --- CONFIGURATION ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStoreConfig {
    pub data_root: PathBuf,
    pub database: String,
    pub cache_capacity: usize,
    pub cache_ttl: Option<Duration>,
}

impl FileStoreConfig {
    pub fn new(data_root: impl Into<PathBuf>, database: &str) -> Self {
        Self {
            data_root: data_root.into(),
            database: database.to_string(),
            cache_capacity: 1000,
            cache_ttl: None,
        }
    }

    pub fn from_app(config: &AppConfig) -> Self {
        Self::new(config.data_root.clone(), &config.database)
    }

    pub fn db_root(&self) -> PathBuf {
        self.data_root.join(&self.database)
    }

    pub fn collections_root(&self) -> PathBuf {
        self.db_root().join("collections")
    }

    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.collections_root().join(collection)
    }

    fn meta_path(&self, collection: &str) -> PathBuf {
        self.collection_path(collection).join(META_FILE)
    }

    fn doc_path(&self, collection: &str, id: &str) -> PathBuf {
        self.collection_path(collection).join(format!("{id}.json"))
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
struct CollectionMeta {
    #[serde(default)]
    unique: Vec<String>,
    #[serde(default)]
    items: Vec<String>,
}

// --- MOTEUR ---

#[derive(Debug)]
pub struct FileStore {
    config: FileStoreConfig,
    cache: Cache<String, Document>,
    // Sérialise les écritures (meta + documents)
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Crée l'arborescence si besoin puis ouvre la base.
    pub async fn create(config: FileStoreConfig) -> Result<Self> {
        fs::create_dir_all(config.collections_root())
            .await
            .map_err(|e| io_failure(&config.db_root(), e))?;
        Self::open(config).await
    }

    /// Ouvre une base existante. Racine absente : base injoignable.
    pub async fn open(config: FileStoreConfig) -> Result<Self> {
        let root = config.db_root();
        if !fs::try_exists(&root).await.unwrap_or(false) {
            return Err(AppError::connection(format!(
                "base absente : {}",
                root.display()
            )));
        }
        tracing::debug!("📂 FileStore ouvert sur {:?}", root);
        Ok(Self {
            cache: Cache::new(config.cache_capacity, config.cache_ttl),
            config,
            write_lock: Mutex::new(()),
        })
    }

    pub fn config(&self) -> &FileStoreConfig {
        &self.config
    }

    pub fn cache(&self) -> &Cache<String, Document> {
        &self.cache
    }

    fn cache_key(collection: &str, id: &str) -> String {
        format!("{}/{}", collection, id)
    }

    async fn ensure_reachable(&self) -> Result<()> {
        let root = self.config.db_root();
        match fs::try_exists(&root).await {
            Ok(true) => Ok(()),
            Ok(false) => Err(AppError::connection(format!(
                "base absente : {}",
                root.display()
            ))),
            Err(e) => Err(io_failure(&root, e)),
        }
    }

    async fn read_meta(&self, collection: &str) -> Result<Option<CollectionMeta>> {
        let path = self.config.meta_path(collection);
        match fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(json::parse(&content).map_err(|e| {
                AppError::connection(format!("{} illisible : {}", path.display(), e))
            })?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_failure(&path, e)),
        }
    }

    async fn write_meta(&self, collection: &str, meta: &CollectionMeta) -> Result<()> {
        let path = self.config.meta_path(collection);
        let content = json::stringify_pretty(meta)?;
        atomic_write(&path, content.as_bytes())
            .await
            .map_err(|e| io_failure(&path, e))
    }

    async fn load_or_create_meta(&self, collection: &str) -> Result<CollectionMeta> {
        if let Some(meta) = self.read_meta(collection).await? {
            return Ok(meta);
        }
        let dir = self.config.collection_path(collection);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_failure(&dir, e))?;
        let meta = CollectionMeta::default();
        self.write_meta(collection, &meta).await?;
        tracing::info!("🗂️ Collection créée : {}", collection);
        Ok(meta)
    }

    async fn read_doc(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let key = Self::cache_key(collection, id);
        if let Some(doc) = self.cache.get(&key) {
            return Ok(Some(doc));
        }

        let path = self.config.doc_path(collection, id);
        let content = match fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_failure(&path, e)),
        };
        let doc: Document = json::parse(&content).map_err(|e| {
            AppError::connection(format!("{} corrompu : {}", path.display(), e))
        })?;

        self.cache.put(key, doc.clone());
        Ok(Some(doc))
    }

    async fn write_doc(&self, collection: &str, id: &str, doc: &Document) -> Result<()> {
        let path = self.config.doc_path(collection, id);
        let content = json::stringify_pretty(doc)?;
        atomic_write(&path, content.as_bytes())
            .await
            .map_err(|e| io_failure(&path, e))?;
        self.cache.put(Self::cache_key(collection, id), doc.clone());
        Ok(())
    }

    async fn load_all(&self, collection: &str, meta: &CollectionMeta) -> Result<Vec<Document>> {
        let mut docs = Vec::with_capacity(meta.items.len());
        for id in &meta.items {
            match self.read_doc(collection, id).await? {
                Some(doc) => docs.push(doc),
                None => tracing::warn!(
                    "⚠️ '{}' référencé dans {}/_meta.json mais fichier absent",
                    id,
                    collection
                ),
            }
        }
        Ok(docs)
    }
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn list_collections(&self) -> Result<BTreeSet<String>> {
        self.ensure_reachable().await?;
        let root = self.config.collections_root();
        let mut out = BTreeSet::new();
        let mut entries = match fs::read_dir(&root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(out),
            Err(e) => return Err(io_failure(&root, e)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_failure(&root, e))?
        {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if let (true, Ok(name)) = (is_dir, entry.file_name().into_string()) {
                out.insert(name);
            }
        }
        Ok(out)
    }

    async fn find(
        &self,
        collection: &str,
        filter: &Filter,
        limit: Option<usize>,
    ) -> Result<Vec<Document>> {
        self.ensure_reachable().await?;
        validate_collection_name(collection)?;
        let Some(meta) = self.read_meta(collection).await? else {
            return Ok(Vec::new());
        };

        let max = limit.unwrap_or(usize::MAX);
        let mut out = Vec::new();
        for id in &meta.items {
            if out.len() >= max {
                break;
            }
            if let Some(doc) = self.read_doc(collection, id).await? {
                if filter.matches(&doc) {
                    out.push(doc);
                }
            }
        }
        let stats = self.cache.stats();
        tracing::debug!(
            "🔎 {} : {} document(s) | cache {} hit / {} miss ({} entrées)",
            collection,
            out.len(),
            stats.hits,
            stats.misses,
            stats.len
        );
        Ok(out)
    }

    async fn find_one(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        self.ensure_reachable().await?;
        validate_collection_name(collection)?;
        match self.read_meta(collection).await? {
            Some(meta) if meta.items.iter().any(|i| i == id) => {
                self.read_doc(collection, id).await
            }
            _ => Ok(None),
        }
    }

    async fn insert(&self, collection: &str, doc: Document) -> Result<String> {
        self.ensure_reachable().await?;
        validate_collection_name(collection)?;
        let _guard = self.write_lock.lock().await;

        let mut meta = self.load_or_create_meta(collection).await?;
        let (id, stored) = with_new_id(doc);

        if !meta.unique.is_empty() {
            let existing = self.load_all(collection, &meta).await?;
            ensure_unique(collection, &meta.unique, &stored, existing.iter())?;
        }

        self.write_doc(collection, &id, &stored).await?;
        meta.items.push(id.clone());
        self.write_meta(collection, &meta).await?;

        tracing::debug!("➕ {}/{} inséré", collection, id);
        Ok(id)
    }

    async fn update(&self, collection: &str, id: &str, changes: Document) -> Result<u64> {
        self.ensure_reachable().await?;
        validate_collection_name(collection)?;
        let _guard = self.write_lock.lock().await;

        let Some(meta) = self.read_meta(collection).await? else {
            return Ok(0);
        };
        if !meta.items.iter().any(|i| i == id) {
            return Ok(0);
        }
        let Some(mut doc) = self.read_doc(collection, id).await? else {
            return Ok(0);
        };
        if !apply_set(&mut doc, &changes) {
            return Ok(0);
        }

        if !meta.unique.is_empty() {
            let existing = self.load_all(collection, &meta).await?;
            ensure_unique(collection, &meta.unique, &doc, existing.iter())?;
        }

        self.write_doc(collection, id, &doc).await?;
        tracing::debug!("✏️ {}/{} mis à jour", collection, id);
        Ok(1)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<u64> {
        self.ensure_reachable().await?;
        validate_collection_name(collection)?;
        let _guard = self.write_lock.lock().await;

        let Some(mut meta) = self.read_meta(collection).await? else {
            return Ok(0);
        };
        let Some(pos) = meta.items.iter().position(|i| i == id) else {
            return Ok(0);
        };

        let path = self.config.doc_path(collection, id);
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(io_failure(&path, e)),
        }
        meta.items.remove(pos);
        self.write_meta(collection, &meta).await?;
        self.cache.remove(&Self::cache_key(collection, id));

        tracing::debug!("🗑️ {}/{} supprimé", collection, id);
        Ok(1)
    }

    async fn ensure_collection(&self, collection: &str) -> Result<()> {
        self.ensure_reachable().await?;
        validate_collection_name(collection)?;
        let _guard = self.write_lock.lock().await;
        self.load_or_create_meta(collection).await.map(|_| ())
    }

    async fn create_unique_index(&self, collection: &str, field: &str) -> Result<()> {
        self.ensure_reachable().await?;
        validate_collection_name(collection)?;
        let _guard = self.write_lock.lock().await;

        let mut meta = self.load_or_create_meta(collection).await?;
        if meta.unique.iter().any(|f| f == field) {
            return Ok(());
        }

        // Les documents existants doivent déjà respecter l'index
        let existing = self.load_all(collection, &meta).await?;
        let fields = [field.to_string()];
        for (i, doc) in existing.iter().enumerate() {
            ensure_unique(collection, &fields, doc, existing[..i].iter())?;
        }

        meta.unique.push(field.to_string());
        self.write_meta(collection, &meta).await?;
        tracing::info!("🔑 Index unique créé : {}.{}", collection, field);
        Ok(())
    }
}

fn io_failure(path: &Path, e: std::io::Error) -> AppError {
    AppError::connection(format!("{} : {}", path.display(), e))
}

/// Écriture atomique (fichier temporaire, sync, rename).
pub async fn atomic_write(path: &Path, content: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("json.tmp");
    {
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(content).await?;
        file.sync_all().await?;
    }
    fs::rename(&temp_path, path).await
}
