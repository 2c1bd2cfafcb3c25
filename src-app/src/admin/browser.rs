// FICHIER : src-app/src/admin/browser.rs

use crate::admin::coercion;
use crate::admin::schema::SchemaRegistry;
use crate::store::{Document, DocumentStore, Filter};
use crate::utils::{AppConfig, AppError, Result};

/// Vue tabulaire d'une collection : échantillon en cache, colonnes, lignes visibles.
#[derive(Debug, Clone)]
pub struct BrowserState {
    collection: Option<String>,
    cache: Vec<Document>,
    columns: Vec<String>,
    // Indices dans `cache` des lignes visibles après filtrage
    rows: Vec<usize>,
    query: String,
    max_rows: usize,
    display_max_len: usize,
    detail_max_len: usize,
}

impl BrowserState {
    pub fn new(max_rows: usize, display_max_len: usize, detail_max_len: usize) -> Self {
        Self {
            collection: None,
            cache: Vec::new(),
            columns: Vec::new(),
            rows: Vec::new(),
            query: String::new(),
            max_rows,
            display_max_len,
            detail_max_len,
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.ui.max_rows,
            config.ui.display_max_len,
            config.ui.detail_max_len,
        )
    }

    /// Charge jusqu'à `max_rows` documents. En cas d'erreur, l'état précédent
    /// est conservé et l'erreur remonte à l'appelant.
    pub async fn load(
        &mut self,
        store: &dyn DocumentStore,
        registry: &SchemaRegistry,
        collection: &str,
    ) -> Result<usize> {
        let docs = store
            .find(collection, &Filter::all(), Some(self.max_rows))
            .await?;

        let same_collection = self.collection.as_deref() == Some(collection);
        self.columns = registry.columns(collection, &docs);
        self.cache = docs;
        self.collection = Some(collection.to_string());

        // Un rechargement de la même collection garde le filtre courant
        let query = if same_collection {
            std::mem::take(&mut self.query)
        } else {
            String::new()
        };
        self.filter(&query);

        tracing::debug!(
            "📋 {} : {} document(s), {} colonne(s)",
            collection,
            self.cache.len(),
            self.columns.len()
        );
        Ok(self.cache.len())
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn cache(&self) -> &[Document] {
        &self.cache
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn visible_count(&self) -> usize {
        self.rows.len()
    }

    pub fn render_row(&self, doc: &Document) -> Vec<String> {
        render_row(doc, &self.columns, self.display_max_len)
    }

    /// Lignes visibles, rendues colonne par colonne.
    pub fn table(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|&i| self.render_row(&self.cache[i]))
            .collect()
    }

    /// Document complet de la ligne visible `row`.
    pub fn select(&self, row: usize) -> Result<&Document> {
        self.rows
            .get(row)
            .map(|&i| &self.cache[i])
            .ok_or_else(|| {
                AppError::validation(format!(
                    "Ligne {} hors limites ({} visibles)",
                    row,
                    self.rows.len()
                ))
            })
    }

    /// Tous les champs du document, valeurs au format détail.
    pub fn detail(&self, row: usize) -> Result<Vec<(String, String)>> {
        let doc = self.select(row)?;
        Ok(doc
            .iter()
            .map(|(k, v)| (k.clone(), coercion::to_display(v, self.detail_max_len)))
            .collect())
    }

    /// Filtre sur le cache uniquement (sous-chaîne, insensible à la casse).
    /// Une requête vide restaure tout le cache.
    pub fn filter(&mut self, query: &str) -> usize {
        let needle = query.trim().to_lowercase();
        self.query = query.trim().to_string();
        self.rows = if needle.is_empty() {
            (0..self.cache.len()).collect()
        } else {
            self.cache
                .iter()
                .enumerate()
                .filter(|(_, doc)| {
                    doc.values().any(|v| {
                        coercion::to_display(v, self.display_max_len)
                            .to_lowercase()
                            .contains(&needle)
                    })
                })
                .map(|(i, _)| i)
                .collect()
        };
        self.rows.len()
    }

    pub fn status_line(&self) -> String {
        if self.query.is_empty() {
            format!(
                "Showing {} documents (max {})",
                self.cache.len(),
                self.max_rows
            )
        } else {
            format!("Filtered: {}", self.rows.len())
        }
    }
}

pub fn render_row(doc: &Document, columns: &[String], max_len: usize) -> Vec<String> {
    columns
        .iter()
        .map(|c| {
            doc.get(c)
                .map(|v| coercion::to_display(v, max_len))
                .unwrap_or_default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::into_document;
    use crate::utils::json::json;

    async fn loaded() -> (MemoryStore, SchemaRegistry, BrowserState) {
        let store = MemoryStore::new();
        for (name, kind, status) in [
            ("Gym A", "gym", "available"),
            ("Pool 1", "pool", "maintenance"),
            ("Court", "court", "available"),
        ] {
            store
                .insert(
                    "facilities",
                    into_document(json!({"name": name, "type": kind, "status": status})).unwrap(),
                )
                .await
                .unwrap();
        }
        let registry = SchemaRegistry::builtin().unwrap();
        let mut browser = BrowserState::new(200, 120, 1000);
        browser.load(&store, &registry, "facilities").await.unwrap();
        (store, registry, browser)
    }

    #[tokio::test]
    async fn test_load_and_render() {
        let (_store, _reg, browser) = loaded().await;
        assert_eq!(browser.columns()[..4], ["_id", "name", "type", "status"]);
        assert_eq!(browser.visible_count(), 3);
        let table = browser.table();
        assert_eq!(table[1][1], "Pool 1");
        assert_eq!(browser.status_line(), "Showing 3 documents (max 200)");
    }

    #[tokio::test]
    async fn test_filter_is_idempotent_and_clearable() {
        let (_store, _reg, mut browser) = loaded().await;

        assert_eq!(browser.filter("AVAIL"), 2);
        let once: Vec<_> = browser.table();
        browser.filter("AVAIL");
        assert_eq!(browser.table(), once);
        assert_eq!(browser.status_line(), "Filtered: 2");

        assert_eq!(browser.filter(""), 3);
        assert_eq!(browser.status_line(), "Showing 3 documents (max 200)");
    }

    #[tokio::test]
    async fn test_select_returns_full_document() {
        let (_store, _reg, mut browser) = loaded().await;
        browser.filter("pool");
        let doc = browser.select(0).unwrap();
        assert_eq!(doc["name"], "Pool 1");
        assert!(doc.contains_key("_id"));
        assert!(browser.select(1).is_err());

        let detail = browser.detail(0).unwrap();
        assert_eq!(detail[0].0, "_id");
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_state() {
        let (store, reg, mut browser) = loaded().await;
        store.set_offline(true);

        let res = browser.load(&store, &reg, "members").await;
        assert!(matches!(res, Err(AppError::Connection(_))));
        assert_eq!(browser.collection(), Some("facilities"));
        assert_eq!(browser.cache().len(), 3);
    }

    #[tokio::test]
    async fn test_reload_keeps_filter_on_same_collection() {
        let (store, reg, mut browser) = loaded().await;
        browser.filter("gym");
        browser.load(&store, &reg, "facilities").await.unwrap();
        assert_eq!(browser.query(), "gym");
        assert_eq!(browser.visible_count(), 1);

        browser.load(&store, &reg, "members").await.unwrap();
        assert_eq!(browser.query(), "");
    }
}
