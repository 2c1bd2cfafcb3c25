// FICHIER : src-app/tools/clubhouse-cli/src/commands/mod.rs

pub mod admin;
pub mod data;
pub mod member;
pub mod shell;

use clubhouse::admin::coercion;
use clubhouse::store::file::{FileStore, FileStoreConfig};
use clubhouse::store::seed;
use clubhouse::store::worker::StoreWorker;
use clubhouse::store::DocumentStore;
use clubhouse::user_error;
use clubhouse::utils::{AppConfig, AppError, Arc, Result};

/// Largeur maximale d'une colonne dans le terminal.
const COLUMN_WIDTH: usize = 32;

/// Ouvre la base fichier derrière le worker unique.
pub async fn open_store(config: &AppConfig) -> Result<Arc<dyn DocumentStore>> {
    let engine = FileStore::create(FileStoreConfig::from_app(config)).await?;
    let handle = StoreWorker::spawn(Arc::new(engine));
    if config.core.seed_on_start {
        seed::ensure_collections(&handle).await?;
    }
    Ok(Arc::new(handle))
}

/// Message utilisateur pour une erreur métier.
pub fn report(err: &AppError, component: &str, action: &str) {
    user_error!(
        err.message_key(),
        error = err,
        component = component,
        action = action
    );
}

pub fn print_table(columns: &[String], rows: &[Vec<String>]) {
    if columns.is_empty() {
        return;
    }
    let clip = |s: &str| coercion::truncate(s, COLUMN_WIDTH);
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|v| clip(v).chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let line = |cells: Vec<String>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| format!("{:<width$}", cell, width = *w))
            .collect::<Vec<_>>()
            .join(" │ ")
    };

    println!("  # │ {}", line(columns.iter().map(|c| clip(c)).collect()));
    for (i, row) in rows.iter().enumerate() {
        println!("{:>3} │ {}", i, line(row.iter().map(|v| clip(v)).collect()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_store_prepares_collections() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::with_data_root(dir.path());
        let store = open_store(&config).await.unwrap();
        assert_eq!(store.list_collections().await.unwrap().len(), 6);
        assert!(config.db_root().join("collections").exists());
    }
}
