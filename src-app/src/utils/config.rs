// FICHIER : src-app/src/utils/config.rs

use crate::utils::env;
use crate::utils::json::{self, Value};
use crate::utils::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Singleton global pour la configuration
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

/// Constantes (Single Source of Truth)
pub const DEFAULT_DATABASE: &str = "club_booking_db";
pub const CONFIG_FILE_NAME: &str = "clubhouse.json";
pub const DEFAULT_MAX_ROWS: usize = 200;
pub const DEFAULT_LOOKUP_LIMIT: usize = 1000;
pub const DEFAULT_BOOKINGS_LIMIT: usize = 500;
pub const DEFAULT_DISPLAY_MAX_LEN: usize = 120;
pub const DEFAULT_DETAIL_MAX_LEN: usize = 1000;

/// Configuration globale structurée par niveaux de responsabilité
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Racine des données (base, logs, historique du shell).
    #[serde(default = "default_data_root")]
    pub data_root: PathBuf,

    #[serde(default = "default_database")]
    pub database: String,

    #[serde(default)]
    pub core: CoreConfig,

    #[serde(default)]
    pub ui: UiConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoreConfig {
    pub log_level: String,
    pub language: String,
    /// Crée les collections et insère le jeu d'exemple au démarrage.
    pub seed_on_start: bool,
}

/// Limites de l'interface (lignes chargées, listes de sélection, troncature).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UiConfig {
    pub max_rows: usize,
    pub lookup_limit: usize,
    pub bookings_limit: usize,
    pub display_max_len: usize,
    pub detail_max_len: usize,
}

/// Identifiants de l'administrateur (comparés en clair).
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct AdminConfig {
    pub name: String,
    pub secret: String,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

// --- HELPERS SERDE ---

fn default_data_root() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("clubhouse_domain")
}

fn default_database() -> String {
    DEFAULT_DATABASE.to_string()
}

// --- IMPLÉMENTATION PRINCIPALE ---

impl AppConfig {
    /// Charge la configuration une seule fois pour tout le process.
    pub fn init() -> Result<()> {
        if CONFIG.get().is_some() {
            return Ok(());
        }
        let config = Self::load()?;
        if CONFIG.set(config).is_err() {
            tracing::debug!("AppConfig déjà initialisée par un autre appelant");
        }
        Ok(())
    }

    /// Configuration globale. Sans `init()` préalable, on retombe sur les défauts.
    pub fn get() -> &'static AppConfig {
        CONFIG.get_or_init(AppConfig::default)
    }

    /// Défauts, puis fichier JSON (CLUBHOUSE_CONFIG ou {data_root}/clubhouse.json),
    /// puis surcharges par variables d'environnement.
    pub fn load() -> Result<Self> {
        let explicit = env::get_optional("CLUBHOUSE_CONFIG").map(PathBuf::from);

        let mut config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let root = env::get_optional("CLUBHOUSE_DATA_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or_else(default_data_root);
                let candidate = root.join(CONFIG_FILE_NAME);
                if candidate.exists() {
                    Self::from_file(&candidate)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Lit un fichier partiel : les clés absentes gardent leur valeur par défaut.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Lecture impossible de {} : {}", path.display(), e))
        })?;
        let overlay: Value = serde_json::from_str(&content).map_err(|e| {
            AppError::Config(format!("JSON invalide dans {} : {}", path.display(), e))
        })?;

        let mut base = json::to_value(Self::default())?;
        json::merge(&mut base, overlay);

        serde_json::from_value(base).map_err(|e| {
            AppError::Config(format!("Configuration invalide dans {} : {}", path.display(), e))
        })
    }

    pub fn with_data_root(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            ..Self::default()
        }
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(root) = env::get_optional("CLUBHOUSE_DATA_ROOT") {
            self.data_root = PathBuf::from(root);
        }
        if let Some(db) = env::get_optional("CLUBHOUSE_DB") {
            self.database = db;
        }
        if let Some(rows) = env::get_parsed::<usize>("CLUBHOUSE_MAX_ROWS")? {
            self.ui.max_rows = rows;
        }
        if let Some(level) = env::get_optional("CLUBHOUSE_LOG_LEVEL") {
            self.core.log_level = level;
        }
        if let Some(lang) = env::get_optional("CLUBHOUSE_LANG") {
            self.core.language = lang;
        }
        if let Some(name) = env::get_optional("CLUBHOUSE_ADMIN_NAME") {
            self.admin.name = name;
        }
        if let Some(secret) = env::get_optional("CLUBHOUSE_ADMIN_SECRET") {
            self.admin.secret = secret;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(AppError::Config("Le nom de base est vide".to_string()));
        }
        if self.ui.max_rows == 0 || self.ui.lookup_limit == 0 {
            return Err(AppError::Config(
                "max_rows et lookup_limit doivent être > 0".to_string(),
            ));
        }
        if self.ui.display_max_len < 4 {
            return Err(AppError::Config(
                "display_max_len doit laisser la place à l'ellipse".to_string(),
            ));
        }
        Ok(())
    }

    // --- CHEMINS DÉRIVÉS ---

    pub fn db_root(&self) -> PathBuf {
        self.data_root.join(&self.database)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_root.join("_system").join("logs")
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_root.join("history.txt")
    }

    /// Surcharges locales des schémas de collections.
    pub fn schemas_dir(&self) -> PathBuf {
        self.db_root().join("schemas").join("v1")
    }

    pub fn locales_dir(&self) -> PathBuf {
        self.data_root.join("locales")
    }
}

// --- IMPLÉMENTATIONS PAR DÉFAUT ---

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            database: default_database(),
            core: CoreConfig::default(),
            ui: UiConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            language: "en".to_string(),
            seed_on_start: true,
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            lookup_limit: DEFAULT_LOOKUP_LIMIT,
            bookings_limit: DEFAULT_BOOKINGS_LIMIT,
            display_max_len: DEFAULT_DISPLAY_MAX_LEN,
            detail_max_len: DEFAULT_DETAIL_MAX_LEN,
        }
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            name: "admin".to_string(),
            secret: "admin123".to_string(),
        }
    }
}

// --- TESTS UNITAIRES ---

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use serial_test::serial;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::with_data_root("/tmp/club");
        assert_eq!(cfg.database, "club_booking_db");
        assert_eq!(cfg.ui.max_rows, 200);
        assert_eq!(cfg.ui.lookup_limit, 1000);
        assert_eq!(cfg.admin.name, "admin");
        assert_eq!(cfg.db_root(), PathBuf::from("/tmp/club/club_booking_db"));
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let content = json!({
            "database": "club_test",
            "ui": { "max_rows": 25 }
        });
        fs::write(&path, content.to_string()).unwrap();

        let cfg = AppConfig::from_file(&path).expect("Lecture du fichier partiel");
        assert_eq!(cfg.database, "club_test");
        assert_eq!(cfg.ui.max_rows, 25);
        assert_eq!(cfg.ui.lookup_limit, DEFAULT_LOOKUP_LIMIT);
        assert_eq!(cfg.admin.secret, "admin123");
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "{ pas du json").unwrap();

        assert!(matches!(
            AppConfig::from_file(&path),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("CLUBHOUSE_DB", "club_env");
        std::env::set_var("CLUBHOUSE_MAX_ROWS", "12");
        std::env::set_var("CLUBHOUSE_ADMIN_SECRET", "s3cret");

        let mut cfg = AppConfig::with_data_root("/tmp/club");
        cfg.apply_env_overrides().unwrap();

        std::env::remove_var("CLUBHOUSE_DB");
        std::env::remove_var("CLUBHOUSE_MAX_ROWS");
        std::env::remove_var("CLUBHOUSE_ADMIN_SECRET");

        assert_eq!(cfg.database, "club_env");
        assert_eq!(cfg.ui.max_rows, 12);
        assert_eq!(cfg.admin.secret, "s3cret");
    }

    #[test]
    fn test_admin_secret_hidden_from_debug() {
        let cfg = AppConfig::default();
        let dbg = format!("{:?}", cfg);
        assert!(!dbg.contains("admin123"));
    }

    #[test]
    fn test_validate_rejects_zero_rows() {
        let mut cfg = AppConfig::default();
        cfg.ui.max_rows = 0;
        assert!(cfg.validate().is_err());
    }
}
