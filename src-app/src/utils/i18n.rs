// FICHIER : src-app/src/utils/i18n.rs

use crate::utils::config::AppConfig;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, OnceLock, RwLock};

// Singleton global : une seule instance pour toute l'app
static TRANSLATOR: OnceLock<Arc<RwLock<Translator>>> = OnceLock::new();

// Catalogues livrés avec le binaire
const BUILTIN_EN: &str = include_str!("../../locales/en.json");
const BUILTIN_FR: &str = include_str!("../../locales/fr.json");

pub struct Translator {
    translations: HashMap<String, String>,
    pub current_lang: String,
}

impl Translator {
    fn new() -> Self {
        Self {
            translations: HashMap::new(),
            current_lang: "en".to_string(),
        }
    }

    fn builtin(lang: &str) -> Option<&'static str> {
        match lang {
            "en" => Some(BUILTIN_EN),
            "fr" => Some(BUILTIN_FR),
            _ => None,
        }
    }

    /// Catalogue embarqué, puis surcharge éventuelle `{locales_dir}/{lang}.json`.
    pub fn load(&mut self, lang: &str, locales_dir: &Path) {
        let embedded = Self::builtin(lang).or_else(|| {
            tracing::warn!("⚠️ Langue '{}' non embarquée, repli sur 'en'", lang);
            Self::builtin("en")
        });

        if let Some(content) = embedded {
            match serde_json::from_str::<HashMap<String, String>>(content) {
                Ok(map) => {
                    self.translations = map;
                    self.current_lang = lang.to_string();
                }
                Err(e) => tracing::error!("❌ Catalogue embarqué '{}' illisible : {}", lang, e),
            }
        }

        let path = locales_dir.join(format!("{}.json", lang));
        if path.exists() {
            self.overlay_from_path(lang, &path);
        }
    }

    fn overlay_from_path(&mut self, lang: &str, path: &Path) {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<HashMap<String, String>>(&content) {
                Ok(map) => {
                    self.translations.extend(map);
                    self.current_lang = lang.to_string();
                    tracing::info!("🌍 Langue surchargée : {} (depuis {:?})", lang, path);
                }
                Err(e) => tracing::error!("❌ Erreur parsing JSON langue ({:?}): {}", path, e),
            },
            Err(e) => tracing::error!("❌ Impossible de lire le fichier langue ({:?}): {}", path, e),
        }
    }

    pub fn t(&self, key: &str) -> String {
        self.translations
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}

/// Initialise le traducteur global avec la langue cible.
pub fn init_i18n(lang: &str) {
    let translator = TRANSLATOR.get_or_init(|| Arc::new(RwLock::new(Translator::new())));
    let locales_dir = AppConfig::get().locales_dir();

    if let Ok(mut guard) = translator.write() {
        guard.load(lang, &locales_dir);
    }
}

/// Traduit une clé via l'instance globale. Clé inconnue ou système non
/// initialisé : la clé elle-même.
pub fn t(key: &str) -> String {
    if let Some(arc) = TRANSLATOR.get() {
        if let Ok(guard) = arc.read() {
            return guard.t(key);
        }
    }
    key.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_translator_default_behavior() {
        let translator = Translator::new();
        assert_eq!(translator.t("HELLO"), "HELLO");
        assert_eq!(translator.current_lang, "en");
    }

    #[test]
    fn test_builtin_catalogues_parse() {
        let dir = tempdir().unwrap();
        for lang in ["en", "fr"] {
            let mut translator = Translator::new();
            translator.load(lang, dir.path());
            assert_eq!(translator.current_lang, lang);
            assert_ne!(translator.t("MSG_LOGIN_OK"), "MSG_LOGIN_OK");
        }
    }

    #[test]
    fn test_overlay_from_locales_dir() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("fr.json"), r#"{ "MSG_LOGIN_OK": "Salut" }"#).unwrap();

        let mut translator = Translator::new();
        translator.load("fr", dir.path());

        assert_eq!(translator.t("MSG_LOGIN_OK"), "Salut");
        // Les autres clés restent celles du catalogue embarqué
        assert_ne!(translator.t("ERR_NOT_FOUND"), "ERR_NOT_FOUND");
        assert_eq!(translator.t("UNKNOWN"), "UNKNOWN");
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        let dir = tempdir().unwrap();
        let mut translator = Translator::new();
        translator.load("es", dir.path());
        assert!(!translator.t("MSG_LOGIN_OK").is_empty());
    }
}
