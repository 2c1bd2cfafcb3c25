// FICHIER : src-app/src/utils/logger.rs

use crate::utils::config::AppConfig;
use std::sync::Once;
use tracing_appender::rolling;
use tracing_subscriber::{
    filter::filter_fn, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

// Une seule initialisation par process (les tests appellent plusieurs fois)
static INIT: Once = Once::new();

pub const LOG_FILE_PREFIX: &str = "clubhouse.log";

pub fn init_logging(config: &AppConfig) {
    INIT.call_once(|| {
        let log_dir = config.log_dir();

        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            eprintln!("⚠️ [Logger] Dossier de logs inaccessible {:?} : {}", log_dir, e);
        }

        // =========================================================================
        // LAYER 1 : FICHIER (JSON, rotation quotidienne)
        // =========================================================================
        let file_appender = rolling::daily(&log_dir, LOG_FILE_PREFIX);

        let file_layer = fmt::layer()
            .json()
            .with_writer(file_appender)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        // =========================================================================
        // LAYER 2 : CONSOLE (compacte, filtrée)
        // =========================================================================
        // RUST_LOG prime sur le niveau configuré.
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.core.log_level.as_str()));

        // Les macros user_* écrivent déjà sur le terminal : pas de doublon console.
        let anti_double_filter =
            filter_fn(|metadata| !metadata.fields().iter().any(|f| f.name() == "event"));

        let console_layer = fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .with_filter(anti_double_filter);

        let registry = tracing_subscriber::registry()
            .with(file_layer)
            .with(console_layer);

        if registry.try_init().is_err() {
            tracing::warn!("⚠️ [Logger] Subscriber global déjà actif, ré-initialisation ignorée.");
            return;
        }

        tracing::info!("🚀 Logger initialisé. Logs disponibles dans : {:?}", log_dir);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_logger_init_idempotency() {
        let dir = tempdir().unwrap();
        let config = AppConfig::with_data_root(dir.path());

        init_logging(&config);
        init_logging(&config);
    }
}
